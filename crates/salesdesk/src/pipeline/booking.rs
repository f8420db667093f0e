use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::error;

use super::dispatch::{Notification, NotificationPublisher};
use super::domain::{
    Booking, BookingId, LeadId, LeadStage, Milestone, MilestoneStatus, Quote, QuoteId, QuoteStatus,
    UnitStatus,
};
use super::inventory::{InventoryError, InventoryLedger};
use super::pricing::PricingConfig;
use super::repository::{BookingRepository, LeadRepository, RepositoryError, UnitRepository};
use super::stages::append_remark;

/// Booking preconditions and commit failures, each with a distinct reason so
/// callers can show the right remediation.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("lead not found")]
    LeadNotFound,
    #[error("quote not found on this lead")]
    QuoteNotFound,
    #[error("quote is '{}', booking requires 'approved'", .0.label())]
    QuoteNotApproved(QuoteStatus),
    #[error("quote validity window has elapsed")]
    QuoteExpired,
    #[error("unit already sold")]
    UnitAlreadySold,
    #[error(transparent)]
    Inventory(InventoryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<InventoryError> for BookingError {
    fn from(error: InventoryError) -> Self {
        match error {
            InventoryError::AlreadySold => BookingError::UnitAlreadySold,
            other => BookingError::Inventory(other),
        }
    }
}

/// A committed booking plus any post-commit collaborator warnings.
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub warnings: Vec<String>,
}

static BOOKING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_booking_id() -> BookingId {
    let id = BOOKING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BookingId(format!("bk-{id:06}"))
}

/// Converts one approved, still-valid quote into a booking, selling the unit
/// and closing the lead as a single logical transaction.
pub struct BookingFinalizer<L, U, B, N> {
    leads: Arc<L>,
    ledger: Arc<InventoryLedger<U>>,
    bookings: Arc<B>,
    notifier: Arc<N>,
    booking_amount: i64,
}

impl<L, U, B, N> BookingFinalizer<L, U, B, N>
where
    L: LeadRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        leads: Arc<L>,
        ledger: Arc<InventoryLedger<U>>,
        bookings: Arc<B>,
        notifier: Arc<N>,
        pricing: &PricingConfig,
    ) -> Self {
        Self {
            leads,
            ledger,
            bookings,
            notifier,
            booking_amount: pricing.booking_amount,
        }
    }

    /// Preconditions are all checked before any mutation; the unit sale, the
    /// quote status, the lead stage, and the new booking then commit
    /// together or not at all.
    pub fn book_from(
        &self,
        lead_id: &LeadId,
        quote_id: &QuoteId,
        now: DateTime<Utc>,
    ) -> Result<BookingOutcome, BookingError> {
        let mut lead = self
            .leads
            .fetch(lead_id)?
            .ok_or(BookingError::LeadNotFound)?;
        let lead_snapshot = lead.clone();

        let quote = lead
            .quote(quote_id)
            .cloned()
            .ok_or(BookingError::QuoteNotFound)?;
        if quote.status != QuoteStatus::Approved {
            return Err(BookingError::QuoteNotApproved(quote.status));
        }
        if quote.is_expired(now) {
            return Err(BookingError::QuoteExpired);
        }

        let unit_before = self.ledger.get(&quote.unit_id)?;
        if unit_before.status == UnitStatus::Sold {
            return Err(BookingError::UnitAlreadySold);
        }

        // First mutation. The CAS inside the ledger is the race guard: two
        // concurrent attempts on one unit cannot both pass this line.
        let sold = self.ledger.sell(&quote.unit_id)?;

        let booking = self.build_booking(&lead, &quote, now);

        for stored in lead.quotes.iter_mut() {
            if &stored.id == quote_id {
                stored.status = QuoteStatus::Booked;
            }
        }
        lead.stage = LeadStage::Booked;
        lead.sub_stage = None;
        lead.next_follow_up = None;
        append_remark(
            &mut lead,
            "system",
            format!("booked unit {} via quote {}", quote.unit_id.0, quote.id.0),
            now,
        );

        // Compensation failures cannot be retried from here; they leave the
        // unit sold without a booking, so they are loudly recorded.
        if let Err(err) = self.leads.update(lead.clone()) {
            if let Err(undo) = self.ledger.reinstate(unit_before, sold.version) {
                error!(unit = %sold.id.0, %undo, "unit left sold after aborted booking");
            }
            return Err(err.into());
        }

        if let Err(err) = self.bookings.insert(booking.clone()) {
            if let Err(undo) = self.leads.update(lead_snapshot) {
                error!(lead = %lead.id.0, %undo, "lead left booked after aborted booking");
            }
            if let Err(undo) = self.ledger.reinstate(unit_before, sold.version) {
                error!(unit = %sold.id.0, %undo, "unit left sold after aborted booking");
            }
            return Err(err.into());
        }

        let mut warnings = Vec::new();
        let notification = Notification {
            template: "booking_confirmed".to_string(),
            lead_id: lead.id.clone(),
            contact: lead.mobile.clone(),
            details: Default::default(),
        };
        if let Err(err) = self.notifier.publish(notification) {
            warnings.push(format!("booking confirmation not sent: {err}"));
        }

        Ok(BookingOutcome { booking, warnings })
    }

    fn build_booking(
        &self,
        lead: &super::domain::Lead,
        quote: &Quote,
        now: DateTime<Utc>,
    ) -> Booking {
        Booking {
            id: next_booking_id(),
            lead_id: lead.id.clone(),
            unit_id: quote.unit_id.clone(),
            quote_id: quote.id.clone(),
            customer_name: lead.name.clone(),
            // Locked financials, taken verbatim from the quote. Never
            // recomputed from current pricing.
            total_cost: quote.cost_sheet.final_price,
            agreement_value: quote.cost_sheet.gross,
            booked_at: now,
            schedule: milestone_schedule(quote.cost_sheet.final_price, self.booking_amount, now),
            cancelled: false,
        }
    }
}

/// Fixed construction-linked breakdown: a paid booking token, percentage
/// milestones, and a possession milestone absorbing the rounding remainder
/// so the schedule always sums to the final price.
fn milestone_schedule(final_price: i64, booking_amount: i64, now: DateTime<Utc>) -> Vec<Milestone> {
    const SLABS: [(&str, i64); 6] = [
        ("Agreement Signing", 10),
        ("Foundation Complete", 20),
        ("Plinth Level", 15),
        ("Superstructure", 15),
        ("Brickwork & Plaster", 10),
        ("Finishing", 10),
    ];

    let token = booking_amount.min(final_price);
    let mut schedule = vec![Milestone {
        name: "Booking Token".to_string(),
        amount: token,
        due_on: now,
        status: MilestoneStatus::Paid,
    }];

    let mut allocated = token;
    for (index, (name, percent)) in SLABS.iter().enumerate() {
        let amount = final_price * percent / 100;
        allocated += amount;
        schedule.push(Milestone {
            name: (*name).to_string(),
            amount,
            due_on: now + Duration::days(30 * (index as i64 + 1)),
            status: if index == 0 {
                MilestoneStatus::Due
            } else {
                MilestoneStatus::Upcoming
            },
        });
    }

    schedule.push(Milestone {
        name: "Possession".to_string(),
        amount: final_price - allocated,
        due_on: now + Duration::days(30 * (SLABS.len() as i64 + 1)),
        status: MilestoneStatus::Upcoming,
    });

    schedule
}

/// Overdue is derived against the clock, never stored.
pub fn milestone_display_status(milestone: &Milestone, now: DateTime<Utc>) -> MilestoneStatus {
    match milestone.status {
        MilestoneStatus::Upcoming | MilestoneStatus::Due if now > milestone.due_on => {
            MilestoneStatus::Overdue
        }
        status => status,
    }
}
