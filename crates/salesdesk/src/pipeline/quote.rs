use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CostSheet, Lead, PaymentPlan, Quote, QuoteId, QuoteStatus, Unit};
use super::pricing::PricingConfig;

/// Discount input for one cost sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountInput {
    /// Discount per unit of area, in whole currency units.
    pub per_area: i64,
    pub include_parking: bool,
}

/// Errors raised while pricing or mutating quotes.
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("discount per area must be non-negative, got {0}")]
    NegativeDiscount(i64),
    #[error("discount per area {found} exceeds the hard ceiling of {ceiling}")]
    DiscountAboveCeiling { ceiling: i64, found: i64 },
    #[error("quote not found on this lead")]
    QuoteNotFound,
    #[error("quote is '{}', approval requires 'pending_approval'", .0.label())]
    NotPendingApproval(QuoteStatus),
    #[error("quote is '{}' and can no longer be rejected", .0.label())]
    NotRejectable(QuoteStatus),
}

static QUOTE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_quote_id() -> QuoteId {
    let id = QUOTE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    QuoteId(format!("qt-{id:06}"))
}

/// Computes cost sheets from the rate table and manages versioned quotes
/// with the discount approval gate.
#[derive(Debug, Clone)]
pub struct QuoteEngine {
    pricing: PricingConfig,
}

impl QuoteEngine {
    pub fn new(pricing: PricingConfig) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Whether this discount needs explicit approval before booking.
    pub fn needs_approval(&self, discount_per_area: i64) -> bool {
        discount_per_area > self.pricing.max_discount_per_area
    }

    /// Pure pricing computation:
    ///
    /// base      = base_rate * area
    /// floorRise = floor * floor_rise_rate * area
    /// gross     = base + floorRise + amenities [+ parking]
    /// taxes     = gross * gst
    /// total     = gross + taxes + registration + (base + floorRise) * stamp_duty
    /// final     = total - discount_per_area * area
    ///
    /// A discount above the hard ceiling is rejected outright; one merely
    /// above the approval threshold is allowed and flips the approval gate
    /// on the resulting quote instead.
    pub fn compute_cost_sheet(
        &self,
        unit: &Unit,
        discount: DiscountInput,
    ) -> Result<CostSheet, QuoteError> {
        if discount.per_area < 0 {
            return Err(QuoteError::NegativeDiscount(discount.per_area));
        }
        if discount.per_area > self.pricing.discount_ceiling_per_area {
            return Err(QuoteError::DiscountAboveCeiling {
                ceiling: self.pricing.discount_ceiling_per_area,
                found: discount.per_area,
            });
        }

        let area = i64::from(unit.area);
        let base_cost = self.pricing.base_rate_per_area * area;
        let floor_rise = i64::from(unit.floor) * self.pricing.floor_rise_per_floor * area;
        let parking = if discount.include_parking {
            self.pricing.parking
        } else {
            0
        };
        let gross = base_cost + floor_rise + self.pricing.amenities + parking;
        let taxes = ((gross as f64) * self.pricing.gst_rate).round() as i64;
        let stamp_duty =
            (((base_cost + floor_rise) as f64) * self.pricing.stamp_duty_rate).round() as i64;
        let total = gross + taxes + self.pricing.registration_fee + stamp_duty;
        let discount_amount = discount.per_area * area;
        let final_price = total - discount_amount;

        Ok(CostSheet {
            base_cost,
            floor_rise,
            amenities: self.pricing.amenities,
            parking,
            gross,
            taxes,
            registration: self.pricing.registration_fee,
            stamp_duty,
            total,
            discount: discount_amount,
            final_price,
            discount_per_area: discount.per_area,
        })
    }

    /// Append a new quote version for this (lead, unit) pair. Prior versions
    /// are never edited or replaced; the full audit trail stays on the lead.
    pub fn generate_quote(
        &self,
        lead: &mut Lead,
        unit: &Unit,
        discount: DiscountInput,
        payment_plan: PaymentPlan,
        now: DateTime<Utc>,
    ) -> Result<Quote, QuoteError> {
        let cost_sheet = self.compute_cost_sheet(unit, discount)?;

        let version = 1 + lead
            .quotes
            .iter()
            .filter(|quote| quote.unit_id == unit.id)
            .map(|quote| quote.version)
            .max()
            .unwrap_or(0);

        let status = if self.needs_approval(discount.per_area) {
            QuoteStatus::PendingApproval
        } else {
            QuoteStatus::Approved
        };

        let quote = Quote {
            id: next_quote_id(),
            lead_id: lead.id.clone(),
            unit_id: unit.id.clone(),
            version,
            cost_sheet,
            payment_plan,
            status,
            created_at: now,
            valid_until: now + Duration::days(self.pricing.quote_validity_days),
        };

        lead.quotes.push(quote.clone());
        Ok(quote)
    }
}

/// Promote a pending quote. Callable only by an authorized actor; the UI
/// confirmation dialog is just one possible caller.
pub fn approve_quote(lead: &mut Lead, id: &QuoteId) -> Result<Quote, QuoteError> {
    let quote = lead
        .quotes
        .iter_mut()
        .find(|quote| &quote.id == id)
        .ok_or(QuoteError::QuoteNotFound)?;
    if quote.status != QuoteStatus::PendingApproval {
        return Err(QuoteError::NotPendingApproval(quote.status));
    }
    quote.status = QuoteStatus::Approved;
    Ok(quote.clone())
}

/// Reject a quote that has not yet been booked.
pub fn reject_quote(lead: &mut Lead, id: &QuoteId) -> Result<Quote, QuoteError> {
    let quote = lead
        .quotes
        .iter_mut()
        .find(|quote| &quote.id == id)
        .ok_or(QuoteError::QuoteNotFound)?;
    match quote.status {
        QuoteStatus::PendingApproval | QuoteStatus::Approved => {
            quote.status = QuoteStatus::Rejected;
            Ok(quote.clone())
        }
        other => Err(QuoteError::NotRejectable(other)),
    }
}
