//! End-to-end walk of the pipeline over the public API: registration,
//! qualification, reception hand-over, quoting, and booking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use salesdesk::pipeline::{
    Agent, AgentId, AgentRepository, AgentRole, AgentStatus, Booking, BookingId,
    BookingRepository, CheckInRequest, DiscountInput, GeoError, GeoPoint, GeoVerifier, IntakeGuard,
    Lead, LeadId, LeadIntake, LeadRepository, LeadStage, Notification, NotificationError,
    NotificationPublisher, PaymentPlan, PipelineError, PipelineService, PricingConfig, QuickAction,
    QuoteStatus, RepositoryError, Unit, UnitId, UnitRepository, UnitStatus, VisitStatus,
};

#[derive(Default)]
struct LeadStore(Mutex<HashMap<String, Lead>>);

impl LeadRepository for LeadStore {
    fn insert(&self, lead: Lead) -> Result<Lead, RepositoryError> {
        let mut map = self.0.lock().expect("lead store");
        if map.contains_key(&lead.id.0) {
            return Err(RepositoryError::Conflict);
        }
        map.insert(lead.id.0.clone(), lead.clone());
        Ok(lead)
    }

    fn update(&self, lead: Lead) -> Result<(), RepositoryError> {
        let mut map = self.0.lock().expect("lead store");
        if !map.contains_key(&lead.id.0) {
            return Err(RepositoryError::NotFound);
        }
        map.insert(lead.id.0.clone(), lead);
        Ok(())
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        Ok(self.0.lock().expect("lead store").get(&id.0).cloned())
    }

    fn list(&self) -> Result<Vec<Lead>, RepositoryError> {
        Ok(self.0.lock().expect("lead store").values().cloned().collect())
    }

    fn find_by_mobile(&self, mobile: &str) -> Result<Vec<Lead>, RepositoryError> {
        Ok(self
            .0
            .lock()
            .expect("lead store")
            .values()
            .filter(|lead| lead.mobile == mobile)
            .cloned()
            .collect())
    }

    fn find_by_gate_pass(&self, token: &str) -> Result<Option<Lead>, RepositoryError> {
        Ok(self
            .0
            .lock()
            .expect("lead store")
            .values()
            .find(|lead| {
                lead.gate_pass
                    .as_ref()
                    .map(|pass| pass.token == token)
                    .unwrap_or(false)
            })
            .cloned())
    }
}

#[derive(Default)]
struct AgentStore(Mutex<Vec<Agent>>);

impl AgentRepository for AgentStore {
    fn insert(&self, agent: Agent) -> Result<Agent, RepositoryError> {
        self.0.lock().expect("agent store").push(agent.clone());
        Ok(agent)
    }

    fn update(&self, agent: Agent) -> Result<(), RepositoryError> {
        let mut pool = self.0.lock().expect("agent store");
        let stored = pool
            .iter_mut()
            .find(|stored| stored.id == agent.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = agent;
        Ok(())
    }

    fn fetch(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        Ok(self
            .0
            .lock()
            .expect("agent store")
            .iter()
            .find(|agent| &agent.id == id)
            .cloned())
    }

    fn list(&self) -> Result<Vec<Agent>, RepositoryError> {
        Ok(self.0.lock().expect("agent store").clone())
    }
}

#[derive(Default)]
struct UnitStore(Mutex<HashMap<String, Unit>>);

impl UnitRepository for UnitStore {
    fn insert(&self, unit: Unit) -> Result<Unit, RepositoryError> {
        self.0
            .lock()
            .expect("unit store")
            .insert(unit.id.0.clone(), unit.clone());
        Ok(unit)
    }

    fn update_versioned(&self, unit: Unit, expected_version: u64) -> Result<(), RepositoryError> {
        let mut map = self.0.lock().expect("unit store");
        let stored = map.get(&unit.id.0).ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::StaleWrite);
        }
        map.insert(unit.id.0.clone(), unit);
        Ok(())
    }

    fn fetch(&self, id: &UnitId) -> Result<Option<Unit>, RepositoryError> {
        Ok(self.0.lock().expect("unit store").get(&id.0).cloned())
    }

    fn list(&self) -> Result<Vec<Unit>, RepositoryError> {
        Ok(self.0.lock().expect("unit store").values().cloned().collect())
    }
}

#[derive(Default)]
struct BookingStore(Mutex<HashMap<String, Booking>>);

impl BookingRepository for BookingStore {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        let mut map = self.0.lock().expect("booking store");
        if map.contains_key(&booking.id.0) {
            return Err(RepositoryError::Conflict);
        }
        map.insert(booking.id.0.clone(), booking.clone());
        Ok(booking)
    }

    fn remove(&self, id: &BookingId) -> Result<(), RepositoryError> {
        self.0
            .lock()
            .expect("booking store")
            .remove(&id.0)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn fetch(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.0.lock().expect("booking store").get(&id.0).cloned())
    }

    fn list(&self) -> Result<Vec<Booking>, RepositoryError> {
        Ok(self
            .0
            .lock()
            .expect("booking store")
            .values()
            .cloned()
            .collect())
    }

    fn find_by_unit(&self, unit: &UnitId) -> Result<Option<Booking>, RepositoryError> {
        Ok(self
            .0
            .lock()
            .expect("booking store")
            .values()
            .find(|booking| &booking.unit_id == unit)
            .cloned())
    }
}

#[derive(Default)]
struct SilentNotifier;

impl NotificationPublisher for SilentNotifier {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Ok(())
    }
}

struct OnSiteGeo;

impl GeoVerifier for OnSiteGeo {
    fn distance_to_project(&self, _project: &str, _point: GeoPoint) -> Result<f64, GeoError> {
        Ok(25.0)
    }
}

type Service = PipelineService<LeadStore, AgentStore, UnitStore, BookingStore, SilentNotifier, OnSiteGeo>;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 2, 10, 0, 0).single().expect("valid timestamp")
}

fn agent(id: &str, role: AgentRole, minutes_ago: i64) -> Agent {
    Agent {
        id: AgentId(id.to_string()),
        name: format!("Agent {id}"),
        role,
        active: true,
        status: AgentStatus::Online,
        last_assigned_at: start() - Duration::minutes(minutes_ago),
    }
}

fn unit(id: &str, floor: u32, area: u32) -> Unit {
    Unit {
        id: UnitId(id.to_string()),
        project: "Skyline Heights".to_string(),
        tower: "A".to_string(),
        floor,
        area,
        unit_type: "3BHK".to_string(),
        status: UnitStatus::Available,
        blocked_by: None,
        blocked_at: None,
        version: 1,
    }
}

fn build_service() -> Arc<Service> {
    let leads = Arc::new(LeadStore::default());
    let agents = Arc::new(AgentStore::default());
    let units = Arc::new(UnitStore::default());
    let bookings = Arc::new(BookingStore::default());

    for seeded in [
        agent("p1", AgentRole::Presales, 120),
        agent("p2", AgentRole::Presales, 60),
        agent("s1", AgentRole::Sales, 180),
        agent("s2", AgentRole::Sales, 90),
    ] {
        agents.insert(seeded).expect("seed agent");
    }
    for seeded in [unit("A-1201", 12, 750), unit("A-0704", 7, 1050)] {
        units.insert(seeded).expect("seed unit");
    }

    Arc::new(PipelineService::new(
        leads,
        agents,
        units,
        bookings,
        Arc::new(SilentNotifier),
        Arc::new(OnSiteGeo),
        PricingConfig::standard(),
        IntakeGuard::default(),
    ))
}

fn intake(mobile: &str) -> LeadIntake {
    LeadIntake {
        name: "Asha Rao".to_string(),
        mobile: mobile.to_string(),
        email: Some("asha@example.com".to_string()),
        source: "Website".to_string(),
        sub_source: Some("organic".to_string()),
        project: "Skyline Heights".to_string(),
    }
}

#[test]
fn full_journey_from_intake_to_booking() {
    let service = build_service();
    let mut now = start();

    // Registration routes to the longest-idle pre-sales agent.
    let lead = service.intake_lead(intake("9876543210"), now).expect("intake");
    assert_eq!(lead.stage, LeadStage::New);
    assert_eq!(lead.assigned_agent, Some(AgentId("p1".to_string())));

    // Qualification over two calls.
    now += Duration::hours(2);
    service
        .quick_action(&lead.id, QuickAction::Rnr, "p1", now)
        .expect("first call");
    now += Duration::days(1);
    let qualified = service
        .quick_action(&lead.id, QuickAction::Visit, "p1", now)
        .expect("second call");
    assert_eq!(qualified.stage, LeadStage::VisitScheduled);
    assert_eq!(qualified.call_count, 2);

    // Gate pass for the scheduled visit, scanned at the gate next morning.
    let pass = service.issue_gate_pass(&lead.id, now).expect("gate pass");
    now += Duration::hours(20);
    let arrival = service.scan_gate_pass(&pass.token, now).expect("scan");
    assert_eq!(
        arrival.handover.expect("handover").to,
        Some(AgentId("s1".to_string()))
    );

    // The closing agent walks them through the meeting.
    service
        .advance_visit(&arrival.lead.id, &arrival.visit_id, VisitStatus::InMeeting)
        .expect("meeting starts");
    service
        .advance_visit(&arrival.lead.id, &arrival.visit_id, VisitStatus::Completed)
        .expect("meeting ends");

    // Quote within the auto-approval band, then book.
    let quote = service
        .generate_quote(
            &lead.id,
            &UnitId("A-1201".to_string()),
            DiscountInput {
                per_area: 100,
                include_parking: true,
            },
            PaymentPlan::ConstructionLinked,
            now,
        )
        .expect("quote");
    assert_eq!(quote.status, QuoteStatus::Approved);
    assert_eq!(quote.cost_sheet.final_price, 8_439_000);

    now += Duration::days(2);
    let outcome = service
        .finalize_booking(&lead.id, &quote.id, now)
        .expect("booking");
    assert_eq!(outcome.booking.total_cost, 8_439_000);

    let closed = service.get_lead(&lead.id).expect("lead");
    assert_eq!(closed.stage, LeadStage::Booked);
    let sold = service.get_unit(&UnitId("A-1201".to_string())).expect("unit");
    assert_eq!(sold.status, UnitStatus::Sold);
}

#[test]
fn discount_above_threshold_requires_approval_before_booking() {
    let service = build_service();
    let now = start();

    let lead = service.intake_lead(intake("9876500001"), now).expect("intake");
    let quote = service
        .generate_quote(
            &lead.id,
            &UnitId("A-0704".to_string()),
            DiscountInput {
                per_area: 300,
                include_parking: false,
            },
            PaymentPlan::DownPayment,
            now,
        )
        .expect("quote");
    assert_eq!(quote.status, QuoteStatus::PendingApproval);

    let premature = service.finalize_booking(&lead.id, &quote.id, now);
    assert!(matches!(premature, Err(PipelineError::Booking(_))));

    service.approve_quote(&lead.id, &quote.id, now).expect("approval");
    service
        .finalize_booking(&lead.id, &quote.id, now + Duration::days(1))
        .expect("booking after approval");
}

#[test]
fn walk_in_without_history_lands_directly_with_sales() {
    let service = build_service();

    let outcome = service
        .check_in(
            CheckInRequest {
                name: "Vikram Shah".to_string(),
                mobile: "9876500002".to_string(),
                project: "Skyline Heights".to_string(),
                declared_source: "Walk-in".to_string(),
                override_source_conflict: false,
                geo: Some(GeoPoint {
                    latitude: 19.07,
                    longitude: 72.88,
                }),
            },
            start(),
        )
        .expect("check-in");

    assert!(outcome.created_new_lead);
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.lead.stage, LeadStage::Negotiation);
    assert_eq!(outcome.lead.assigned_agent, Some(AgentId("s1".to_string())));
}

#[test]
fn concurrent_bookings_on_one_unit_leave_exactly_one_winner() {
    let service = build_service();
    let now = start();

    let mut contenders = Vec::new();
    for digit in 0..4 {
        let lead = service
            .intake_lead(intake(&format!("987651000{digit}")), now)
            .expect("intake");
        let quote = service
            .generate_quote(
                &lead.id,
                &UnitId("A-1201".to_string()),
                DiscountInput {
                    per_area: 0,
                    include_parking: true,
                },
                PaymentPlan::ConstructionLinked,
                now,
            )
            .expect("quote");
        contenders.push((lead.id, quote.id));
    }

    let handles: Vec<_> = contenders
        .into_iter()
        .map(|(lead_id, quote_id)| {
            let service = service.clone();
            std::thread::spawn(move || {
                service
                    .finalize_booking(&lead_id, &quote_id, now + Duration::hours(1))
                    .is_ok()
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread"))
        .filter(|won| *won)
        .count();

    assert_eq!(wins, 1, "the unit must be sold exactly once");
    assert_eq!(service.bookings().expect("bookings").len(), 1);

    let sold = service.get_unit(&UnitId("A-1201".to_string())).expect("unit");
    assert_eq!(sold.status, UnitStatus::Sold);
}
