use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::pipeline::dispatch::{
    GeoError, GeoPoint, GeoVerifier, Notification, NotificationError, NotificationPublisher,
};
use crate::pipeline::domain::{
    Agent, AgentId, AgentRole, AgentStatus, Booking, BookingId, Lead, LeadId, Unit, UnitId,
    UnitStatus,
};
use crate::pipeline::intake::{IntakeGuard, LeadIntake};
use crate::pipeline::pricing::PricingConfig;
use crate::pipeline::repository::{
    AgentRepository, BookingRepository, LeadRepository, RepositoryError, UnitRepository,
};
use crate::pipeline::service::PipelineService;

pub(super) type TestService = PipelineService<
    MemoryLeads,
    MemoryAgents,
    MemoryUnits,
    MemoryBookings,
    MemoryNotifier,
    StaticGeo,
>;

pub(super) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).single().expect("valid timestamp")
}

pub(super) fn pricing() -> PricingConfig {
    PricingConfig::standard()
}

pub(super) fn agent(id: &str, role: AgentRole, minutes_ago: i64) -> Agent {
    Agent {
        id: AgentId(id.to_string()),
        name: format!("Agent {id}"),
        role,
        active: true,
        status: AgentStatus::Online,
        last_assigned_at: epoch() - chrono::Duration::minutes(minutes_ago),
    }
}

pub(super) fn unit(id: &str, floor: u32, area: u32) -> Unit {
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

pub(super) fn intake(name: &str, mobile: &str) -> LeadIntake {
    LeadIntake {
        name: name.to_string(),
        mobile: mobile.to_string(),
        email: None,
        source: "Website".to_string(),
        sub_source: None,
        project: "Skyline Heights".to_string(),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryLeads {
    records: Arc<Mutex<HashMap<LeadId, Lead>>>,
}

impl LeadRepository for MemoryLeads {
    fn insert(&self, lead: Lead) -> Result<Lead, RepositoryError> {
        let mut guard = self.records.lock().expect("lead mutex poisoned");
        if guard.contains_key(&lead.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(lead.id.clone(), lead.clone());
        Ok(lead)
    }

    fn update(&self, lead: Lead) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("lead mutex poisoned");
        if !guard.contains_key(&lead.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(lead.id.clone(), lead);
        Ok(())
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let guard = self.records.lock().expect("lead mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Lead>, RepositoryError> {
        let guard = self.records.lock().expect("lead mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn find_by_mobile(&self, mobile: &str) -> Result<Vec<Lead>, RepositoryError> {
        let guard = self.records.lock().expect("lead mutex poisoned");
        Ok(guard
            .values()
            .filter(|lead| lead.mobile == mobile)
            .cloned()
            .collect())
    }

    fn find_by_gate_pass(&self, token: &str) -> Result<Option<Lead>, RepositoryError> {
        let guard = self.records.lock().expect("lead mutex poisoned");
        Ok(guard
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

#[derive(Default, Clone)]
pub(super) struct MemoryAgents {
    records: Arc<Mutex<Vec<Agent>>>,
}

impl MemoryAgents {
    pub(super) fn seed(&self, agents: Vec<Agent>) {
        *self.records.lock().expect("agent mutex poisoned") = agents;
    }
}

impl AgentRepository for MemoryAgents {
    fn insert(&self, agent: Agent) -> Result<Agent, RepositoryError> {
        let mut guard = self.records.lock().expect("agent mutex poisoned");
        if guard.iter().any(|stored| stored.id == agent.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(agent.clone());
        Ok(agent)
    }

    fn update(&self, agent: Agent) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("agent mutex poisoned");
        let Some(stored) = guard.iter_mut().find(|stored| stored.id == agent.id) else {
            return Err(RepositoryError::NotFound);
        };
        *stored = agent;
        Ok(())
    }

    fn fetch(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        let guard = self.records.lock().expect("agent mutex poisoned");
        Ok(guard.iter().find(|agent| &agent.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Agent>, RepositoryError> {
        let guard = self.records.lock().expect("agent mutex poisoned");
        Ok(guard.clone())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryUnits {
    records: Arc<Mutex<HashMap<UnitId, Unit>>>,
}

impl UnitRepository for MemoryUnits {
    fn insert(&self, unit: Unit) -> Result<Unit, RepositoryError> {
        let mut guard = self.records.lock().expect("unit mutex poisoned");
        if guard.contains_key(&unit.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(unit.id.clone(), unit.clone());
        Ok(unit)
    }

    fn update_versioned(&self, unit: Unit, expected_version: u64) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("unit mutex poisoned");
        let Some(stored) = guard.get(&unit.id) else {
            return Err(RepositoryError::NotFound);
        };
        if stored.version != expected_version {
            return Err(RepositoryError::StaleWrite);
        }
        guard.insert(unit.id.clone(), unit);
        Ok(())
    }

    fn fetch(&self, id: &UnitId) -> Result<Option<Unit>, RepositoryError> {
        let guard = self.records.lock().expect("unit mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Unit>, RepositoryError> {
        let guard = self.records.lock().expect("unit mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryBookings {
    records: Arc<Mutex<HashMap<BookingId, Booking>>>,
}

impl BookingRepository for MemoryBookings {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        let mut guard = self.records.lock().expect("booking mutex poisoned");
        if guard.contains_key(&booking.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(booking.id.clone(), booking.clone());
        Ok(booking)
    }

    fn remove(&self, id: &BookingId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("booking mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn fetch(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let guard = self.records.lock().expect("booking mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Booking>, RepositoryError> {
        let guard = self.records.lock().expect("booking mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn find_by_unit(&self, unit: &UnitId) -> Result<Option<Booking>, RepositoryError> {
        let guard = self.records.lock().expect("booking mutex poisoned");
        Ok(guard
            .values()
            .find(|booking| &booking.unit_id == unit)
            .cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
    fail: Arc<Mutex<bool>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn set_failing(&self, failing: bool) {
        *self.fail.lock().expect("notifier mutex poisoned") = failing;
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        if *self.fail.lock().expect("notifier mutex poisoned") {
            return Err(NotificationError::Transport("gateway offline".to_string()));
        }
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

#[derive(Clone)]
pub(super) struct StaticGeo {
    pub(super) distance: Option<f64>,
}

impl Default for StaticGeo {
    fn default() -> Self {
        Self {
            distance: Some(40.0),
        }
    }
}

impl GeoVerifier for StaticGeo {
    fn distance_to_project(&self, _project: &str, _point: GeoPoint) -> Result<f64, GeoError> {
        match self.distance {
            Some(distance) => Ok(distance),
            None => Err(GeoError::Unavailable("provider timeout".to_string())),
        }
    }
}

pub(super) struct TestHarness {
    pub(super) service: Arc<TestService>,
    pub(super) leads: Arc<MemoryLeads>,
    pub(super) agents: Arc<MemoryAgents>,
    pub(super) units: Arc<MemoryUnits>,
    pub(super) bookings: Arc<MemoryBookings>,
    pub(super) notifier: Arc<MemoryNotifier>,
}

pub(super) fn build_harness() -> TestHarness {
    build_harness_with_geo(StaticGeo::default())
}

pub(super) fn build_harness_with_geo(geo: StaticGeo) -> TestHarness {
    let leads = Arc::new(MemoryLeads::default());
    let agents = Arc::new(MemoryAgents::default());
    let units = Arc::new(MemoryUnits::default());
    let bookings = Arc::new(MemoryBookings::default());
    let notifier = Arc::new(MemoryNotifier::default());

    agents.seed(vec![
        agent("p1", AgentRole::Presales, 60),
        agent("p2", AgentRole::Presales, 45),
        agent("s1", AgentRole::Sales, 90),
        agent("s2", AgentRole::Sales, 30),
    ]);
    units
        .insert(unit("A-1201", 12, 750))
        .expect("seed unit A-1201");
    units
        .insert(unit("A-0704", 7, 1050))
        .expect("seed unit A-0704");

    let service = Arc::new(PipelineService::new(
        leads.clone(),
        agents.clone(),
        units.clone(),
        bookings.clone(),
        notifier.clone(),
        Arc::new(geo),
        pricing(),
        IntakeGuard::default(),
    ));

    TestHarness {
        service,
        leads,
        agents,
        units,
        bookings,
        notifier,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
