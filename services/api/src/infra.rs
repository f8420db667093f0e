use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use salesdesk::pipeline::{
    Agent, AgentId, AgentRepository, AgentRole, AgentStatus, Booking, BookingId,
    BookingRepository, GeoError, GeoPoint, GeoVerifier, Lead, LeadId, LeadRepository,
    Notification, NotificationError, NotificationPublisher, RepositoryError, Unit, UnitId,
    UnitRepository, UnitStatus,
};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLeadRepository {
    records: Arc<Mutex<HashMap<LeadId, Lead>>>,
}

impl LeadRepository for InMemoryLeadRepository {
    fn insert(&self, lead: Lead) -> Result<Lead, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&lead.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(lead.id.clone(), lead.clone());
        Ok(lead)
    }

    fn update(&self, lead: Lead) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&lead.id) {
            guard.insert(lead.id.clone(), lead);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Lead>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn find_by_mobile(&self, mobile: &str) -> Result<Vec<Lead>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|lead| lead.mobile == mobile)
            .cloned()
            .collect())
    }

    fn find_by_gate_pass(&self, token: &str) -> Result<Option<Lead>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
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
pub(crate) struct InMemoryAgentRepository {
    pool: Arc<Mutex<Vec<Agent>>>,
}

impl AgentRepository for InMemoryAgentRepository {
    fn insert(&self, agent: Agent) -> Result<Agent, RepositoryError> {
        let mut guard = self.pool.lock().expect("repository mutex poisoned");
        if guard.iter().any(|stored| stored.id == agent.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(agent.clone());
        Ok(agent)
    }

    fn update(&self, agent: Agent) -> Result<(), RepositoryError> {
        let mut guard = self.pool.lock().expect("repository mutex poisoned");
        match guard.iter_mut().find(|stored| stored.id == agent.id) {
            Some(stored) => {
                *stored = agent;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError> {
        let guard = self.pool.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|agent| &agent.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Agent>, RepositoryError> {
        let guard = self.pool.lock().expect("repository mutex poisoned");
        Ok(guard.clone())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUnitRepository {
    records: Arc<Mutex<HashMap<UnitId, Unit>>>,
}

impl UnitRepository for InMemoryUnitRepository {
    fn insert(&self, unit: Unit) -> Result<Unit, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&unit.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(unit.id.clone(), unit.clone());
        Ok(unit)
    }

    fn update_versioned(&self, unit: Unit, expected_version: u64) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get(&unit.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::StaleWrite);
        }
        guard.insert(unit.id.clone(), unit);
        Ok(())
    }

    fn fetch(&self, id: &UnitId) -> Result<Option<Unit>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Unit>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryBookingRepository {
    records: Arc<Mutex<HashMap<BookingId, Booking>>>,
}

impl BookingRepository for InMemoryBookingRepository {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&booking.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(booking.id.clone(), booking.clone());
        Ok(booking)
    }

    fn remove(&self, id: &BookingId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn fetch(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Booking>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn find_by_unit(&self, unit: &UnitId) -> Result<Option<Booking>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|booking| &booking.unit_id == unit)
            .cloned())
    }
}

/// Logs outbound messages instead of dispatching them. Swap in a gateway
/// adapter for production.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationPublisher for LoggingNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            lead = %notification.lead_id.0,
            "notification dispatched"
        );
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance against a static table of project site coordinates.
pub(crate) struct ProjectSiteGeo {
    sites: HashMap<String, GeoPoint>,
}

impl Default for ProjectSiteGeo {
    fn default() -> Self {
        let mut sites = HashMap::new();
        sites.insert(
            "skyline heights".to_string(),
            GeoPoint {
                latitude: 19.0728,
                longitude: 72.8826,
            },
        );
        sites.insert(
            "riverview residences".to_string(),
            GeoPoint {
                latitude: 18.5204,
                longitude: 73.8567,
            },
        );
        Self { sites }
    }
}

impl GeoVerifier for ProjectSiteGeo {
    fn distance_to_project(&self, project: &str, point: GeoPoint) -> Result<f64, GeoError> {
        let site = self
            .sites
            .get(&project.trim().to_ascii_lowercase())
            .ok_or_else(|| GeoError::Unavailable(format!("no site coordinates for '{project}'")))?;
        Ok(haversine_meters(*site, point))
    }
}

fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

pub(crate) fn seed_agents(repository: &InMemoryAgentRepository) -> Result<(), RepositoryError> {
    let now = Utc::now();
    let roster = [
        ("presales-anita", "Anita Kulkarni", AgentRole::Presales),
        ("presales-rohit", "Rohit Menon", AgentRole::Presales),
        ("sales-divya", "Divya Nair", AgentRole::Sales),
        ("sales-kabir", "Kabir Joshi", AgentRole::Sales),
        ("reception-meera", "Meera Pillai", AgentRole::Reception),
    ];
    for (id, name, role) in roster {
        repository.insert(Agent {
            id: AgentId(id.to_string()),
            name: name.to_string(),
            role,
            active: true,
            status: AgentStatus::Online,
            last_assigned_at: now,
        })?;
    }
    Ok(())
}

pub(crate) fn seed_units(repository: &InMemoryUnitRepository) -> Result<(), RepositoryError> {
    let stock = [
        ("A-1201", "Skyline Heights", "A", 12, 750, "2BHK"),
        ("A-0704", "Skyline Heights", "A", 7, 1050, "3BHK"),
        ("B-0902", "Skyline Heights", "B", 9, 880, "2BHK"),
        ("R-0301", "Riverview Residences", "R", 3, 1200, "3BHK"),
    ];
    for (id, project, tower, floor, area, unit_type) in stock {
        repository.insert(Unit {
            id: UnitId(id.to_string()),
            project: project.to_string(),
            tower: tower.to_string(),
            floor,
            area,
            unit_type: unit_type.to_string(),
            status: UnitStatus::Available,
            blocked_by: None,
            blocked_at: None,
            version: 1,
        })?;
    }
    Ok(())
}
