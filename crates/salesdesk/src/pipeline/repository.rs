use serde::Serialize;

use super::domain::{Agent, AgentId, Booking, BookingId, Lead, LeadId, Unit, UnitId};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stale write rejected: stored version differs from expected")]
    StaleWrite,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Keyed store for leads. Components never reach into each other's
/// collections; every mutation flows through one of these traits.
pub trait LeadRepository: Send + Sync {
    fn insert(&self, lead: Lead) -> Result<Lead, RepositoryError>;
    fn update(&self, lead: Lead) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError>;
    fn list(&self) -> Result<Vec<Lead>, RepositoryError>;
    /// All leads registered under a mobile number, across projects.
    fn find_by_mobile(&self, mobile: &str) -> Result<Vec<Lead>, RepositoryError>;
    /// Lead holding the given gate-pass token, used or not.
    fn find_by_gate_pass(&self, token: &str) -> Result<Option<Lead>, RepositoryError>;
}

/// Keyed store for agents.
pub trait AgentRepository: Send + Sync {
    fn insert(&self, agent: Agent) -> Result<Agent, RepositoryError>;
    fn update(&self, agent: Agent) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &AgentId) -> Result<Option<Agent>, RepositoryError>;
    fn list(&self) -> Result<Vec<Agent>, RepositoryError>;
}

/// Keyed store for units. Writes carry the version the writer read so the
/// store can reject lost updates.
pub trait UnitRepository: Send + Sync {
    fn insert(&self, unit: Unit) -> Result<Unit, RepositoryError>;
    /// Persist `unit` only if the stored version still equals
    /// `expected_version`; otherwise fail with [`RepositoryError::StaleWrite`].
    fn update_versioned(&self, unit: Unit, expected_version: u64) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &UnitId) -> Result<Option<Unit>, RepositoryError>;
    fn list(&self) -> Result<Vec<Unit>, RepositoryError>;
}

/// Keyed store for bookings.
pub trait BookingRepository: Send + Sync {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError>;
    fn remove(&self, id: &BookingId) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;
    fn list(&self) -> Result<Vec<Booking>, RepositoryError>;
    fn find_by_unit(&self, unit: &UnitId) -> Result<Option<Booking>, RepositoryError>;
}

/// Sanitized projection of a lead for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct LeadStatusView {
    pub lead_id: LeadId,
    pub name: String,
    pub project: String,
    pub stage: &'static str,
    pub sub_stage: Option<&'static str>,
    pub assigned_agent: Option<AgentId>,
    pub call_count: u32,
    pub quote_count: usize,
    pub visit_count: usize,
    pub last_remark: Option<String>,
}

impl Lead {
    pub fn status_view(&self) -> LeadStatusView {
        LeadStatusView {
            lead_id: self.id.clone(),
            name: self.name.clone(),
            project: self.project.clone(),
            stage: self.stage.label(),
            sub_stage: self.sub_stage.map(|sub| sub.label()),
            assigned_agent: self.assigned_agent.clone(),
            call_count: self.call_count,
            quote_count: self.quotes.len(),
            visit_count: self.visits.len(),
            last_remark: self.remarks.last().map(|remark| remark.text.clone()),
        }
    }
}
