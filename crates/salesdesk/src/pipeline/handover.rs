use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::dispatch::{GeoPoint, GeoVerifier, Notification, NotificationPublisher};
use super::domain::{
    AgentId, AgentRole, GatePassToken, Lead, LeadId, LeadStage, VisitId, VisitRecord, VisitStatus,
};
use super::intake::{IntakeError, IntakeGuard, LeadIntake};
use super::repository::{AgentRepository, LeadRepository, RepositoryError};
use super::scheduler::{AssignmentOutcome, AssignmentScheduler};
use super::stages::append_remark;

/// Visitors waiting longer than this get the overdue highlight. Purely
/// informational; nothing is cancelled.
pub const OVERDUE_WAIT_MINUTES: i64 = 15;

/// Device locations farther than this from the project site raise a warning.
pub const MAX_CHECKIN_DISTANCE_METERS: f64 = 500.0;

const GATE_PASS_VALIDITY_HOURS: i64 = 24;

/// Check-in request from the reception desk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub name: String,
    pub mobile: String,
    pub project: String,
    pub declared_source: String,
    /// Source attribution drives commission; a mismatch against the recorded
    /// source must be explicitly confirmed by the operator.
    #[serde(default)]
    pub override_source_conflict: bool,
    #[serde(default)]
    pub geo: Option<GeoPoint>,
}

/// Outgoing and incoming agent of a hand-over. `to` is `None` when no
/// eligible closing agent was online.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverSummary {
    pub from: Option<AgentId>,
    pub to: Option<AgentId>,
}

/// Result of a successful check-in, whichever path produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckInOutcome {
    pub lead: Lead,
    pub visit_id: VisitId,
    pub created_new_lead: bool,
    pub handover: Option<HandoverSummary>,
    /// Collaborator degradations the operator may override.
    pub warnings: Vec<String>,
}

/// Check-in failures. The source conflict is a business-risk gate, not an
/// error state: re-submitting with the override flag proceeds.
#[derive(Debug, thiserror::Error)]
pub enum CheckInError {
    #[error("declared source '{declared}' conflicts with recorded source '{recorded}'")]
    SourceConflict { recorded: String, declared: String },
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Gate-pass scan failures. Reception staff act differently on each, so the
/// three reasons stay distinguishable.
#[derive(Debug, thiserror::Error)]
pub enum GatePassError {
    #[error("gate pass not found")]
    NotFound,
    #[error("gate pass already used")]
    AlreadyUsed,
    #[error("gate pass expired")]
    Expired,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Visit lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum VisitError {
    #[error("lead not found")]
    LeadNotFound,
    #[error("visit not found on this lead")]
    VisitNotFound,
    #[error("visit is '{}', cannot move to '{}'", .from.label(), .to.label())]
    InvalidTransition { from: VisitStatus, to: VisitStatus },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

static VISIT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static GATE_PASS_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_visit_id() -> VisitId {
    let id = VISIT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    VisitId(format!("visit-{id:06}"))
}

fn next_gate_pass_token() -> String {
    let id = GATE_PASS_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("GP-{id:06}")
}

/// How long a visitor has been waiting.
pub fn visit_wait(visit: &VisitRecord, now: DateTime<Utc>) -> Duration {
    now - visit.checked_in_at
}

pub fn visit_overdue(visit: &VisitRecord, now: DateTime<Utc>) -> bool {
    visit.status == VisitStatus::Waiting
        && visit_wait(visit, now) > Duration::minutes(OVERDUE_WAIT_MINUTES)
}

/// Runs at the reception/check-in boundary: source-conflict detection,
/// pre-sales to closing-agent hand-over, gate-pass scans, and visit records.
pub struct HandoverCoordinator<L, A, G, N> {
    leads: Arc<L>,
    agents: Arc<A>,
    scheduler: Arc<AssignmentScheduler<A>>,
    geo: Arc<G>,
    notifier: Arc<N>,
    guard: IntakeGuard,
}

impl<L, A, G, N> HandoverCoordinator<L, A, G, N>
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    G: GeoVerifier + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        leads: Arc<L>,
        agents: Arc<A>,
        scheduler: Arc<AssignmentScheduler<A>>,
        geo: Arc<G>,
        notifier: Arc<N>,
        guard: IntakeGuard,
    ) -> Self {
        Self {
            leads,
            agents,
            scheduler,
            geo,
            notifier,
            guard,
        }
    }

    /// Check a visitor in by identity. Known lead on the same project is a
    /// revisit; a new mobile/project combination opens a fresh lead directly
    /// in negotiation, since the customer is already on site.
    pub fn check_in(
        &self,
        request: CheckInRequest,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, CheckInError> {
        let mobile = IntakeGuard::normalize_mobile(&request.mobile)?;
        let known = self
            .leads
            .find_by_mobile(&mobile)?
            .into_iter()
            .find(|lead| lead.project.eq_ignore_ascii_case(request.project.trim()));

        let mut warnings = Vec::new();
        if let Some(point) = request.geo {
            self.verify_location(&request.project, point, &mut warnings);
        }

        let (mut lead, created_new_lead) = match known {
            Some(lead) => (lead, false),
            None => {
                let intake = LeadIntake {
                    name: request.name.clone(),
                    mobile: request.mobile.clone(),
                    email: None,
                    source: request.declared_source.clone(),
                    sub_source: None,
                    project: request.project.clone(),
                };
                let lead = self
                    .guard
                    .lead_from_intake(intake, LeadStage::Negotiation, now)?;
                (lead, true)
            }
        };

        if !created_new_lead && !lead.source.eq_ignore_ascii_case(request.declared_source.trim()) {
            if !request.override_source_conflict {
                return Err(CheckInError::SourceConflict {
                    recorded: lead.source.clone(),
                    declared: request.declared_source,
                });
            }
            let remark = format!(
                "source conflict overridden by operator: recorded '{}', declared '{}'",
                lead.source, request.declared_source
            );
            append_remark(&mut lead, "reception", remark, now);
        }

        let handover = self.perform_handover(&mut lead, now)?;
        let visit_id = open_visit(&mut lead, request.declared_source.trim().to_string(), now);

        if created_new_lead {
            self.leads.insert(lead.clone())?;
        } else {
            self.leads.update(lead.clone())?;
        }

        self.notify_checkin(&lead, &mut warnings);

        Ok(CheckInOutcome {
            lead,
            visit_id,
            created_new_lead,
            handover,
            warnings,
        })
    }

    /// Alternate identification path: a single-use, time-bound token. A
    /// successful scan performs the same hand-over logic as a revisit.
    pub fn scan_gate_pass(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, GatePassError> {
        let mut lead = self
            .leads
            .find_by_gate_pass(token)?
            .ok_or(GatePassError::NotFound)?;
        let pass = lead.gate_pass.as_ref().ok_or(GatePassError::NotFound)?;

        if pass.used {
            return Err(GatePassError::AlreadyUsed);
        }
        if now > pass.expires_at {
            return Err(GatePassError::Expired);
        }

        if let Some(pass) = lead.gate_pass.as_mut() {
            pass.used = true;
        }
        append_remark(&mut lead, "reception", "gate pass scanned at entry", now);

        let handover = self.perform_handover(&mut lead, now)?;
        let declared_source = lead.source.clone();
        let visit_id = open_visit(&mut lead, declared_source, now);
        self.leads.update(lead.clone())?;

        let mut warnings = Vec::new();
        self.notify_checkin(&lead, &mut warnings);

        Ok(CheckInOutcome {
            lead,
            visit_id,
            created_new_lead: false,
            handover,
            warnings,
        })
    }

    /// Issue a fresh gate pass for a scheduled visit, replacing any earlier
    /// one on the lead.
    pub fn issue_gate_pass(
        &self,
        lead_id: &LeadId,
        now: DateTime<Utc>,
    ) -> Result<GatePassToken, VisitError> {
        let mut lead = self.leads.fetch(lead_id)?.ok_or(VisitError::LeadNotFound)?;
        let pass = GatePassToken {
            token: next_gate_pass_token(),
            expires_at: now + Duration::hours(GATE_PASS_VALIDITY_HOURS),
            used: false,
        };
        lead.gate_pass = Some(pass.clone());
        append_remark(&mut lead, "system", "gate pass issued for site visit", now);
        self.leads.update(lead)?;
        Ok(pass)
    }

    /// Advance a visit along `Waiting -> InMeeting -> Completed`.
    pub fn advance_visit(
        &self,
        lead_id: &LeadId,
        visit_id: &VisitId,
        to: VisitStatus,
    ) -> Result<VisitRecord, VisitError> {
        let mut lead = self.leads.fetch(lead_id)?.ok_or(VisitError::LeadNotFound)?;
        let visit = lead
            .visits
            .iter_mut()
            .find(|visit| &visit.id == visit_id)
            .ok_or(VisitError::VisitNotFound)?;

        let legal = matches!(
            (visit.status, to),
            (VisitStatus::Waiting, VisitStatus::InMeeting)
                | (VisitStatus::InMeeting, VisitStatus::Completed)
        );
        if !legal {
            return Err(VisitError::InvalidTransition {
                from: visit.status,
                to,
            });
        }

        visit.status = to;
        let updated = visit.clone();
        self.leads.update(lead)?;
        Ok(updated)
    }

    /// Replace a pre-sales assignment with a closing agent. Leads already
    /// held by a sales agent are left alone.
    fn perform_handover(
        &self,
        lead: &mut Lead,
        now: DateTime<Utc>,
    ) -> Result<Option<HandoverSummary>, RepositoryError> {
        if let Some(current) = &lead.assigned_agent {
            if let Some(agent) = self.agents.fetch(current)? {
                if agent.role == AgentRole::Sales {
                    return Ok(None);
                }
            }
        }

        let from = lead.assigned_agent.clone();
        match self.scheduler.assign(AgentRole::Sales, true, now)? {
            AssignmentOutcome::Assigned(agent) => {
                lead.assigned_agent = Some(agent.id.clone());
                let outgoing = from
                    .as_ref()
                    .map(|id| id.0.as_str())
                    .unwrap_or("unassigned");
                append_remark(
                    lead,
                    "reception",
                    format!("hand-over: {} -> {} ({})", outgoing, agent.id.0, agent.name),
                    now,
                );
                Ok(Some(HandoverSummary {
                    from,
                    to: Some(agent.id),
                }))
            }
            AssignmentOutcome::NoneEligible => {
                lead.assigned_agent = None;
                append_remark(
                    lead,
                    "reception",
                    "hand-over: no eligible sales agent online, left unassigned",
                    now,
                );
                Ok(Some(HandoverSummary { from, to: None }))
            }
        }
    }

    fn verify_location(&self, project: &str, point: GeoPoint, warnings: &mut Vec<String>) {
        match self.geo.distance_to_project(project, point) {
            Ok(distance) if distance > MAX_CHECKIN_DISTANCE_METERS => {
                warnings.push(format!(
                    "device location is {distance:.0}m from the project site"
                ));
            }
            Ok(_) => {}
            Err(err) => warnings.push(format!("geo verification skipped: {err}")),
        }
    }

    fn notify_checkin(&self, lead: &Lead, warnings: &mut Vec<String>) {
        let notification = Notification {
            template: "visit_checkin".to_string(),
            lead_id: lead.id.clone(),
            contact: lead.mobile.clone(),
            details: Default::default(),
        };
        if let Err(err) = self.notifier.publish(notification) {
            warnings.push(format!("check-in notification not sent: {err}"));
        }
    }
}

/// Every check-in opens exactly one visit record in `Waiting`.
fn open_visit(lead: &mut Lead, declared_source: String, now: DateTime<Utc>) -> VisitId {
    let visit = VisitRecord {
        id: next_visit_id(),
        checked_in_at: now,
        status: VisitStatus::Waiting,
        declared_source,
    };
    let id = visit.id.clone();
    lead.visits.push(visit);
    id
}
