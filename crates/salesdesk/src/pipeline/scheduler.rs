use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::domain::{Agent, AgentRole, AgentStatus};
use super::repository::{AgentRepository, RepositoryError};

/// Result of an assignment request. Pool exhaustion is a defined outcome,
/// not an error; callers must log an explicit "unassigned" entry on the lead.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentOutcome {
    Assigned(Agent),
    NoneEligible,
}

/// Least-recently-served round robin over the agent pool, scoped by role.
///
/// Picking the agent and stamping `last_assigned_at` happen under one lock so
/// two requests arriving in the same instant can never observe the same
/// snapshot and select the same agent.
pub struct AssignmentScheduler<A> {
    agents: Arc<A>,
    pick_lock: Mutex<()>,
}

impl<A> AssignmentScheduler<A>
where
    A: AgentRepository + 'static,
{
    pub fn new(agents: Arc<A>) -> Self {
        Self {
            agents,
            pick_lock: Mutex::new(()),
        }
    }

    /// Pick the eligible agent who has waited longest since their last
    /// assignment, ties broken by stable pool order, and stamp them with
    /// `now` before releasing the lock.
    pub fn assign(
        &self,
        role: AgentRole,
        require_online: bool,
        now: DateTime<Utc>,
    ) -> Result<AssignmentOutcome, RepositoryError> {
        let _serialized = self.pick_lock.lock().expect("scheduler mutex poisoned");

        let pool = self.agents.list()?;
        let chosen = pool
            .into_iter()
            .enumerate()
            .filter(|(_, agent)| {
                agent.active
                    && agent.role == role
                    && (!require_online || agent.status == AgentStatus::Online)
            })
            .min_by_key(|(index, agent)| (agent.last_assigned_at, *index));

        let Some((_, mut agent)) = chosen else {
            return Ok(AssignmentOutcome::NoneEligible);
        };

        agent.last_assigned_at = now;
        self.agents.update(agent.clone())?;

        Ok(AssignmentOutcome::Assigned(agent))
    }
}
