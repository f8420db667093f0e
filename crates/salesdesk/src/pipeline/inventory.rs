use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::domain::{AgentId, Unit, UnitId, UnitStatus};
use super::repository::{RepositoryError, UnitRepository};

/// Conflict and lookup failures surfaced to the caller with a specific
/// reason, so reception and sales screens can show different remediation.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("unit not found")]
    UnitNotFound,
    #[error("unit is '{}', blocking requires 'available'", .0.label())]
    NotAvailable(UnitStatus),
    #[error("unit is '{}', release requires 'blocked'", .0.label())]
    NotBlocked(UnitStatus),
    #[error("unit already sold")]
    AlreadySold,
    #[error("unit changed underneath this request, retry with fresh state")]
    StaleWrite,
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for InventoryError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::StaleWrite => InventoryError::StaleWrite,
            RepositoryError::NotFound => InventoryError::UnitNotFound,
            other => InventoryError::Repository(other),
        }
    }
}

/// Owns the authoritative status of every sellable unit and enforces the
/// single-owner transition rules: `Available -> Blocked -> Sold`,
/// `Blocked -> Available`, `Available -> Sold`. `Sold` is terminal.
///
/// Every transition is a compare-and-swap on the unit's version stamp, so
/// two writers racing on one unit cannot both succeed.
pub struct InventoryLedger<U> {
    units: Arc<U>,
    block_validity: Duration,
}

impl<U> InventoryLedger<U>
where
    U: UnitRepository + 'static,
{
    pub fn new(units: Arc<U>, block_validity_hours: i64) -> Self {
        Self {
            units,
            block_validity: Duration::hours(block_validity_hours),
        }
    }

    /// Current state of one unit.
    pub fn get(&self, id: &UnitId) -> Result<Unit, InventoryError> {
        self.units.fetch(id)?.ok_or(InventoryError::UnitNotFound)
    }

    /// Advisory hold on an available unit, recording the blocking agent and
    /// timestamp. Expiry is swept by an external scheduled task calling
    /// [`Self::sweep_expired`]; the core never auto-expires.
    pub fn block(
        &self,
        id: &UnitId,
        agent: AgentId,
        now: DateTime<Utc>,
    ) -> Result<Unit, InventoryError> {
        let unit = self.get(id)?;
        if unit.status != UnitStatus::Available {
            return Err(InventoryError::NotAvailable(unit.status));
        }

        let expected = unit.version;
        let mut blocked = unit;
        blocked.status = UnitStatus::Blocked;
        blocked.blocked_by = Some(agent);
        blocked.blocked_at = Some(now);
        blocked.version += 1;
        self.units.update_versioned(blocked.clone(), expected)?;
        Ok(blocked)
    }

    /// Explicit cancellation of a hold.
    pub fn release(&self, id: &UnitId) -> Result<Unit, InventoryError> {
        let unit = self.get(id)?;
        if unit.status != UnitStatus::Blocked {
            return Err(InventoryError::NotBlocked(unit.status));
        }

        let expected = unit.version;
        let mut released = unit;
        released.status = UnitStatus::Available;
        released.blocked_by = None;
        released.blocked_at = None;
        released.version += 1;
        self.units.update_versioned(released.clone(), expected)?;
        Ok(released)
    }

    /// Release every hold older than the block validity window. Intended to
    /// be driven by the external scheduler collaborator.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<UnitId>, InventoryError> {
        let mut released = Vec::new();
        for unit in self.units.list()? {
            if unit.status != UnitStatus::Blocked {
                continue;
            }
            let expired = unit
                .blocked_at
                .map(|at| now - at > self.block_validity)
                .unwrap_or(true);
            if !expired {
                continue;
            }
            match self.release(&unit.id) {
                Ok(unit) => released.push(unit.id),
                // Another writer got there first; the sweep is best-effort.
                Err(InventoryError::StaleWrite | InventoryError::NotBlocked(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Ok(released)
    }

    /// Final transition. Allowed from `Available` or `Blocked`; rejected if
    /// another booking already sold the unit.
    pub fn sell(&self, id: &UnitId) -> Result<Unit, InventoryError> {
        let unit = self.get(id)?;
        if unit.status == UnitStatus::Sold {
            return Err(InventoryError::AlreadySold);
        }

        let expected = unit.version;
        let mut sold = unit;
        sold.status = UnitStatus::Sold;
        // A sale supersedes any hold; the terminal record carries no stale
        // blocking metadata.
        sold.blocked_by = None;
        sold.blocked_at = None;
        sold.version += 1;
        self.units.update_versioned(sold.clone(), expected)?;
        Ok(sold)
    }

    /// Roll a sale back to the captured pre-sale snapshot. Only the booking
    /// finalizer calls this, while unwinding a failed commit.
    pub(crate) fn reinstate(
        &self,
        previous: Unit,
        sold_version: u64,
    ) -> Result<(), InventoryError> {
        let mut restored = previous;
        restored.version = sold_version + 1;
        self.units.update_versioned(restored, sold_version)?;
        Ok(())
    }
}
