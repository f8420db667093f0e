use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::booking::{BookingError, BookingFinalizer, BookingOutcome};
use super::dispatch::{GeoVerifier, NotificationPublisher};
use super::domain::{
    AgentId, AgentRole, Booking, CostSheet, GatePassToken, Lead, LeadId, LeadStage, PaymentPlan,
    Quote, QuoteId, Unit, UnitId, VisitId, VisitRecord, VisitStatus,
};
use super::handover::{
    CheckInError, CheckInOutcome, CheckInRequest, GatePassError, HandoverCoordinator, VisitError,
};
use super::intake::{IntakeError, IntakeGuard, LeadIntake};
use super::inventory::{InventoryError, InventoryLedger};
use super::pricing::PricingConfig;
use super::quote::{self, DiscountInput, QuoteEngine, QuoteError};
use super::repository::{
    AgentRepository, BookingRepository, LeadRepository, RepositoryError, UnitRepository,
};
use super::scheduler::{AssignmentOutcome, AssignmentScheduler};
use super::stages::{self, Disposition, QuickAction, StageError};

/// Error raised by the pipeline facade.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("lead not found")]
    LeadNotFound,
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Quote(#[from] QuoteError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    CheckIn(#[from] CheckInError),
    #[error(transparent)]
    GatePass(#[from] GatePassError),
    #[error(transparent)]
    Visit(#[from] VisitError),
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Facade composing the scheduler, stage machine, quote engine, hand-over
/// coordinator, inventory ledger, and booking finalizer over injected
/// repositories. All shared state flows through these components; nothing
/// reaches into another's collection directly.
pub struct PipelineService<L, A, U, B, N, G> {
    leads: Arc<L>,
    scheduler: Arc<AssignmentScheduler<A>>,
    ledger: Arc<InventoryLedger<U>>,
    bookings: Arc<B>,
    engine: QuoteEngine,
    coordinator: HandoverCoordinator<L, A, G, N>,
    finalizer: BookingFinalizer<L, U, B, N>,
    guard: IntakeGuard,
}

impl<L, A, U, B, N, G> PipelineService<L, A, U, B, N, G>
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        leads: Arc<L>,
        agents: Arc<A>,
        units: Arc<U>,
        bookings: Arc<B>,
        notifier: Arc<N>,
        geo: Arc<G>,
        pricing: PricingConfig,
        guard: IntakeGuard,
    ) -> Self {
        let scheduler = Arc::new(AssignmentScheduler::new(agents.clone()));
        let ledger = Arc::new(InventoryLedger::new(
            units.clone(),
            pricing.block_validity_hours,
        ));
        let coordinator = HandoverCoordinator::new(
            leads.clone(),
            agents,
            scheduler.clone(),
            geo,
            notifier.clone(),
            guard.clone(),
        );
        let finalizer = BookingFinalizer::new(
            leads.clone(),
            ledger.clone(),
            bookings.clone(),
            notifier,
            &pricing,
        );
        let engine = QuoteEngine::new(pricing);

        Self {
            leads,
            scheduler,
            ledger,
            bookings,
            engine,
            coordinator,
            finalizer,
            guard,
        }
    }

    fn lead(&self, id: &LeadId) -> Result<Lead, PipelineError> {
        self.leads.fetch(id)?.ok_or(PipelineError::LeadNotFound)
    }

    /// Register a new lead and route it to the least-recently-served
    /// pre-sales agent. An exhausted pool leaves the lead unassigned with an
    /// explicit log entry, never dropped.
    pub fn intake_lead(&self, intake: LeadIntake, now: DateTime<Utc>) -> Result<Lead, PipelineError> {
        let mobile = IntakeGuard::normalize_mobile(&intake.mobile)?;
        let duplicate = self
            .leads
            .find_by_mobile(&mobile)?
            .into_iter()
            .any(|lead| lead.project.eq_ignore_ascii_case(intake.project.trim()));
        if duplicate {
            return Err(IntakeError::DuplicateLead.into());
        }

        let mut lead = self.guard.lead_from_intake(intake, LeadStage::New, now)?;

        match self.scheduler.assign(AgentRole::Presales, false, now)? {
            AssignmentOutcome::Assigned(agent) => {
                lead.assigned_agent = Some(agent.id.clone());
                stages::append_remark(
                    &mut lead,
                    "system",
                    format!("assigned to pre-sales agent {} ({})", agent.id.0, agent.name),
                    now,
                );
            }
            AssignmentOutcome::NoneEligible => {
                stages::append_remark(
                    &mut lead,
                    "system",
                    "no eligible pre-sales agent, left unassigned",
                    now,
                );
            }
        }

        let stored = self.leads.insert(lead)?;
        info!(lead = %stored.id.0, project = %stored.project, "lead registered");
        Ok(stored)
    }

    pub fn get_lead(&self, id: &LeadId) -> Result<Lead, PipelineError> {
        self.lead(id)
    }

    /// Manual disposition by an agent.
    pub fn disposition(
        &self,
        id: &LeadId,
        disposition: Disposition,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<Lead, PipelineError> {
        let mut lead = self.lead(id)?;
        stages::apply_disposition(&mut lead, disposition, author, now)?;
        self.leads.update(lead.clone())?;
        Ok(lead)
    }

    /// Named quick action with its fixed stage/sub-stage/follow-up tuple.
    pub fn quick_action(
        &self,
        id: &LeadId,
        action: QuickAction,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<Lead, PipelineError> {
        let mut lead = self.lead(id)?;
        stages::apply_quick_action(&mut lead, action, author, now)?;
        self.leads.update(lead.clone())?;
        Ok(lead)
    }

    pub fn check_in(
        &self,
        request: CheckInRequest,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, PipelineError> {
        let outcome = self.coordinator.check_in(request, now)?;
        info!(
            lead = %outcome.lead.id.0,
            new = outcome.created_new_lead,
            "visitor checked in"
        );
        Ok(outcome)
    }

    pub fn scan_gate_pass(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, PipelineError> {
        Ok(self.coordinator.scan_gate_pass(token, now)?)
    }

    pub fn issue_gate_pass(
        &self,
        id: &LeadId,
        now: DateTime<Utc>,
    ) -> Result<GatePassToken, PipelineError> {
        Ok(self.coordinator.issue_gate_pass(id, now)?)
    }

    pub fn advance_visit(
        &self,
        lead_id: &LeadId,
        visit_id: &VisitId,
        to: VisitStatus,
    ) -> Result<VisitRecord, PipelineError> {
        Ok(self.coordinator.advance_visit(lead_id, visit_id, to)?)
    }

    /// Price a unit without generating a quote.
    pub fn preview_cost_sheet(
        &self,
        unit_id: &UnitId,
        discount: DiscountInput,
    ) -> Result<CostSheet, PipelineError> {
        let unit = self.ledger.get(unit_id)?;
        Ok(self.engine.compute_cost_sheet(&unit, discount)?)
    }

    /// Append a new quote version for the lead against the unit.
    pub fn generate_quote(
        &self,
        lead_id: &LeadId,
        unit_id: &UnitId,
        discount: DiscountInput,
        payment_plan: PaymentPlan,
        now: DateTime<Utc>,
    ) -> Result<Quote, PipelineError> {
        let mut lead = self.lead(lead_id)?;
        let unit = self.ledger.get(unit_id)?;
        let quote = self
            .engine
            .generate_quote(&mut lead, &unit, discount, payment_plan, now)?;
        stages::append_remark(
            &mut lead,
            "system",
            format!(
                "quote {} v{} generated for unit {}",
                quote.id.0, quote.version, unit.id.0
            ),
            now,
        );
        self.leads.update(lead)?;
        Ok(quote)
    }

    pub fn approve_quote(
        &self,
        lead_id: &LeadId,
        quote_id: &QuoteId,
        now: DateTime<Utc>,
    ) -> Result<Quote, PipelineError> {
        let mut lead = self.lead(lead_id)?;
        let quote = quote::approve_quote(&mut lead, quote_id)?;
        stages::append_remark(
            &mut lead,
            "system",
            format!("quote {} approved", quote.id.0),
            now,
        );
        self.leads.update(lead)?;
        Ok(quote)
    }

    pub fn reject_quote(
        &self,
        lead_id: &LeadId,
        quote_id: &QuoteId,
        now: DateTime<Utc>,
    ) -> Result<Quote, PipelineError> {
        let mut lead = self.lead(lead_id)?;
        let quote = quote::reject_quote(&mut lead, quote_id)?;
        stages::append_remark(
            &mut lead,
            "system",
            format!("quote {} rejected", quote.id.0),
            now,
        );
        self.leads.update(lead)?;
        Ok(quote)
    }

    pub fn block_unit(
        &self,
        unit_id: &UnitId,
        agent: AgentId,
        now: DateTime<Utc>,
    ) -> Result<Unit, PipelineError> {
        Ok(self.ledger.block(unit_id, agent, now)?)
    }

    pub fn release_unit(&self, unit_id: &UnitId) -> Result<Unit, PipelineError> {
        Ok(self.ledger.release(unit_id)?)
    }

    /// Driven by the external scheduled task; releases lapsed holds.
    pub fn sweep_expired_blocks(&self, now: DateTime<Utc>) -> Result<Vec<UnitId>, PipelineError> {
        Ok(self.ledger.sweep_expired(now)?)
    }

    pub fn get_unit(&self, unit_id: &UnitId) -> Result<Unit, PipelineError> {
        Ok(self.ledger.get(unit_id)?)
    }

    /// Convert an approved, still-valid quote into a booking.
    pub fn finalize_booking(
        &self,
        lead_id: &LeadId,
        quote_id: &QuoteId,
        now: DateTime<Utc>,
    ) -> Result<BookingOutcome, PipelineError> {
        let outcome = self.finalizer.book_from(lead_id, quote_id, now)?;
        info!(
            booking = %outcome.booking.id.0,
            unit = %outcome.booking.unit_id.0,
            "booking committed"
        );
        Ok(outcome)
    }

    pub fn bookings(&self) -> Result<Vec<Booking>, PipelineError> {
        Ok(self.bookings.list()?)
    }
}
