//! The lead-to-booking pipeline: intake, assignment, stage transitions,
//! reception hand-over, quoting, inventory, and booking finalization.

pub(crate) mod booking;
pub mod dispatch;
pub mod domain;
pub(crate) mod handover;
pub(crate) mod intake;
pub(crate) mod inventory;
pub mod pricing;
pub mod repository;
pub mod router;
pub(crate) mod scheduler;
pub mod service;
pub(crate) mod stages;

mod quote;

#[cfg(test)]
mod tests;

pub use booking::{milestone_display_status, BookingError, BookingOutcome};
pub use dispatch::{
    GeoError, GeoPoint, GeoVerifier, Notification, NotificationError, NotificationPublisher,
};
pub use domain::{
    Agent, AgentId, AgentRole, AgentStatus, Booking, BookingId, CostSheet, GatePassToken, Lead,
    LeadId, LeadStage, Milestone, MilestoneStatus, PaymentPlan, Quote, QuoteId, QuoteStatus,
    RemarkEntry, SubStage, Unit, UnitId, UnitStatus, VisitId, VisitRecord, VisitStatus,
};
pub use handover::{
    visit_overdue, visit_wait, CheckInError, CheckInOutcome, CheckInRequest, GatePassError,
    HandoverSummary, VisitError, MAX_CHECKIN_DISTANCE_METERS, OVERDUE_WAIT_MINUTES,
};
pub use intake::{IntakeError, IntakeGuard, LeadIntake};
pub use inventory::{InventoryError, InventoryLedger};
pub use pricing::PricingConfig;
pub use quote::{DiscountInput, QuoteEngine, QuoteError};
pub use repository::{
    AgentRepository, BookingRepository, LeadRepository, LeadStatusView, RepositoryError,
    UnitRepository,
};
pub use router::{pipeline_router, status_and_reason};
pub use scheduler::{AssignmentOutcome, AssignmentScheduler};
pub use service::{PipelineError, PipelineService};
pub use stages::{
    sub_stage_vocabulary, CallOutcome, Disposition, QuickAction, StageError,
};
