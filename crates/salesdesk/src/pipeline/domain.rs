use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for leads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

/// Identifier wrapper for human agents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

/// Identifier wrapper for sellable inventory units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub String);

/// Identifier wrapper for versioned quotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

/// Identifier wrapper for bookings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub String);

/// Identifier wrapper for reception visit records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisitId(pub String);

/// Role held by an operator, scoping which leads the scheduler may route to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentRole {
    Presales,
    Sales,
    SalesHead,
    TeamLeader,
    Reception,
    SuperAdmin,
}

impl AgentRole {
    pub const fn label(self) -> &'static str {
        match self {
            AgentRole::Presales => "presales",
            AgentRole::Sales => "sales",
            AgentRole::SalesHead => "sales_head",
            AgentRole::TeamLeader => "team_leader",
            AgentRole::Reception => "reception",
            AgentRole::SuperAdmin => "super_admin",
        }
    }
}

/// Presence indicator for an agent. Informational except where a caller opts
/// into online-only assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Online,
    Busy,
    Break,
    Offline,
}

/// A human operator eligible to receive leads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub role: AgentRole,
    pub active: bool,
    pub status: AgentStatus,
    /// Monotonic stamp used purely for least-recently-served ordering.
    pub last_assigned_at: DateTime<Utc>,
}

/// Stage of a lead within the pipeline. `Booked` and `Lost` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadStage {
    New,
    Connected,
    VisitScheduled,
    Qualified,
    Negotiation,
    Booked,
    Lost,
    Unresponsive,
}

impl LeadStage {
    pub const fn label(self) -> &'static str {
        match self {
            LeadStage::New => "new",
            LeadStage::Connected => "connected",
            LeadStage::VisitScheduled => "visit_scheduled",
            LeadStage::Qualified => "qualified",
            LeadStage::Negotiation => "negotiation",
            LeadStage::Booked => "booked",
            LeadStage::Lost => "lost",
            LeadStage::Unresponsive => "unresponsive",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, LeadStage::Booked | LeadStage::Lost)
    }
}

/// Constrained detail within a stage. Validity against the parent stage is
/// enforced by the stage machine, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubStage {
    Fresh,
    Callback,
    Rnr,
    Busy,
    SwitchedOff,
    Interested,
    NotInterested,
    Tentative,
    Confirmed,
    Rescheduled,
    Warm,
    Hot,
    Cold,
    CostSheetShared,
    FinalNegotiation,
    OnHold,
    BudgetMismatch,
    LocationMismatch,
    Competitor,
    NotResponding,
}

impl SubStage {
    pub const fn label(self) -> &'static str {
        match self {
            SubStage::Fresh => "fresh",
            SubStage::Callback => "callback",
            SubStage::Rnr => "rnr",
            SubStage::Busy => "busy",
            SubStage::SwitchedOff => "switched_off",
            SubStage::Interested => "interested",
            SubStage::NotInterested => "not_interested",
            SubStage::Tentative => "tentative",
            SubStage::Confirmed => "confirmed",
            SubStage::Rescheduled => "rescheduled",
            SubStage::Warm => "warm",
            SubStage::Hot => "hot",
            SubStage::Cold => "cold",
            SubStage::CostSheetShared => "cost_sheet_shared",
            SubStage::FinalNegotiation => "final_negotiation",
            SubStage::OnHold => "on_hold",
            SubStage::BudgetMismatch => "budget_mismatch",
            SubStage::LocationMismatch => "location_mismatch",
            SubStage::Competitor => "competitor",
            SubStage::NotResponding => "not_responding",
        }
    }
}

/// One append-only entry in a lead's activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemarkEntry {
    pub at: DateTime<Utc>,
    pub author: String,
    pub text: String,
}

/// Reception visit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisitStatus {
    Waiting,
    InMeeting,
    Completed,
}

impl VisitStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VisitStatus::Waiting => "waiting",
            VisitStatus::InMeeting => "in_meeting",
            VisitStatus::Completed => "completed",
        }
    }
}

/// One physical visit opened at check-in. Wait duration is derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: VisitId,
    pub checked_in_at: DateTime<Utc>,
    pub status: VisitStatus,
    pub declared_source: String,
}

/// Single-use, time-bound token allowing expedited check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePassToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

/// One prospective customer's interest in one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
    pub source: String,
    pub sub_source: Option<String>,
    pub project: String,
    pub stage: LeadStage,
    pub sub_stage: Option<SubStage>,
    /// At most one current assignment; reassignment replaces, never appends.
    pub assigned_agent: Option<AgentId>,
    pub call_count: u32,
    pub next_follow_up: Option<DateTime<Utc>>,
    pub remarks: Vec<RemarkEntry>,
    pub quotes: Vec<Quote>,
    pub visits: Vec<VisitRecord>,
    pub gate_pass: Option<GatePassToken>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn quote(&self, id: &QuoteId) -> Option<&Quote> {
        self.quotes.iter().find(|quote| &quote.id == id)
    }

    pub fn visit(&self, id: &VisitId) -> Option<&VisitRecord> {
        self.visits.iter().find(|visit| &visit.id == id)
    }
}

/// Authoritative status of a sellable unit. `Sold` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitStatus {
    Available,
    Blocked,
    Sold,
}

impl UnitStatus {
    pub const fn label(self) -> &'static str {
        match self {
            UnitStatus::Available => "available",
            UnitStatus::Blocked => "blocked",
            UnitStatus::Sold => "sold",
        }
    }
}

/// A physical sellable inventory item. Mutated only through the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub project: String,
    pub tower: String,
    pub floor: u32,
    pub area: u32,
    pub unit_type: String,
    pub status: UnitStatus,
    pub blocked_by: Option<AgentId>,
    pub blocked_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency stamp; stale writes are rejected.
    pub version: u64,
}

/// Itemized price breakdown for one unit. Pure computation result, always
/// embedded in a quote and never edited afterwards. Amounts are whole
/// currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSheet {
    pub base_cost: i64,
    pub floor_rise: i64,
    pub amenities: i64,
    pub parking: i64,
    pub gross: i64,
    pub taxes: i64,
    pub registration: i64,
    pub stamp_duty: i64,
    pub total: i64,
    pub discount: i64,
    pub final_price: i64,
    pub discount_per_area: i64,
}

/// Payment plan attached to a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentPlan {
    ConstructionLinked,
    DownPayment,
    Flexi,
}

impl PaymentPlan {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentPlan::ConstructionLinked => "construction_linked",
            PaymentPlan::DownPayment => "down_payment",
            PaymentPlan::Flexi => "flexi",
        }
    }
}

/// Forward-only quote lifecycle. No regression from `Booked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteStatus {
    PendingApproval,
    Approved,
    Booked,
    Rejected,
    Expired,
}

impl QuoteStatus {
    pub const fn label(self) -> &'static str {
        match self {
            QuoteStatus::PendingApproval => "pending_approval",
            QuoteStatus::Approved => "approved",
            QuoteStatus::Booked => "booked",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Expired => "expired",
        }
    }
}

/// Immutable, versioned snapshot of a priced offer for one lead against one
/// unit. Regeneration appends a new version, never edits history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub lead_id: LeadId,
    pub unit_id: UnitId,
    /// Strictly increasing per (lead, unit) pair.
    pub version: u32,
    pub cost_sheet: CostSheet,
    pub payment_plan: PaymentPlan,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl Quote {
    /// Validity is re-checked at booking time, not just at generation time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }
}

/// Status of a single payment milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MilestoneStatus {
    Upcoming,
    Due,
    Overdue,
    Paid,
}

impl MilestoneStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MilestoneStatus::Upcoming => "upcoming",
            MilestoneStatus::Due => "due",
            MilestoneStatus::Overdue => "overdue",
            MilestoneStatus::Paid => "paid",
        }
    }
}

/// One entry in a booking's payment schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub name: String,
    pub amount: i64,
    pub due_on: DateTime<Utc>,
    pub status: MilestoneStatus,
}

/// The durable record of a completed sale. Financials are copied verbatim
/// from the quote that produced it, never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub lead_id: LeadId,
    pub unit_id: UnitId,
    pub quote_id: QuoteId,
    pub customer_name: String,
    pub total_cost: i64,
    pub agreement_value: i64,
    pub booked_at: DateTime<Utc>,
    pub schedule: Vec<Milestone>,
    pub cancelled: bool,
}
