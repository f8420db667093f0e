use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Lead, LeadStage, RemarkEntry, SubStage};

/// Errors raised by stage transitions. Rejected before any mutation.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("lead is in terminal stage '{}' and cannot take quick actions", .0.label())]
    TerminalStage(LeadStage),
    #[error("sub-stage '{}' is not valid within stage '{}'", .sub_stage.label(), .stage.label())]
    SubStageNotAllowed { stage: LeadStage, sub_stage: SubStage },
    #[error("remark text must not be empty")]
    EmptyRemark,
}

/// The constrained vocabulary of sub-stages per stage. Values outside this
/// list are invalid and must be cleared whenever the stage changes.
pub const fn sub_stage_vocabulary(stage: LeadStage) -> &'static [SubStage] {
    match stage {
        LeadStage::New => &[SubStage::Fresh, SubStage::Callback],
        LeadStage::Connected => &[
            SubStage::Rnr,
            SubStage::Busy,
            SubStage::SwitchedOff,
            SubStage::Interested,
            SubStage::NotInterested,
            SubStage::Callback,
        ],
        LeadStage::VisitScheduled => &[
            SubStage::Tentative,
            SubStage::Confirmed,
            SubStage::Rescheduled,
        ],
        LeadStage::Qualified => &[SubStage::Warm, SubStage::Hot, SubStage::Cold],
        LeadStage::Negotiation => &[
            SubStage::CostSheetShared,
            SubStage::FinalNegotiation,
            SubStage::OnHold,
        ],
        LeadStage::Booked => &[],
        LeadStage::Lost => &[
            SubStage::BudgetMismatch,
            SubStage::LocationMismatch,
            SubStage::Competitor,
            SubStage::NotResponding,
        ],
        LeadStage::Unresponsive => &[SubStage::Rnr, SubStage::SwitchedOff],
    }
}

fn sub_stage_allowed(stage: LeadStage, sub_stage: SubStage) -> bool {
    sub_stage_vocabulary(stage)
        .iter()
        .any(|allowed| *allowed == sub_stage)
}

/// Whether a disposition recorded an actual call attempt. Only these bump
/// the lead's call counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    Connected,
    NotConnected,
}

/// Manual disposition by an agent: free choice of stage, sub-stage, and
/// follow-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disposition {
    pub stage: LeadStage,
    #[serde(default)]
    pub sub_stage: Option<SubStage>,
    pub remark: String,
    #[serde(default)]
    pub next_follow_up: Option<DateTime<Utc>>,
    #[serde(default)]
    pub call_outcome: Option<CallOutcome>,
}

/// System quick actions mapping one named outcome to a fixed
/// (stage, sub-stage, follow-up offset, log text) tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    Rnr,
    Busy,
    Interested,
    Visit,
}

impl QuickAction {
    pub const fn stage(self) -> LeadStage {
        match self {
            QuickAction::Rnr | QuickAction::Busy => LeadStage::Connected,
            QuickAction::Interested => LeadStage::Qualified,
            QuickAction::Visit => LeadStage::VisitScheduled,
        }
    }

    pub const fn sub_stage(self) -> SubStage {
        match self {
            QuickAction::Rnr => SubStage::Rnr,
            QuickAction::Busy => SubStage::Busy,
            QuickAction::Interested => SubStage::Warm,
            QuickAction::Visit => SubStage::Tentative,
        }
    }

    pub fn follow_up_offset(self) -> Duration {
        match self {
            QuickAction::Rnr => Duration::days(1),
            QuickAction::Busy => Duration::hours(4),
            QuickAction::Interested => Duration::days(2),
            QuickAction::Visit => Duration::days(1),
        }
    }

    pub const fn log_text(self) -> &'static str {
        match self {
            QuickAction::Rnr => "call attempted, ringing no response",
            QuickAction::Busy => "customer busy, short retry window",
            QuickAction::Interested => "customer interested, qualified warm",
            QuickAction::Visit => "site visit scheduled, tentative slot",
        }
    }

    /// Every quick action represents a dialled call.
    const fn call_outcome(self) -> CallOutcome {
        match self {
            QuickAction::Rnr | QuickAction::Busy => CallOutcome::NotConnected,
            QuickAction::Interested | QuickAction::Visit => CallOutcome::Connected,
        }
    }
}

/// Append one entry to the lead's activity log. The log is append-only and
/// ordered by timestamp; this is the only place entries are written.
pub fn append_remark(lead: &mut Lead, author: &str, text: impl Into<String>, now: DateTime<Utc>) {
    lead.remarks.push(RemarkEntry {
        at: now,
        author: author.to_string(),
        text: text.into(),
    });
}

/// Apply a manual disposition. Exactly one log entry is appended; the call
/// counter moves only when a call outcome was recorded.
pub fn apply_disposition(
    lead: &mut Lead,
    disposition: Disposition,
    author: &str,
    now: DateTime<Utc>,
) -> Result<(), StageError> {
    if disposition.remark.trim().is_empty() {
        return Err(StageError::EmptyRemark);
    }
    if let Some(sub_stage) = disposition.sub_stage {
        if !sub_stage_allowed(disposition.stage, sub_stage) {
            return Err(StageError::SubStageNotAllowed {
                stage: disposition.stage,
                sub_stage,
            });
        }
    }

    if lead.stage != disposition.stage {
        // Stale detail text must never survive a stage change.
        lead.sub_stage = None;
    }
    lead.stage = disposition.stage;
    lead.sub_stage = disposition.sub_stage;
    lead.next_follow_up = disposition.next_follow_up;
    if disposition.call_outcome.is_some() {
        lead.call_count += 1;
    }
    append_remark(lead, author, disposition.remark, now);
    Ok(())
}

/// Apply a named quick action. Terminal leads are not re-enterable this way;
/// only explicit manual flows may move them.
pub fn apply_quick_action(
    lead: &mut Lead,
    action: QuickAction,
    author: &str,
    now: DateTime<Utc>,
) -> Result<(), StageError> {
    if lead.stage.is_terminal() {
        return Err(StageError::TerminalStage(lead.stage));
    }

    let disposition = Disposition {
        stage: action.stage(),
        sub_stage: Some(action.sub_stage()),
        remark: action.log_text().to_string(),
        next_follow_up: Some(now + action.follow_up_offset()),
        call_outcome: Some(action.call_outcome()),
    };
    apply_disposition(lead, disposition, author, now)
}
