use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Lead, LeadId, LeadStage, RemarkEntry, SubStage};

/// Inbound lead details as captured at intake or at the reception desk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadIntake {
    pub name: String,
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
    pub source: String,
    #[serde(default)]
    pub sub_source: Option<String>,
    pub project: String,
}

/// Validation errors raised before any state mutation.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("mandatory field missing: {0}")]
    MissingField(&'static str),
    #[error("mobile number must be 10 digits, got '{0}'")]
    MalformedMobile(String),
    #[error("unknown lead source '{0}'")]
    UnknownSource(String),
    #[error("lead already exists for this mobile and project")]
    DuplicateLead,
}

static LEAD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_lead_id() -> LeadId {
    let id = LEAD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LeadId(format!("lead-{id:06}"))
}

/// Guard responsible for producing `Lead` records from raw intake input.
/// The valid source list comes from the configuration collaborator.
#[derive(Debug, Clone)]
pub struct IntakeGuard {
    valid_sources: Vec<String>,
}

impl Default for IntakeGuard {
    fn default() -> Self {
        Self::new(
            ["Website", "Walk-in", "Channel Partner", "Referral", "Campaign"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
    }
}

impl IntakeGuard {
    pub fn new(valid_sources: Vec<String>) -> Self {
        Self { valid_sources }
    }

    pub fn valid_sources(&self) -> &[String] {
        &self.valid_sources
    }

    /// Strip separators and an optional country prefix down to the ten
    /// significant digits.
    pub fn normalize_mobile(raw: &str) -> Result<String, IntakeError> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        let trimmed = match digits.len() {
            10 => digits,
            12 if digits.starts_with("91") => digits[2..].to_string(),
            _ => return Err(IntakeError::MalformedMobile(raw.to_string())),
        };
        Ok(trimmed)
    }

    /// Convert raw intake input into a sanitized lead in the given opening
    /// stage. No repository writes happen here.
    pub fn lead_from_intake(
        &self,
        intake: LeadIntake,
        opening_stage: LeadStage,
        now: DateTime<Utc>,
    ) -> Result<Lead, IntakeError> {
        if intake.name.trim().is_empty() {
            return Err(IntakeError::MissingField("name"));
        }
        if intake.project.trim().is_empty() {
            return Err(IntakeError::MissingField("project"));
        }
        if intake.source.trim().is_empty() {
            return Err(IntakeError::MissingField("source"));
        }
        if !self
            .valid_sources
            .iter()
            .any(|source| source.eq_ignore_ascii_case(intake.source.trim()))
        {
            return Err(IntakeError::UnknownSource(intake.source));
        }

        let mobile = Self::normalize_mobile(&intake.mobile)?;

        let sub_stage = match opening_stage {
            LeadStage::New => Some(SubStage::Fresh),
            _ => None,
        };

        Ok(Lead {
            id: next_lead_id(),
            name: intake.name.trim().to_string(),
            mobile,
            email: intake.email,
            source: intake.source.trim().to_string(),
            sub_source: intake.sub_source,
            project: intake.project.trim().to_string(),
            stage: opening_stage,
            sub_stage,
            assigned_agent: None,
            call_count: 0,
            next_follow_up: None,
            remarks: vec![RemarkEntry {
                at: now,
                author: "system".to_string(),
                text: format!("lead created via {}", intake.source.trim()),
            }],
            quotes: Vec::new(),
            visits: Vec::new(),
            gate_pass: None,
            created_at: now,
        })
    }
}
