use serde::{Deserialize, Serialize};

use super::require_text;
use crate::error::NexusError;
use crate::service::risk_scoring::ControlOutcome;

/// Implementation state of a control as tracked on the control itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ControlStatus {
    NotImplemented,
    Planned,
    PartiallyImplemented,
    Implemented,
    NotApplicable,
}

impl ControlStatus {
    pub fn outcome(self) -> ControlOutcome {
        match self {
            ControlStatus::Implemented => ControlOutcome::Satisfied,
            ControlStatus::PartiallyImplemented => ControlOutcome::Partial,
            ControlStatus::NotImplemented | ControlStatus::Planned => ControlOutcome::Unsatisfied,
            ControlStatus::NotApplicable => ControlOutcome::NotApplicable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AssessmentStatus {
    InProgress,
    Completed,
}

/// Finding recorded for one control during an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ResultStatus {
    Compliant,
    PartiallyCompliant,
    NonCompliant,
    NotApplicable,
}

impl ResultStatus {
    pub fn outcome(self) -> ControlOutcome {
        match self {
            ResultStatus::Compliant => ControlOutcome::Satisfied,
            ResultStatus::PartiallyCompliant => ControlOutcome::Partial,
            ResultStatus::NonCompliant => ControlOutcome::Unsatisfied,
            ResultStatus::NotApplicable => ControlOutcome::NotApplicable,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFramework {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
}

impl CreateFramework {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("name", &self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDomain {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

impl CreateDomain {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("code", &self.code)?;
        require_text("name", &self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateControl {
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub implementation_status: Option<ControlStatus>,
    pub owner_id: Option<i64>,
}

impl CreateControl {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("code", &self.code)?;
        require_text("title", &self.title)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateControl {
    pub title: Option<String>,
    pub description: Option<String>,
    pub implementation_status: Option<ControlStatus>,
    pub owner_id: Option<i64>,
}

impl UpdateControl {
    pub fn validate(&self) -> Result<(), NexusError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAssessment {
    pub framework_id: i64,
    pub name: String,
}

impl CreateAssessment {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("name", &self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordResult {
    pub status: ResultStatus,
    pub notes: Option<String>,
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct AssessmentProgress {
    pub total: i64,
    pub assessed: i64,
    pub percent: f64,
}

impl AssessmentProgress {
    pub fn new(total: i64, assessed: i64) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            (assessed as f64 / total as f64 * 1000.0).round() / 10.0
        };
        Self {
            total,
            assessed,
            percent,
        }
    }
}
