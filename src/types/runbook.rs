use serde::{Deserialize, Serialize};

use super::{require_range, require_text};
use crate::error::NexusError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RunbookStatus {
    Draft,
    Active,
    Retired,
}

#[derive(Debug, Deserialize)]
pub struct CreateRunbook {
    pub process_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<RunbookStatus>,
}

impl CreateRunbook {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("title", &self.title)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRunbook {
    pub process_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<RunbookStatus>,
}

impl UpdateRunbook {
    pub fn validate(&self) -> Result<(), NexusError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        Ok(())
    }
}

/// Upper bound for a single step, one week.
const MAX_STEP_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateStep {
    pub title: String,
    pub description: Option<String>,
    pub owner_role: Option<String>,
    #[serde(default)]
    pub estimated_minutes: i64,
}

impl CreateStep {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("title", &self.title)?;
        require_range("estimated_minutes", self.estimated_minutes, 0, MAX_STEP_MINUTES)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStep {
    pub title: Option<String>,
    pub description: Option<String>,
    pub owner_role: Option<String>,
    pub estimated_minutes: Option<i64>,
}

impl UpdateStep {
    pub fn validate(&self) -> Result<(), NexusError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(minutes) = self.estimated_minutes {
            require_range("estimated_minutes", minutes, 0, MAX_STEP_MINUTES)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ReorderSteps {
    pub step_ids: Vec<i64>,
}

/// Whether the runbook can be executed inside its process RTO.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunbookReadiness {
    pub runbook_id: i64,
    pub step_count: usize,
    pub total_minutes: i64,
    pub rto_minutes: Option<i64>,
    pub within_rto: Option<bool>,
}

impl RunbookReadiness {
    pub fn evaluate(
        runbook_id: i64,
        step_minutes: &[i64],
        process_rto_hours: Option<f64>,
    ) -> Self {
        let total_minutes: i64 = step_minutes.iter().sum();
        let rto_minutes = process_rto_hours.map(|h| (h * 60.0).round() as i64);
        Self {
            runbook_id,
            step_count: step_minutes.len(),
            total_minutes,
            rto_minutes,
            within_rto: rto_minutes.map(|rto| total_minutes <= rto),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_compares_against_rto() {
        let r = RunbookReadiness::evaluate(1, &[30, 45, 60], Some(2.0));
        assert_eq!(r.total_minutes, 135);
        assert_eq!(r.rto_minutes, Some(120));
        assert_eq!(r.within_rto, Some(false));

        let r = RunbookReadiness::evaluate(1, &[30, 45], Some(2.0));
        assert_eq!(r.within_rto, Some(true));
    }

    #[test]
    fn readiness_without_process_is_unknown() {
        let r = RunbookReadiness::evaluate(4, &[], None);
        assert_eq!(r.step_count, 0);
        assert_eq!(r.within_rto, None);
    }
}
