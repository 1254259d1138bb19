use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::require_text;
use crate::error::NexusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PolicyStatus {
    Draft,
    InReview,
    Approved,
    Archived,
}

/// What a status change does to the policy besides setting the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    None,
    /// Stamp `approved_at`.
    Approve,
    /// Start a new revision: bump `version`, clear `approved_at`.
    NewRevision,
}

impl PolicyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyStatus::Draft => "draft",
            PolicyStatus::InReview => "in_review",
            PolicyStatus::Approved => "approved",
            PolicyStatus::Archived => "archived",
        }
    }

    /// Lifecycle: draft -> in_review -> approved -> archived, with
    /// in_review able to bounce back to draft and approved/archived
    /// reopening as a new draft revision.
    pub fn transition(self, to: PolicyStatus) -> Result<TransitionEffect, NexusError> {
        use PolicyStatus::*;
        match (self, to) {
            (Draft, InReview) | (InReview, Draft) | (Approved, Archived) => {
                Ok(TransitionEffect::None)
            }
            (InReview, Approved) => Ok(TransitionEffect::Approve),
            (Approved, Draft) | (Archived, Draft) => Ok(TransitionEffect::NewRevision),
            (from, to) => Err(NexusError::conflict(format!(
                "policy cannot move from {} to {}",
                from.as_str(),
                to.as_str()
            ))),
        }
    }

    /// Content is frozen once a policy has been approved.
    pub fn content_editable(self) -> bool {
        matches!(self, PolicyStatus::Draft | PolicyStatus::InReview)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePolicy {
    pub title: String,
    pub category: Option<String>,
    #[serde(default)]
    pub content: String,
    pub owner_id: Option<i64>,
    pub review_date: Option<NaiveDate>,
}

impl CreatePolicy {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("title", &self.title)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePolicy {
    pub title: Option<String>,
    pub category: Option<String>,
    pub content: Option<String>,
    pub owner_id: Option<i64>,
    pub review_date: Option<NaiveDate>,
}

impl UpdatePolicy {
    pub fn validate(&self) -> Result<(), NexusError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct PolicyTransition {
    pub status: PolicyStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct PolicyFilter {
    pub status: Option<PolicyStatus>,
}

#[derive(Debug, Deserialize)]
pub struct GeneratePolicy {
    pub title: String,
    pub category: Option<String>,
    /// Framework the policy should map to, e.g. "ISO 27001".
    pub framework: Option<String>,
    pub owner_id: Option<i64>,
}

impl GeneratePolicy {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("title", &self.title)
    }
}
