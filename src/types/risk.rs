use serde::{Deserialize, Serialize};

use super::{require_range, require_text};
use crate::error::NexusError;
use crate::service::risk_scoring::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RiskStatus {
    Identified,
    Assessed,
    Mitigating,
    Accepted,
    Closed,
}

impl RiskStatus {
    pub fn is_open(self) -> bool {
        !matches!(self, RiskStatus::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RiskTreatment {
    Mitigate,
    Transfer,
    Avoid,
    Accept,
}

#[derive(Debug, Deserialize)]
pub struct CreateUniverseEntry {
    pub category: String,
    pub name: String,
    pub description: Option<String>,
}

impl CreateUniverseEntry {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("category", &self.category)?;
        require_text("name", &self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRisk {
    pub universe_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub likelihood: i64,
    pub impact: i64,
    pub residual_likelihood: Option<i64>,
    pub residual_impact: Option<i64>,
    pub status: Option<RiskStatus>,
    pub treatment: Option<RiskTreatment>,
    pub owner_id: Option<i64>,
}

impl CreateRisk {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("title", &self.title)?;
        require_range("likelihood", self.likelihood, 1, 5)?;
        require_range("impact", self.impact, 1, 5)?;
        if let Some(v) = self.residual_likelihood {
            require_range("residual_likelihood", v, 1, 5)?;
        }
        if let Some(v) = self.residual_impact {
            require_range("residual_impact", v, 1, 5)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRisk {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub likelihood: Option<i64>,
    pub impact: Option<i64>,
    pub residual_likelihood: Option<i64>,
    pub residual_impact: Option<i64>,
    pub status: Option<RiskStatus>,
    pub treatment: Option<RiskTreatment>,
    pub owner_id: Option<i64>,
}

impl UpdateRisk {
    pub fn validate(&self) -> Result<(), NexusError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        for (field, value) in [
            ("likelihood", self.likelihood),
            ("impact", self.impact),
            ("residual_likelihood", self.residual_likelihood),
            ("residual_impact", self.residual_impact),
        ] {
            if let Some(v) = value {
                require_range(field, v, 1, 5)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RiskFilter {
    pub status: Option<RiskStatus>,
    pub level: Option<RiskLevel>,
}
