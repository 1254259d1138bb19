use serde::{Deserialize, Serialize};

use super::{require_non_negative, require_text};
use crate::error::NexusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Criticality {
    Low,
    Medium,
    High,
    Critical,
}

impl Criticality {
    /// Base of the analysis risk rating, 1 (low) to 4 (critical).
    pub fn rank(self) -> u8 {
        match self {
            Criticality::Low => 1,
            Criticality::Medium => 2,
            Criticality::High => 3,
            Criticality::Critical => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AssetType {
    Application,
    Infrastructure,
    Data,
    Facility,
    People,
    Supplier,
}

fn require_rto(field: &str, value: f64) -> Result<(), NexusError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(NexusError::validation(format!(
            "`{field}` must be a positive number of hours"
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateProcess {
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<i64>,
    pub criticality: Criticality,
    pub rto_hours: f64,
    pub rpo_hours: f64,
    pub mtpd_hours: Option<f64>,
    #[serde(default)]
    pub hourly_downtime_cost: f64,
}

impl CreateProcess {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("name", &self.name)?;
        require_rto("rto_hours", self.rto_hours)?;
        require_non_negative("rpo_hours", self.rpo_hours)?;
        require_non_negative("hourly_downtime_cost", self.hourly_downtime_cost)?;
        if let Some(mtpd) = self.mtpd_hours {
            require_rto("mtpd_hours", mtpd)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProcess {
    pub name: Option<String>,
    pub description: Option<String>,
    pub owner_id: Option<i64>,
    pub criticality: Option<Criticality>,
    pub rto_hours: Option<f64>,
    pub rpo_hours: Option<f64>,
    pub mtpd_hours: Option<f64>,
    pub hourly_downtime_cost: Option<f64>,
}

impl UpdateProcess {
    pub fn validate(&self) -> Result<(), NexusError> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(rto) = self.rto_hours {
            require_rto("rto_hours", rto)?;
        }
        if let Some(rpo) = self.rpo_hours {
            require_non_negative("rpo_hours", rpo)?;
        }
        if let Some(mtpd) = self.mtpd_hours {
            require_rto("mtpd_hours", mtpd)?;
        }
        if let Some(cost) = self.hourly_downtime_cost {
            require_non_negative("hourly_downtime_cost", cost)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAsset {
    pub name: String,
    pub asset_type: AssetType,
    pub rto_hours: Option<f64>,
    pub rpo_hours: Option<f64>,
    #[serde(default)]
    pub hourly_cost: f64,
}

impl CreateAsset {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("name", &self.name)?;
        if let Some(rto) = self.rto_hours {
            require_rto("rto_hours", rto)?;
        }
        if let Some(rpo) = self.rpo_hours {
            require_non_negative("rpo_hours", rpo)?;
        }
        require_non_negative("hourly_cost", self.hourly_cost)
    }
}

/// Exactly one of `process_id` / `asset_id` names the upstream dependency.
#[derive(Debug, Deserialize)]
pub struct CreateDependency {
    pub process_id: Option<i64>,
    pub asset_id: Option<i64>,
    pub notes: Option<String>,
}

impl CreateDependency {
    pub fn validate(&self, dependent_process: i64) -> Result<(), NexusError> {
        match (self.process_id, self.asset_id) {
            (Some(_), Some(_)) | (None, None) => Err(NexusError::validation(
                "exactly one of `process_id` or `asset_id` is required",
            )),
            (Some(pid), None) if pid == dependent_process => Err(NexusError::validation(
                "a process cannot depend on itself",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationRequest {
    /// Extra context appended to the prompt, e.g. recent incidents.
    pub context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_requires_exactly_one_target() {
        let both = CreateDependency {
            process_id: Some(2),
            asset_id: Some(3),
            notes: None,
        };
        assert!(both.validate(1).is_err());
        let neither = CreateDependency {
            process_id: None,
            asset_id: None,
            notes: None,
        };
        assert!(neither.validate(1).is_err());
        let own = CreateDependency {
            process_id: Some(1),
            asset_id: None,
            notes: None,
        };
        assert!(own.validate(1).is_err());
        let asset = CreateDependency {
            process_id: None,
            asset_id: Some(1),
            notes: None,
        };
        assert!(asset.validate(1).is_ok());
    }

    #[test]
    fn process_rto_must_be_positive() {
        let p = CreateProcess {
            name: "Payroll".into(),
            description: None,
            owner_id: None,
            criticality: Criticality::High,
            rto_hours: 0.0,
            rpo_hours: 1.0,
            mtpd_hours: None,
            hourly_downtime_cost: 10.0,
        };
        assert!(p.validate().is_err());
    }
}
