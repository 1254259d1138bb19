use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::service::bia_analysis::{AssetNode, NodeRef, ProcessNode};
use crate::types::bia::{AssetType, Criticality};
use crate::types::compliance::{AssessmentStatus, ControlStatus, ResultStatus};
use crate::types::organization::UserRole;
use crate::types::policy::PolicyStatus;
use crate::types::risk::{RiskStatus, RiskTreatment};
use crate::types::runbook::RunbookStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbOrganization {
    pub id: i64,
    pub name: String,
    pub industry: Option<String>,
    pub risk_appetite: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub organization_id: i64,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbPolicy {
    pub id: i64,
    pub organization_id: i64,
    pub title: String,
    pub category: Option<String>,
    pub content: String,
    pub status: PolicyStatus,
    pub version: i64,
    pub owner_id: Option<i64>,
    pub review_date: Option<NaiveDate>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbFramework {
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbDomain {
    pub id: i64,
    pub framework_id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbControl {
    pub id: i64,
    pub domain_id: i64,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub implementation_status: ControlStatus,
    pub owner_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbAssessment {
    pub id: i64,
    pub organization_id: i64,
    pub framework_id: i64,
    pub name: String,
    pub status: AssessmentStatus,
    pub score: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbAssessmentResult {
    pub id: i64,
    pub assessment_id: i64,
    pub control_id: i64,
    pub status: ResultStatus,
    pub notes: Option<String>,
    pub evidence: Option<String>,
    pub assessed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbUniverseEntry {
    pub id: i64,
    pub organization_id: i64,
    pub category: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbRisk {
    pub id: i64,
    pub organization_id: i64,
    pub universe_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub likelihood: i64,
    pub impact: i64,
    pub residual_likelihood: Option<i64>,
    pub residual_impact: Option<i64>,
    pub status: RiskStatus,
    pub treatment: Option<RiskTreatment>,
    pub owner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbProcess {
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<i64>,
    pub criticality: Criticality,
    pub rto_hours: f64,
    pub rpo_hours: f64,
    pub mtpd_hours: Option<f64>,
    pub hourly_downtime_cost: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbAsset {
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    pub asset_type: AssetType,
    pub rto_hours: Option<f64>,
    pub rpo_hours: Option<f64>,
    pub hourly_cost: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbDependency {
    pub id: i64,
    pub process_id: i64,
    pub depends_on_process_id: Option<i64>,
    pub depends_on_asset_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbRunbook {
    pub id: i64,
    pub organization_id: i64,
    pub process_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: RunbookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbRunbookStep {
    pub id: i64,
    pub runbook_id: i64,
    pub position: i64,
    pub title: String,
    pub description: Option<String>,
    pub owner_role: Option<String>,
    pub estimated_minutes: i64,
}

impl From<DbProcess> for ProcessNode {
    fn from(p: DbProcess) -> Self {
        ProcessNode {
            id: p.id,
            name: p.name,
            criticality: p.criticality,
            rto_hours: p.rto_hours,
            rpo_hours: p.rpo_hours,
            mtpd_hours: p.mtpd_hours,
            hourly_downtime_cost: p.hourly_downtime_cost,
        }
    }
}

impl From<DbAsset> for AssetNode {
    fn from(a: DbAsset) -> Self {
        AssetNode {
            id: a.id,
            name: a.name,
            asset_type: a.asset_type,
            rto_hours: a.rto_hours,
            rpo_hours: a.rpo_hours,
            hourly_cost: a.hourly_cost,
        }
    }
}

impl DbDependency {
    /// `None` only for rows violating the one-target CHECK.
    pub fn target(&self) -> Option<NodeRef> {
        match (self.depends_on_process_id, self.depends_on_asset_id) {
            (Some(pid), None) => Some(NodeRef::Process(pid)),
            (None, Some(aid)) => Some(NodeRef::Asset(aid)),
            _ => None,
        }
    }
}
