//! Framework and assessment scoring on top of the risk-weighted engine.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::GrcStorage;
use crate::db::models::{DbAssessmentResult, DbControl};
use crate::error::NexusError;
use crate::service::risk_scoring::{
    ComplianceScore, ControlOutcome, ScoredControl, risk_based_compliance_score,
};

#[derive(Debug, Clone, Serialize)]
pub struct FrameworkScore {
    pub framework_id: i64,
    pub name: String,
    #[serde(flatten)]
    pub score: ComplianceScore,
}

/// Score from each control's own implementation status.
pub fn score_from_controls(
    controls: &[DbControl],
    risk_scores: &HashMap<i64, u8>,
) -> ComplianceScore {
    let scored: Vec<ScoredControl> = controls
        .iter()
        .map(|c| ScoredControl {
            control_id: c.id,
            outcome: c.implementation_status.outcome(),
            max_risk_score: risk_scores.get(&c.id).copied(),
        })
        .collect();
    risk_based_compliance_score(&scored)
}

/// Score from assessment findings. A control nobody assessed counts as
/// unsatisfied.
pub fn score_from_results(
    controls: &[DbControl],
    results: &[DbAssessmentResult],
    risk_scores: &HashMap<i64, u8>,
) -> ComplianceScore {
    let findings: HashMap<i64, ControlOutcome> = results
        .iter()
        .map(|r| (r.control_id, r.status.outcome()))
        .collect();
    let scored: Vec<ScoredControl> = controls
        .iter()
        .map(|c| ScoredControl {
            control_id: c.id,
            outcome: findings
                .get(&c.id)
                .copied()
                .unwrap_or(ControlOutcome::Unsatisfied),
            max_risk_score: risk_scores.get(&c.id).copied(),
        })
        .collect();
    risk_based_compliance_score(&scored)
}

pub async fn framework_score(
    storage: &GrcStorage,
    org: i64,
    framework_id: i64,
) -> Result<FrameworkScore, NexusError> {
    let framework = storage.get_framework(org, framework_id).await?;
    let (controls, risk_scores) = futures::try_join!(
        storage.list_framework_controls(framework_id),
        storage.control_risk_scores(framework_id),
    )?;
    Ok(FrameworkScore {
        framework_id,
        name: framework.name,
        score: score_from_controls(&controls, &risk_scores),
    })
}
