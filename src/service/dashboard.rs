use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::GrcStorage;
use crate::error::NexusError;
use crate::service::bia_analysis::analyze_all;
use crate::service::compliance::{FrameworkScore, framework_score};
use crate::service::risk_register::{RiskHeatmap, RiskSummary, open_heatmap, summarize, views};
use crate::types::policy::PolicyStatus;
use crate::types::runbook::RunbookStatus;

#[derive(Debug, Clone, Serialize)]
pub struct BiaSummary {
    pub processes: usize,
    pub processes_with_rto_gaps: usize,
    pub processes_exceeding_mtpd: usize,
    pub total_exposure: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub organization_id: i64,
    pub risk_appetite: i64,
    pub policies_by_status: BTreeMap<&'static str, usize>,
    pub risks: RiskSummary,
    pub heatmap: RiskHeatmap,
    pub frameworks: Vec<FrameworkScore>,
    pub bia: BiaSummary,
    pub runbooks_by_status: BTreeMap<RunbookStatus, usize>,
}

/// Everything the dashboard widgets show, computed in one pass.
pub async fn build(storage: &GrcStorage, org: i64) -> Result<DashboardSummary, NexusError> {
    let organization = storage.get_organization(org).await?;
    let (policies, risks, frameworks, graph, runbooks) = futures::try_join!(
        storage.list_policies(org, None),
        storage.list_risks(org, None),
        storage.list_frameworks(org),
        storage.load_dependency_graph(org),
        storage.list_runbooks(org),
    )?;

    let mut policies_by_status: BTreeMap<&'static str, usize> = [
        PolicyStatus::Draft,
        PolicyStatus::InReview,
        PolicyStatus::Approved,
        PolicyStatus::Archived,
    ]
    .into_iter()
    .map(|s| (s.as_str(), 0))
    .collect();
    for policy in &policies {
        *policies_by_status.entry(policy.status.as_str()).or_default() += 1;
    }

    let risk_views = views(risks, organization.risk_appetite)?;

    let mut framework_scores = Vec::with_capacity(frameworks.len());
    for framework in &frameworks {
        framework_scores.push(framework_score(storage, org, framework.id).await?);
    }

    let overview = analyze_all(&graph);

    let mut runbooks_by_status = BTreeMap::new();
    for runbook in &runbooks {
        *runbooks_by_status.entry(runbook.status).or_default() += 1;
    }

    Ok(DashboardSummary {
        organization_id: org,
        risk_appetite: organization.risk_appetite,
        policies_by_status,
        risks: summarize(&risk_views),
        heatmap: open_heatmap(&risk_views),
        frameworks: framework_scores,
        bia: BiaSummary {
            processes: overview.processes,
            processes_with_rto_gaps: overview.processes_with_rto_gaps,
            processes_exceeding_mtpd: overview.processes_exceeding_mtpd,
            total_exposure: overview.total_exposure,
        },
        runbooks_by_status,
    })
}
