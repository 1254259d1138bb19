//! Register views: stored risks enriched with their computed scores.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::models::DbRisk;
use crate::error::NexusError;
use crate::service::risk_scoring::{Heatmap, RiskLevel, RiskScore, heatmap};

#[derive(Debug, Clone, Serialize)]
pub struct RiskView {
    #[serde(flatten)]
    pub risk: DbRisk,
    pub inherent_score: u8,
    pub inherent_level: RiskLevel,
    pub residual_score: u8,
    pub residual_level: RiskLevel,
    pub exceeds_appetite: bool,
}

impl RiskView {
    pub fn new(risk: DbRisk, appetite: i64) -> Result<Self, NexusError> {
        let inherent = RiskScore::new(risk.likelihood, risk.impact)?;
        let residual = inherent.residual(risk.residual_likelihood, risk.residual_impact)?;
        Ok(Self {
            inherent_score: inherent.value(),
            inherent_level: inherent.level(),
            residual_score: residual.value(),
            residual_level: residual.level(),
            exceeds_appetite: inherent.exceeds_appetite(appetite),
            risk,
        })
    }

    pub fn inherent(&self) -> Option<RiskScore> {
        RiskScore::new(self.risk.likelihood, self.risk.impact).ok()
    }
}

pub fn views(risks: Vec<DbRisk>, appetite: i64) -> Result<Vec<RiskView>, NexusError> {
    risks.into_iter().map(|r| RiskView::new(r, appetite)).collect()
}

/// Likelihood × impact matrix of every risk that is not closed.
#[derive(Debug, Clone, Serialize)]
pub struct RiskHeatmap {
    pub cells: Heatmap,
    pub total: u32,
    /// Axis order of `cells`.
    pub rows: &'static str,
    pub columns: &'static str,
}

pub fn open_heatmap(views: &[RiskView]) -> RiskHeatmap {
    let cells = heatmap(
        views
            .iter()
            .filter(|v| v.risk.status.is_open())
            .filter_map(RiskView::inherent),
    );
    RiskHeatmap {
        total: cells.iter().flatten().sum(),
        cells,
        rows: "likelihood",
        columns: "impact",
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RiskSummary {
    pub total: usize,
    pub open: usize,
    pub above_appetite: usize,
    pub by_level: BTreeMap<RiskLevel, usize>,
}

/// Counts over open risks; `total` includes closed ones.
pub fn summarize(views: &[RiskView]) -> RiskSummary {
    let mut summary = RiskSummary {
        total: views.len(),
        ..RiskSummary::default()
    };
    for view in views.iter().filter(|v| v.risk.status.is_open()) {
        summary.open += 1;
        if view.exceeds_appetite {
            summary.above_appetite += 1;
        }
        *summary.by_level.entry(view.inherent_level).or_default() += 1;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::risk::RiskStatus;
    use chrono::Utc;

    fn risk(id: i64, likelihood: i64, impact: i64, status: RiskStatus) -> DbRisk {
        DbRisk {
            id,
            organization_id: 1,
            universe_id: None,
            title: format!("Risk {id}"),
            description: None,
            category: None,
            likelihood,
            impact,
            residual_likelihood: None,
            residual_impact: Some(1),
            status,
            treatment: None,
            owner_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn view_computes_inherent_and_residual() {
        let view = RiskView::new(risk(1, 4, 5, RiskStatus::Assessed), 12).unwrap();
        assert_eq!(view.inherent_score, 20);
        assert_eq!(view.inherent_level, RiskLevel::Critical);
        assert_eq!(view.residual_score, 4);
        assert_eq!(view.residual_level, RiskLevel::Low);
        assert!(view.exceeds_appetite);
    }

    #[test]
    fn closed_risks_leave_heatmap_and_counts() {
        let all = views(
            vec![
                risk(1, 5, 5, RiskStatus::Identified),
                risk(2, 5, 5, RiskStatus::Closed),
                risk(3, 2, 2, RiskStatus::Mitigating),
            ],
            12,
        )
        .unwrap();
        let map = open_heatmap(&all);
        assert_eq!(map.cells[4][4], 1);
        assert_eq!(map.total, 2);

        let summary = summarize(&all);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.open, 2);
        assert_eq!(summary.above_appetite, 1);
        assert_eq!(summary.by_level.get(&RiskLevel::Critical), Some(&1));
        assert_eq!(summary.by_level.get(&RiskLevel::Low), Some(&1));
    }
}
