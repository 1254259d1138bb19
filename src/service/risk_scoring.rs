//! Likelihood × impact risk scoring and the risk-weighted compliance score.
//!
//! Scores live on a 5×5 matrix: both factors are 1..=5, so an inherent
//! score is 1..=25. Controls that mitigate high-scoring risks weigh more
//! in the compliance score than controls nobody depends on.

use serde::{Deserialize, Serialize};

use crate::error::NexusError;

pub const MIN_FACTOR: u8 = 1;
pub const MAX_FACTOR: u8 = 5;
pub const MAX_SCORE: u8 = MAX_FACTOR * MAX_FACTOR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// 1–4 low, 5–9 medium, 10–15 high, 16–25 critical.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=4 => RiskLevel::Low,
            5..=9 => RiskLevel::Medium,
            10..=15 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    /// Maps a 1..=4 rank onto a level; out-of-range ranks are clamped.
    pub fn from_rank(rank: u8) -> Self {
        match rank {
            0 | 1 => RiskLevel::Low,
            2 => RiskLevel::Medium,
            3 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskScore {
    likelihood: u8,
    impact: u8,
}

fn factor(field: &str, value: i64) -> Result<u8, NexusError> {
    u8::try_from(value)
        .ok()
        .filter(|v| (MIN_FACTOR..=MAX_FACTOR).contains(v))
        .ok_or_else(|| {
            NexusError::validation(format!(
                "`{field}` must be between {MIN_FACTOR} and {MAX_FACTOR}, got {value}"
            ))
        })
}

impl RiskScore {
    pub fn new(likelihood: i64, impact: i64) -> Result<Self, NexusError> {
        Ok(Self {
            likelihood: factor("likelihood", likelihood)?,
            impact: factor("impact", impact)?,
        })
    }

    pub fn likelihood(self) -> u8 {
        self.likelihood
    }

    pub fn impact(self) -> u8 {
        self.impact
    }

    pub fn value(self) -> u8 {
        self.likelihood * self.impact
    }

    pub fn level(self) -> RiskLevel {
        RiskLevel::from_score(self.value())
    }

    /// Residual score after treatment. A factor that was not reassessed
    /// keeps its inherent value.
    pub fn residual(
        self,
        residual_likelihood: Option<i64>,
        residual_impact: Option<i64>,
    ) -> Result<Self, NexusError> {
        Ok(Self {
            likelihood: residual_likelihood
                .map(|v| factor("residual_likelihood", v))
                .transpose()?
                .unwrap_or(self.likelihood),
            impact: residual_impact
                .map(|v| factor("residual_impact", v))
                .transpose()?
                .unwrap_or(self.impact),
        })
    }

    pub fn exceeds_appetite(self, appetite: i64) -> bool {
        i64::from(self.value()) > appetite
    }
}

/// Risk counts indexed `[likelihood - 1][impact - 1]`.
pub type Heatmap = [[u32; MAX_FACTOR as usize]; MAX_FACTOR as usize];

pub fn heatmap<I>(scores: I) -> Heatmap
where
    I: IntoIterator<Item = RiskScore>,
{
    let mut map: Heatmap = Default::default();
    for score in scores {
        map[usize::from(score.likelihood - 1)][usize::from(score.impact - 1)] += 1;
    }
    map
}

/// Normalised state of a control, whether it came from the control's own
/// implementation status or from an assessment finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlOutcome {
    Satisfied,
    Partial,
    Unsatisfied,
    NotApplicable,
}

impl ControlOutcome {
    /// `None` removes the control from the score entirely.
    pub fn credit(self) -> Option<f64> {
        match self {
            ControlOutcome::Satisfied => Some(1.0),
            ControlOutcome::Partial => Some(0.5),
            ControlOutcome::Unsatisfied => Some(0.0),
            ControlOutcome::NotApplicable => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredControl {
    pub control_id: i64,
    pub outcome: ControlOutcome,
    /// Highest inherent score among risks linked to this control.
    pub max_risk_score: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplianceScore {
    pub risk_weighted: f64,
    pub unweighted: f64,
    pub applicable: usize,
    pub satisfied: usize,
    pub partial: usize,
    pub unsatisfied: usize,
    pub not_applicable: usize,
}

/// 1.0 for an unlinked control, rising linearly to 3.0 at score 25.
pub fn control_weight(max_risk_score: Option<u8>) -> f64 {
    let score = max_risk_score.unwrap_or(0).min(MAX_SCORE);
    1.0 + 2.0 * f64::from(score) / f64::from(MAX_SCORE)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn risk_based_compliance_score(controls: &[ScoredControl]) -> ComplianceScore {
    let mut score = ComplianceScore::default();
    let mut weighted_credit = 0.0;
    let mut total_weight = 0.0;
    let mut credit_sum = 0.0;

    for control in controls {
        match control.outcome {
            ControlOutcome::Satisfied => score.satisfied += 1,
            ControlOutcome::Partial => score.partial += 1,
            ControlOutcome::Unsatisfied => score.unsatisfied += 1,
            ControlOutcome::NotApplicable => score.not_applicable += 1,
        }
        let Some(credit) = control.outcome.credit() else {
            continue;
        };
        let weight = control_weight(control.max_risk_score);
        score.applicable += 1;
        weighted_credit += weight * credit;
        total_weight += weight;
        credit_sum += credit;
    }

    if score.applicable > 0 {
        score.risk_weighted = round1(100.0 * weighted_credit / total_weight);
        score.unweighted = round1(100.0 * credit_sum / score.applicable as f64);
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(id: i64, outcome: ControlOutcome, risk: Option<u8>) -> ScoredControl {
        ScoredControl {
            control_id: id,
            outcome,
            max_risk_score: risk,
        }
    }

    #[test]
    fn score_is_likelihood_times_impact() {
        let s = RiskScore::new(4, 3).unwrap();
        assert_eq!(s.value(), 12);
        assert_eq!(s.level(), RiskLevel::High);
        assert_eq!(RiskScore::new(5, 5).unwrap().level(), RiskLevel::Critical);
        assert_eq!(RiskScore::new(1, 4).unwrap().level(), RiskLevel::Low);
        assert_eq!(RiskScore::new(3, 3).unwrap().level(), RiskLevel::Medium);
    }

    #[test]
    fn level_band_edges() {
        assert_eq!(RiskLevel::from_score(4), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(5), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(10), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(15), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(16), RiskLevel::Critical);
    }

    #[test]
    fn factors_outside_matrix_are_rejected() {
        assert!(RiskScore::new(0, 3).is_err());
        assert!(RiskScore::new(3, 6).is_err());
        assert!(RiskScore::new(-1, 2).is_err());
        assert!(RiskScore::new(300, 2).is_err());
    }

    #[test]
    fn residual_falls_back_to_inherent_factors() {
        let inherent = RiskScore::new(4, 5).unwrap();
        let residual = inherent.residual(Some(2), None).unwrap();
        assert_eq!(residual.value(), 10);
        assert_eq!(inherent.residual(None, None).unwrap(), inherent);
        assert!(inherent.residual(Some(9), None).is_err());
    }

    #[test]
    fn appetite_is_strictly_exceeded() {
        let s = RiskScore::new(3, 4).unwrap();
        assert!(!s.exceeds_appetite(12));
        assert!(s.exceeds_appetite(11));
    }

    #[test]
    fn heatmap_counts_cells() {
        let map = heatmap([
            RiskScore::new(1, 1).unwrap(),
            RiskScore::new(5, 5).unwrap(),
            RiskScore::new(5, 5).unwrap(),
            RiskScore::new(2, 4).unwrap(),
        ]);
        assert_eq!(map[0][0], 1);
        assert_eq!(map[4][4], 2);
        assert_eq!(map[1][3], 1);
        assert_eq!(map.iter().flatten().sum::<u32>(), 4);
    }

    #[test]
    fn weight_grows_with_linked_risk() {
        assert_eq!(control_weight(None), 1.0);
        assert_eq!(control_weight(Some(25)), 3.0);
        assert!((control_weight(Some(10)) - 1.8).abs() < 1e-9);
    }

    #[test]
    fn high_risk_controls_dominate_weighted_score() {
        // One implemented control guarding a critical risk, one
        // unimplemented control with nothing linked.
        let controls = [
            control(1, ControlOutcome::Satisfied, Some(25)),
            control(2, ControlOutcome::Unsatisfied, None),
        ];
        let score = risk_based_compliance_score(&controls);
        assert_eq!(score.unweighted, 50.0);
        assert_eq!(score.risk_weighted, 75.0);

        let flipped = [
            control(1, ControlOutcome::Unsatisfied, Some(25)),
            control(2, ControlOutcome::Satisfied, None),
        ];
        assert_eq!(risk_based_compliance_score(&flipped).risk_weighted, 25.0);
    }

    #[test]
    fn not_applicable_controls_are_excluded() {
        let controls = [
            control(1, ControlOutcome::Partial, None),
            control(2, ControlOutcome::NotApplicable, Some(25)),
        ];
        let score = risk_based_compliance_score(&controls);
        assert_eq!(score.applicable, 1);
        assert_eq!(score.not_applicable, 1);
        assert_eq!(score.partial, 1);
        assert_eq!(score.risk_weighted, 50.0);
        assert_eq!(score.unweighted, 50.0);
    }

    #[test]
    fn empty_framework_scores_zero() {
        let score = risk_based_compliance_score(&[]);
        assert_eq!(score, ComplianceScore::default());
        let only_na = [control(1, ControlOutcome::NotApplicable, None)];
        assert_eq!(risk_based_compliance_score(&only_na).risk_weighted, 0.0);
    }
}
