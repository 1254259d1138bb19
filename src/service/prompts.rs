//! Prompt builders for the AI-assisted endpoints and parsing of the
//! structured replies.

use std::fmt::Write as _;

use serde::Deserialize;
use tracing::warn;

use crate::db::models::{DbControl, DbProcess, DbRisk};
use crate::error::NexusError;
use crate::service::bia_analysis::ProcessAnalysis;
use crate::service::risk_scoring::RiskScore;
use crate::types::policy::GeneratePolicy;
use crate::types::runbook::CreateStep;

/// A system and user message pair.
pub struct Prompt {
    pub system: &'static str,
    pub user: String,
}

const POLICY_SYSTEM: &str = "You are a governance, risk and compliance specialist. \
Write clear, auditable organisational policies in Markdown with the sections: \
Purpose, Scope, Roles and Responsibilities, Policy Statements, Compliance, Review. \
Do not add any preamble or closing remarks.";

const TREATMENT_SYSTEM: &str = "You are an enterprise risk manager. Recommend a \
treatment strategy (mitigate, transfer, avoid or accept) for the risk described, \
justify it in two or three sentences, then list concrete actions as bullet points.";

const RUNBOOK_SYSTEM: &str = "You are a business continuity planner. Produce recovery \
runbook steps as a JSON array and nothing else. Each element must be an object with \
the keys \"title\" (string), \"description\" (string), \"owner_role\" (string) and \
\"estimated_minutes\" (integer).";

const BIA_SYSTEM: &str = "You are a business continuity consultant reviewing a business \
impact analysis. Give prioritised, practical recommendations to close recovery \
objective gaps and reduce downtime exposure. Answer in Markdown.";

pub fn policy_draft(input: &GeneratePolicy) -> Prompt {
    let mut user = format!("Draft a policy titled \"{}\".", input.title.trim());
    if let Some(category) = input.category.as_deref() {
        let _ = write!(user, "\nCategory: {category}.");
    }
    if let Some(framework) = input.framework.as_deref() {
        let _ = write!(user, "\nAlign it with the requirements of {framework}.");
    }
    Prompt {
        system: POLICY_SYSTEM,
        user,
    }
}

pub fn risk_treatment(
    risk: &DbRisk,
    inherent: RiskScore,
    appetite: i64,
    controls: &[DbControl],
) -> Prompt {
    let mut user = format!(
        "Risk: {}\nCategory: {}\nInherent likelihood {} and impact {} (score {} of 25, {:?}).\n\
         Organisation risk appetite: {appetite}.",
        risk.title,
        risk.category.as_deref().unwrap_or("uncategorised"),
        inherent.likelihood(),
        inherent.impact(),
        inherent.value(),
        inherent.level(),
    );
    if let Some(description) = risk.description.as_deref() {
        let _ = write!(user, "\nDescription: {description}");
    }
    if controls.is_empty() {
        user.push_str("\nNo controls are currently linked to this risk.");
    } else {
        user.push_str("\nLinked controls:");
        for control in controls {
            let _ = write!(
                user,
                "\n- {} {} ({:?})",
                control.code, control.title, control.implementation_status
            );
        }
    }
    Prompt {
        system: TREATMENT_SYSTEM,
        user,
    }
}

pub fn runbook_steps(
    runbook_title: &str,
    process: Option<&DbProcess>,
    analysis: Option<&ProcessAnalysis>,
) -> Prompt {
    let mut user = format!("Runbook: {runbook_title}");
    if let Some(p) = process {
        let _ = write!(
            user,
            "\nProcess: {} ({:?} criticality), RTO {} h, RPO {} h.",
            p.name, p.criticality, p.rto_hours, p.rpo_hours
        );
        if let Some(description) = p.description.as_deref() {
            let _ = write!(user, "\nProcess description: {description}");
        }
    }
    if let Some(a) = analysis
        && !a.dependencies.is_empty()
    {
        user.push_str("\nRecover these dependencies, most fundamental first:");
        for dep in a.dependencies.iter().rev() {
            let _ = write!(user, "\n- {} (depth {})", dep.name, dep.depth);
        }
    }
    user.push_str("\nKeep the total estimated time within the RTO where possible.");
    Prompt {
        system: RUNBOOK_SYSTEM,
        user,
    }
}

pub fn bia_recommendations(analysis: &ProcessAnalysis, context: Option<&str>) -> Prompt {
    let mut user = format!(
        "Process: {} ({:?} criticality)\nTarget RTO {} h, achievable RTO {} h, RPO {} h.",
        analysis.process_name,
        analysis.criticality,
        analysis.rto_hours,
        analysis.achievable_rto_hours,
        analysis.rpo_hours,
    );
    if let Some(mtpd) = analysis.mtpd_hours {
        let _ = write!(
            user,
            "\nMTPD {mtpd} h{}.",
            if analysis.exceeds_mtpd { ", exceeded" } else { "" }
        );
    }
    for gap in &analysis.rto_gaps {
        let _ = write!(
            user,
            "\nRTO gap: {} recovers in {} h, {} h over target.",
            gap.name, gap.dependency_hours, gap.gap_hours
        );
    }
    for gap in &analysis.rpo_gaps {
        let _ = write!(
            user,
            "\nRPO gap: {} loses up to {} h of data, {} h over target.",
            gap.name, gap.dependency_hours, gap.gap_hours
        );
    }
    let _ = write!(
        user,
        "\nDownstream processes impacted: {}.\nEstimated total downtime cost: {:.2}.\nOverall rating: {:?}.",
        analysis.impacted_processes.len(),
        analysis.downtime_cost.total,
        analysis.risk_rating,
    );
    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        let _ = write!(user, "\nAdditional context: {context}");
    }
    Prompt {
        system: BIA_SYSTEM,
        user,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StepsReply {
    Bare(Vec<CreateStep>),
    Wrapped { steps: Vec<CreateStep> },
}

/// Strip a surrounding Markdown code fence, with or without a language tag.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse generated runbook steps. Items failing validation are dropped;
/// a reply with no usable step is an error.
pub fn parse_runbook_steps(reply: &str) -> Result<Vec<CreateStep>, NexusError> {
    let steps = match serde_json::from_str::<StepsReply>(strip_code_fence(reply))? {
        StepsReply::Bare(steps) | StepsReply::Wrapped { steps } => steps,
    };
    let steps: Vec<CreateStep> = steps
        .into_iter()
        .filter(|step| match step.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(title = %step.title, error = %e, "dropping generated runbook step");
                false
            }
        })
        .collect();
    if steps.is_empty() {
        return Err(NexusError::EmptyCompletion);
    }
    Ok(steps)
}
