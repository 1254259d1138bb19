use axum::{extract::State, http::StatusCode};
use serde::Serialize;
use tracing::info;

use crate::db::models::{DbAssessment, DbAssessmentResult};
use crate::middleware::extract::{Json, Path};
use crate::middleware::org::OrgContext;
use crate::service::compliance::score_from_results;
use crate::service::risk_scoring::ComplianceScore;
use crate::types::compliance::{AssessmentProgress, CreateAssessment, RecordResult};
use crate::{NexusError, router::NexusState};

#[derive(Debug, Serialize)]
pub struct AssessmentDetail {
    #[serde(flatten)]
    pub assessment: DbAssessment,
    pub progress: AssessmentProgress,
    pub results: Vec<DbAssessmentResult>,
}

#[derive(Debug, Serialize)]
pub struct CompletedAssessment {
    #[serde(flatten)]
    pub assessment: DbAssessment,
    pub breakdown: ComplianceScore,
}

async fn progress_of(
    state: &NexusState,
    assessment: &DbAssessment,
) -> Result<(AssessmentProgress, Vec<DbAssessmentResult>), NexusError> {
    let (controls, results) = futures::try_join!(
        state.storage.list_framework_controls(assessment.framework_id),
        state.storage.list_assessment_results(assessment.id),
    )?;
    let progress = AssessmentProgress::new(controls.len() as i64, results.len() as i64);
    Ok((progress, results))
}

pub async fn create_assessment(
    State(state): State<NexusState>,
    org: OrgContext,
    Json(input): Json<CreateAssessment>,
) -> Result<(StatusCode, Json<DbAssessment>), NexusError> {
    input.validate()?;
    let assessment = state.storage.create_assessment(org.id, input).await?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

pub async fn list_assessments(
    State(state): State<NexusState>,
    org: OrgContext,
) -> Result<Json<Vec<DbAssessment>>, NexusError> {
    Ok(Json(state.storage.list_assessments(org.id).await?))
}

pub async fn get_assessment(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<AssessmentDetail>, NexusError> {
    let assessment = state.storage.get_assessment(org.id, id).await?;
    let (progress, results) = progress_of(&state, &assessment).await?;
    Ok(Json(AssessmentDetail {
        assessment,
        progress,
        results,
    }))
}

pub async fn record_result(
    State(state): State<NexusState>,
    org: OrgContext,
    Path((id, control_id)): Path<(i64, i64)>,
    Json(input): Json<RecordResult>,
) -> Result<Json<DbAssessmentResult>, NexusError> {
    Ok(Json(
        state
            .storage
            .record_result(org.id, id, control_id, input)
            .await?,
    ))
}

pub async fn assessment_progress(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<AssessmentProgress>, NexusError> {
    let assessment = state.storage.get_assessment(org.id, id).await?;
    let (progress, _) = progress_of(&state, &assessment).await?;
    Ok(Json(progress))
}

/// Score the findings and close the assessment.
pub async fn complete_assessment(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<CompletedAssessment>, NexusError> {
    let (assessment, breakdown) = state
        .storage
        .complete_assessment(org.id, id, |controls, results, weights| {
            let breakdown = score_from_results(controls, results, weights);
            (breakdown.risk_weighted, breakdown)
        })
        .await?;
    info!(
        assessment_id = id,
        score = breakdown.risk_weighted,
        "assessment completed"
    );
    Ok(Json(CompletedAssessment {
        assessment,
        breakdown,
    }))
}
