use axum::{extract::State, http::StatusCode};
use serde::Serialize;

use crate::db::models::{DbAsset, DbDependency, DbProcess};
use crate::middleware::extract::{Json, Path};
use crate::middleware::org::OrgContext;
use crate::service::bia_analysis::{BiaOverview, ProcessAnalysis, analyze_all, analyze_process};
use crate::service::prompts;
use crate::types::bia::{
    CreateAsset, CreateDependency, CreateProcess, RecommendationRequest, UpdateProcess,
};
use crate::{NexusError, router::NexusState};

#[derive(Debug, Serialize)]
pub struct AnalysisWithRecommendations {
    pub analysis: ProcessAnalysis,
    pub recommendations: String,
}

pub async fn create_process(
    State(state): State<NexusState>,
    org: OrgContext,
    Json(input): Json<CreateProcess>,
) -> Result<(StatusCode, Json<DbProcess>), NexusError> {
    input.validate()?;
    state.storage.ensure_user(org.id, input.owner_id).await?;
    let process = state.storage.create_process(org.id, input).await?;
    Ok((StatusCode::CREATED, Json(process)))
}

pub async fn list_processes(
    State(state): State<NexusState>,
    org: OrgContext,
) -> Result<Json<Vec<DbProcess>>, NexusError> {
    Ok(Json(state.storage.list_processes(org.id).await?))
}

pub async fn get_process(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<DbProcess>, NexusError> {
    Ok(Json(state.storage.get_process(org.id, id).await?))
}

pub async fn update_process(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
    Json(changes): Json<UpdateProcess>,
) -> Result<Json<DbProcess>, NexusError> {
    changes.validate()?;
    state.storage.ensure_user(org.id, changes.owner_id).await?;
    Ok(Json(state.storage.update_process(org.id, id, changes).await?))
}

pub async fn delete_process(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, NexusError> {
    state.storage.delete_process(org.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_asset(
    State(state): State<NexusState>,
    org: OrgContext,
    Json(input): Json<CreateAsset>,
) -> Result<(StatusCode, Json<DbAsset>), NexusError> {
    input.validate()?;
    let asset = state.storage.create_asset(org.id, input).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

pub async fn list_assets(
    State(state): State<NexusState>,
    org: OrgContext,
) -> Result<Json<Vec<DbAsset>>, NexusError> {
    Ok(Json(state.storage.list_assets(org.id).await?))
}

pub async fn delete_asset(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, NexusError> {
    state.storage.delete_asset(org.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_dependency(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(process_id): Path<i64>,
    Json(input): Json<CreateDependency>,
) -> Result<(StatusCode, Json<DbDependency>), NexusError> {
    let dependency = state
        .storage
        .create_dependency(org.id, process_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(dependency)))
}

pub async fn list_dependencies(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(process_id): Path<i64>,
) -> Result<Json<Vec<DbDependency>>, NexusError> {
    Ok(Json(
        state.storage.list_dependencies(org.id, process_id).await?,
    ))
}

pub async fn delete_dependency(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, NexusError> {
    state.storage.delete_dependency(org.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn process_analysis(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<ProcessAnalysis>, NexusError> {
    let graph = state.storage.load_dependency_graph(org.id).await?;
    Ok(Json(analyze_process(&graph, id)?))
}

pub async fn process_recommendations(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
    body: Option<Json<RecommendationRequest>>,
) -> Result<Json<AnalysisWithRecommendations>, NexusError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let graph = state.storage.load_dependency_graph(org.id).await?;
    let analysis = analyze_process(&graph, id)?;
    let prompt = prompts::bia_recommendations(&analysis, request.context.as_deref());
    let recommendations = state.assistant.complete(prompt.system, &prompt.user).await?;
    Ok(Json(AnalysisWithRecommendations {
        analysis,
        recommendations,
    }))
}

pub async fn organization_analysis(
    State(state): State<NexusState>,
    org: OrgContext,
) -> Result<Json<BiaOverview>, NexusError> {
    let graph = state.storage.load_dependency_graph(org.id).await?;
    Ok(Json(analyze_all(&graph)))
}
