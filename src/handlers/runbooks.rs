use axum::{extract::State, http::StatusCode};
use tracing::info;

use crate::db::models::{DbRunbook, DbRunbookStep};
use crate::middleware::extract::{Json, Path};
use crate::middleware::org::OrgContext;
use crate::service::bia_analysis::analyze_process;
use crate::service::prompts;
use crate::types::runbook::{
    CreateRunbook, CreateStep, ReorderSteps, RunbookReadiness, UpdateRunbook, UpdateStep,
};
use crate::{NexusError, router::NexusState};

pub async fn create_runbook(
    State(state): State<NexusState>,
    org: OrgContext,
    Json(input): Json<CreateRunbook>,
) -> Result<(StatusCode, Json<DbRunbook>), NexusError> {
    input.validate()?;
    let runbook = state.storage.create_runbook(org.id, input).await?;
    Ok((StatusCode::CREATED, Json(runbook)))
}

pub async fn list_runbooks(
    State(state): State<NexusState>,
    org: OrgContext,
) -> Result<Json<Vec<DbRunbook>>, NexusError> {
    Ok(Json(state.storage.list_runbooks(org.id).await?))
}

pub async fn get_runbook(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<DbRunbook>, NexusError> {
    Ok(Json(state.storage.get_runbook(org.id, id).await?))
}

pub async fn update_runbook(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
    Json(changes): Json<UpdateRunbook>,
) -> Result<Json<DbRunbook>, NexusError> {
    changes.validate()?;
    Ok(Json(state.storage.update_runbook(org.id, id, changes).await?))
}

pub async fn delete_runbook(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, NexusError> {
    state.storage.delete_runbook(org.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_steps(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<Vec<DbRunbookStep>>, NexusError> {
    Ok(Json(state.storage.list_steps(org.id, id).await?))
}

pub async fn add_step(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
    Json(input): Json<CreateStep>,
) -> Result<(StatusCode, Json<DbRunbookStep>), NexusError> {
    input.validate()?;
    let step = state.storage.add_step(org.id, id, input).await?;
    Ok((StatusCode::CREATED, Json(step)))
}

pub async fn update_step(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
    Json(changes): Json<UpdateStep>,
) -> Result<Json<DbRunbookStep>, NexusError> {
    changes.validate()?;
    Ok(Json(state.storage.update_step(org.id, id, changes).await?))
}

pub async fn delete_step(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, NexusError> {
    state.storage.delete_step(org.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_steps(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
    Json(body): Json<ReorderSteps>,
) -> Result<Json<Vec<DbRunbookStep>>, NexusError> {
    Ok(Json(
        state
            .storage
            .reorder_runbook_steps(org.id, id, &body.step_ids)
            .await?,
    ))
}

pub async fn runbook_readiness(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<RunbookReadiness>, NexusError> {
    let runbook = state.storage.get_runbook(org.id, id).await?;
    let steps = state.storage.list_steps(org.id, id).await?;
    let rto_hours = match runbook.process_id {
        Some(process_id) => Some(state.storage.get_process(org.id, process_id).await?.rto_hours),
        None => None,
    };
    let minutes: Vec<i64> = steps.iter().map(|s| s.estimated_minutes).collect();
    Ok(Json(RunbookReadiness::evaluate(id, &minutes, rto_hours)))
}

/// Ask the assistant for recovery steps and append them to the runbook.
pub async fn generate_steps(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<Vec<DbRunbookStep>>), NexusError> {
    let runbook = state.storage.get_runbook(org.id, id).await?;
    let (process, analysis) = match runbook.process_id {
        Some(process_id) => {
            let process = state.storage.get_process(org.id, process_id).await?;
            let graph = state.storage.load_dependency_graph(org.id).await?;
            let analysis = analyze_process(&graph, process_id)?;
            (Some(process), Some(analysis))
        }
        None => (None, None),
    };
    let prompt = prompts::runbook_steps(&runbook.title, process.as_ref(), analysis.as_ref());
    let reply = state.assistant.complete(prompt.system, &prompt.user).await?;
    let steps = prompts::parse_runbook_steps(&reply)?;
    let created = state.storage.append_steps(org.id, id, steps).await?;
    info!(runbook_id = id, steps = created.len(), "runbook steps generated");
    Ok((StatusCode::CREATED, Json(created)))
}
