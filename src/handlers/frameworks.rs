use axum::{extract::State, http::StatusCode};

use crate::db::compliance::FrameworkTree;
use crate::db::models::{DbControl, DbDomain, DbFramework};
use crate::middleware::extract::{Json, Path};
use crate::middleware::org::OrgContext;
use crate::service::compliance::{FrameworkScore, framework_score};
use crate::types::compliance::{CreateControl, CreateDomain, CreateFramework, UpdateControl};
use crate::{NexusError, router::NexusState};

pub async fn create_framework(
    State(state): State<NexusState>,
    org: OrgContext,
    Json(input): Json<CreateFramework>,
) -> Result<(StatusCode, Json<DbFramework>), NexusError> {
    input.validate()?;
    let framework = state.storage.create_framework(org.id, input).await?;
    Ok((StatusCode::CREATED, Json(framework)))
}

pub async fn list_frameworks(
    State(state): State<NexusState>,
    org: OrgContext,
) -> Result<Json<Vec<DbFramework>>, NexusError> {
    Ok(Json(state.storage.list_frameworks(org.id).await?))
}

pub async fn get_framework(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<FrameworkTree>, NexusError> {
    Ok(Json(state.storage.framework_tree(org.id, id).await?))
}

pub async fn delete_framework(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, NexusError> {
    state.storage.delete_framework(org.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_domain(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(framework_id): Path<i64>,
    Json(input): Json<CreateDomain>,
) -> Result<(StatusCode, Json<DbDomain>), NexusError> {
    input.validate()?;
    let domain = state
        .storage
        .create_domain(org.id, framework_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(domain)))
}

pub async fn create_control(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(domain_id): Path<i64>,
    Json(input): Json<CreateControl>,
) -> Result<(StatusCode, Json<DbControl>), NexusError> {
    input.validate()?;
    state.storage.ensure_user(org.id, input.owner_id).await?;
    let control = state
        .storage
        .create_control(org.id, domain_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(control)))
}

pub async fn update_control(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
    Json(changes): Json<UpdateControl>,
) -> Result<Json<DbControl>, NexusError> {
    changes.validate()?;
    state.storage.ensure_user(org.id, changes.owner_id).await?;
    Ok(Json(state.storage.update_control(org.id, id, changes).await?))
}

pub async fn score_framework(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<FrameworkScore>, NexusError> {
    Ok(Json(framework_score(&state.storage, org.id, id).await?))
}
