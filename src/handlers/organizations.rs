use axum::{extract::State, http::StatusCode};
use tracing::info;

use crate::db::models::{DbOrganization, DbUser};
use crate::middleware::extract::{Json, Path};
use crate::middleware::org::OrgContext;
use crate::types::organization::{CreateOrganization, CreateUser, UpdateOrganization};
use crate::{NexusError, router::NexusState};

pub async fn create_organization(
    State(state): State<NexusState>,
    Json(input): Json<CreateOrganization>,
) -> Result<(StatusCode, Json<DbOrganization>), NexusError> {
    input.validate()?;
    let org = state
        .storage
        .create_organization(input, state.default_risk_appetite)
        .await?;
    info!(org_id = org.id, name = %org.name, "organization created");
    Ok((StatusCode::CREATED, Json(org)))
}

pub async fn list_organizations(
    State(state): State<NexusState>,
) -> Result<Json<Vec<DbOrganization>>, NexusError> {
    Ok(Json(state.storage.list_organizations().await?))
}

pub async fn get_organization(
    State(state): State<NexusState>,
    Path(id): Path<i64>,
) -> Result<Json<DbOrganization>, NexusError> {
    Ok(Json(state.storage.get_organization(id).await?))
}

pub async fn update_organization(
    State(state): State<NexusState>,
    Path(id): Path<i64>,
    Json(changes): Json<UpdateOrganization>,
) -> Result<Json<DbOrganization>, NexusError> {
    changes.validate()?;
    Ok(Json(state.storage.update_organization(id, changes).await?))
}

pub async fn create_user(
    State(state): State<NexusState>,
    org: OrgContext,
    Json(input): Json<CreateUser>,
) -> Result<(StatusCode, Json<DbUser>), NexusError> {
    input.validate()?;
    let user = state.storage.create_user(org.id, input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<NexusState>,
    org: OrgContext,
) -> Result<Json<Vec<DbUser>>, NexusError> {
    Ok(Json(state.storage.list_users(org.id).await?))
}

pub async fn delete_user(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, NexusError> {
    state.storage.delete_user(org.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
