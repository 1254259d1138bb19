use axum::{extract::State, http::StatusCode};
use tracing::info;

use crate::db::models::DbPolicy;
use crate::middleware::extract::{Json, Path, Query};
use crate::middleware::org::OrgContext;
use crate::service::prompts;
use crate::types::policy::{
    CreatePolicy, GeneratePolicy, PolicyFilter, PolicyTransition, UpdatePolicy,
};
use crate::{NexusError, router::NexusState};

pub async fn create_policy(
    State(state): State<NexusState>,
    org: OrgContext,
    Json(input): Json<CreatePolicy>,
) -> Result<(StatusCode, Json<DbPolicy>), NexusError> {
    input.validate()?;
    state.storage.ensure_user(org.id, input.owner_id).await?;
    let policy = state.storage.create_policy(org.id, input).await?;
    Ok((StatusCode::CREATED, Json(policy)))
}

pub async fn list_policies(
    State(state): State<NexusState>,
    org: OrgContext,
    Query(filter): Query<PolicyFilter>,
) -> Result<Json<Vec<DbPolicy>>, NexusError> {
    Ok(Json(
        state.storage.list_policies(org.id, filter.status).await?,
    ))
}

pub async fn get_policy(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<DbPolicy>, NexusError> {
    Ok(Json(state.storage.get_policy(org.id, id).await?))
}

pub async fn update_policy(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
    Json(changes): Json<UpdatePolicy>,
) -> Result<Json<DbPolicy>, NexusError> {
    changes.validate()?;
    state.storage.ensure_user(org.id, changes.owner_id).await?;
    Ok(Json(state.storage.update_policy(org.id, id, changes).await?))
}

pub async fn delete_policy(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, NexusError> {
    state.storage.delete_policy(org.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn transition_policy(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
    Json(body): Json<PolicyTransition>,
) -> Result<Json<DbPolicy>, NexusError> {
    let policy = state
        .storage
        .transition_policy(org.id, id, body.status)
        .await?;
    info!(
        policy_id = id,
        status = policy.status.as_str(),
        version = policy.version,
        "policy transitioned"
    );
    Ok(Json(policy))
}

/// Draft a policy with the AI assistant and store it as a new draft.
pub async fn generate_policy(
    State(state): State<NexusState>,
    org: OrgContext,
    Json(input): Json<GeneratePolicy>,
) -> Result<(StatusCode, Json<DbPolicy>), NexusError> {
    input.validate()?;
    state.storage.ensure_user(org.id, input.owner_id).await?;
    let prompt = prompts::policy_draft(&input);
    let content = state.assistant.complete(prompt.system, &prompt.user).await?;
    let policy = state
        .storage
        .create_policy(
            org.id,
            CreatePolicy {
                title: input.title,
                category: input.category,
                content,
                owner_id: input.owner_id,
                review_date: None,
            },
        )
        .await?;
    info!(policy_id = policy.id, "policy draft generated");
    Ok((StatusCode::CREATED, Json(policy)))
}
