use axum::{extract::State, http::StatusCode};
use serde::Serialize;

use crate::db::models::{DbControl, DbUniverseEntry};
use crate::middleware::extract::{Json, Path, Query};
use crate::middleware::org::OrgContext;
use crate::service::prompts;
use crate::service::risk_register::{RiskHeatmap, RiskView, open_heatmap, views};
use crate::service::risk_scoring::RiskScore;
use crate::types::risk::{CreateRisk, CreateUniverseEntry, RiskFilter, UpdateRisk};
use crate::{NexusError, router::NexusState};

#[derive(Debug, Serialize)]
pub struct RiskDetail {
    #[serde(flatten)]
    pub view: RiskView,
    pub controls: Vec<DbControl>,
}

#[derive(Debug, Serialize)]
pub struct TreatmentSuggestion {
    pub risk_id: i64,
    pub suggestion: String,
}

pub async fn create_universe_entry(
    State(state): State<NexusState>,
    org: OrgContext,
    Json(input): Json<CreateUniverseEntry>,
) -> Result<(StatusCode, Json<DbUniverseEntry>), NexusError> {
    input.validate()?;
    let entry = state.storage.create_universe_entry(org.id, input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_universe(
    State(state): State<NexusState>,
    org: OrgContext,
) -> Result<Json<Vec<DbUniverseEntry>>, NexusError> {
    Ok(Json(state.storage.list_universe(org.id).await?))
}

pub async fn create_risk(
    State(state): State<NexusState>,
    org: OrgContext,
    Json(input): Json<CreateRisk>,
) -> Result<(StatusCode, Json<RiskView>), NexusError> {
    input.validate()?;
    state.storage.ensure_user(org.id, input.owner_id).await?;
    let risk = state.storage.create_risk(org.id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(RiskView::new(risk, org.risk_appetite)?),
    ))
}

/// Highest inherent score first; `level` filters on the inherent level.
pub async fn list_risks(
    State(state): State<NexusState>,
    org: OrgContext,
    Query(filter): Query<RiskFilter>,
) -> Result<Json<Vec<RiskView>>, NexusError> {
    let risks = state.storage.list_risks(org.id, filter.status).await?;
    let mut views = views(risks, org.risk_appetite)?;
    if let Some(level) = filter.level {
        views.retain(|v| v.inherent_level == level);
    }
    Ok(Json(views))
}

pub async fn get_risk(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<RiskDetail>, NexusError> {
    let risk = state.storage.get_risk(org.id, id).await?;
    let controls = state.storage.list_risk_controls(id).await?;
    Ok(Json(RiskDetail {
        view: RiskView::new(risk, org.risk_appetite)?,
        controls,
    }))
}

pub async fn update_risk(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
    Json(changes): Json<UpdateRisk>,
) -> Result<Json<RiskView>, NexusError> {
    changes.validate()?;
    state.storage.ensure_user(org.id, changes.owner_id).await?;
    let risk = state.storage.update_risk(org.id, id, changes).await?;
    Ok(Json(RiskView::new(risk, org.risk_appetite)?))
}

pub async fn delete_risk(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, NexusError> {
    state.storage.delete_risk(org.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn link_control(
    State(state): State<NexusState>,
    org: OrgContext,
    Path((id, control_id)): Path<(i64, i64)>,
) -> Result<StatusCode, NexusError> {
    state
        .storage
        .link_risk_control(org.id, id, control_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlink_control(
    State(state): State<NexusState>,
    org: OrgContext,
    Path((id, control_id)): Path<(i64, i64)>,
) -> Result<StatusCode, NexusError> {
    state
        .storage
        .unlink_risk_control(org.id, id, control_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn risk_heatmap(
    State(state): State<NexusState>,
    org: OrgContext,
) -> Result<Json<RiskHeatmap>, NexusError> {
    let risks = state.storage.list_risks(org.id, None).await?;
    Ok(Json(open_heatmap(&views(risks, org.risk_appetite)?)))
}

pub async fn suggest_treatment(
    State(state): State<NexusState>,
    org: OrgContext,
    Path(id): Path<i64>,
) -> Result<Json<TreatmentSuggestion>, NexusError> {
    let risk = state.storage.get_risk(org.id, id).await?;
    let controls = state.storage.list_risk_controls(id).await?;
    let inherent = RiskScore::new(risk.likelihood, risk.impact)?;
    let prompt = prompts::risk_treatment(&risk, inherent, org.risk_appetite, &controls);
    let suggestion = state.assistant.complete(prompt.system, &prompt.user).await?;
    Ok(Json(TreatmentSuggestion {
        risk_id: id,
        suggestion,
    }))
}
