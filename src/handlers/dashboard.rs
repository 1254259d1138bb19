use axum::extract::State;

use crate::middleware::extract::Json;
use crate::middleware::org::OrgContext;
use crate::service::dashboard::{self, DashboardSummary};
use crate::{NexusError, router::NexusState};

pub async fn dashboard_summary(
    State(state): State<NexusState>,
    org: OrgContext,
) -> Result<Json<DashboardSummary>, NexusError> {
    Ok(Json(dashboard::build(&state.storage, org.id).await?))
}
