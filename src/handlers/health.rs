use axum::extract::State;
use serde_json::{Value, json};

use crate::middleware::extract::Json;
use crate::{NexusError, router::NexusState};

/// Liveness plus a round trip to the database.
pub async fn health(State(state): State<NexusState>) -> Result<Json<Value>, NexusError> {
    state.storage.ping().await?;
    Ok(Json(json!({
        "status": "ok",
        "ai_enabled": state.assistant.is_enabled(),
    })))
}
