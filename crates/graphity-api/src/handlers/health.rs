use axum::extract::State;
use axum::Json;
use graphity_core::AppError;
use serde_json::{json, Value};

use crate::error::HttpAppError;
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, HttpAppError> {
    if !state.pipeline.is_accepting() {
        return Err(AppError::QueueClosed.into());
    }

    Ok(Json(json!({
        "status": "ok",
        "environment": state.config.environment,
        "templates": state.pipeline.registry().names(),
    })))
}
