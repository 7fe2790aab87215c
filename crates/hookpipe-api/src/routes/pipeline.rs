//! Pipeline trigger endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use hookpipe_core::Error;
use serde::Deserialize;
use tracing::{info, warn};

use crate::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new().route("/pipeline", post(trigger_pipeline))
}

/// Trigger request body. The presented token rides in `trigger`.
#[derive(Debug, Deserialize)]
pub struct TriggerPayload {
    #[serde(default)]
    trigger: Option<String>,
}

/// Authenticate the trigger and execute the pipeline.
///
/// Pure orchestration: verification lives in the authenticator, run
/// semantics in the executor.
async fn trigger_pipeline(
    State(state): State<AppState>,
    payload: Option<Json<TriggerPayload>>,
) -> Result<(StatusCode, String), ApiError> {
    // An absent body or absent/empty trigger is rejected without
    // touching the authenticator.
    let token = payload
        .as_ref()
        .and_then(|p| p.trigger.as_deref())
        .unwrap_or("");
    if token.is_empty() {
        warn!("trigger request without token");
        return Err(Error::Unauthorized.into());
    }

    if !state.authenticator.verify(&state.config.pipeline_name, token) {
        warn!(pipeline = %state.config.pipeline_name, "trigger token rejected");
        return Err(Error::Unauthorized.into());
    }

    info!(pipeline = %state.config.pipeline_name, "trigger accepted");

    // ExecutionInProgress maps to 409 via ApiError.
    let result = state.executor.run().await?;

    if result.succeeded {
        Ok((
            StatusCode::OK,
            "Pipeline executed successfully".to_string(),
        ))
    } else {
        let message = result
            .failure
            .map(|f| f.message)
            .unwrap_or_else(|| "unknown failure".to_string());
        Err(ApiError::Internal(format!(
            "Error executing pipeline: {}",
            message
        )))
    }
}
