// Management endpoints and the shared JSON error payload.

use crate::interface_adapters::protocol::StatusResponse;
use crate::interface_adapters::state::AppState;
use crate::use_cases::SimEvent;

use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{info, warn};

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    // Human-readable error string for consistent JSON error responses.
    pub error: String,
}

type HttpError = (StatusCode, Json<ErrorResponse>);

fn unavailable(message: &str) -> HttpError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

// Forces the active backend back to its initial condition and neutralizes controls.
pub async fn reset(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, HttpError> {
    let (ack_tx, ack_rx) = oneshot::channel();
    let events_tx = state.events_tx.clone();

    let request = async move {
        events_tx
            .send(SimEvent::Reset { ack: Some(ack_tx) })
            .await
            .map_err(|_| "flight loop unavailable")?;
        ack_rx.await.map_err(|_| "flight loop dropped the reset")
    };

    match timeout(state.reset_ack_timeout, request).await {
        Ok(Ok(())) => {
            info!("reset applied");
            Ok(Json(StatusResponse { status: "reset" }))
        }
        Ok(Err(reason)) => {
            warn!(reason, "reset failed");
            Err(unavailable(reason))
        }
        Err(_) => {
            warn!(
                timeout_ms = state.reset_ack_timeout.as_millis() as u64,
                "reset not acknowledged in time"
            );
            Err(unavailable("reset timed out"))
        }
    }
}
