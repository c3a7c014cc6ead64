use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{debug, warn};

use support_gateway::error::PushError;
use support_gateway::push::PushTransport;
use support_gateway::router;
use support_types::events::{GatewayRequest, GatewayResponse};

use crate::AppState;

/// Entry point for an external socket gateway: one lifecycle event in, one
/// structured response out.
pub async fn lifecycle_event(
    State(state): State<AppState>,
    Json(request): Json<GatewayRequest>,
) -> Json<GatewayResponse> {
    Json(router::route(&state.relay, request).await)
}

/// Connection-management endpoint: push the raw body to a socket held by
/// this process. `410 Gone` when the socket is not here.
pub async fn post_to_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<String>,
    body: Bytes,
) -> StatusCode {
    match state.dispatcher.push(&connection_id, body).await {
        Ok(()) => StatusCode::OK,
        Err(PushError::Stale(_)) => {
            debug!("Push to unknown connection {}", connection_id);
            StatusCode::GONE
        }
        Err(e) => {
            warn!("{}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
