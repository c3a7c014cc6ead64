use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, warn};

use support_types::api::{Claims, Role};

use crate::AppState;

/// Full history of one user's support thread, oldest first.
pub async fn get_all_messages_for_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    if !claims.may_access_thread(&email) {
        warn!("{} may not read the thread of {}", claims.email, email);
        return Err(StatusCode::UNAUTHORIZED);
    }

    let messages = state.relay.store().list_for_user(&email).await.map_err(|e| {
        error!("Loading thread of {} failed: {:#}", email, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(messages))
}

/// Users with at least one message, for the support agent inbox.
pub async fn get_all_user_emails_with_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    if claims.role != Role::SupportAgent {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let emails = state.relay.store().user_identities().await.map_err(|e| {
        error!("Listing thread owners failed: {:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(emails))
}
