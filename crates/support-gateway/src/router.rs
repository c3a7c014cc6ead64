use tracing::{info, warn};

use support_types::events::{GatewayRequest, GatewayResponse, RouteKey};

use crate::handlers::Relay;

/// Dispatch one lifecycle event to its handler.
///
/// Handler failures become a structured response; nothing here panics or
/// retries.
pub async fn route(relay: &Relay, request: GatewayRequest) -> GatewayResponse {
    let connection_id = request.request_context.connection_id.as_str();

    let result = match request.route() {
        RouteKey::Connect => relay
            .connect(
                connection_id,
                request.query_param("token"),
                request.query_param("userEmail"),
            )
            .await
            .map(|_| ()),
        RouteKey::Disconnect => relay.disconnect(connection_id).await,
        RouteKey::Message(key) => {
            info!("Relaying {} frame from {}", key, connection_id);
            relay
                .relay_message(connection_id, request.body.as_deref().unwrap_or_default())
                .await
                .map(|_| ())
        }
    };

    match result {
        Ok(()) => GatewayResponse::ok(),
        Err(e) => {
            warn!(
                "{} event for {} failed: {}",
                request.request_context.route_key, connection_id, e
            );
            GatewayResponse::error(e.status_code(), e.to_string())
        }
    }
}
