mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use support_api::routes::{api_routes, management_routes};
use support_api::{AppState, AppStateInner};
use support_gateway::connection;
use support_gateway::directory::{ConnectionDirectory, MemoryDirectory, SqliteDirectory};
use support_gateway::dispatcher::Dispatcher;
use support_gateway::handlers::Relay;
use support_gateway::push::{HttpPushTransport, PushTransport};
use support_gateway::store::SqliteMessageStore;
use support_types::api::ConnectQuery;

use crate::config::{Config, DirectoryBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "support_server=debug,support_gateway=debug,support_api=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(support_db::Database::open(&config.db_path)?);

    let directory: Arc<dyn ConnectionDirectory> = match config.directory {
        DirectoryBackend::Sqlite => Arc::new(SqliteDirectory::new(db.clone())),
        DirectoryBackend::Memory => Arc::new(MemoryDirectory::new()),
    };

    let dispatcher = Dispatcher::new();
    let transport: Arc<dyn PushTransport> = match &config.push_endpoint {
        Some(endpoint) => {
            let http = HttpPushTransport::new(endpoint)?;
            info!("Fan-out via connection-management API at {}", http.endpoint());
            Arc::new(http)
        }
        None => Arc::new(dispatcher.clone()),
    };

    let relay = Relay::new(
        directory,
        Arc::new(SqliteMessageStore::new(db)),
        transport,
        config.jwt_secret.clone(),
    );
    let app_state: AppState = Arc::new(AppStateInner { relay, dispatcher });

    let app = router(app_state, config.expose_management);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Support relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState, expose_management: bool) -> Router {
    let ws_route = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(state.clone());

    let mut app = Router::new()
        .merge(api_routes(state.clone()))
        .merge(ws_route);
    if expose_management {
        warn!("Management endpoints mounted without authentication");
        app = app.merge(management_routes(state));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// The connect handler runs before the upgrade: a refused request gets its
/// status code and never becomes a socket.
async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let connection_id = Uuid::new_v4().to_string();

    if let Err(e) = state
        .relay
        .connect(
            &connection_id,
            query.token.as_deref(),
            query.user_email.as_deref(),
        )
        .await
    {
        warn!("Connect {} refused: {}", connection_id, e);
        let status =
            StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, e.to_string()).into_response();
    }

    let relay = state.relay.clone();
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, relay, dispatcher, connection_id)
    })
}
