use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::require_auth;
use crate::{AppState, events, messages};

/// Message history for clients, always behind bearer auth.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/messages/{email}/all",
            get(messages::get_all_messages_for_user),
        )
        .route(
            "/api/messages/user-emails",
            get(messages::get_all_user_emails_with_messages),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

/// Lifecycle-event and connection-management endpoints for an external
/// socket gateway. Unauthenticated: only mount on an internal listener.
pub fn management_routes(state: AppState) -> Router {
    Router::new()
        .route("/events", post(events::lifecycle_event))
        .route(
            "/@connections/{connection_id}",
            post(events::post_to_connection),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use support_gateway::directory::{ConnectionDirectory, MemoryDirectory};
    use support_gateway::dispatcher::Dispatcher;
    use support_gateway::handlers::Relay;
    use support_gateway::store::MemoryMessageStore;
    use support_types::api::{Claims, Role};
    use support_types::models::ConnectionRecord;

    use super::*;
    use crate::AppStateInner;

    const SECRET: &str = "test-secret";

    fn token(email: &str, role: Role) -> String {
        let claims = Claims {
            email: email.into(),
            role,
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    struct Fixture {
        state: AppState,
        directory: Arc<MemoryDirectory>,
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(MemoryDirectory::new());
        let dispatcher = Dispatcher::new();
        let relay = Relay::new(
            directory.clone(),
            Arc::new(MemoryMessageStore::new()),
            Arc::new(dispatcher.clone()),
            SECRET,
        );
        Fixture {
            state: Arc::new(AppStateInner { relay, dispatcher }),
            directory,
        }
    }

    fn app(f: &Fixture) -> Router {
        api_routes(f.state.clone()).merge(management_routes(f.state.clone()))
    }

    async fn get_json(app: Router, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::get(uri);
        if let Some(t) = bearer {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        let res = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn seed_thread(f: &Fixture, owner: &str, bodies: &[&str]) {
        let cid = format!("seed-{}", owner);
        f.directory
            .put(ConnectionRecord::new(cid.clone(), owner))
            .await
            .unwrap();
        for body in bodies {
            f.state
                .relay
                .relay_message(&cid, &json!({ "token": "", "message": body }).to_string())
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn history_requires_bearer_token() {
        let f = fixture();
        let (status, _) = get_json(app(&f), "/api/messages/a@x.io/all", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = get_json(app(&f), "/api/messages/a@x.io/all", Some("junk")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn user_reads_own_thread_only() {
        let f = fixture();
        seed_thread(&f, "a@x.io", &["first", "second"]).await;
        let t = token("a@x.io", Role::RegisteredUser);

        let (status, body) = get_json(app(&f), "/api/messages/a@x.io/all", Some(&t)).await;
        assert_eq!(status, StatusCode::OK);
        let bodies: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["body"].as_str().unwrap())
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(body[0]["senderIdentity"], "a@x.io");

        let (status, _) = get_json(app(&f), "/api/messages/b@x.io/all", Some(&t)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn inbox_is_for_support_agents() {
        let f = fixture();
        seed_thread(&f, "b@x.io", &["help"]).await;
        seed_thread(&f, "a@x.io", &["hi"]).await;

        let agent = token("agent@x.io", Role::SupportAgent);
        let (status, body) = get_json(app(&f), "/api/messages/user-emails", Some(&agent)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["a@x.io", "b@x.io"]));

        let user = token("a@x.io", Role::RegisteredUser);
        let (status, _) = get_json(app(&f), "/api/messages/user-emails", Some(&user)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn lifecycle_events_over_http() {
        let f = fixture();
        let t = token("a@x.io", Role::RegisteredUser);

        let (status, body) = post_json(
            app(&f),
            "/events",
            json!({
                "requestContext": { "routeKey": "$connect", "connectionId": "c1" },
                "queryStringParameters": { "token": t, "userEmail": "a@x.io" }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "statusCode": 200 }));
        assert_eq!(f.directory.len().await, 1);

        let (_, body) = post_json(
            app(&f),
            "/events",
            json!({
                "requestContext": { "routeKey": "$connect", "connectionId": "c2" },
                "queryStringParameters": { "token": t, "userEmail": "b@x.io" }
            }),
        )
        .await;
        assert_eq!(body["statusCode"], 401);
    }

    #[tokio::test]
    async fn management_push_reaches_local_socket() {
        let f = fixture();
        let mut rx = f.state.dispatcher.register("c1").await;

        let req = Request::post("/@connections/c1")
            .body(Body::from("{\"body\":\"hi\"}"))
            .unwrap();
        let res = app(&f).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(&rx.recv().await.unwrap()[..], b"{\"body\":\"hi\"}");

        let req = Request::post("/@connections/gone").body(Body::empty()).unwrap();
        let res = app(&f).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::GONE);
    }
}
