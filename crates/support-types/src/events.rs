use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a socket event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKey {
    Connect,
    Disconnect,
    /// Any other route key is treated as a chat message.
    Message(String),
}

impl RouteKey {
    pub fn parse(key: &str) -> Self {
        match key {
            "$connect" => RouteKey::Connect,
            "$disconnect" => RouteKey::Disconnect,
            other => RouteKey::Message(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub route_key: String,
    pub connection_id: String,
}

/// A WebSocket lifecycle event in the shape API Gateway delivers it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    pub request_context: RequestContext,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
}

impl GatewayRequest {
    pub fn route(&self) -> RouteKey {
        RouteKey::parse(&self.request_context.route_key)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|q| q.get(name))
            .map(String::as_str)
    }
}

/// Structured result handed back to the gateway for every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl GatewayResponse {
    pub fn ok() -> Self {
        Self {
            status_code: 200,
            body: None,
        }
    }

    pub fn error(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: Some(body.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
