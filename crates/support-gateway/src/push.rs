use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, Url};

use crate::error::PushError;

/// Delivers a payload to one open connection.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// `PushError::Stale` means the socket is already gone.
    async fn push(&self, connection_id: &str, payload: Bytes) -> Result<(), PushError>;
}

/// Pushes through a connection-management HTTP API:
/// `POST {endpoint}/@connections/{connection_id}` with the raw payload.
/// `410 Gone` marks the connection stale.
#[derive(Clone)]
pub struct HttpPushTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpPushTransport {
    /// Accepts the public socket URL too; `wss://` / `ws://` are rewritten to
    /// `https://` / `http://`.
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = if let Some(rest) = endpoint.strip_prefix("wss://") {
            format!("https://{}", rest)
        } else if let Some(rest) = endpoint.strip_prefix("ws://") {
            format!("http://{}", rest)
        } else {
            endpoint.to_string()
        };
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))?;
        if endpoint.cannot_be_a_base() {
            return Err(anyhow!("push endpoint {} cannot carry a path", endpoint));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn connection_url(&self, connection_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("@connections").push(connection_id);
        }
        url
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    async fn push(&self, connection_id: &str, payload: Bytes) -> Result<(), PushError> {
        let response = self
            .client
            .post(self.connection_url(connection_id))
            .body(payload)
            .send()
            .await
            .map_err(|e| PushError::Delivery {
                connection_id: connection_id.to_string(),
                reason: e.to_string(),
            })?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::GONE => Err(PushError::Stale(connection_id.to_string())),
            s => Err(PushError::Delivery {
                connection_id: connection_id.to_string(),
                reason: format!("management API returned {}", s),
            }),
        }
    }
}
