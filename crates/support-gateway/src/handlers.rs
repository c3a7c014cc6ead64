use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use support_types::api::{Claims, SocketMessage};
use support_types::models::{ChatMessage, ConnectionRecord, NewChatMessage};

use crate::auth::{decode_unverified, validate_token};
use crate::directory::ConnectionDirectory;
use crate::error::{PushError, RelayError};
use crate::push::PushTransport;
use crate::store::MessageStore;

/// The three socket lifecycle handlers with their collaborators injected.
///
/// Holds no per-connection state of its own; all coordination goes through
/// the directory's single-key operations.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    directory: Arc<dyn ConnectionDirectory>,
    store: Arc<dyn MessageStore>,
    transport: Arc<dyn PushTransport>,
    jwt_secret: String,
}

/// Outcome of one fan-out. Only `message` is durable.
#[derive(Debug, Clone)]
pub struct FanOut {
    pub message: ChatMessage,
    pub attempted: usize,
    pub delivered: usize,
    pub stale: usize,
    pub failed: usize,
}

impl Relay {
    pub fn new(
        directory: Arc<dyn ConnectionDirectory>,
        store: Arc<dyn MessageStore>,
        transport: Arc<dyn PushTransport>,
        jwt_secret: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                directory,
                store,
                transport,
                jwt_secret: jwt_secret.into(),
            }),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner.jwt_secret
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.inner.store
    }

    /// Authorize a connect request and record the connection.
    ///
    /// Support agents may open a socket on any user's thread, registered
    /// users only on their own.
    pub async fn connect(
        &self,
        connection_id: &str,
        token: Option<&str>,
        user_email: Option<&str>,
    ) -> Result<ConnectionRecord, RelayError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RelayError::Unauthorized("missing token".into()))?;
        let claims = validate_token(token, &self.inner.jwt_secret)
            .map_err(|e| RelayError::Unauthorized(format!("invalid token: {}", e)))?;

        // An absent target only passes for roles that may open any thread
        let owner = user_email.unwrap_or_default();

        if !claims.may_access_thread(owner) {
            warn!(
                "{} ({}) refused connect to thread of {}",
                claims.email,
                claims.role.as_str(),
                owner
            );
            return Err(RelayError::Unauthorized("unauthorized role".into()));
        }

        let record = ConnectionRecord::new(connection_id, owner);
        self.inner
            .directory
            .put(record.clone())
            .await
            .map_err(RelayError::TransportSession)?;

        info!(
            "{} ({}) connected as {} on thread of {}",
            claims.email,
            claims.role.as_str(),
            connection_id,
            owner
        );
        Ok(record)
    }

    /// Forget a connection. Unknown ids succeed.
    pub async fn disconnect(&self, connection_id: &str) -> Result<(), RelayError> {
        self.inner
            .directory
            .delete(connection_id)
            .await
            .map_err(RelayError::TransportSession)?;

        info!("{} disconnected", connection_id);
        Ok(())
    }

    /// Persist an inbound chat frame and fan it out to every live
    /// connection of the thread owner, the sending socket included.
    ///
    /// Delivery is best-effort: a failed push is logged and skipped, and the
    /// stale directory entry is left in place.
    pub async fn relay_message(&self, connection_id: &str, body: &str) -> Result<FanOut, RelayError> {
        let socket_message: SocketMessage = serde_json::from_str(body)
            .map_err(|e| RelayError::MalformedMessage(e.to_string()))?;

        // Unverified on purpose: these claims only annotate the message
        let author: Option<Claims> = match decode_unverified(&socket_message.token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!("{} sent a message without readable claims: {}", connection_id, e);
                None
            }
        };

        let connection = self.resolve_sender(connection_id).await?;

        let message = self
            .inner
            .store
            .insert(NewChatMessage {
                body: socket_message.message,
                sender_identity: connection.owner_identity.clone(),
                author_identity: author.as_ref().map(|c| c.email.clone()),
                author_role: author.as_ref().map(|c| c.role),
            })
            .await
            .map_err(RelayError::Persistence)?;

        let payload = Bytes::from(
            serde_json::to_vec(&message)
                .map_err(|e| RelayError::Persistence(anyhow::anyhow!("encode message: {}", e)))?,
        );

        let recipients = self
            .inner
            .directory
            .scan_by_owner(&connection.owner_identity)
            .await
            .map_err(RelayError::TransportSession)?;

        let mut fan_out = FanOut {
            message,
            attempted: 0,
            delivered: 0,
            stale: 0,
            failed: 0,
        };

        for recipient in &recipients {
            fan_out.attempted += 1;
            match self
                .inner
                .transport
                .push(&recipient.connection_id, payload.clone())
                .await
            {
                Ok(()) => fan_out.delivered += 1,
                Err(e @ PushError::Stale(_)) => {
                    fan_out.stale += 1;
                    warn!("Skipping recipient: {}", e);
                }
                Err(e @ PushError::Delivery { .. }) => {
                    fan_out.failed += 1;
                    warn!("Skipping recipient: {}", e);
                }
            }
        }

        info!(
            "Message {} on thread of {} from {}: {}/{} delivered ({} stale, {} failed)",
            fan_out.message.id,
            connection.owner_identity,
            connection_id,
            fan_out.delivered,
            fan_out.attempted,
            fan_out.stale,
            fan_out.failed
        );
        Ok(fan_out)
    }

    async fn resolve_sender(&self, connection_id: &str) -> Result<ConnectionRecord, RelayError> {
        let mut found = self
            .inner
            .directory
            .get_by_key(connection_id)
            .await
            .map_err(RelayError::TransportSession)?;

        match found.len() {
            0 => Err(RelayError::ConnectionNotFound(connection_id.to_string())),
            1 => Ok(found.remove(0)),
            _ => Err(RelayError::DuplicateConnection(connection_id.to_string())),
        }
    }
}
