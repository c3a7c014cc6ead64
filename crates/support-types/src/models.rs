use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::Role;

/// One live socket in the connection directory.
///
/// Keyed by `connection_id`. Several records may share an owner (one per
/// tab or device).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    #[serde(rename = "userEmail")]
    pub owner_identity: String,
}

impl ConnectionRecord {
    pub fn new(connection_id: impl Into<String>, owner_identity: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            owner_identity: owner_identity.into(),
        }
    }
}

/// A persisted support-chat message. This is also the push payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub body: String,
    /// Owner of the thread the message was posted into.
    pub sender_identity: String,
    /// Email from the (unverified) token of whoever typed the message.
    pub author_identity: Option<String>,
    pub author_role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

/// Insert request for the message store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub body: String,
    pub sender_identity: String,
    pub author_identity: Option<String>,
    pub author_role: Option<Role>,
}
