use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use tracing::warn;
use uuid::Uuid;

use support_db::Database;
use support_db::models::MessageRow;
use support_types::api::Role;
use support_types::models::{ChatMessage, NewChatMessage};

use crate::blocking;

/// Append-only log of support-chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: NewChatMessage) -> Result<ChatMessage>;

    /// One user's thread, oldest first.
    async fn list_for_user(&self, identity: &str) -> Result<Vec<ChatMessage>>;

    /// Distinct thread owners, sorted.
    async fn user_identities(&self) -> Result<Vec<String>>;
}

fn stamp(message: NewChatMessage) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4(),
        body: message.body,
        sender_identity: message.sender_identity,
        author_identity: message.author_identity,
        author_role: message.author_role,
        // Microseconds is what the database column keeps
        created_at: Utc::now().trunc_subsecs(6),
    }
}

pub struct SqliteMessageStore {
    db: Arc<Database>,
}

impl SqliteMessageStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn insert(&self, message: NewChatMessage) -> Result<ChatMessage> {
        let message = stamp(message);
        let row = MessageRow {
            id: message.id.to_string(),
            body: message.body.clone(),
            user_email: message.sender_identity.clone(),
            author_email: message.author_identity.clone(),
            author_role: message.author_role.map(|r| r.as_str().to_string()),
            // Fixed-width UTC so the text column sorts chronologically
            created_at: message.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        };
        blocking(&self.db, move |db| db.insert_message(&row)).await?;
        Ok(message)
    }

    async fn list_for_user(&self, identity: &str) -> Result<Vec<ChatMessage>> {
        let identity = identity.to_string();
        let rows = blocking(&self.db, move |db| db.get_messages_for_user(&identity)).await?;
        Ok(rows.into_iter().map(message_from_row).collect())
    }

    async fn user_identities(&self) -> Result<Vec<String>> {
        blocking(&self.db, |db| db.get_user_emails_with_messages()).await
    }
}

fn message_from_row(row: MessageRow) -> ChatMessage {
    ChatMessage {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt message id '{}': {}", row.id, e);
            Uuid::default()
        }),
        created_at: row
            .created_at
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|e| {
                warn!("Corrupt created_at '{}' on message '{}': {}", row.created_at, row.id, e);
                DateTime::default()
            }),
        body: row.body,
        sender_identity: row.user_email,
        author_identity: row.author_email,
        author_role: row.author_role.as_deref().map(Role::parse),
    }
}

/// In-process store for tests and throwaway deployments.
#[derive(Default)]
pub struct MemoryMessageStore {
    messages: Mutex<Vec<ChatMessage>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert(&self, message: NewChatMessage) -> Result<ChatMessage> {
        let message = stamp(message);
        self.messages
            .lock()
            .map_err(|e| anyhow!("message store lock poisoned: {}", e))?
            .push(message.clone());
        Ok(message)
    }

    async fn list_for_user(&self, identity: &str) -> Result<Vec<ChatMessage>> {
        let messages = self
            .messages
            .lock()
            .map_err(|e| anyhow!("message store lock poisoned: {}", e))?;
        Ok(messages
            .iter()
            .filter(|m| m.sender_identity == identity)
            .cloned()
            .collect())
    }

    async fn user_identities(&self) -> Result<Vec<String>> {
        let messages = self
            .messages
            .lock()
            .map_err(|e| anyhow!("message store lock poisoned: {}", e))?;
        let mut identities: Vec<String> =
            messages.iter().map(|m| m.sender_identity.clone()).collect();
        identities.sort();
        identities.dedup();
        Ok(identities)
    }
}
