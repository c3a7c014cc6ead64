//! Fakes shared by the unit tests in this crate.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use jsonwebtoken::{EncodingKey, Header, encode};

use support_types::api::{Claims, Role};
use support_types::models::{ChatMessage, NewChatMessage};

use crate::error::PushError;
use crate::push::PushTransport;
use crate::store::MessageStore;

pub fn token(email: &str, role: Role, secret: &str) -> String {
    sign(email, role, secret, chrono::Utc::now() + chrono::Duration::hours(1))
}

pub fn expired_token(email: &str, role: Role, secret: &str) -> String {
    sign(email, role, secret, chrono::Utc::now() - chrono::Duration::hours(1))
}

fn sign(email: &str, role: Role, secret: &str, exp: chrono::DateTime<chrono::Utc>) -> String {
    let claims = Claims {
        email: email.to_string(),
        role,
        exp: exp.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// Records every push. Ids listed as stale fail with `Stale`, ids listed as
/// failing fail with `Delivery`.
#[derive(Default)]
pub struct RecordingTransport {
    stale: HashSet<String>,
    failing: HashSet<String>,
    pub attempts: Mutex<Vec<(String, Bytes)>>,
}

impl RecordingTransport {
    pub fn with_stale(ids: &[&str]) -> Self {
        Self {
            stale: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_failing(mut self, ids: &[&str]) -> Self {
        self.failing = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn attempted_ids(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn push(&self, connection_id: &str, payload: Bytes) -> Result<(), PushError> {
        self.attempts
            .lock()
            .unwrap()
            .push((connection_id.to_string(), payload));
        if self.stale.contains(connection_id) {
            return Err(PushError::Stale(connection_id.to_string()));
        }
        if self.failing.contains(connection_id) {
            return Err(PushError::Delivery {
                connection_id: connection_id.to_string(),
                reason: "management API returned 500 Internal Server Error".into(),
            });
        }
        Ok(())
    }
}

/// A message store whose inserts always fail.
pub struct FailingStore;

#[async_trait]
impl MessageStore for FailingStore {
    async fn insert(&self, _message: NewChatMessage) -> Result<ChatMessage> {
        Err(anyhow!("relation \"messages\" does not exist"))
    }

    async fn list_for_user(&self, _identity: &str) -> Result<Vec<ChatMessage>> {
        Ok(vec![])
    }

    async fn user_identities(&self) -> Result<Vec<String>> {
        Ok(vec![])
    }
}
