use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{RwLock, mpsc};

use crate::error::PushError;
use crate::push::PushTransport;

/// Tracks the sockets held open by this process and pushes to them.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// Per-connection outbound channels: connection_id -> sender
    sockets: RwLock<HashMap<String, mpsc::UnboundedSender<Bytes>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live socket. Returns the receiver its writer task drains.
    pub async fn register(&self, connection_id: &str) -> mpsc::UnboundedReceiver<Bytes> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .sockets
            .write()
            .await
            .insert(connection_id.to_string(), tx);
        rx
    }

    pub async fn unregister(&self, connection_id: &str) {
        self.inner.sockets.write().await.remove(connection_id);
    }

    pub async fn is_connected(&self, connection_id: &str) -> bool {
        self.inner.sockets.read().await.contains_key(connection_id)
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.sockets.read().await.len()
    }
}

#[async_trait]
impl PushTransport for Dispatcher {
    async fn push(&self, connection_id: &str, payload: Bytes) -> Result<(), PushError> {
        let sockets = self.inner.sockets.read().await;
        let tx = sockets
            .get(connection_id)
            .ok_or_else(|| PushError::Stale(connection_id.to_string()))?;

        // A closed receiver means the writer task already exited
        tx.send(payload)
            .map_err(|_| PushError::Stale(connection_id.to_string()))
    }
}
