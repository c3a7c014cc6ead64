pub mod auth;
pub mod connection;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod push;
pub mod router;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use anyhow::anyhow;
use support_db::Database;

/// Run a blocking database call off the async runtime.
pub(crate) async fn blocking<T, F>(db: &Arc<Database>, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&*db))
        .await
        .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?
}
