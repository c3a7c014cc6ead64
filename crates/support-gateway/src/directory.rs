use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use support_db::Database;
use support_types::models::ConnectionRecord;

use crate::blocking;

/// Keyed store of live connections: connection id -> owning user.
///
/// Single-key operations are atomic. `scan_by_owner` is a snapshot and may
/// miss or include connections that change while it runs.
#[async_trait]
pub trait ConnectionDirectory: Send + Sync {
    /// Insert or overwrite the record keyed by `record.connection_id`.
    async fn put(&self, record: ConnectionRecord) -> Result<()>;

    /// Remove a record. Unknown keys are not an error.
    async fn delete(&self, connection_id: &str) -> Result<()>;

    async fn get_by_key(&self, connection_id: &str) -> Result<Vec<ConnectionRecord>>;

    async fn scan_by_owner(&self, owner_identity: &str) -> Result<Vec<ConnectionRecord>>;
}

/// Process-local directory. Used by tests and single-node deployments.
#[derive(Default)]
pub struct MemoryDirectory {
    records: RwLock<HashMap<String, ConnectionRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn contains(&self, connection_id: &str) -> bool {
        self.records.read().await.contains_key(connection_id)
    }
}

#[async_trait]
impl ConnectionDirectory for MemoryDirectory {
    async fn put(&self, record: ConnectionRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.connection_id.clone(), record);
        Ok(())
    }

    async fn delete(&self, connection_id: &str) -> Result<()> {
        self.records.write().await.remove(connection_id);
        Ok(())
    }

    async fn get_by_key(&self, connection_id: &str) -> Result<Vec<ConnectionRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(connection_id)
            .cloned()
            .into_iter()
            .collect())
    }

    async fn scan_by_owner(&self, owner_identity: &str) -> Result<Vec<ConnectionRecord>> {
        let mut matches: Vec<ConnectionRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.owner_identity == owner_identity)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
        Ok(matches)
    }
}

/// Directory backed by the `connections` table of the service database.
pub struct SqliteDirectory {
    db: Arc<Database>,
}

impl SqliteDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConnectionDirectory for SqliteDirectory {
    async fn put(&self, record: ConnectionRecord) -> Result<()> {
        blocking(&self.db, move |db| {
            db.put_connection(&record.connection_id, &record.owner_identity)
        })
        .await
    }

    async fn delete(&self, connection_id: &str) -> Result<()> {
        let id = connection_id.to_string();
        blocking(&self.db, move |db| db.delete_connection(&id).map(|_| ())).await
    }

    async fn get_by_key(&self, connection_id: &str) -> Result<Vec<ConnectionRecord>> {
        let id = connection_id.to_string();
        let rows = blocking(&self.db, move |db| db.get_connections_by_id(&id)).await?;
        Ok(rows
            .into_iter()
            .map(|r| ConnectionRecord::new(r.connection_id, r.user_email))
            .collect())
    }

    async fn scan_by_owner(&self, owner_identity: &str) -> Result<Vec<ConnectionRecord>> {
        let owner = owner_identity.to_string();
        let rows = blocking(&self.db, move |db| db.scan_connections_by_user(&owner)).await?;
        Ok(rows
            .into_iter()
            .map(|r| ConnectionRecord::new(r.connection_id, r.user_email))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise(dir: &dyn ConnectionDirectory) {
        dir.put(ConnectionRecord::new("c1", "a@x.io")).await.unwrap();
        dir.put(ConnectionRecord::new("c2", "a@x.io")).await.unwrap();
        dir.put(ConnectionRecord::new("c3", "b@x.io")).await.unwrap();

        let found = dir.get_by_key("c1").await.unwrap();
        assert_eq!(found, vec![ConnectionRecord::new("c1", "a@x.io")]);
        assert!(dir.get_by_key("missing").await.unwrap().is_empty());

        let mut owned: Vec<String> = dir
            .scan_by_owner("a@x.io")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.connection_id)
            .collect();
        owned.sort();
        assert_eq!(owned, vec!["c1", "c2"]);

        // Upsert moves c2 to another owner
        dir.put(ConnectionRecord::new("c2", "b@x.io")).await.unwrap();
        assert_eq!(dir.scan_by_owner("a@x.io").await.unwrap().len(), 1);
        assert_eq!(dir.get_by_key("c2").await.unwrap().len(), 1);

        dir.delete("c1").await.unwrap();
        dir.delete("c1").await.unwrap();
        dir.delete("never-seen").await.unwrap();
        assert!(dir.get_by_key("c1").await.unwrap().is_empty());
        assert!(dir.scan_by_owner("a@x.io").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_directory_contract() {
        let dir = MemoryDirectory::new();
        exercise(&dir).await;
        assert_eq!(dir.len().await, 2);
    }

    #[tokio::test]
    async fn sqlite_directory_contract() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        exercise(&SqliteDirectory::new(db)).await;
    }
}
