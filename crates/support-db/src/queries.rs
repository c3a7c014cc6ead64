use crate::models::{ConnectionRow, MessageRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, Row};

impl Database {
    // -- Connection directory --

    /// Insert or replace the directory entry for `connection_id`.
    pub fn put_connection(&self, connection_id: &str, user_email: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO connections (connection_id, user_email) VALUES (?1, ?2)
                 ON CONFLICT(connection_id) DO UPDATE SET user_email = excluded.user_email",
                (connection_id, user_email),
            )?;
            Ok(())
        })
    }

    /// Returns the number of rows removed (0 when the key was unknown).
    pub fn delete_connection(&self, connection_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM connections WHERE connection_id = ?1",
                [connection_id],
            )?;
            Ok(n)
        })
    }

    pub fn get_connections_by_id(&self, connection_id: &str) -> Result<Vec<ConnectionRow>> {
        self.with_conn(|conn| {
            query_connections(
                conn,
                "SELECT connection_id, user_email FROM connections WHERE connection_id = ?1",
                connection_id,
            )
        })
    }

    /// Full-table filter on the owner column (no index on `user_email`).
    pub fn scan_connections_by_user(&self, user_email: &str) -> Result<Vec<ConnectionRow>> {
        self.with_conn(|conn| {
            query_connections(
                conn,
                "SELECT connection_id, user_email FROM connections WHERE user_email = ?1
                 ORDER BY connected_at, connection_id",
                user_email,
            )
        })
    }

    // -- Messages --

    pub fn insert_message(&self, row: &MessageRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, body, user_email, author_email, author_role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    row.id,
                    row.body,
                    row.user_email,
                    row.author_email,
                    row.author_role,
                    row.created_at
                ],
            )?;
            Ok(())
        })
    }

    /// All messages of one user's support thread, oldest first.
    pub fn get_messages_for_user(&self, user_email: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, body, user_email, author_email, author_role, created_at
                 FROM messages
                 WHERE user_email = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([user_email], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Distinct thread owners that have at least one message.
    pub fn get_user_emails_with_messages(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT user_email FROM messages ORDER BY user_email")?;
            let emails = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(emails)
        })
    }
}

fn query_connections(conn: &Connection, sql: &str, key: &str) -> Result<Vec<ConnectionRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([key], |row| {
            Ok(ConnectionRow {
                connection_id: row.get(0)?,
                user_email: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        body: row.get(1)?,
        user_email: row.get(2)?,
        author_email: row.get(3)?,
        author_role: row.get(4)?,
        created_at: row.get(5)?,
    })
}
