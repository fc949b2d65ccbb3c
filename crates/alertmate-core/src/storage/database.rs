//! SQLite-backed persistence.
//!
//! Provides:
//! - Namespaced key-value records (contacts, last location fix)
//! - Dispatch log of every alert that reached the SMS layer

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations};
use crate::error::{DatabaseError, Result};
use crate::sms::{ContactFailure, DispatchReport};
use crate::trigger::TriggerSource;

/// One row of the dispatch log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub id: i64,
    pub source: TriggerSource,
    pub message: String,
    pub delivered: Vec<String>,
    pub failed: Vec<ContactFailure>,
    pub sent_at: DateTime<Utc>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/alertmate.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("alertmate.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM kv WHERE namespace = ?1 AND key = ?2")?;
        let result = stmt.query_row(params![namespace, key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (namespace, key, value) VALUES (?1, ?2, ?3)",
            params![namespace, key, value],
        )?;
        Ok(())
    }

    /// Remove a key. Returns whether a row existed.
    pub fn kv_remove(&self, namespace: &str, key: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
            params![namespace, key],
        )?;
        Ok(removed > 0)
    }

    // ── Dispatch log ─────────────────────────────────────────────────

    pub fn record_dispatch(&self, report: &DispatchReport, sent_at: DateTime<Utc>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO dispatch_log (source, message, delivered, failed, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                report.source.as_str(),
                report.message,
                serde_json::to_string(&report.delivered)?,
                serde_json::to_string(&report.failed)?,
                sent_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Newest first.
    pub fn recent_dispatches(&self, limit: usize) -> Result<Vec<DispatchRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source, message, delivered, failed, sent_at
             FROM dispatch_log
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, source, message, delivered, failed, sent_at) = row?;
            let source = source
                .parse::<TriggerSource>()
                .map_err(DatabaseError::QueryFailed)?;
            let sent_at = DateTime::parse_from_rfc3339(&sent_at)
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
                .with_timezone(&Utc);
            records.push(DispatchRecord {
                id,
                source,
                message,
                delivered: serde_json::from_str(&delivered)?,
                failed: serde_json::from_str(&failed)?,
                sent_at,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("ns", "test").unwrap().is_none());
        db.kv_set("ns", "test", "hello").unwrap();
        assert_eq!(db.kv_get("ns", "test").unwrap().unwrap(), "hello");
        assert!(db.kv_get("other", "test").unwrap().is_none());
        assert!(db.kv_remove("ns", "test").unwrap());
        assert!(!db.kv_remove("ns", "test").unwrap());
    }

    #[test]
    fn dispatch_log_newest_first() {
        let db = Database::open_memory().unwrap();
        let first = DispatchReport {
            source: TriggerSource::Shake,
            message: "one".into(),
            delivered: vec!["+1".into()],
            failed: vec![],
        };
        let second = DispatchReport {
            source: TriggerSource::TimerExpiry,
            message: "two".into(),
            delivered: vec![],
            failed: vec![ContactFailure {
                contact: "+2".into(),
                reason: "radio off".into(),
            }],
        };
        db.record_dispatch(&first, Utc::now()).unwrap();
        db.record_dispatch(&second, Utc::now()).unwrap();

        let log = db.recent_dispatches(10).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].source, TriggerSource::TimerExpiry);
        assert_eq!(log[0].failed[0].contact, "+2");
        assert_eq!(log[1].delivered, vec!["+1".to_string()]);

        assert_eq!(db.recent_dispatches(1).unwrap().len(), 1);
    }
}
