pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle over a single SQLite connection holding the complaint store.
/// Handlers share it behind an Arc and funnel every statement through
/// [`Database::with_conn`]; there is no other global state.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the store at `path` and bring its schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;

        // WAL keeps readers unblocked during writes; the busy timeout makes
        // writers queue on a locked database instead of failing fast.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&conn)?;

        info!("Complaint store ready at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("connection lock poisoned: {}", e))?;
        f(&conn)
    }
}

/// True when `err` wraps a SQLite UNIQUE/constraint failure, so callers can
/// turn a lost registration race into the same duplicate-email answer as the
/// pre-insert check.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reopen_preserves_rows() {
        let path = std::env::temp_dir().join(format!("gunaso-test-{}.db", uuid::Uuid::new_v4()));

        {
            let db = Database::open(&path).unwrap();
            db.create_user("u1", "Asha", "asha@example.com", "hash", "citizen", None)
                .unwrap();
        }

        // Second open re-runs the idempotent migrations against live data.
        let db = Database::open(&path).unwrap();
        assert!(db.get_user_by_email("asha@example.com").unwrap().is_some());

        drop(db);
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[test]
    fn unique_violation_is_detected() {
        let db = Database::open(":memory:").unwrap();
        db.create_user("u1", "Asha", "asha@example.com", "h1", "citizen", None)
            .unwrap();

        let err = db
            .create_user("u2", "Bina", "asha@example.com", "h2", "citizen", None)
            .unwrap_err();
        assert!(is_unique_violation(&err));

        assert!(!is_unique_violation(&anyhow::anyhow!("not a sqlite error")));
    }
}
