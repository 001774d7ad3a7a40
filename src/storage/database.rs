//! Database connection handle and initialization.
//!
//! Wraps rusqlite for use from async code: the connection lives behind a
//! mutex and every operation runs via `spawn_blocking` so the runtime is
//! never blocked on SQLite.

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use thiserror::Error;
use tokio::sync::Mutex;

use super::schema;

/// Errors that can occur during database operations.
///
/// Any of these is fatal for the current run: attempt history must never be
/// dropped silently.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("blocking task failed: {0}")]
    Join(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Thread-safe database connection wrapper.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// Runs migrations to ensure the schema is up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = Connection::open(&path)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            Ok(conn)
        })
        .await
        .map_err(|e| DatabaseError::Join(e.to_string()))??;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations().await?;

        Ok(db)
    }

    /// Opens an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = tokio::task::spawn_blocking(|| -> Result<Connection> {
            let conn = Connection::open_in_memory()?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(conn)
        })
        .await
        .map_err(|e| DatabaseError::Join(e.to_string()))??;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations().await?;

        Ok(db)
    }

    /// Runs all schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn.blocking_lock();

            for migration in schema::all_migrations() {
                conn.execute_batch(migration)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Join(e.to_string()))?
    }

    /// Executes a function with access to the database connection.
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|e| DatabaseError::Join(e.to_string()))?
    }

    /// Executes a transaction with the given function.
    ///
    /// The transaction is committed on success or rolled back on error.
    /// Attempt records go through here so a crash can never leave a
    /// half-written row.
    pub async fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            let result = f(&tx)?;
            tx.commit()?;
            Ok(result)
        })
        .await
        .map_err(|e| DatabaseError::Join(e.to_string()))?
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_creates_schema() {
        let db = Database::open_in_memory().await.unwrap();

        let tables: Vec<String> = db
            .with_conn(|conn| {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
            })
            .await
            .unwrap();

        assert!(tables.contains(&"senders".to_string()));
        assert!(tables.contains(&"unsubscribe_attempts".to_string()));
        assert!(tables.contains(&"reading_patterns".to_string()));
        assert!(tables.contains(&"post_attempt_samples".to_string()));
    }

    #[tokio::test]
    async fn open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.db");

        {
            let db = Database::open(&path).await.unwrap();
            db.transaction(|tx| {
                tx.execute(
                    "INSERT INTO senders (address, first_seen_at, created_at, updated_at)
                     VALUES (?1, ?2, ?2, ?2)",
                    rusqlite::params!["a@example.com", "2026-01-01T00:00:00Z"],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        }

        let db = Database::open(&path).await.unwrap();
        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM senders", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().await.unwrap();

        let result: Result<()> = db
            .transaction(|tx| {
                tx.execute(
                    "INSERT INTO senders (address, first_seen_at, created_at, updated_at)
                     VALUES (?1, ?2, ?2, ?2)",
                    rusqlite::params!["rollback@example.com", "2026-01-01T00:00:00Z"],
                )?;
                Err(DatabaseError::Migration("intentional error".to_string()))
            })
            .await;

        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM senders", [], |row| row.get(0))?)
            })
            .await
            .unwrap();

        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn unread_check_constraint_rejects_bad_counts() {
        let db = Database::open_in_memory().await.unwrap();

        let result = db
            .transaction(|tx| {
                tx.execute(
                    "INSERT INTO senders
                     (address, first_seen_at, lifetime_messages, unread_messages, created_at, updated_at)
                     VALUES (?1, ?2, 3, 5, ?2, ?2)",
                    rusqlite::params!["bad@example.com", "2026-01-01T00:00:00Z"],
                )?;
                Ok(())
            })
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn database_is_clone() {
        let db1 = Database::open_in_memory().await.unwrap();
        let db2 = db1.clone();

        db1.transaction(|tx| {
            tx.execute(
                "INSERT INTO senders (address, first_seen_at, created_at, updated_at)
                 VALUES (?1, ?2, ?2, ?2)",
                rusqlite::params!["clone@example.com", "2026-01-01T00:00:00Z"],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let count: i64 = db2
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM senders", [], |row| row.get(0))?)
            })
            .await
            .unwrap();

        assert_eq!(count, 1);
    }
}
