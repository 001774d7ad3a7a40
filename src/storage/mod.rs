//! Persistence layer.
//!
//! SQLite storage for senders, attempts, reading patterns, and post-attempt
//! samples. The [`Database`] handle is the only shared mutable resource in
//! the engine; it is passed explicitly to the services that need it.

mod database;
pub mod queries;
pub mod schema;

pub use database::{Database, DatabaseError, Result};

use std::path::PathBuf;

/// Default on-disk database location under the platform data directory.
pub fn default_db_path() -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "mailsweep", "mailsweep")?;
    Some(dirs.data_dir().join("mailsweep.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_db_path_ends_with_db_file() {
        if let Some(path) = default_db_path() {
            assert!(path.ends_with("mailsweep.db"));
        }
    }
}
