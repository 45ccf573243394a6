mod schema;
pub mod passages;
pub mod profiles;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

pub use passages::BookPassage;
pub use profiles::DimensionalProfile;
pub use schema::{MIGRATIONS, SCHEMA};

/// Handle to the critique store (profiles + passages).
///
/// Profiles are written once per (advisor, image) and treated as immutable
/// afterwards, so concurrent readers never need coordination beyond
/// SQLite's own transactional isolation.
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// In-memory database, for tests and ephemeral runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }
}
