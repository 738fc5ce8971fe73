//! membank-storage: embedded graph store for the membank service.
//!
//! Uses rusqlite with bundled SQLite, WAL mode, and an embedded schema.
//! Nodes are labeled property rows (per-label attributes as JSON); edges are
//! typed rows with MERGE semantics via the `(src, relationship, dst)`
//! primary key. Deleting a node cascades its incident edges.

use membank_core::MemBankError;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

mod catalog;
mod nodes;
mod registry;

pub mod gateways;

pub use nodes::NodeRow;
pub use registry::ClientRegistry;

const SCHEMA: &str = include_str!("schema.sql");

/// One embedded graph database handle.
///
/// Wraps `rusqlite::Connection` in a `Mutex`: SQLite does not support
/// concurrent writers on a single handle, so all statements on this client
/// are linearised in lock-acquisition order.
pub struct StoreClient {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl StoreClient {
    /// Get a lock on the underlying connection.
    pub(crate) fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("StoreClient mutex poisoned")
    }

    /// Open (or create) the database directory and install the schema.
    ///
    /// `db_dir` is the engine-owned directory under a project root
    /// (`{projectRoot}/{dbFilename}`); the store file lives inside it.
    pub fn open(db_dir: &Path) -> Result<Self, MemBankError> {
        std::fs::create_dir_all(db_dir)?;
        let db_file = db_dir.join("store.db");
        let conn = Connection::open(&db_file).map_err(|e| MemBankError::Engine(e.to_string()))?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        // Foreign keys ON (edge cascade on node delete)
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        // NORMAL sync (good balance of safety vs speed)
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        // 5s busy timeout
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| MemBankError::Engine(e.to_string()))?;

        // Schema installer: idempotent CREATE IF NOT EXISTS batch
        conn.execute_batch(SCHEMA)
            .map_err(|e| MemBankError::Engine(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(db_dir.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, MemBankError> {
        let conn =
            Connection::open_in_memory().map_err(|e| MemBankError::Engine(e.to_string()))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// The engine-owned database directory, if this client is on disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Compute the SHA-256 hash of file content.
    pub fn content_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
