//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex for thread-safe access.
//! Configures WAL mode and recommended PRAGMAs on initialization. File-backed
//! databases are shared per path through a process-wide registry so the same
//! store is never opened twice.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use rusqlite::Connection;
use tracing::{debug, info};

use incident_core::error::IncidentError;

use crate::migrations;

type Registry = Mutex<HashMap<PathBuf, Weak<Database>>>;

static OPEN_DATABASES: OnceLock<Registry> = OnceLock::new();

/// Thread-safe SQLite database wrapper.
///
/// The connection is wrapped in a Mutex since rusqlite Connection is not Sync.
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) a database at the given path.
    ///
    /// Configures WAL mode, synchronous=NORMAL and runs all pending migrations.
    /// Prefer [`Database::open_shared`] outside of tests.
    pub fn new(path: &Path) -> Result<Self, IncidentError> {
        // Ensure parent directory exists.
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| IncidentError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| IncidentError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };

        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, IncidentError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| IncidentError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
            path: None,
        };

        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Return the process-wide handle for the database at `path`, opening it
    /// on first use.
    ///
    /// The registry lock is held while opening, so concurrent callers asking
    /// for the same file get the same handle. Once every handle is dropped the
    /// next call opens the file again.
    pub fn open_shared(path: &Path) -> Result<Arc<Self>, IncidentError> {
        let key = registry_key(path)?;
        let registry = OPEN_DATABASES.get_or_init(|| Mutex::new(HashMap::new()));
        let mut open = registry
            .lock()
            .map_err(|e| IncidentError::Storage(format!("Database registry poisoned: {}", e)))?;

        if let Some(db) = open.get(&key).and_then(Weak::upgrade) {
            debug!(path = %key.display(), "Reusing open database handle");
            return Ok(db);
        }

        let db = Arc::new(Self::new(&key)?);
        open.retain(|_, handle| handle.strong_count() > 0);
        open.insert(key, Arc::downgrade(&db));
        Ok(db)
    }

    /// File backing this database, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// This is the primary way to interact with the database. The mutex
    /// is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, IncidentError>
    where
        F: FnOnce(&Connection) -> Result<T, IncidentError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| IncidentError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

/// Canonical registry key for `path`. The file itself may not exist yet, so
/// only the parent directory is canonicalized.
fn registry_key(path: &Path) -> Result<PathBuf, IncidentError> {
    let file_name = path.file_name().ok_or_else(|| {
        IncidentError::Config(format!("Database path has no file name: {}", path.display()))
    })?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;
    Ok(parent.canonicalize()?.join(file_name))
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}
