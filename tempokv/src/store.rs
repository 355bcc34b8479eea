//! Store : racine de stockage et ouverture des namespaces

use crate::namespace::Namespace;
use crate::{Error, Result};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const FILE_SUFFIX: &str = ".kv.sqlite";

/// Access mode of a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Only the owning process ever opens the namespace.
    SingleProcess,
    /// Several processes may open the namespace; readers never block the writer.
    MultiProcess,
}

/// Storage root shared by every namespace of a service
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
    busy_timeout: Duration,
}

impl Store {
    /// Default time a multi-process namespace waits on a foreign lock
    pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(2000);

    /// Creates a store rooted at `root` (created on first open)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            busy_timeout: Self::DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Overrides the busy timeout used by multi-process namespaces
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    /// Path of the file backing `namespace_id`
    pub fn namespace_path(&self, namespace_id: &str) -> PathBuf {
        self.root
            .join(format!("{}{}", sanitize(namespace_id), FILE_SUFFIX))
    }

    /// Opens (or creates) a namespace
    ///
    /// The id must be stable across restarts: it is the only link between a
    /// relaunched process and the data written by its previous incarnation.
    pub fn open(&self, namespace_id: &str, mode: Mode) -> Result<Namespace> {
        if namespace_id.trim().is_empty() {
            return Err(Error::InvalidNamespace(namespace_id.to_string()));
        }

        fs::create_dir_all(&self.root)?;

        let path = self.namespace_path(namespace_id);
        let conn = Connection::open(&path)?;

        if mode == Mode::MultiProcess {
            conn.busy_timeout(self.busy_timeout)?;
            let journal: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
            if !journal.eq_ignore_ascii_case("wal") {
                tracing::warn!(
                    namespace = namespace_id,
                    journal = %journal,
                    "WAL journal not available, concurrent readers may block"
                );
            }
            conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
        }

        conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value BLOB NOT NULL,
                PRIMARY KEY (namespace, key)
            )",
            [],
        )?;

        let reader = match mode {
            Mode::MultiProcess => Some(self.open_reader(&path)?),
            Mode::SingleProcess => None,
        };

        tracing::info!(
            namespace = namespace_id,
            path = %path.display(),
            ?mode,
            "Opened storage namespace"
        );

        Ok(Namespace::new(
            namespace_id.to_string(),
            mode,
            path,
            conn,
            reader,
        ))
    }

    fn open_reader(&self, path: &Path) -> Result<Connection> {
        let reader = Connection::open(path)?;
        reader.busy_timeout(self.busy_timeout)?;
        reader.execute_batch("PRAGMA query_only=ON;")?;
        Ok(reader)
    }
}

/// Maps a namespace id to a portable file stem
///
/// Distinct ids may share a stem (`a::b` and `a__b`); rows stay separated
/// because every row is keyed by the raw id.
fn sanitize(namespace_id: &str) -> String {
    namespace_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
