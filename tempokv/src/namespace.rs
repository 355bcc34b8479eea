//! Namespace : région de clés isolée dans le store

use crate::store::Mode;
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const UPSERT: &str = "INSERT OR REPLACE INTO entries (namespace, key, value) VALUES (?1, ?2, ?3)";

#[derive(Debug)]
struct NamespaceInner {
    id: String,
    mode: Mode,
    path: PathBuf,
    conn: Mutex<Connection>,
    // Connexion dédiée aux lectures (multi-processus uniquement)
    reader: Option<Mutex<Connection>>,
}

/// Handle on one namespace of a [`Store`](crate::Store)
///
/// Cloning is cheap; every clone shares the same connections. Each key write is
/// atomic, and [`Namespace::write_batch`] commits several keys together.
///
/// A multi-process namespace reads through its own read-only connection, so a
/// read never waits for a write of the same handle to finish; it sees the last
/// committed value.
#[derive(Debug, Clone)]
pub struct Namespace {
    inner: Arc<NamespaceInner>,
}

impl Namespace {
    pub(crate) fn new(
        id: String,
        mode: Mode,
        path: PathBuf,
        conn: Connection,
        reader: Option<Connection>,
    ) -> Self {
        Self {
            inner: Arc::new(NamespaceInner {
                id,
                mode,
                path,
                conn: Mutex::new(conn),
                reader: reader.map(Mutex::new),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Decodes `key`, falling back to `default` when the key is absent or
    /// cannot be read back as `T`
    pub fn decode<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let bytes = match self.get_raw(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return default,
            Err(e) => {
                tracing::warn!(namespace = %self.inner.id, key, error = %e, "Failed to read key, using default");
                return default;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(namespace = %self.inner.id, key, error = %e, "Failed to decode key, using default");
                default
            }
        }
    }

    /// Same as [`Namespace::decode`] with `T::default()` as fallback
    pub fn decode_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.decode(key, T::default())
    }

    /// Encodes `value` under `key`, replacing any previous value
    pub fn encode<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = to_bytes(key, value)?;
        let conn = self.lock();
        conn.execute(UPSERT, params![self.inner.id, key, bytes])?;
        Ok(())
    }

    /// Commits every value encoded by `build` in one transaction, in call order
    ///
    /// Nothing is written if `build` fails.
    pub fn write_batch<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce(&mut WriteBatch) -> Result<()>,
    {
        let mut batch = WriteBatch::default();
        build(&mut batch)?;

        if batch.entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT)?;
            for (key, bytes) in &batch.entries {
                stmt.execute(params![self.inner.id, key, bytes])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Returns true if `key` holds a value
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.get_raw(key), Ok(Some(_)))
    }

    /// Deletes `key` (no-op if absent)
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "DELETE FROM entries WHERE namespace = ?1 AND key = ?2",
            params![self.inner.id, key],
        )?;
        Ok(())
    }

    /// Lists the keys stored in this namespace, sorted
    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = self.lock_reader();
        let mut stmt =
            conn.prepare("SELECT key FROM entries WHERE namespace = ?1 ORDER BY key ASC")?;
        let rows = stmt.query_map(params![self.inner.id], |row| row.get(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.lock_reader();
        let value = conn
            .query_row(
                "SELECT value FROM entries WHERE namespace = ?1 AND key = ?2",
                params![self.inner.id, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.inner
            .conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_reader(&self) -> MutexGuard<'_, Connection> {
        match &self.inner.reader {
            Some(reader) => reader.lock().unwrap_or_else(PoisonError::into_inner),
            None => self.lock(),
        }
    }
}

/// Values staged by [`Namespace::write_batch`]
#[derive(Debug, Default)]
pub struct WriteBatch {
    entries: Vec<(String, Vec<u8>)>,
}

impl WriteBatch {
    pub fn encode<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let bytes = to_bytes(key, value)?;
        self.entries.push((key.to_string(), bytes));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn to_bytes<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|source| Error::Encode {
        key: key.to_string(),
        source,
    })
}
