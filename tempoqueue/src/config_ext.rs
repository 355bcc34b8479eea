//! Extension de tempoconfig pour la file de lecture

use crate::manager::DEFAULT_EVENT_CAPACITY;
use anyhow::Result;
use serde_yaml::{Number, Value};
use std::time::Duration;
use tempoconfig::Config;
use tempokv::Store;

/// Trait d'extension pour tempoconfig::Config
pub trait QueueConfigExt {
    /// Store rooted at the configured storage directory, with its busy timeout
    fn queue_store(&self) -> Result<Store>;

    /// Capacity of the playlist change broadcast channel
    fn get_playlist_event_capacity(&self) -> Result<usize>;

    fn set_playlist_event_capacity(&self, capacity: usize) -> Result<()>;
}

impl QueueConfigExt for Config {
    fn queue_store(&self) -> Result<Store> {
        let root = self.get_storage_dir()?;
        let timeout = Duration::from_millis(self.get_storage_busy_timeout_ms()?);
        Ok(Store::new(root).with_busy_timeout(timeout))
    }

    fn get_playlist_event_capacity(&self) -> Result<usize> {
        match self.get_value(&["playlist", "event_capacity"]) {
            Ok(Value::Number(n)) => Ok(n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(DEFAULT_EVENT_CAPACITY)),
            _ => {
                self.set_playlist_event_capacity(DEFAULT_EVENT_CAPACITY)?;
                Ok(DEFAULT_EVENT_CAPACITY)
            }
        }
    }

    fn set_playlist_event_capacity(&self, capacity: usize) -> Result<()> {
        self.set_value(
            &["playlist", "event_capacity"],
            Value::Number(Number::from(capacity)),
        )
    }
}
