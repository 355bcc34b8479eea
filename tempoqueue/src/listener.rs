//! Protocole de notification des modifications de playlist

use serde::{Deserialize, Serialize};

/// What a committed mutation did to the queue
///
/// Observers apply these incrementally instead of diffing whole lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaylistChange {
    /// The whole list was replaced.
    Swapped {
        position: usize,
        play_on_prepared: bool,
    },
    /// The item at `from` now sits at `to`.
    Moved { from: usize, to: usize },
    /// `count` items now start at `position`.
    Inserted { position: usize, count: usize },
    /// The items at the requested positions (pre-removal indices) are gone.
    Removed { positions: Vec<usize> },
}

/// Observer of a [`PlaylistManager`](crate::PlaylistManager)
///
/// Called on the manager's worker thread, after the change is committed to
/// storage and in commit order.
pub trait ModifyPlaylistListener: Send + Sync {
    fn on_playlist_changed(&self, change: &PlaylistChange);

    /// The owning service is going away.
    ///
    /// Listeners forwarding changes to another process disconnect here
    /// instead of waiting for a timeout.
    fn on_shutdown(&self) {}
}

impl<F> ModifyPlaylistListener for F
where
    F: Fn(&PlaylistChange) + Send + Sync,
{
    fn on_playlist_changed(&self, change: &PlaylistChange) {
        self(change)
    }
}
