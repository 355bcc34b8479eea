//! # tempoqueue - File de lecture et état de session persistants
//!
//! Durable-state core of a background playback service:
//! - **PlaylistManager**: owner of the queue of one namespace; mutations are
//!   serialized on a dedicated worker thread and reported as structured
//!   [`PlaylistChange`]s (swap, move, insert, remove)
//! - **Access**: a manager opened read-only serves reads and ignores edits
//! - **state**: write-through mirrors of the session state (progress, sound
//!   quality, toggles, current radio station)
//!
//! Everything is stored in a [`tempokv::Store`] and survives the process
//! being killed and relaunched.
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use tempokv::Store;
//! use tempoqueue::{Access, MusicItem, Playlist, PlaylistManager};
//!
//! # fn main() -> tempoqueue::Result<()> {
//! let store = Store::new("/tmp/tempo-state");
//! let manager = PlaylistManager::open(&store, "player.PlayerService", Access::ReadWrite)?;
//!
//! manager.set_playlist(
//!     Playlist::new(vec![
//!         MusicItem::new("1", "First", "file:///1.flac"),
//!         MusicItem::new("2", "Second", "file:///2.flac"),
//!     ]),
//!     0,
//!     true,
//! );
//! manager.move_music_item(0, 1);
//! manager.flush();
//!
//! // Vue en lecture seule, par exemple depuis un processus contrôleur
//! let view = PlaylistManager::open(&store, "player.PlayerService", Access::ReadOnly)?;
//! assert_eq!(view.playlist()[0].id(), "2");
//! # Ok(())
//! # }
//! ```

mod error;
mod item;
mod listener;
mod manager;
mod playlist;
mod worker;

pub mod state;

#[cfg(feature = "tempoconfig")]
mod config_ext;

// Réexports publics
pub use error::{Error, Result};
pub use item::MusicItem;
pub use listener::{ModifyPlaylistListener, PlaylistChange};
pub use manager::{Access, PlaylistManager, DEFAULT_EVENT_CAPACITY};
pub use playlist::Playlist;

#[cfg(feature = "tempoconfig")]
pub use config_ext::QueueConfigExt;
