//! États de session persistés champ par champ
//!
//! A plain record (`RadioStationState`, `PlaylistState`) is an ordinary
//! in-memory value. [`Persistent::attach`] turns it into a write-through
//! mirror: every tracked field is restored from storage, falling back to the
//! field's documented default, and from then on each setter updates memory
//! and re-encodes that single field. Reads never touch storage.
//!
//! ```no_run
//! use tempokv::Store;
//! use tempoqueue::state::{Persistent, RadioStationState, SoundQuality};
//!
//! # fn main() -> tempoqueue::Result<()> {
//! let store = Store::new("/tmp/tempo-state");
//! let mut state = Persistent::attach(RadioStationState::default(), &store, "player.radio")?;
//!
//! state.set_sound_quality(SoundQuality::High)?;
//! assert_eq!(state.sound_quality, SoundQuality::High);
//! # Ok(())
//! # }
//! ```

use crate::Result;
use std::ops::Deref;
use tempokv::{Mode, Namespace, Store};

pub(crate) const KEY_PLAY_PROGRESS: &str = "play_progress";
pub(crate) const KEY_PLAY_PROGRESS_UPDATE_TIME: &str = "play_progress_update_time";
pub(crate) const KEY_SOUND_QUALITY: &str = "sound_quality";
pub(crate) const KEY_AUDIO_EFFECT_ENABLED: &str = "audio_effect_enabled";
pub(crate) const KEY_ONLY_WIFI_NETWORK: &str = "only_wifi_network";
pub(crate) const KEY_IGNORE_LOSS_AUDIO_FOCUS: &str = "ignore_loss_audio_focus";

/// Record whose fields can be mirrored into a namespace
///
/// `Default` gives the documented default of every tracked field.
pub trait MirroredState: Clone + Default {
    /// Overwrites every tracked field with its stored value, or with its
    /// documented default when nothing readable is stored
    fn restore(&mut self, storage: &Namespace);
}

/// Write-through mirror of a [`MirroredState`] record
///
/// Dereferences to the in-memory record for reads. The namespace is opened in
/// single-process mode: only the owning process may write it.
#[derive(Debug)]
pub struct Persistent<S> {
    state: S,
    storage: Namespace,
}

impl<S: MirroredState> Persistent<S> {
    /// Restores `state` from `namespace_id` and starts mirroring it
    ///
    /// Tracked fields of `state` are all overwritten, so what a reader sees
    /// after attaching is exactly what a restarted process will see.
    pub fn attach(mut state: S, store: &Store, namespace_id: &str) -> Result<Self> {
        let storage = store.open(namespace_id, Mode::SingleProcess)?;
        state.restore(&storage);
        tracing::debug!(namespace = namespace_id, "State restored from storage");
        Ok(Self { state, storage })
    }

    /// Plain copy of the current record
    pub fn snapshot(&self) -> S {
        self.state.clone()
    }

    /// Stops mirroring and returns the record
    pub fn into_inner(self) -> S {
        self.state
    }

    pub fn namespace_id(&self) -> &str {
        self.storage.id()
    }
}

impl<S> Deref for Persistent<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.state
    }
}

/// Generates the write-through setters of a `Persistent<Record>`
///
/// Memory is updated before the encode; on an encode error the two diverge
/// until the next successful write of that field.
macro_rules! mirrored_setters {
    ($( $(#[$doc:meta])* $setter:ident => $field:ident : $ty:ty, $key:expr; )*) => {
        $(
            $(#[$doc])*
            pub fn $setter(&mut self, value: $ty) -> $crate::Result<()> {
                self.state.$field = value;
                self.storage.encode($key, &self.state.$field)?;
                Ok(())
            }
        )*
    };
}

pub(crate) use mirrored_setters;

mod playlist_state;
mod radio;
mod types;

pub use playlist_state::{PersistentPlaylistState, PlaylistState};
pub use radio::{PersistentRadioStationState, RadioStationState};
pub use types::{PlayMode, RadioStation, SoundQuality};
