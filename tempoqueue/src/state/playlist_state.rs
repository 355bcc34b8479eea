//! État de lecture de la file

use super::types::{PlayMode, SoundQuality};
use super::*;

const KEY_POSITION: &str = "position";
const KEY_PLAY_MODE: &str = "play_mode";

/// Playback state while the queue is playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistState {
    pub play_progress: u64,
    pub play_progress_update_time: i64,
    pub sound_quality: SoundQuality,
    pub audio_effect_enabled: bool,
    pub only_wifi_network: bool,
    pub ignore_loss_audio_focus: bool,
    /// Index of the playing item in the queue.
    pub position: usize,
    pub play_mode: PlayMode,
}

impl Default for PlaylistState {
    fn default() -> Self {
        Self {
            play_progress: 0,
            play_progress_update_time: 0,
            sound_quality: SoundQuality::Standard,
            audio_effect_enabled: false,
            only_wifi_network: true,
            ignore_loss_audio_focus: false,
            position: 0,
            play_mode: PlayMode::Sequential,
        }
    }
}

impl MirroredState for PlaylistState {
    fn restore(&mut self, storage: &Namespace) {
        let defaults = Self::default();
        self.play_progress = storage.decode(KEY_PLAY_PROGRESS, defaults.play_progress);
        self.play_progress_update_time =
            storage.decode(KEY_PLAY_PROGRESS_UPDATE_TIME, defaults.play_progress_update_time);
        self.sound_quality = storage.decode(KEY_SOUND_QUALITY, defaults.sound_quality);
        self.audio_effect_enabled =
            storage.decode(KEY_AUDIO_EFFECT_ENABLED, defaults.audio_effect_enabled);
        self.only_wifi_network = storage.decode(KEY_ONLY_WIFI_NETWORK, defaults.only_wifi_network);
        self.ignore_loss_audio_focus =
            storage.decode(KEY_IGNORE_LOSS_AUDIO_FOCUS, defaults.ignore_loss_audio_focus);
        self.position = storage.decode(KEY_POSITION, defaults.position);
        self.play_mode = storage.decode(KEY_PLAY_MODE, defaults.play_mode);
    }
}

pub type PersistentPlaylistState = Persistent<PlaylistState>;

impl Persistent<PlaylistState> {
    mirrored_setters! {
        set_play_progress => play_progress: u64, KEY_PLAY_PROGRESS;
        set_play_progress_update_time => play_progress_update_time: i64, KEY_PLAY_PROGRESS_UPDATE_TIME;
        set_sound_quality => sound_quality: SoundQuality, KEY_SOUND_QUALITY;
        set_audio_effect_enabled => audio_effect_enabled: bool, KEY_AUDIO_EFFECT_ENABLED;
        set_only_wifi_network => only_wifi_network: bool, KEY_ONLY_WIFI_NETWORK;
        set_ignore_loss_audio_focus => ignore_loss_audio_focus: bool, KEY_IGNORE_LOSS_AUDIO_FOCUS;
        set_position => position: usize, KEY_POSITION;
        set_play_mode => play_mode: PlayMode, KEY_PLAY_MODE;
    }

    /// Moves to another item, resetting the progress in the same commit
    pub fn play_position(&mut self, position: usize, update_time: i64) -> Result<()> {
        self.state.position = position;
        self.state.play_progress = 0;
        self.state.play_progress_update_time = update_time;
        self.storage.write_batch(|batch| {
            batch.encode(KEY_POSITION, &position)?;
            batch.encode(KEY_PLAY_PROGRESS, &0u64)?;
            batch.encode(KEY_PLAY_PROGRESS_UPDATE_TIME, &update_time)
        })?;
        Ok(())
    }
}
