//! État de lecture d'une radio

use super::types::{RadioStation, SoundQuality};
use super::*;

const KEY_RADIO_STATION: &str = "radio_station";

/// Playback state while a radio station is playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioStationState {
    /// Position in the current track, in milliseconds.
    pub play_progress: u64,
    /// When `play_progress` was last updated, in milliseconds since the epoch.
    pub play_progress_update_time: i64,
    pub sound_quality: SoundQuality,
    pub audio_effect_enabled: bool,
    pub only_wifi_network: bool,
    pub ignore_loss_audio_focus: bool,
    pub radio_station: RadioStation,
}

impl Default for RadioStationState {
    fn default() -> Self {
        Self {
            play_progress: 0,
            play_progress_update_time: 0,
            sound_quality: SoundQuality::Standard,
            audio_effect_enabled: false,
            only_wifi_network: true,
            ignore_loss_audio_focus: false,
            radio_station: RadioStation::default(),
        }
    }
}

impl MirroredState for RadioStationState {
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
        self.radio_station = storage.decode(KEY_RADIO_STATION, defaults.radio_station);
    }
}

/// Radio playback state surviving restarts
pub type PersistentRadioStationState = Persistent<RadioStationState>;

impl Persistent<RadioStationState> {
    mirrored_setters! {
        set_play_progress => play_progress: u64, KEY_PLAY_PROGRESS;
        set_play_progress_update_time => play_progress_update_time: i64, KEY_PLAY_PROGRESS_UPDATE_TIME;
        set_sound_quality => sound_quality: SoundQuality, KEY_SOUND_QUALITY;
        set_audio_effect_enabled => audio_effect_enabled: bool, KEY_AUDIO_EFFECT_ENABLED;
        set_only_wifi_network => only_wifi_network: bool, KEY_ONLY_WIFI_NETWORK;
        set_ignore_loss_audio_focus => ignore_loss_audio_focus: bool, KEY_IGNORE_LOSS_AUDIO_FOCUS;
        /// Switches to another station; the empty station means "none".
        set_radio_station => radio_station: RadioStation, KEY_RADIO_STATION;
    }

    /// Sets progress and its timestamp, committed together
    pub fn record_progress(&mut self, play_progress: u64, update_time: i64) -> Result<()> {
        self.state.play_progress = play_progress;
        self.state.play_progress_update_time = update_time;
        self.storage.write_batch(|batch| {
            batch.encode(KEY_PLAY_PROGRESS, &play_progress)?;
            batch.encode(KEY_PLAY_PROGRESS_UPDATE_TIME, &update_time)
        })?;
        Ok(())
    }
}
