//! The local mirror of the remote player's state.
//!
//! [`PlayerState`] is a plain value. All writes go through methods that keep
//! its invariants: the position is finite, non-negative and never past the end
//! of the loaded track, and the volume stays within `0..=100`.

use std::time::Duration;

use crate::protocol::{Command, PlayerEvent, RepeatMode, SongInfo, Track};

/// Volume reported before the remote player tells us otherwise.
pub const DEFAULT_VOLUME: u8 = 100;

/// Snapshot of the remote player's playback state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// The loaded track, if any.
    pub song: Option<Track>,
    pub is_playing: bool,
    pub muted: bool,
    /// Playback position within `song`, in seconds.
    pub position_seconds: f64,
    /// Volume in percent, `0..=100`.
    pub volume_percent: u8,
    pub repeat_mode: RepeatMode,
    pub shuffle: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            song: None,
            is_playing: false,
            muted: false,
            position_seconds: 0.0,
            volume_percent: DEFAULT_VOLUME,
            repeat_mode: RepeatMode::None,
            shuffle: false,
        }
    }
}

/// Authoritative state fetched from the query endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct PolledState {
    /// Result of `GET /song`; `None` when nothing is loaded.
    pub song: Option<SongInfo>,
    pub shuffle: bool,
    pub repeat_mode: RepeatMode,
}

impl PlayerState {
    /// Returns `true` if a track is loaded.
    pub fn has_song(&self) -> bool {
        self.song.is_some()
    }

    /// Duration of the loaded track, in seconds.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.song.as_ref().map(|track| track.duration_seconds)
    }

    /// Estimate of the current position `elapsed` after the last update.
    ///
    /// While playing, the remote position advances in real time between
    /// `POSITION_CHANGED` events or polls; renderers use this to move a seek
    /// bar smoothly. The estimate never passes the end of the track.
    pub fn interpolated_position(&self, elapsed: Duration) -> f64 {
        if !self.is_playing {
            return self.position_seconds;
        }
        self.clamp_position(self.position_seconds + elapsed.as_secs_f64())
    }

    /// Apply the partial update carried by `event`.
    ///
    /// Returns `false` for [`PlayerEvent::Unknown`], which leaves the state
    /// untouched.
    pub fn apply(&mut self, event: &PlayerEvent) -> bool {
        match event {
            PlayerEvent::PlayerInfo {
                song,
                is_playing,
                muted,
                position,
                volume,
                repeat,
                shuffle,
            } => {
                self.song = song.as_ref().map(|info| info.track.clone());
                self.is_playing = *is_playing;
                self.muted = *muted;
                self.set_position(*position);
                self.set_volume(*volume);
                self.repeat_mode = *repeat;
                self.shuffle = *shuffle;
            }
            PlayerEvent::VideoChanged { song, position } => {
                self.song = Some(song.track.clone());
                self.is_playing = !song.is_paused.unwrap_or(false);
                self.set_position(*position);
            }
            PlayerEvent::PlayerStateChanged {
                is_playing,
                position,
            } => {
                self.is_playing = *is_playing;
                self.set_position(*position);
            }
            PlayerEvent::PositionChanged { position } => self.set_position(*position),
            PlayerEvent::VolumeChanged { volume, muted } => {
                self.set_volume(*volume);
                self.muted = *muted;
            }
            PlayerEvent::RepeatChanged { repeat } => self.repeat_mode = *repeat,
            PlayerEvent::ShuffleChanged { shuffle } => self.shuffle = *shuffle,
            PlayerEvent::Unknown => return false,
        }
        true
    }

    /// Merge the result of an authoritative fetch.
    ///
    /// Volume and mute are not part of the query set and are left alone.
    pub fn merge_polled(&mut self, polled: &PolledState) {
        match &polled.song {
            Some(info) => {
                self.song = Some(info.track.clone());
                self.is_playing = !info.is_paused.unwrap_or(false);
                self.set_position(info.elapsed_seconds.unwrap_or(0.0));
            }
            None => {
                self.song = None;
                self.is_playing = false;
                self.position_seconds = 0.0;
            }
        }
        self.shuffle = polled.shuffle;
        self.repeat_mode = polled.repeat_mode;
    }

    /// Apply the local guess for `command`, ahead of server confirmation.
    pub fn apply_optimistic(&mut self, command: &Command) {
        match *command {
            Command::TogglePlayback => self.is_playing = !self.is_playing,
            Command::NextTrack | Command::PreviousTrack => self.position_seconds = 0.0,
            Command::ToggleShuffle => self.shuffle = !self.shuffle,
            Command::ToggleMute => self.muted = !self.muted,
            Command::CycleRepeat => self.repeat_mode = self.repeat_mode.next(),
            Command::SeekTo { seconds } => self.set_position(seconds),
            Command::SetVolume { percent } => self.set_volume(f64::from(percent)),
        }
    }

    /// Store the volume reported by `GET /volume`.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume_percent = clamp_volume(volume);
    }

    /// Store a playback position, clamped into the loaded track.
    pub fn set_position(&mut self, seconds: f64) {
        self.position_seconds = self.clamp_position(seconds);
    }

    /// Clear everything, as after losing the connection.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn clamp_position(&self, seconds: f64) -> f64 {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0.0;
        }
        match self.duration_seconds() {
            Some(duration) if duration.is_finite() && duration >= 0.0 => seconds.min(duration),
            _ => seconds,
        }
    }
}

fn clamp_volume(volume: f64) -> u8 {
    if !volume.is_finite() {
        return 0;
    }
    // In range after the clamp, so the cast cannot truncate.
    volume.round().clamp(0.0, 100.0) as u8
}
