//! Wire types for the remote player's HTTP and event-stream API.
//!
//! Every type in this module matches the JSON produced and accepted by the
//! remote player. Field names are camelCase on the wire, enum values are
//! `SCREAMING_SNAKE_CASE`, and event-stream messages carry a `type` tag.

use serde::{Deserialize, Serialize};

// ── Enums ───────────────────────────────────────────────────────────

/// Repeat mode of the remote player's queue.
///
/// Only these three values are ever stored; any other value on the wire is
/// rejected during deserialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepeatMode {
    /// Play the queue once.
    #[default]
    None,
    /// Repeat the current track.
    One,
    /// Repeat the whole queue.
    All,
}

impl RepeatMode {
    /// The mode the remote player switches to after one `/switch-repeat`
    /// iteration: `NONE → ALL → ONE → NONE`.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::All,
            Self::All => Self::One,
            Self::One => Self::None,
        }
    }
}

/// Kind of media the current track is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    #[default]
    Audio,
    OriginalMusicVideo,
    UserGeneratedContent,
    PodcastEpisode,
    OtherVideo,
    /// A media type this client does not know about yet.
    #[serde(other)]
    Unknown,
}

// ── Track ───────────────────────────────────────────────────────────

/// Descriptor of a track loaded in the remote player.
///
/// Tracks are value objects: a track change replaces the whole descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_title: Option<String>,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_url: Option<String>,
    #[serde(default)]
    pub views: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    /// Track length in seconds.
    #[serde(rename = "songDuration")]
    pub duration_seconds: f64,
    /// Cover art URL.
    #[serde(rename = "imageSrc", default)]
    pub image_url: Option<String>,
    /// Link to the track on the remote service.
    #[serde(rename = "url", default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub media_type: MediaType,
    pub video_id: String,
    #[serde(default)]
    pub playlist_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A [`Track`] together with the playback fields the remote player attaches
/// to it in `/song` responses and `VIDEO_CHANGED` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongInfo {
    #[serde(flatten)]
    pub track: Track,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_paused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
}

// ── Event stream ────────────────────────────────────────────────────

/// Messages pushed by the remote player over the event stream.
///
/// Each variant carries the partial state update it declares; see
/// [`PlayerState::apply`](crate::state::PlayerState::apply).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerEvent {
    /// Full player snapshot, sent right after the stream opens.
    #[serde(rename_all = "camelCase")]
    PlayerInfo {
        song: Option<SongInfo>,
        is_playing: bool,
        muted: bool,
        position: f64,
        volume: f64,
        repeat: RepeatMode,
        shuffle: bool,
    },
    /// A different track was loaded.
    VideoChanged { song: SongInfo, position: f64 },
    /// Playback was started or paused.
    #[serde(rename_all = "camelCase")]
    PlayerStateChanged { is_playing: bool, position: f64 },
    /// Playback position moved.
    PositionChanged { position: f64 },
    /// Volume or mute state changed.
    VolumeChanged { volume: f64, muted: bool },
    /// Repeat mode changed.
    RepeatChanged { repeat: RepeatMode },
    /// Shuffle was toggled.
    ShuffleChanged { shuffle: bool },
    /// A message type this client does not handle.
    #[serde(other)]
    Unknown,
}

impl PlayerEvent {
    /// The wire tag of this event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerInfo { .. } => "PLAYER_INFO",
            Self::VideoChanged { .. } => "VIDEO_CHANGED",
            Self::PlayerStateChanged { .. } => "PLAYER_STATE_CHANGED",
            Self::PositionChanged { .. } => "POSITION_CHANGED",
            Self::VolumeChanged { .. } => "VOLUME_CHANGED",
            Self::RepeatChanged { .. } => "REPEAT_CHANGED",
            Self::ShuffleChanged { .. } => "SHUFFLE_CHANGED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

// ── HTTP bodies ─────────────────────────────────────────────────────

/// Body of `POST /switch-repeat`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwitchRepeatRequest {
    pub iteration: u32,
}

/// Body of `POST /seek-to`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeekRequest {
    pub seconds: f64,
}

/// Body of `POST /volume`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeRequest {
    pub volume: u8,
}

/// Response of `GET /shuffle`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShuffleResponse {
    pub state: bool,
}

/// Response of `GET /repeat-mode`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepeatModeResponse {
    pub mode: RepeatMode,
}

/// Response of `GET /volume`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VolumeResponse {
    pub state: f64,
}

/// Response of `POST /auth/{client}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
}

// ── Commands ────────────────────────────────────────────────────────

/// A playback command relayed to the remote player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    TogglePlayback,
    NextTrack,
    PreviousTrack,
    ToggleShuffle,
    ToggleMute,
    CycleRepeat,
    SeekTo { seconds: f64 },
    SetVolume { percent: u8 },
}

impl Command {
    /// API path of the command, relative to the versioned API base.
    pub fn path(&self) -> &'static str {
        match self {
            Self::TogglePlayback => "/toggle-play",
            Self::NextTrack => "/next",
            Self::PreviousTrack => "/previous",
            Self::ToggleShuffle => "/shuffle",
            Self::ToggleMute => "/toggle-mute",
            Self::CycleRepeat => "/switch-repeat",
            Self::SeekTo { .. } => "/seek-to",
            Self::SetVolume { .. } => "/volume",
        }
    }

    /// JSON body of the command, if it takes one.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the body cannot be encoded.
    pub fn body(&self) -> Result<Option<serde_json::Value>, serde_json::Error> {
        let body = match *self {
            Self::CycleRepeat => Some(serde_json::to_value(SwitchRepeatRequest { iteration: 1 })?),
            Self::SeekTo { seconds } => Some(serde_json::to_value(SeekRequest { seconds })?),
            Self::SetVolume { percent } => {
                Some(serde_json::to_value(VolumeRequest { volume: percent })?)
            }
            _ => None,
        };
        Ok(body)
    }
}
