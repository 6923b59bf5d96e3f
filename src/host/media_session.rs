use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::HostError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaAction {
    Play,
    Pause,
    Stop,
    SeekBackward,
    SeekForward,
    SeekTo,
    PreviousTrack,
    NextTrack,
}

impl MediaAction {
    pub const ALL: [MediaAction; 8] = [
        MediaAction::Play,
        MediaAction::Pause,
        MediaAction::Stop,
        MediaAction::SeekBackward,
        MediaAction::SeekForward,
        MediaAction::SeekTo,
        MediaAction::PreviousTrack,
        MediaAction::NextTrack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaAction::Play => "play",
            MediaAction::Pause => "pause",
            MediaAction::Stop => "stop",
            MediaAction::SeekBackward => "seekbackward",
            MediaAction::SeekForward => "seekforward",
            MediaAction::SeekTo => "seekto",
            MediaAction::PreviousTrack => "previoustrack",
            MediaAction::NextTrack => "nexttrack",
        }
    }
}

impl fmt::Display for MediaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    None,
    Paused,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionState {
    pub duration: f64,
    pub playback_rate: f64,
    pub position: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: Vec<String>,
}

/// Arguments the platform passes along with an action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionDetails {
    pub action: MediaAction,
    pub seek_offset: Option<f64>,
    pub seek_time: Option<f64>,
}

impl ActionDetails {
    pub fn new(action: MediaAction) -> Self {
        Self {
            action,
            seek_offset: None,
            seek_time: None,
        }
    }
}

pub type ActionHandler = Arc<dyn Fn(ActionDetails) + Send + Sync>;

/// OS/browser media-control surface (lock screen, media keys, PiP transport).
pub trait MediaSession: Send + Sync {
    fn set_metadata(&self, metadata: Option<MediaMetadata>) -> Result<(), HostError>;
    fn set_playback_state(&self, state: PlaybackState) -> Result<(), HostError>;
    fn set_position_state(&self, state: Option<PositionState>) -> Result<(), HostError>;
    /// `None` clears the handler for `action`.
    fn set_action_handler(
        &self,
        action: MediaAction,
        handler: Option<ActionHandler>,
    ) -> Result<(), HostError>;
}
