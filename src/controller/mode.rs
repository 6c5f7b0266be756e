//! Conversation modes

use serde::{Deserialize, Serialize};

use crate::error::AudioModeError;

/// Conversation mode requested by the application.
///
/// The controller stores `Option<AudioMode>`; `None` means no mode has
/// been requested yet and no routing decisions are made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioMode {
    /// Before and after every call
    Idle,
    /// Voice only; earpiece is the default endpoint
    AudioCall,
    /// Video; speaker is the default endpoint
    VideoCall,
}

impl AudioMode {
    pub const DEFAULT: i64 = 0;
    pub const AUDIO_CALL: i64 = 1;
    pub const VIDEO_CALL: i64 = 2;

    /// Numeric value exposed to clients
    pub fn code(&self) -> i64 {
        match self {
            AudioMode::Idle => Self::DEFAULT,
            AudioMode::AudioCall => Self::AUDIO_CALL,
            AudioMode::VideoCall => Self::VIDEO_CALL,
        }
    }

    /// Whether audio has to be routed in this mode
    pub fn is_call(&self) -> bool {
        !matches!(self, AudioMode::Idle)
    }
}

impl TryFrom<i64> for AudioMode {
    type Error = AudioModeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            Self::DEFAULT => Ok(AudioMode::Idle),
            Self::AUDIO_CALL => Ok(AudioMode::AudioCall),
            Self::VIDEO_CALL => Ok(AudioMode::VideoCall),
            other => Err(AudioModeError::InvalidMode(other)),
        }
    }
}

impl std::fmt::Display for AudioMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioMode::Idle => write!(f, "Idle"),
            AudioMode::AudioCall => write!(f, "AudioCall"),
            AudioMode::VideoCall => write!(f, "VideoCall"),
        }
    }
}

/// The mode constants exported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ModeConstants {
    pub default: i64,
    pub audio_call: i64,
    pub video_call: i64,
}

impl Default for ModeConstants {
    fn default() -> Self {
        Self {
            default: AudioMode::DEFAULT,
            audio_call: AudioMode::AUDIO_CALL,
            video_call: AudioMode::VIDEO_CALL,
        }
    }
}
