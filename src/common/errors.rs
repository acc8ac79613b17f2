use std::time::Duration;

use thiserror::Error;

use crate::media::ConsumeOrder;

/// Usage and precondition failures returned synchronously by `MusicSession`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("voice worker inactive")]
    WorkerNotActive,
    #[error("voice worker already active")]
    WorkerAlreadyActive,
    #[error("not currently streaming")]
    NotStreaming,
    /// Media that cannot be handed to the worker at all.
    #[error("invalid media")]
    InvalidMedia,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("unsupported feature by current media")]
    MediaUnsupportedFeature,
    #[error("no media found")]
    NoMediaFound,
    #[error("no voice channel set")]
    NoVoiceChannelSet,
    #[error("command already sent")]
    CommandAlreadySent,
    #[error("media queue full")]
    QueueFull,
    #[error("playlist consume order not supported")]
    PlaylistConsumeOrderUnsupported,
    #[error("voice worker did not exit within {0:?}")]
    LeaveTimeout(Duration),
}

/// Failures of a single play attempt. Reported through error callbacks and
/// never fatal to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("voice connection failed: {0}")]
    Connect(String),
    #[error("failed to load media: {0}")]
    Load(String),
    #[error("failed to start encoder: {0}")]
    Encode(String),
    /// The voice transport went away underneath an active stream.
    #[error("voice connection closed")]
    TransportDropped,
    #[error("stream error: {0}")]
    Stream(String),
}

impl PlaybackError {
    pub fn is_transport_dropped(&self) -> bool {
        matches!(self, Self::TransportDropped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaylistError {
    /// Nothing left to consume. A normal end-of-playlist condition.
    #[error("playlist is empty")]
    Empty,
    #[error("consume order {0} not supported")]
    ConsumeOrderUnsupported(ConsumeOrder),
    #[error("playlist source error: {0}")]
    Source(String),
}

impl From<PlaylistError> for PlayerError {
    fn from(e: PlaylistError) -> Self {
        match e {
            PlaylistError::ConsumeOrderUnsupported(_) => Self::PlaylistConsumeOrderUnsupported,
            PlaylistError::Empty | PlaylistError::Source(_) => Self::NoMediaFound,
        }
    }
}
