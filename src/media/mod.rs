//! Playable media and the sources that feed the voice worker.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::common::errors::{PlaybackError, PlaylistError};

pub mod playlist;
pub mod queue;

pub use playlist::MemoryPlaylist;
pub use queue::MediaQueue;

/// A single playable item.
///
/// Implementations own whatever is needed to (re)resolve a stream URL, so
/// `ensure_loaded` takes `&self` and relies on interior mutability.
#[async_trait]
pub trait Media: Send + Sync {
    /// URL handed to the encoder. A local file path or a remote stream.
    fn file_url(&self) -> String;

    /// When the current `file_url` stops being valid. `None` for URLs that
    /// never expire.
    fn file_url_expires_at(&self) -> Option<OffsetDateTime>;

    /// Make sure `file_url` is valid, refreshing it over the network if
    /// needed. Called before every encode.
    async fn ensure_loaded(&self) -> Result<(), PlaybackError>;

    /// Whether playback can start from an arbitrary offset.
    fn can_seek(&self) -> bool;

    /// Total duration; `None` for live streams.
    fn duration(&self) -> Option<Duration>;
}

/// Order in which a playlist hands out its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumeOrder {
    #[serde(rename = "start")]
    FromStart,
    Shuffle,
}

impl fmt::Display for ConsumeOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FromStart => write!(f, "start"),
            Self::Shuffle => write!(f, "shuffle"),
        }
    }
}

/// External source of media consumed only when the queue is empty.
///
/// Playlists lock internally; the worker calls `consume_next` without holding
/// the session lock.
pub trait Playlist: Send + Sync {
    fn title(&self) -> String;

    /// Next item, or `PlaylistError::Empty` once exhausted.
    fn consume_next(&self) -> Result<Arc<dyn Media>, PlaylistError>;

    fn media_count(&self) -> usize;

    fn available_consume_orders(&self) -> Vec<ConsumeOrder> {
        vec![ConsumeOrder::FromStart]
    }

    fn consume_order(&self) -> ConsumeOrder {
        ConsumeOrder::FromStart
    }

    fn set_consume_order(&self, order: ConsumeOrder) -> Result<(), PlaylistError> {
        if order == ConsumeOrder::FromStart {
            Ok(())
        } else {
            Err(PlaylistError::ConsumeOrderUnsupported(order))
        }
    }

    fn remove_on_consume(&self) -> bool {
        true
    }

    fn set_remove_on_consume(&self, _remove: bool) {}

    /// Sum of the known durations of the remaining items.
    fn duration_left(&self) -> Option<Duration> {
        None
    }
}
