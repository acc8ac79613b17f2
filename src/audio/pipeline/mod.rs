//! Encode/stream contract between the voice worker and the audio backend.
//!
//! An encode turns a media URL into opus frames starting at a whole-second
//! offset; a stream pushes those frames into a voice connection and reports
//! completion exactly once on its [`Completion`] channel.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{common::errors::PlaybackError, voice::VoiceConnection};

/// `Ok(())` means end of stream. A dropped sender is treated the same way.
pub type Completion = flume::Receiver<Result<(), PlaybackError>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    pub start_offset_secs: u64,
}

impl EncodeOptions {
    /// Sub-second precision is dropped.
    pub fn starting_at(offset: Duration) -> Self {
        Self {
            start_offset_secs: offset.as_secs(),
        }
    }

    pub fn start_offset(&self) -> Duration {
        Duration::from_secs(self.start_offset_secs)
    }
}

/// A running encoder.
pub trait EncodeHandle: Send + Sync {
    /// Stop the encoder and release its process/resources. Idempotent.
    fn cleanup(&self);
}

/// Live control over a stream that is being sent.
pub trait StreamHandle: Send + Sync {
    /// Absolute position in the media, including the encode start offset.
    fn playback_position(&self) -> Duration;

    fn set_paused(&self, paused: bool);

    fn paused(&self) -> bool;
}

pub struct StreamSession {
    pub stream: Arc<dyn StreamHandle>,
    pub done: Completion,
}

#[async_trait]
pub trait AudioPipeline: Send + Sync {
    async fn start_encoding(
        &self,
        url: &str,
        options: EncodeOptions,
    ) -> Result<Arc<dyn EncodeHandle>, PlaybackError>;

    fn start_streaming(
        &self,
        encoder: Arc<dyn EncodeHandle>,
        connection: Arc<dyn VoiceConnection>,
    ) -> StreamSession;
}
