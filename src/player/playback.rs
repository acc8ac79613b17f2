use std::{future::Future, sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::{
    audio::{EncodeOptions, StreamHandle, StreamSession},
    common::errors::PlaybackError,
    media::Media,
    player::{
        constants::{NEAR_END_THRESHOLD, URL_EXPIRY_LEAD, URL_EXPIRY_POLL_INTERVAL},
        state::CurrentPlayback,
        worker::VoiceWorker,
    },
    voice::VoiceConnection,
};

/// What the worker should do after one play attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NextStep {
    /// The item is done (finished, skipped or failed); move on.
    Advance,
    /// Play the same item again from the given offset.
    Resume(Duration),
    /// Leave the channel.
    Exit,
}

pub(crate) struct PlayOutcome {
    pub error: Option<PlaybackError>,
    pub next: NextStep,
}

impl PlayOutcome {
    fn step(next: NextStep) -> Self {
        Self { error: None, next }
    }

    fn failed(error: PlaybackError) -> Self {
        Self {
            error: Some(error),
            next: NextStep::Advance,
        }
    }
}

impl VoiceWorker {
    /// Play `media` once, starting at `start_at`, until it completes, a
    /// command arrives, its URL is about to expire or the worker is
    /// cancelled.
    pub(super) async fn play_media(
        &mut self,
        media: &Arc<dyn Media>,
        start_at: Duration,
    ) -> PlayOutcome {
        // Per-item token; dropping the guard stops the expiry watcher.
        let item_token = self.token.child_token();
        let _item_guard = item_token.clone().drop_guard();

        let connection = match until_cancelled(&item_token, self.ensure_connection()).await {
            Some(Ok(connection)) => connection,
            Some(Err(e)) => return PlayOutcome::failed(e),
            None => return PlayOutcome::step(NextStep::Exit),
        };
        self.connection = Some(connection.clone());

        match until_cancelled(&item_token, media.ensure_loaded()).await {
            Some(Ok(())) => {}
            Some(Err(e)) => return PlayOutcome::failed(e),
            None => return PlayOutcome::step(NextStep::Exit),
        }

        let url = media.file_url();
        info!("Playing: {} (from {}s)", url, start_at.as_secs());

        let _ = connection.set_speaking(true).await;

        let pipeline = self.core.pipeline.clone();
        let encoder = match until_cancelled(
            &item_token,
            pipeline.start_encoding(&url, EncodeOptions::starting_at(start_at)),
        )
        .await
        {
            Some(Ok(encoder)) => encoder,
            Some(Err(e)) => {
                let _ = connection.set_speaking(false).await;
                return PlayOutcome::failed(e);
            }
            None => {
                let _ = connection.set_speaking(false).await;
                return PlayOutcome::step(NextStep::Exit);
            }
        };

        let StreamSession { stream, done } =
            pipeline.start_streaming(encoder.clone(), connection.clone());

        self.core.state.write().current = Some(CurrentPlayback {
            media: media.clone(),
            stream: stream.clone(),
        });

        let (reload_tx, reload_rx) = flume::bounded::<()>(1);
        if let Some(expires_at) = media.file_url_expires_at() {
            tokio::spawn(
                watch_url_expiry(expires_at, reload_tx, item_token.clone()).in_current_span(),
            );
        }

        let outcome = tokio::select! {
            result = done.recv_async() => match result {
                // A dropped completion sender counts as end of stream.
                Ok(Ok(())) | Err(_) => PlayOutcome::step(NextStep::Advance),
                Ok(Err(e)) if e.is_transport_dropped() => {
                    PlayOutcome::step(after_transport_drop(&**media, &*stream))
                }
                Ok(Err(e)) => PlayOutcome::failed(e),
            },
            Ok(()) = self.commands.leave.recv_async() => {
                info!("Asked to leave while playing");
                PlayOutcome::step(NextStep::Exit)
            }
            Ok(target) = self.commands.jump.recv_async() => {
                debug!("Jumping to {:?}", target);
                PlayOutcome::step(NextStep::Resume(target))
            }
            Ok(()) = self.commands.skip.recv_async() => {
                debug!("Skipping {}", url);
                PlayOutcome::step(NextStep::Advance)
            }
            Ok(()) = reload_rx.recv_async() => {
                info!("Stream URL about to expire, reloading");
                PlayOutcome::step(NextStep::Resume(resume_point(&**media, &*stream)))
            }
            _ = item_token.cancelled() => {
                info!("Worker cancelled while playing");
                PlayOutcome::step(NextStep::Exit)
            }
        };

        encoder.cleanup();
        let _ = connection.set_speaking(false).await;

        {
            let mut state = self.core.state.write();
            state.last_completed = Some(media.clone());
            state.current = None;
            // A jump is only validated against the item it was sent for.
            if !matches!(outcome.next, NextStep::Resume(_)) {
                let _ = self.commands.jump.try_recv();
            }
        }

        outcome
    }

    /// Reuse the live connection or (re)join the configured channel.
    async fn ensure_connection(&self) -> Result<Arc<dyn VoiceConnection>, PlaybackError> {
        if let Some(connection) = &self.connection {
            if connection.is_ready() {
                return Ok(connection.clone());
            }
        }

        let channel_id = self
            .core
            .state
            .read()
            .channel_id
            .clone()
            .ok_or_else(|| PlaybackError::Connect("no voice channel set".into()))?;

        debug!("Joining voice channel {}", channel_id);
        self.core
            .transport
            .join(&self.core.guild_id, &channel_id)
            .await
            .map_err(|e| PlaybackError::Connect(e.to_string()))
    }
}

/// Await `fut` unless `token` is cancelled first.
async fn until_cancelled<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        output = fut => Some(output),
        _ = token.cancelled() => None,
    }
}

fn resume_point(media: &dyn Media, stream: &dyn StreamHandle) -> Duration {
    if media.can_seek() {
        stream.playback_position()
    } else {
        Duration::ZERO
    }
}

fn after_transport_drop(media: &dyn Media, stream: &dyn StreamHandle) -> NextStep {
    let position = stream.playback_position();

    if let Some(total) = media.duration() {
        if total.saturating_sub(position) < NEAR_END_THRESHOLD {
            debug!("Voice connection dropped near the end, treating as finished");
            return NextStep::Advance;
        }
    }

    warn!("Voice connection dropped at {:?}, resuming", position);
    NextStep::Resume(resume_point(media, stream))
}

/// Signals `reload` once `expires_at` is within [`URL_EXPIRY_LEAD`].
async fn watch_url_expiry(
    expires_at: OffsetDateTime,
    reload: flume::Sender<()>,
    token: CancellationToken,
) {
    let reload_at = expires_at - URL_EXPIRY_LEAD;

    loop {
        if OffsetDateTime::now_utc() >= reload_at {
            let _ = reload.try_send(());
            return;
        }

        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(URL_EXPIRY_POLL_INTERVAL) => {}
        }
    }
}
