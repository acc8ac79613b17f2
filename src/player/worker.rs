use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    common::errors::PlaylistError,
    media::Media,
    player::{
        commands::CommandReceivers,
        constants::IDLE_LOOP_DELAY,
        playback::{NextStep, PlayOutcome},
        session::SessionCore,
    },
    voice::VoiceConnection,
};

/// The single task that owns a session's voice connection while active.
pub(crate) struct VoiceWorker {
    pub(super) core: Arc<SessionCore>,
    pub(super) commands: CommandReceivers,
    pub(super) token: CancellationToken,
    pub(super) exited: CancellationToken,
    pub(super) connection: Option<Arc<dyn VoiceConnection>>,
}

impl VoiceWorker {
    pub fn new(
        core: Arc<SessionCore>,
        commands: CommandReceivers,
        token: CancellationToken,
        exited: CancellationToken,
    ) -> Self {
        Self {
            core,
            commands,
            token,
            exited,
            connection: None,
        }
    }

    /// Run until told to leave or cancelled, then tear down. Teardown also
    /// runs if the loop panics.
    pub async fn run(mut self) {
        debug!("Voice worker started");

        if AssertUnwindSafe(self.drive()).catch_unwind().await.is_err() {
            error!("Voice worker panicked, tearing down");
        }

        self.teardown().await;
    }

    async fn drive(&mut self) {
        'worker: loop {
            if let Some(media) = self.next_media() {
                let mut start_at = Duration::ZERO;
                let mut is_reload = false;

                loop {
                    self.core.callbacks.notify_next_media(&media, is_reload);

                    let PlayOutcome { error, next } = self.play_media(&media, start_at).await;

                    if let Some(e) = error {
                        warn!("Error occurred while playing {}: {}", media.file_url(), e);
                        self.core.callbacks.notify_error(&media, e);
                    }

                    match next {
                        NextStep::Exit => break 'worker,
                        NextStep::Advance => break,
                        NextStep::Resume(at) => {
                            start_at = at;
                            is_reload = true;
                        }
                    }
                }
            }

            if self.commands.leave.try_recv().is_ok() {
                debug!("Leave requested while idle");
                break;
            }
            if self.token.is_cancelled() {
                debug!("Worker cancelled while idle");
                break;
            }
            if self.commands.replay.try_recv().is_ok() {
                self.requeue_last_completed();
            }

            tokio::time::sleep(IDLE_LOOP_DELAY).await;
        }
    }

    /// Queue first, then the playlist. An exhausted playlist is detached.
    fn next_media(&self) -> Option<Arc<dyn Media>> {
        let playlist = {
            let mut state = self.core.state.write();
            if let Some(media) = state.queue.consume() {
                return Some(media);
            }
            state.playlist.clone()?
        };

        match playlist.consume_next() {
            Ok(media) => Some(media),
            Err(PlaylistError::Empty) => {
                info!("Playlist '{}' finished", playlist.title());
                let mut state = self.core.state.write();
                if state
                    .playlist
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &playlist))
                {
                    state.playlist = None;
                }
                None
            }
            Err(e) => {
                warn!("Failed to consume playlist '{}': {}", playlist.title(), e);
                None
            }
        }
    }

    fn requeue_last_completed(&self) {
        let mut state = self.core.state.write();
        let Some(media) = state.last_completed.clone() else {
            debug!("Replay requested but nothing has completed yet");
            return;
        };

        if let Err(e) = state.queue.enqueue(media) {
            warn!("Could not queue replay: {}", e);
        }
    }

    async fn teardown(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.disconnect().await {
                warn!("Voice disconnect failed: {}", e);
            }
        }

        let handle = self.core.state.write().reset_after_worker();
        // dropping the handle closes the command mailboxes
        drop(handle);

        info!("Exited voice channel");
        self.token.cancel();
        self.exited.cancel();
    }
}
