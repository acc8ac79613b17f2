use std::{sync::Arc, time::Duration};

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};

use crate::{
    audio::AudioPipeline,
    common::{
        errors::{PlaybackError, PlayerError},
        types::{ChannelId, GuildId},
    },
    configs::PlayerConfig,
    media::{ConsumeOrder, Media, Playlist},
    player::{
        callbacks::CallbackRegistry,
        commands::{self, Mailbox},
        state::{SessionState, WorkerHandle},
        watchdog::IdleWatchdog,
        worker::VoiceWorker,
    },
    voice::{PresenceProvider, VoiceTransport},
};

/// State and collaborators shared by the facade, the worker and the watchdog.
pub(crate) struct SessionCore {
    pub guild_id: GuildId,
    pub config: PlayerConfig,
    pub transport: Arc<dyn VoiceTransport>,
    pub pipeline: Arc<dyn AudioPipeline>,
    pub presence: Option<Arc<dyn PresenceProvider>>,
    pub parent: CancellationToken,
    pub state: RwLock<SessionState>,
    pub callbacks: CallbackRegistry,
}

pub struct SessionOptions {
    pub guild_id: GuildId,
    pub channel_id: Option<ChannelId>,
    pub player: PlayerConfig,
}

/// The external services a session drives.
pub struct Collaborators {
    pub transport: Arc<dyn VoiceTransport>,
    pub pipeline: Arc<dyn AudioPipeline>,
    /// Needed only for the empty-channel auto-leave.
    pub presence: Option<Arc<dyn PresenceProvider>>,
}

/// Playback session for one guild.
///
/// Every method is synchronous except [`MusicSession::set_voice_channel_id`],
/// which may wait for the worker to leave. Commands are posted to single-slot
/// mailboxes and never block on the worker.
#[derive(Clone)]
pub struct MusicSession {
    core: Arc<SessionCore>,
}

impl MusicSession {
    /// Cancelling `parent` stops any running worker.
    pub fn new(
        parent: CancellationToken,
        options: SessionOptions,
        collaborators: Collaborators,
    ) -> Self {
        let state = SessionState::new(options.channel_id, options.player.queue_capacity());

        Self {
            core: Arc::new(SessionCore {
                guild_id: options.guild_id,
                config: options.player,
                transport: collaborators.transport,
                pipeline: collaborators.pipeline,
                presence: collaborators.presence,
                parent,
                state: RwLock::new(state),
                callbacks: CallbackRegistry::default(),
            }),
        }
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.core.guild_id
    }

    pub fn voice_channel_id(&self) -> Option<ChannelId> {
        self.core.state.read().channel_id.clone()
    }

    pub fn is_worker_active(&self) -> bool {
        self.core.state.read().is_worker_active()
    }

    // -- Queue & playlist ---------------------------------------------------

    /// Appends to the queue. Does not start the worker.
    pub fn enqueue_media(&self, media: Arc<dyn Media>) -> Result<(), PlayerError> {
        self.core.state.write().queue.enqueue(media)
    }

    /// Returns whether anything was removed.
    pub fn clear_media_queue(&self) -> bool {
        self.core.state.write().queue.clear()
    }

    pub fn get_media_queue(&self) -> Vec<Arc<dyn Media>> {
        self.core.state.read().queue.snapshot()
    }

    /// Replaces the current playlist. Queued media still plays first.
    pub fn set_playlist(&self, playlist: Arc<dyn Playlist>) {
        self.core.state.write().playlist = Some(playlist);
    }

    /// Returns whether a playlist was set.
    pub fn clear_playlist(&self) -> bool {
        self.core.state.write().playlist.take().is_some()
    }

    pub fn get_current_playlist(&self) -> Option<Arc<dyn Playlist>> {
        self.core.state.read().playlist.clone()
    }

    pub fn set_playlist_consume_order(&self, order: ConsumeOrder) -> Result<(), PlayerError> {
        let playlist = self
            .get_current_playlist()
            .ok_or(PlayerError::NoMediaFound)?;
        playlist.set_consume_order(order)?;
        Ok(())
    }

    // -- Worker lifecycle ---------------------------------------------------

    /// Launches the voice worker.
    ///
    /// The returned token is cancelled once the worker has exited; cancelling
    /// it stops the worker.
    pub fn start(&self) -> Result<CancellationToken, PlayerError> {
        let (token, exited, receivers, channel_id) = {
            let mut state = self.core.state.write();
            if state.is_worker_active() {
                return Err(PlayerError::WorkerAlreadyActive);
            }
            let channel_id = state
                .channel_id
                .clone()
                .ok_or(PlayerError::NoVoiceChannelSet)?;

            let token = self.core.parent.child_token();
            let exited = CancellationToken::new();
            let (mailbox, receivers) = commands::mailbox();
            state.worker = Some(WorkerHandle {
                exited: exited.clone(),
                mailbox,
            });
            (token, exited, receivers, channel_id)
        };

        let span = info_span!("voice", guild = %self.core.guild_id, channel = %channel_id);

        let worker = VoiceWorker::new(self.core.clone(), receivers, token.clone(), exited);
        tokio::spawn(worker.run().instrument(span.clone()));

        if let Some(watchdog) = IdleWatchdog::new(self.core.clone(), token.clone()) {
            tokio::spawn(watchdog.run().instrument(span));
        }

        Ok(token)
    }

    fn post(&self, send: impl FnOnce(&Mailbox) -> Result<(), PlayerError>) -> Result<(), PlayerError> {
        let state = self.core.state.read();
        let worker = state.worker.as_ref().ok_or(PlayerError::WorkerNotActive)?;
        send(&worker.mailbox)
    }

    pub fn leave(&self) -> Result<(), PlayerError> {
        self.post(Mailbox::leave)
    }

    pub fn skip(&self) -> Result<(), PlayerError> {
        self.post(Mailbox::skip)
    }

    /// Plays the last completed item again.
    ///
    /// With no worker running, `force_start` queues that item and starts the
    /// worker instead of failing.
    pub fn replay(&self, force_start: bool) -> Result<(), PlayerError> {
        {
            let mut state = self.core.state.write();
            if let Some(worker) = &state.worker {
                return worker.mailbox.replay();
            }

            let media = state
                .last_completed
                .clone()
                .ok_or(PlayerError::NoMediaFound)?;
            if !force_start {
                return Err(PlayerError::WorkerNotActive);
            }
            if state.channel_id.is_none() {
                return Err(PlayerError::NoVoiceChannelSet);
            }
            state.queue.enqueue(media)?;
        }

        match self.start() {
            Ok(_) | Err(PlayerError::WorkerAlreadyActive) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Restart the current item at `offset`, truncated to whole seconds.
    pub fn jump(&self, offset: time::Duration) -> Result<(), PlayerError> {
        let target = Duration::try_from(offset)
            .map_err(|_| PlayerError::InvalidArgument("jump offset must not be negative"))?;

        let state = self.core.state.read();
        let media = &state
            .current
            .as_ref()
            .ok_or(PlayerError::NoMediaFound)?
            .media;

        if !media.can_seek() {
            return Err(PlayerError::MediaUnsupportedFeature);
        }
        if media.duration().is_some_and(|total| target > total) {
            return Err(PlayerError::InvalidArgument("jump offset beyond media duration"));
        }

        let worker = state.worker.as_ref().ok_or(PlayerError::WorkerNotActive)?;
        worker.mailbox.jump(target)
    }

    // -- Playback status ----------------------------------------------------

    pub fn set_paused(&self, paused: bool) -> Result<(), PlayerError> {
        let state = self.core.state.read();
        let current = state.current.as_ref().ok_or(PlayerError::NotStreaming)?;
        current.stream.set_paused(paused);
        Ok(())
    }

    pub fn is_paused(&self) -> Result<bool, PlayerError> {
        let state = self.core.state.read();
        let current = state.current.as_ref().ok_or(PlayerError::NotStreaming)?;
        Ok(current.stream.paused())
    }

    pub fn get_currently_playing_media(&self) -> Option<Arc<dyn Media>> {
        self.core
            .state
            .read()
            .current
            .as_ref()
            .map(|c| c.media.clone())
    }

    /// Zero when nothing is playing.
    pub fn current_playback_position(&self) -> Duration {
        self.core
            .state
            .read()
            .current
            .as_ref()
            .map(|c| c.stream.playback_position())
            .unwrap_or_default()
    }

    /// Move the session to another voice channel.
    ///
    /// A running worker is asked to leave first and awaited for up to
    /// `leave_timeout_ms`. Returns whether a worker had to be stopped.
    pub async fn set_voice_channel_id(&self, channel_id: ChannelId) -> Result<bool, PlayerError> {
        let running = {
            let state = self.core.state.read();
            if state.channel_id.as_ref() == Some(&channel_id) {
                return Ok(false);
            }
            state
                .worker
                .as_ref()
                .map(|w| (w.exited.clone(), w.mailbox.leave()))
        };

        let stopped = match running {
            None => false,
            Some((exited, sent)) => {
                match sent {
                    Ok(()) | Err(PlayerError::CommandAlreadySent) | Err(PlayerError::WorkerNotActive) => {}
                    Err(e) => return Err(e),
                }

                let limit = self.core.config.leave_timeout();
                tokio::time::timeout(limit, exited.cancelled())
                    .await
                    .map_err(|_| PlayerError::LeaveTimeout(limit))?;
                true
            }
        };

        debug!("Voice channel for {} set to {}", self.core.guild_id, channel_id);
        self.core.state.write().channel_id = Some(channel_id);
        Ok(stopped)
    }

    // -- Callbacks ----------------------------------------------------------

    /// `f(media, is_reload)` runs before every play attempt.
    pub fn add_next_media_callback<F>(&self, f: F)
    where
        F: Fn(Arc<dyn Media>, bool) + Send + Sync + 'static,
    {
        self.core.callbacks.add_next_media(Arc::new(f));
    }

    pub fn add_error_callback<F>(&self, f: F)
    where
        F: Fn(Arc<dyn Media>, PlaybackError) + Send + Sync + 'static,
    {
        self.core.callbacks.add_error(Arc::new(f));
    }
}
