//! Hand-written collaborators for unit tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::{
    audio::{AudioPipeline, EncodeHandle, EncodeOptions, PlaybackClock, StreamSession},
    common::{
        errors::{PlaybackError, PlaylistError},
        types::{AnyResult, ChannelId, GuildId},
    },
    configs::PlayerConfig,
    media::{Media, Playlist},
    player::{Collaborators, MusicSession, SessionOptions},
    voice::{PresenceProvider, VoiceConnection, VoiceTransport},
};

static NEXT_MEDIA_ID: AtomicUsize = AtomicUsize::new(0);

// -- Media -------------------------------------------------------------------

pub struct MockMedia {
    url: String,
    duration: Option<Duration>,
    seekable: bool,
    expires_at: Mutex<Option<OffsetDateTime>>,
    fail_load: bool,
    loads: AtomicUsize,
}

impl MockMedia {
    /// Seekable, 60 seconds long, URL never expires.
    pub fn new() -> Self {
        let id = NEXT_MEDIA_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            url: format!("https://media.test/{id}.webm"),
            duration: Some(Duration::from_secs(60)),
            seekable: true,
            expires_at: Mutex::new(None),
            fail_load: false,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn arc() -> Arc<dyn Media> {
        Self::new().into_arc()
    }

    /// Live stream: unknown duration, not seekable.
    pub fn live() -> Arc<dyn Media> {
        Self {
            duration: None,
            seekable: false,
            ..Self::new()
        }
        .into_arc()
    }

    pub fn non_seekable(mut self) -> Self {
        self.seekable = false;
        self
    }

    /// The first URL expires after `lead`; every later load pushes the
    /// expiry an hour out.
    pub fn expiring_in(self, lead: time::Duration) -> Self {
        *self.expires_at.lock() = Some(OffsetDateTime::now_utc() + lead);
        self
    }

    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn into_arc(self) -> Arc<dyn Media> {
        Arc::new(self)
    }
}

#[async_trait]
impl Media for MockMedia {
    fn file_url(&self) -> String {
        self.url.clone()
    }

    fn file_url_expires_at(&self) -> Option<OffsetDateTime> {
        *self.expires_at.lock()
    }

    async fn ensure_loaded(&self) -> Result<(), PlaybackError> {
        if self.fail_load {
            return Err(PlaybackError::Load(format!("{} unavailable", self.url)));
        }

        if self.loads.fetch_add(1, Ordering::SeqCst) > 0 {
            let mut expires_at = self.expires_at.lock();
            if expires_at.is_some() {
                *expires_at = Some(OffsetDateTime::now_utc() + time::Duration::hours(1));
            }
        }
        Ok(())
    }

    fn can_seek(&self) -> bool {
        self.seekable
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

/// Playlist with only the mandatory capabilities.
#[derive(Default)]
pub struct FixedPlaylist {
    items: Mutex<Vec<Arc<dyn Media>>>,
}

impl Playlist for FixedPlaylist {
    fn title(&self) -> String {
        "fixed".to_string()
    }

    fn consume_next(&self) -> Result<Arc<dyn Media>, PlaylistError> {
        let mut items = self.items.lock();
        if items.is_empty() {
            return Err(PlaylistError::Empty);
        }
        Ok(items.remove(0))
    }

    fn media_count(&self) -> usize {
        self.items.lock().len()
    }
}

/// Fails once with a source error, then hands out its items.
pub struct FlakyPlaylist {
    failed: AtomicBool,
    items: Mutex<Vec<Arc<dyn Media>>>,
}

impl FlakyPlaylist {
    pub fn new(items: Vec<Arc<dyn Media>>) -> Self {
        Self {
            failed: AtomicBool::new(false),
            items: Mutex::new(items),
        }
    }
}

impl Playlist for FlakyPlaylist {
    fn title(&self) -> String {
        "flaky".to_string()
    }

    fn consume_next(&self) -> Result<Arc<dyn Media>, PlaylistError> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(PlaylistError::Source("upstream timed out".into()));
        }
        let mut items = self.items.lock();
        if items.is_empty() {
            return Err(PlaylistError::Empty);
        }
        Ok(items.remove(0))
    }

    fn media_count(&self) -> usize {
        self.items.lock().len()
    }
}

// -- Voice -------------------------------------------------------------------

pub struct MockConnection {
    ready: AtomicBool,
    speaking: Mutex<Vec<bool>>,
    disconnects: AtomicUsize,
}

impl MockConnection {
    fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            speaking: Mutex::new(Vec::new()),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn last_speaking(&self) -> Option<bool> {
        self.speaking.lock().last().copied()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceConnection for MockConnection {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn set_speaking(&self, speaking: bool) -> AnyResult<()> {
        self.speaking.lock().push(speaking);
        Ok(())
    }

    async fn disconnect(&self) -> AnyResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockTransport {
    pub connection: Arc<MockConnection>,
    joins: AtomicUsize,
    fail: AtomicBool,
    hold: AtomicBool,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            connection: Arc::new(MockConnection::new()),
            joins: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            hold: AtomicBool::new(false),
        }
    }

    pub fn joins(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    pub fn fail_joins(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Joins never complete; only cancellation gets the worker out.
    pub fn hold_joins(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VoiceTransport for MockTransport {
    async fn join(
        &self,
        _guild_id: &GuildId,
        _channel_id: &ChannelId,
    ) -> AnyResult<Arc<dyn VoiceConnection>> {
        self.joins.fetch_add(1, Ordering::SeqCst);

        if self.hold.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err("join refused".into());
        }

        self.connection.set_ready(true);
        Ok(self.connection.clone())
    }
}

pub struct MockPresence {
    occupied: AtomicBool,
    calls: AtomicUsize,
}

impl MockPresence {
    pub fn set_occupied(&self, occupied: bool) {
        self.occupied.store(occupied, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PresenceProvider for MockPresence {
    async fn has_non_bot_members(
        &self,
        _guild_id: &GuildId,
        _channel_id: &ChannelId,
    ) -> AnyResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.occupied.load(Ordering::SeqCst))
    }
}

// -- Audio -------------------------------------------------------------------

struct MockEncoder {
    cleanups: Arc<AtomicUsize>,
    cleaned: AtomicBool,
}

impl EncodeHandle for MockEncoder {
    fn cleanup(&self) {
        if !self.cleaned.swap(true, Ordering::SeqCst) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct MockStream {
    clock: Arc<PlaybackClock>,
    done: flume::Sender<Result<(), PlaybackError>>,
}

/// Streams never finish on their own; tests end them with
/// [`MockPipeline::complete`].
#[derive(Default)]
pub struct MockPipeline {
    encodes: Mutex<Vec<EncodeOptions>>,
    streams: Mutex<Vec<MockStream>>,
    cleanups: Arc<AtomicUsize>,
    fail_encode: AtomicBool,
}

impl MockPipeline {
    pub fn fail_encodes(&self, fail: bool) {
        self.fail_encode.store(fail, Ordering::SeqCst);
    }

    pub fn stream_count(&self) -> usize {
        self.streams.lock().len()
    }

    pub fn encode_offsets(&self) -> Vec<u64> {
        self.encodes
            .lock()
            .iter()
            .map(|o| o.start_offset_secs)
            .collect()
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }

    pub fn clock(&self, index: usize) -> Arc<PlaybackClock> {
        self.streams.lock()[index].clock.clone()
    }

    /// Finish stream `index` with `result`.
    pub fn complete(&self, index: usize, result: Result<(), PlaybackError>) {
        let done = self.streams.lock()[index].done.clone();
        let _ = done.try_send(result);
    }
}

#[async_trait]
impl AudioPipeline for MockPipeline {
    async fn start_encoding(
        &self,
        url: &str,
        options: EncodeOptions,
    ) -> Result<Arc<dyn EncodeHandle>, PlaybackError> {
        if self.fail_encode.load(Ordering::SeqCst) {
            return Err(PlaybackError::Encode(format!("cannot encode {url}")));
        }

        self.encodes.lock().push(options);
        Ok(Arc::new(MockEncoder {
            cleanups: self.cleanups.clone(),
            cleaned: AtomicBool::new(false),
        }))
    }

    fn start_streaming(
        &self,
        _encoder: Arc<dyn EncodeHandle>,
        _connection: Arc<dyn VoiceConnection>,
    ) -> StreamSession {
        let start = self
            .encodes
            .lock()
            .last()
            .map(EncodeOptions::start_offset)
            .unwrap_or_default();
        let clock = Arc::new(PlaybackClock::new(start));
        let (done_tx, done_rx) = flume::bounded(1);

        self.streams.lock().push(MockStream {
            clock: clock.clone(),
            done: done_tx,
        });

        StreamSession {
            stream: clock,
            done: done_rx,
        }
    }
}

// -- Harness -----------------------------------------------------------------

pub struct Harness {
    pub session: MusicSession,
    pub parent: CancellationToken,
    pub transport: Arc<MockTransport>,
    pub pipeline: Arc<MockPipeline>,
    pub presence: Arc<MockPresence>,
}

/// Session for guild "g" joined to channel "1". Presence reports the channel
/// as occupied.
pub fn harness(config: PlayerConfig) -> Harness {
    build(config, Some("1".into()))
}

pub fn harness_without_channel(config: PlayerConfig) -> Harness {
    build(config, None)
}

fn build(config: PlayerConfig, channel_id: Option<ChannelId>) -> Harness {
    let parent = CancellationToken::new();
    let transport = Arc::new(MockTransport::new());
    let pipeline = Arc::new(MockPipeline::default());
    let presence = Arc::new(MockPresence {
        occupied: AtomicBool::new(true),
        calls: AtomicUsize::new(0),
    });

    let session = MusicSession::new(
        parent.clone(),
        SessionOptions {
            guild_id: "g".into(),
            channel_id,
            player: config,
        },
        Collaborators {
            transport: transport.clone(),
            pipeline: pipeline.clone(),
            presence: Some(presence.clone()),
        },
    );

    Harness {
        session,
        parent,
        transport,
        pipeline,
        presence,
    }
}

/// Polls `cond` until it holds, panicking after `timeout`.
pub async fn eventually(timeout: Duration, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
