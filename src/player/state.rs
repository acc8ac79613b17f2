use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    audio::StreamHandle,
    common::types::ChannelId,
    media::{Media, MediaQueue, Playlist},
    player::commands::Mailbox,
};

/// The item in flight and the handles of its stream.
pub(crate) struct CurrentPlayback {
    pub media: Arc<dyn Media>,
    pub stream: Arc<dyn StreamHandle>,
}

/// Present exactly while a worker task is alive.
pub(crate) struct WorkerHandle {
    /// Cancelled once teardown has fully completed.
    pub exited: CancellationToken,
    pub mailbox: Mailbox,
}

/// Everything guarded by the session lock.
pub(crate) struct SessionState {
    pub channel_id: Option<ChannelId>,
    pub current: Option<CurrentPlayback>,
    pub last_completed: Option<Arc<dyn Media>>,
    pub queue: MediaQueue,
    pub playlist: Option<Arc<dyn Playlist>>,
    pub worker: Option<WorkerHandle>,
}

impl SessionState {
    pub fn new(channel_id: Option<ChannelId>, queue_capacity: usize) -> Self {
        Self {
            channel_id,
            current: None,
            last_completed: None,
            queue: MediaQueue::new(queue_capacity),
            playlist: None,
            worker: None,
        }
    }

    pub fn is_worker_active(&self) -> bool {
        self.worker.is_some()
    }

    /// Worker exit: drops the mailbox and forgets all pending playback.
    /// `last_completed` survives so a later replay can restart it.
    pub fn reset_after_worker(&mut self) -> Option<WorkerHandle> {
        self.current = None;
        self.queue.clear();
        self.playlist = None;
        self.worker.take()
    }
}
