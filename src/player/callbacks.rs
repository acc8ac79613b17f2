use std::sync::Arc;

use parking_lot::RwLock;

use crate::{common::errors::PlaybackError, media::Media};

/// Called before every play attempt. The flag is `true` when the same item
/// is being restarted (resume, jump or URL reload).
pub type NextMediaCallback = Arc<dyn Fn(Arc<dyn Media>, bool) + Send + Sync>;

/// Called after a play attempt failed.
pub type ErrorCallback = Arc<dyn Fn(Arc<dyn Media>, PlaybackError) + Send + Sync>;

/// Append-only observer lists.
///
/// Dispatch snapshots the list and runs it on a spawned task, so a slow
/// observer never stalls the worker.
#[derive(Default)]
pub(crate) struct CallbackRegistry {
    next_media: RwLock<Vec<NextMediaCallback>>,
    error: RwLock<Vec<ErrorCallback>>,
}

impl CallbackRegistry {
    pub fn add_next_media(&self, cb: NextMediaCallback) {
        self.next_media.write().push(cb);
    }

    pub fn add_error(&self, cb: ErrorCallback) {
        self.error.write().push(cb);
    }

    pub fn notify_next_media(&self, media: &Arc<dyn Media>, is_reload: bool) {
        let callbacks = self.next_media.read().clone();
        if callbacks.is_empty() {
            return;
        }

        let media = media.clone();
        tokio::spawn(async move {
            for cb in callbacks {
                cb(media.clone(), is_reload);
            }
        });
    }

    pub fn notify_error(&self, media: &Arc<dyn Media>, error: PlaybackError) {
        let callbacks = self.error.read().clone();
        if callbacks.is_empty() {
            return;
        }

        let media = media.clone();
        tokio::spawn(async move {
            for cb in callbacks {
                cb(media.clone(), error.clone());
            }
        });
    }
}
