use std::{collections::VecDeque, sync::Arc};

use crate::{common::errors::PlayerError, media::Media};

/// Bounded FIFO of pending media.
///
/// Not synchronised on its own: it lives inside the session state and is only
/// touched under the session lock.
pub struct MediaQueue {
    items: VecDeque<Arc<dyn Media>>,
    capacity: usize,
}

impl MediaQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append at the tail. A full queue is left untouched.
    pub fn enqueue(&mut self, media: Arc<dyn Media>) -> Result<(), PlayerError> {
        if self.items.len() >= self.capacity {
            return Err(PlayerError::QueueFull);
        }
        self.items.push_back(media);
        Ok(())
    }

    pub fn consume(&mut self) -> Option<Arc<dyn Media>> {
        self.items.pop_front()
    }

    /// Returns whether anything was removed.
    pub fn clear(&mut self) -> bool {
        let had_items = !self.items.is_empty();
        self.items.clear();
        had_items
    }

    pub fn snapshot(&self) -> Vec<Arc<dyn Media>> {
        self.items.iter().cloned().collect()
    }
}
