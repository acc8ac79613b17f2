use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    common::errors::PlaylistError,
    media::{ConsumeOrder, Media, Playlist},
};

struct PlaylistState {
    items: Vec<Arc<dyn Media>>,
    order: ConsumeOrder,
    remove_on_consume: bool,
    next_index: usize,
    rng: StdRng,
}

/// In-memory playlist supporting both consume orders.
///
/// With `remove_on_consume` disabled, `FromStart` wraps around and the
/// playlist never runs dry.
pub struct MemoryPlaylist {
    title: String,
    state: Mutex<PlaylistState>,
}

impl MemoryPlaylist {
    pub fn new(title: impl Into<String>, items: Vec<Arc<dyn Media>>) -> Self {
        Self {
            title: title.into(),
            state: Mutex::new(PlaylistState {
                items,
                order: ConsumeOrder::FromStart,
                remove_on_consume: true,
                next_index: 0,
                rng: StdRng::from_entropy(),
            }),
        }
    }

    /// Deterministic shuffle order, mostly useful in tests.
    pub fn with_seed(self, seed: u64) -> Self {
        self.state.lock().rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn push(&self, media: Arc<dyn Media>) {
        self.state.lock().items.push(media);
    }
}

impl Playlist for MemoryPlaylist {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn consume_next(&self) -> Result<Arc<dyn Media>, PlaylistError> {
        let mut state = self.state.lock();
        let len = state.items.len();
        if len == 0 {
            return Err(PlaylistError::Empty);
        }

        let index = match state.order {
            ConsumeOrder::FromStart => {
                if state.remove_on_consume {
                    0
                } else {
                    let index = state.next_index % len;
                    state.next_index = state.next_index.wrapping_add(1);
                    index
                }
            }
            ConsumeOrder::Shuffle => state.rng.gen_range(0..len),
        };

        if state.remove_on_consume {
            Ok(state.items.remove(index))
        } else {
            Ok(state.items[index].clone())
        }
    }

    fn media_count(&self) -> usize {
        self.state.lock().items.len()
    }

    fn available_consume_orders(&self) -> Vec<ConsumeOrder> {
        vec![ConsumeOrder::FromStart, ConsumeOrder::Shuffle]
    }

    fn consume_order(&self) -> ConsumeOrder {
        self.state.lock().order
    }

    fn set_consume_order(&self, order: ConsumeOrder) -> Result<(), PlaylistError> {
        self.state.lock().order = order;
        Ok(())
    }

    fn remove_on_consume(&self) -> bool {
        self.state.lock().remove_on_consume
    }

    fn set_remove_on_consume(&self, remove: bool) {
        self.state.lock().remove_on_consume = remove;
    }

    fn duration_left(&self) -> Option<Duration> {
        Some(
            self.state
                .lock()
                .items
                .iter()
                .filter_map(|m| m.duration())
                .sum(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMedia;

    fn three() -> Vec<Arc<dyn Media>> {
        (0..3).map(|_| MockMedia::arc()).collect()
    }

    #[test]
    fn test_from_start_removes_in_order() {
        let items = three();
        let playlist = MemoryPlaylist::new("mix", items.clone());

        for expected in &items {
            let got = playlist.consume_next().unwrap();
            assert!(Arc::ptr_eq(&got, expected));
        }
        assert_eq!(playlist.consume_next().err(), Some(PlaylistError::Empty));
        assert_eq!(playlist.media_count(), 0);
    }

    #[test]
    fn test_from_start_wraps_when_keeping_items() {
        let items = three();
        let playlist = MemoryPlaylist::new("loop", items.clone());
        playlist.set_remove_on_consume(false);

        for round in 0..2 {
            for expected in &items {
                let got = playlist.consume_next().unwrap();
                assert!(Arc::ptr_eq(&got, expected), "round {round}");
            }
        }
        assert_eq!(playlist.media_count(), 3);
    }

    #[test]
    fn test_shuffle_drains_every_item_once() {
        let items = three();
        let playlist = MemoryPlaylist::new("shuffled", items.clone()).with_seed(7);
        playlist.set_consume_order(ConsumeOrder::Shuffle).unwrap();

        let mut seen = Vec::new();
        while let Ok(media) = playlist.consume_next() {
            seen.push(media);
        }

        assert_eq!(seen.len(), 3);
        for expected in &items {
            assert_eq!(seen.iter().filter(|m| Arc::ptr_eq(m, expected)).count(), 1);
        }
    }

    #[test]
    fn test_duration_left_sums_known_durations() {
        let playlist = MemoryPlaylist::new("mix", three());
        playlist.push(MockMedia::live());
        assert_eq!(playlist.duration_left(), Some(Duration::from_secs(180)));
        assert_eq!(
            playlist.available_consume_orders(),
            vec![ConsumeOrder::FromStart, ConsumeOrder::Shuffle]
        );
    }
}
