use std::{
    sync::atomic::{AtomicU8, AtomicU64, Ordering},
    time::Duration,
};

use crate::audio::{constants::SAMPLE_RATE, pipeline::StreamHandle};

#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(u8)]
pub enum PlaybackState {
    Playing = 0,
    Paused = 1,
    Stopped = 2,
}

impl PlaybackState {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Playing,
            1 => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

/// Shared position/pause state of one stream.
///
/// The sending side calls [`PlaybackClock::advance`] per frame and checks
/// [`PlaybackClock::is_paused`]; the session reads it through
/// [`StreamHandle`].
#[derive(Debug)]
pub struct PlaybackClock {
    state: AtomicU8,
    position: AtomicU64, // position in samples
}

impl PlaybackClock {
    pub fn new(start: Duration) -> Self {
        Self {
            state: AtomicU8::new(PlaybackState::Playing as u8),
            position: AtomicU64::new(duration_to_samples(start)),
        }
    }

    pub fn pause(&self) {
        self.transition(PlaybackState::Paused);
    }

    pub fn play(&self) {
        self.transition(PlaybackState::Playing);
    }

    pub fn stop(&self) {
        self.state
            .store(PlaybackState::Stopped as u8, Ordering::Release);
    }

    pub fn get_state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_paused(&self) -> bool {
        self.get_state() == PlaybackState::Paused
    }

    /// Record `samples` more samples as sent. Ignored unless playing.
    pub fn advance(&self, samples: u64) {
        if self.get_state() == PlaybackState::Playing {
            self.position.fetch_add(samples, Ordering::AcqRel);
        }
    }

    pub fn set_position(&self, position: Duration) {
        self.position
            .store(duration_to_samples(position), Ordering::Release);
    }

    pub fn position(&self) -> Duration {
        let samples = self.position.load(Ordering::Acquire);
        Duration::from_micros(samples * 1_000_000 / SAMPLE_RATE)
    }

    // A stopped clock stays stopped.
    fn transition(&self, next: PlaybackState) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (PlaybackState::from_u8(s) != PlaybackState::Stopped).then_some(next as u8)
            });
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl StreamHandle for PlaybackClock {
    fn playback_position(&self) -> Duration {
        self.position()
    }

    fn set_paused(&self, paused: bool) {
        if paused { self.pause() } else { self.play() }
    }

    fn paused(&self) -> bool {
        self.is_paused()
    }
}

fn duration_to_samples(d: Duration) -> u64 {
    (d.as_micros() as u64) * SAMPLE_RATE / 1_000_000
}
