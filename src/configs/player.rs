use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-session playback and auto-leave settings.
///
/// Durations are stored in milliseconds so they stay readable in toml; a zero
/// idle timeout disables that watchdog trigger.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_media_queue_max_size")]
    pub media_queue_max_size: usize,
    #[serde(default)]
    pub idle_channel_timeout_ms: u64,
    #[serde(default)]
    pub idle_queue_timeout_ms: u64,
    #[serde(default = "default_idle_poll_interval_ms")]
    pub idle_poll_interval_ms: u64,
    #[serde(default = "default_leave_timeout_ms")]
    pub leave_timeout_ms: u64,
}

impl PlayerConfig {
    pub fn queue_capacity(&self) -> usize {
        if self.media_queue_max_size == 0 {
            default_media_queue_max_size()
        } else {
            self.media_queue_max_size
        }
    }

    pub fn idle_channel_timeout(&self) -> Option<Duration> {
        non_zero_ms(self.idle_channel_timeout_ms)
    }

    pub fn idle_queue_timeout(&self) -> Option<Duration> {
        non_zero_ms(self.idle_queue_timeout_ms)
    }

    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_interval_ms.max(1))
    }

    pub fn leave_timeout(&self) -> Duration {
        Duration::from_millis(self.leave_timeout_ms)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            media_queue_max_size: default_media_queue_max_size(),
            idle_channel_timeout_ms: 0,
            idle_queue_timeout_ms: 0,
            idle_poll_interval_ms: default_idle_poll_interval_ms(),
            leave_timeout_ms: default_leave_timeout_ms(),
        }
    }
}

fn non_zero_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn default_media_queue_max_size() -> usize {
    100
}

fn default_idle_poll_interval_ms() -> u64 {
    10_000
}

fn default_leave_timeout_ms() -> u64 {
    5_000
}
