use std::{sync::Arc, time::Duration};

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{player::session::SessionCore, voice::PresenceProvider};

/// Cancels the worker after the channel has had no human listeners, or
/// nothing has played, for longer than the configured limits.
pub(crate) struct IdleWatchdog {
    core: Arc<SessionCore>,
    token: CancellationToken,
    presence: Option<Arc<dyn PresenceProvider>>,
    channel_timeout: Option<Duration>,
    queue_timeout: Option<Duration>,
    poll_interval: Duration,
}

impl IdleWatchdog {
    /// `None` when no idle trigger is configured.
    pub fn new(core: Arc<SessionCore>, token: CancellationToken) -> Option<Self> {
        let mut channel_timeout = core.config.idle_channel_timeout();
        let queue_timeout = core.config.idle_queue_timeout();
        let presence = core.presence.clone();

        if channel_timeout.is_some() && presence.is_none() {
            warn!("idle_channel_timeout_ms is set but no presence provider is available");
            channel_timeout = None;
        }

        if channel_timeout.is_none() && queue_timeout.is_none() {
            return None;
        }

        Some(Self {
            poll_interval: core.config.idle_poll_interval(),
            core,
            token,
            presence,
            channel_timeout,
            queue_timeout,
        })
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_occupied = Instant::now();
        let mut last_active = Instant::now();

        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = interval.tick() => {}
            }

            let now = Instant::now();

            if let Some(limit) = self.channel_timeout {
                if self.channel_occupied().await {
                    last_occupied = now;
                } else if now.duration_since(last_occupied) >= limit {
                    info!("No listeners for {:?}, leaving", limit);
                    self.token.cancel();
                    break;
                }
            }

            if let Some(limit) = self.queue_timeout {
                if self.core.state.read().current.is_some() {
                    last_active = now;
                } else if now.duration_since(last_active) >= limit {
                    info!("Nothing played for {:?}, leaving", limit);
                    self.token.cancel();
                    break;
                }
            }
        }

        debug!("Idle watchdog stopped");
    }

    /// Lookup failures count as occupied; leaving on bad data would be worse
    /// than staying a little longer.
    async fn channel_occupied(&self) -> bool {
        let Some(presence) = &self.presence else {
            return true;
        };
        let Some(channel_id) = self.core.state.read().channel_id.clone() else {
            return true;
        };

        match presence
            .has_non_bot_members(&self.core.guild_id, &channel_id)
            .await
        {
            Ok(occupied) => occupied,
            Err(e) => {
                warn!("Presence lookup failed: {}", e);
                true
            }
        }
    }
}
