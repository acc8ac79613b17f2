use std::time::Duration;

/// A dropped transport this close to the end of a track ends it instead of
/// resuming.
pub const NEAR_END_THRESHOLD: Duration = Duration::from_secs(2);

/// Reload a stream URL once its expiry is this close.
pub const URL_EXPIRY_LEAD: Duration = Duration::from_secs(10);

/// How often a pending URL expiry is re-checked.
pub const URL_EXPIRY_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Pause between worker iterations while nothing is playing.
pub const IDLE_LOOP_DELAY: Duration = Duration::from_millis(50);
