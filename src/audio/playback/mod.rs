pub mod handle;

pub use handle::{PlaybackClock, PlaybackState};
