pub mod constants;
pub mod pipeline;
pub mod playback;

pub use pipeline::{
    AudioPipeline, Completion, EncodeHandle, EncodeOptions, StreamHandle, StreamSession,
};
pub use playback::{PlaybackClock, PlaybackState};
