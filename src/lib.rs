pub mod audio;
pub mod common;
pub mod configs;
pub mod media;
pub mod player;
pub mod voice;

#[cfg(test)]
mod testing;

pub use common::errors::{PlaybackError, PlayerError, PlaylistError};
pub use player::{Collaborators, MusicSession, SessionOptions};
