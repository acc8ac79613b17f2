pub mod callbacks;
mod commands;
pub mod constants;
mod playback;
pub mod session;
mod state;
mod watchdog;
mod worker;

pub use callbacks::{ErrorCallback, NextMediaCallback};
pub use session::{Collaborators, MusicSession, SessionOptions};
