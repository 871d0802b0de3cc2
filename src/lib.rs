//! Synchronized four-stem playback: vocals, other, drums and bass rendered
//! sample-locked through one output stream, with per-stem volume, mute and
//! solo.

pub mod audio;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod fader;
pub mod jobs;
pub mod library;
pub mod player;
pub mod transport;

#[cfg(test)]
mod testutil;

pub use error::{AudioLoadError, JobError, LibraryError, LoadFailure};
pub use player::{PlayerOptions, StemPlayer};
