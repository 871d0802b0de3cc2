use std::path::PathBuf;

use thiserror::Error;

/// Why a stem could not be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    Missing,
    Unreadable,
    Unsupported,
    Empty,
}

/// Errors returned when loading a song. Never raised mid-playback.
#[derive(Debug, Error)]
pub enum AudioLoadError {
    /// The stem file does not exist
    #[error("Stem file not found: {}", path.display())]
    Missing { path: PathBuf },

    /// The file exists but could not be read or decoded
    #[error("Failed to read {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    /// The container or codec is not supported
    #[error("Unsupported audio format in {}: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: String },

    /// The file decoded to zero frames
    #[error("Stem file contains no audio: {}", path.display())]
    Empty { path: PathBuf },
}

impl AudioLoadError {
    pub fn path(&self) -> &PathBuf {
        match self {
            AudioLoadError::Missing { path }
            | AudioLoadError::Unreadable { path, .. }
            | AudioLoadError::Unsupported { path, .. }
            | AudioLoadError::Empty { path } => path,
        }
    }

    pub fn failure(&self) -> LoadFailure {
        match self {
            AudioLoadError::Missing { .. } => LoadFailure::Missing,
            AudioLoadError::Unreadable { .. } => LoadFailure::Unreadable,
            AudioLoadError::Unsupported { .. } => LoadFailure::Unsupported,
            AudioLoadError::Empty { .. } => LoadFailure::Empty,
        }
    }
}

/// Song library and stem resolution errors
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Library version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("No '{stem}' stem found in {}", folder.display())]
    StemNotFound { stem: &'static str, folder: PathBuf },

    #[error("Song not found: {0}")]
    SongNotFound(String),
}

/// Processing job queue errors
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Status request for session {session_id} failed: {reason}")]
    Provider { session_id: String, reason: String },

    #[error("Failed to persist processing queue: {0}")]
    Storage(#[from] LibraryError),
}
