//! Error types shared across the player.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by an [`AudioOutput`](crate::audio::AudioOutput).
#[derive(Debug, Error)]
pub enum OutputError {
    /// No audio device could be opened.
    #[error("no audio output device: {0}")]
    Device(String),

    /// The track file could not be opened.
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The track file could not be decoded.
    #[error("failed to decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Seeking inside the current track failed.
    #[error("seek failed: {0}")]
    Seek(String),

    /// An operation needed a loaded track and there was none.
    #[error("no track loaded")]
    NothingLoaded,
}

/// Failures while building a playlist from disk.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid playlist manifest {path:?}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0:?} is neither a directory nor a .toml playlist manifest")]
    UnsupportedSource(PathBuf),
}
