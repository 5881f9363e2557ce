//! Events pushed from the coordinator to every registered player surface.

use std::time::Duration;

use crate::library::Track;

/// A change in the shared playback state.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The playlist was set; emitted once.
    PlaylistReady { tracks: Vec<Track> },
    /// A new track was selected and loaded (position is back at zero).
    TrackChanged { index: usize, track: Track },
    /// Playback started or stopped.
    PlayStateChanged { is_playing: bool },
    /// Periodic progress while playing, and after every seek.
    PositionUpdated {
        position: Duration,
        duration: Option<Duration>,
    },
    /// The duration of one playlist entry became known.
    MetadataLoaded { index: usize, duration: Duration },
    VolumeChanged { volume: f32 },
}

/// Point-in-time copy of the coordinator's playback state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSnapshot {
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub position: Duration,
    pub volume: f32,
}
