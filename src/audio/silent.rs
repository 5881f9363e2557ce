use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::OutputError;

use super::output::AudioOutput;

/// Output used when no audio device is available.
///
/// It accepts every command and keeps the bookkeeping (loaded file, paused
/// flag, seek position, volume) so the rest of the player behaves normally,
/// but produces no sound and never reaches the end of a track.
#[derive(Debug, Default)]
pub struct SilentOutput {
    loaded: Option<PathBuf>,
    playing: bool,
    position: Duration,
    volume: f32,
}

impl SilentOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded(&self) -> Option<&Path> {
        self.loaded.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl AudioOutput for SilentOutput {
    fn load(&mut self, path: &Path) -> Result<Option<Duration>, OutputError> {
        self.loaded = Some(path.to_path_buf());
        self.playing = false;
        self.position = Duration::ZERO;
        Ok(None)
    }

    fn play(&mut self) -> Result<(), OutputError> {
        if self.loaded.is_none() {
            return Err(OutputError::NothingLoaded);
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn stop(&mut self) {
        self.loaded = None;
        self.playing = false;
        self.position = Duration::ZERO;
    }

    fn seek(&mut self, position: Duration) -> Result<(), OutputError> {
        if self.loaded.is_none() {
            return Err(OutputError::NothingLoaded);
        }
        self.position = position;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn is_finished(&self) -> bool {
        false
    }
}
