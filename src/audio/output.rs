use std::path::Path;
use std::thread;
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::error::OutputError;

use super::sink::open_paused_sink;

/// The single playback resource behind the coordinator.
///
/// Implementations hold at most one loaded track. `load` replaces whatever
/// was loaded before and leaves the new track paused at position zero.
pub trait AudioOutput {
    /// Load `path`, returning its total duration when the decoder knows it.
    fn load(&mut self, path: &Path) -> Result<Option<Duration>, OutputError>;
    fn play(&mut self) -> Result<(), OutputError>;
    fn pause(&mut self);
    /// Stop and unload the current track.
    fn stop(&mut self);
    fn seek(&mut self, position: Duration) -> Result<(), OutputError>;
    /// `volume` is already clamped to `[0, 1]` by the caller.
    fn set_volume(&mut self, volume: f32);
    fn position(&self) -> Duration;
    /// Whether the loaded track has played through to its end.
    fn is_finished(&self) -> bool;
    /// Ramp the volume down over `duration`, then stop.
    fn fade_out(&mut self, duration: Duration) {
        let _ = duration;
        self.stop();
    }
}

/// [`AudioOutput`] backed by the default `rodio` output device.
pub struct RodioOutput {
    stream: OutputStream,
    sink: Option<Sink>,
    volume: f32,
}

impl RodioOutput {
    /// Open the default output device.
    pub fn open(volume: f32) -> Result<Self, OutputError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| OutputError::Device(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped. That's useful in debugging,
        // but noisy for a TUI app.
        stream.log_on_drop(false);

        Ok(Self {
            stream,
            sink: None,
            volume: volume.clamp(0.0, 1.0),
        })
    }
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, path: &Path) -> Result<Option<Duration>, OutputError> {
        self.stop();
        let (sink, total) = open_paused_sink(&self.stream, path, self.volume)?;
        self.sink = Some(sink);
        Ok(total)
    }

    fn play(&mut self) -> Result<(), OutputError> {
        let sink = self.sink.as_ref().ok_or(OutputError::NothingLoaded)?;
        sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.pause();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn seek(&mut self, position: Duration) -> Result<(), OutputError> {
        let sink = self.sink.as_ref().ok_or(OutputError::NothingLoaded)?;
        sink.try_seek(position)
            .map_err(|e| OutputError::Seek(e.to_string()))
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(volume);
        }
    }

    fn position(&self) -> Duration {
        self.sink
            .as_ref()
            .map(|s| s.get_pos())
            .unwrap_or(Duration::ZERO)
    }

    fn is_finished(&self) -> bool {
        self.sink.as_ref().map(|s| s.empty()).unwrap_or(false)
    }

    fn fade_out(&mut self, duration: Duration) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        let fade_out_ms = duration.as_millis() as u64;
        if fade_out_ms > 0 && !sink.is_paused() {
            let steps: u64 = 20;
            let step_ms = (fade_out_ms / steps).max(1);
            for step in 1..=steps {
                let t = step as f32 / steps as f32;
                sink.set_volume(self.volume * (1.0 - t));
                thread::sleep(Duration::from_millis(step_ms));
            }
        }
        self.stop();
    }
}
