//! Utilities for creating `rodio` sinks from track files.
//!
//! The helper here encapsulates opening/decoding a file and preparing a
//! paused `Sink` ready to be started by the coordinator.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::error::OutputError;

/// Create a paused `Sink` for the file at `path`.
///
/// Also returns the total duration when the decoder can tell it up front.
pub(super) fn open_paused_sink(
    stream: &OutputStream,
    path: &Path,
    volume: f32,
) -> Result<(Sink, Option<Duration>), OutputError> {
    let file = File::open(path).map_err(|source| OutputError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let source = Decoder::new(BufReader::new(file)).map_err(|e| OutputError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let total = source.total_duration();

    let sink = Sink::connect_new(stream.mixer());
    sink.set_volume(volume);
    sink.append(source);
    sink.pause();
    Ok((sink, total))
}
