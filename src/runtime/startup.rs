use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::audio::{AudioOutput, RodioOutput, SilentOutput};
use crate::config::{LibrarySettings, LoggingSettings};
use crate::error::LibraryError;
use crate::library::{self, Track};

/// Environment variable overriding `logging.filter`.
const LOG_ENV: &str = "PLAYDECK_LOG";

/// Install the file logger when `logging.file` is set.
///
/// The TUI owns stdout and stderr, so without a file nothing is logged.
pub fn init_logging(settings: &LoggingSettings) {
    let Some(path) = settings.file.as_ref() else {
        return;
    };

    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("playdeck: cannot open log file {}: {e}", path.display());
            return;
        }
    };

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("playdeck=info"));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    if let Err(e) = installed {
        eprintln!("playdeck: logging disabled: {e}");
    }
}

/// Open the default audio device, or a silent stand-in when there is none.
pub fn open_output(volume: f32) -> Box<dyn AudioOutput> {
    match RodioOutput::open(volume) {
        Ok(output) => Box::new(output),
        Err(e) => {
            warn!(error = %e, "no audio device; continuing without sound");
            Box::new(SilentOutput::new())
        }
    }
}

/// Build the playlist from a directory or a `.toml` manifest.
pub fn load_playlist(source: &Path, settings: &LibrarySettings) -> Result<Vec<Track>, LibraryError> {
    let tracks = library::load(source, settings)?;
    info!(source = %source.display(), tracks = tracks.len(), "playlist loaded");
    Ok(tracks)
}
