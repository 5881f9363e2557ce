//! Playlist sources: directory scanning, TOML manifests and category grouping.

mod category;
mod manifest;
mod model;
mod scan;

use std::path::Path;

use crate::config::LibrarySettings;
use crate::error::LibraryError;

pub use category::{CategoryGroup, group_by_category};
pub use model::{Track, format_duration};

/// Build a playlist from `source`: a `.toml` manifest or a directory to scan.
pub fn load(source: &Path, settings: &LibrarySettings) -> Result<Vec<Track>, LibraryError> {
    if source.is_dir() {
        return Ok(scan::scan(source, settings));
    }

    let is_manifest = source
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    if is_manifest {
        return manifest::read(source);
    }

    Err(LibraryError::UnsupportedSource(source.to_path_buf()))
}
