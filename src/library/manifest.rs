//! TOML playlist manifests.
//!
//! ```toml
//! [[track]]
//! title = "Drift"
//! file = "ambient/drift.mp3"
//! category = "Ambient"
//! duration_secs = 241  # optional
//! ```
//!
//! Relative `file` entries resolve against the manifest's directory.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::LibraryError;

use super::model::Track;

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "track")]
    tracks: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    title: String,
    file: String,
    category: String,
    duration_secs: Option<u64>,
}

pub(super) fn parse(text: &str, base: &Path, origin: &Path) -> Result<Vec<Track>, LibraryError> {
    let manifest: Manifest = toml::from_str(text).map_err(|source| LibraryError::Manifest {
        path: origin.to_path_buf(),
        source,
    })?;

    Ok(manifest
        .tracks
        .into_iter()
        .map(|entry| {
            let file = Path::new(&entry.file);
            let path = if file.is_absolute() {
                file.to_path_buf()
            } else {
                base.join(file)
            };
            Track {
                title: entry.title,
                path,
                category: entry.category,
                duration: entry.duration_secs.map(Duration::from_secs),
            }
        })
        .collect())
}

pub(super) fn read(path: &Path) -> Result<Vec<Track>, LibraryError> {
    let text = std::fs::read_to_string(path).map_err(|source| LibraryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse(&text, base, path)
}
