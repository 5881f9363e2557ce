use std::path::Path;

use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::Track;

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Category of a file: the first directory below `root` on its path, or the
/// configured default for files sitting directly in `root`.
fn category_for(root: &Path, path: &Path, settings: &LibrarySettings) -> String {
    path.strip_prefix(root)
        .ok()
        .and_then(|rel| {
            let mut parts = rel.components();
            let first = parts.next()?;
            // A lone component is the file itself.
            parts.next()?;
            first.as_os_str().to_str().map(str::to_string)
        })
        .unwrap_or_else(|| settings.default_category.clone())
}

/// Walk `dir` and collect audio files as tracks with unknown durations.
///
/// Nothing is decoded here; durations are probed in the background once the
/// playlist is handed to the coordinator.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file()
            && (settings.include_hidden || !is_hidden(path))
            && is_audio_file(path, settings)
        {
            let title = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("UNKNOWN")
                .to_string();
            let category = category_for(dir, path, settings);

            tracks.push(Track::new(title, path, category));
        }
    }

    tracks.sort_by(|a, b| {
        let a = a.path.to_string_lossy().to_lowercase();
        let b = b.path.to_string_lossy().to_lowercase();
        a.cmp(&b)
    });
    tracks
}
