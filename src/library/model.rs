use std::path::PathBuf;
use std::time::Duration;

/// One entry of the playlist.
///
/// Everything but `duration` is fixed once the playlist is built; the
/// duration may be filled in later by probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub path: PathBuf,
    pub category: String,
    pub duration: Option<Duration>,
}

impl Track {
    pub fn new(title: impl Into<String>, path: impl Into<PathBuf>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            category: category.into(),
            duration: None,
        }
    }
}

/// Format a duration as `M:SS`, or `unknown` when it has not been probed.
pub fn format_duration(d: Option<Duration>) -> String {
    match d {
        Some(d) => {
            let secs = d.as_secs();
            format!("{}:{:02}", secs / 60, secs % 60)
        }
        None => "unknown".to_string(),
    }
}
