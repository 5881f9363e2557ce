use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/playdeck/config.toml` or `~/.config/playdeck/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `PLAYDECK__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub probe: ProbeSettings,
    pub library: LibrarySettings,
    pub ui: UiSettings,
    pub controls: ControlsSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Volume applied when the output is opened, in `[0, 1]`.
    pub initial_volume: f32,
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            initial_volume: 0.8,
            quit_fade_out_ms: 300,
        }
    }
}

/// Background duration probing for tracks whose length is not known up front.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub enabled: bool,
    /// Time budget for one batch of probes (milliseconds). Probes still
    /// running when it expires are treated as failed.
    pub timeout_ms: u64,
    /// How many files are probed concurrently.
    pub batch_size: usize,
    /// Pause between two batches (milliseconds).
    pub batch_pause_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 10_000,
            batch_size: 5,
            batch_pause_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
    /// Category given to files sitting directly in the scanned directory.
    pub default_category: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
            default_category: "Uncategorized".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,

    /// Categories listed first, in this order. Categories not named here
    /// follow in the order they first appear in the playlist.
    ///
    /// Example: ["Ambient", "Electronic", "Orchestral"]
    pub category_order: Vec<String>,

    /// Whether to show the floating mini player under the main view.
    pub mini_player: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ playdeck ~ ".to_string(),
            category_order: vec![
                "Ambient".to_string(),
                "Electronic".to_string(),
                "Orchestral".to_string(),
            ],
            mini_player: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Percentage of the track to skip when pressing `H` / `L`.
    pub seek_step_percent: u8,
    /// Volume change per `+` / `-` press, in percent.
    pub volume_step_percent: u8,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            seek_step_percent: 5,
            volume_step_percent: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log file. Nothing is logged when unset, since the terminal belongs to the UI.
    pub file: Option<PathBuf>,
    /// `tracing` filter directive used when `PLAYDECK_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: None,
            filter: "playdeck=info".to_string(),
        }
    }
}
