use crate::config;

/// Load settings, falling back to defaults on any problem.
///
/// Logging is not installed yet at this point (its destination is part of
/// the settings), so problems go to stderr before the UI takes the terminal.
pub fn load_settings() -> config::Settings {
    match config::Settings::load() {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                eprintln!("playdeck: invalid config, using defaults: {msg}");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            // Config is optional; failures should not prevent the app from starting.
            eprintln!("playdeck: failed to load config, using defaults: {e}");
            config::Settings::default()
        }
    }
}
