//! Centralized path management for the raidvod CLI
//!
//! Every command resolves the tracking database, configuration file and
//! OAuth files through these helpers so they agree on one location.

use std::path::PathBuf;

/// The name of the application directory used across all platforms
const APP_DIR: &str = "raidvod";

/// The name of the tracking database file
const DATABASE_FILE: &str = "raidvod.db";

/// The name of the configuration file
const CONFIG_FILE: &str = "config.toml";

/// The name of the directory holding OAuth files inside the config dir
const AUTH_SUBDIR: &str = "auth";

/// Returns the base data directory for the application
///
/// - Linux: `~/.local/share/raidvod`
/// - macOS: `~/Library/Application Support/raidvod`
/// - Windows: `%APPDATA%/raidvod`
///
/// Falls back to `.raidvod` in the current directory.
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".raidvod"))
}

/// Returns the default path of the tracking database
pub fn get_database_path() -> PathBuf {
    get_data_dir().join(DATABASE_FILE)
}

/// Returns the configuration directory
///
/// `$XDG_CONFIG_HOME/raidvod` wins on Unix-like systems when set.
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join(APP_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".raidvod"))
}

/// Returns the default configuration file path
pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}

/// Returns the default directory for client secrets and the saved token
pub fn get_auth_dir() -> PathBuf {
    get_config_dir().join(AUTH_SUBDIR)
}
