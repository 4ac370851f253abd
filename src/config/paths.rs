//! Per-platform application data locations.

use std::env;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "proxy-rotator";

const CONFIG_FILE: &str = "config.toml";
const STATS_FILE: &str = "node_stats.json";

/// Application data directory for the current platform.
pub fn data_dir() -> PathBuf {
    let home = env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    if cfg!(windows) {
        let base = env::var_os("APPDATA").map(PathBuf::from).unwrap_or(home);
        return base.join(APP_NAME);
    }

    if cfg!(target_os = "macos") {
        return home
            .join("Library")
            .join("Application Support")
            .join(APP_NAME);
    }

    xdg_data_dir(env::var_os("XDG_DATA_HOME").map(PathBuf::from), &home)
}

fn xdg_data_dir(xdg_data_home: Option<PathBuf>, home: &Path) -> PathBuf {
    xdg_data_home
        .filter(|p| p.is_absolute())
        .unwrap_or_else(|| home.join(".local").join("share"))
        .join(APP_NAME)
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

/// Default statistics file path.
pub fn default_stats_path() -> PathBuf {
    data_dir().join(STATS_FILE)
}
