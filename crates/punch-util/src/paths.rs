//! Default paths for punchd components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/punchd/punchd.sock` or `/tmp/punchd-$USER/punchd.sock`
//! - Data: `$XDG_DATA_HOME/punchd` or `~/.local/share/punchd`
//! - Config: `$XDG_CONFIG_HOME/punchclock/config.toml` or `~/.config/punchclock/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const PUNCH_SOCKET_ENV: &str = "PUNCH_SOCKET";

/// Environment variable for overriding the data directory
pub const PUNCH_DATA_DIR_ENV: &str = "PUNCH_DATA_DIR";

const SOCKET_FILENAME: &str = "punchd.sock";
const APP_DIR: &str = "punchd";
const CONFIG_APP_DIR: &str = "punchclock";
const CONFIG_FILENAME: &str = "config.toml";

/// Default socket path.
///
/// Order of precedence:
/// 1. `$PUNCH_SOCKET`
/// 2. `$XDG_RUNTIME_DIR/punchd/punchd.sock`
/// 3. `/tmp/punchd-$USER/punchd.sock`
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(PUNCH_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Socket path without consulting `PUNCH_SOCKET`.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Default data directory (holds `punchd.db`).
///
/// Order of precedence:
/// 1. `$PUNCH_DATA_DIR`
/// 2. `$XDG_DATA_HOME/punchd`
/// 3. `~/.local/share/punchd`
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(PUNCH_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Data directory without consulting `PUNCH_DATA_DIR`.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share").join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home)
            .join(CONFIG_APP_DIR)
            .join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(CONFIG_APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(CONFIG_APP_DIR).join(CONFIG_FILENAME)
}
