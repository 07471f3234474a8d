//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Attendance rules
    #[serde(default)]
    pub attendance: RawAttendanceConfig,

    /// Where attendance rows are mirrored
    #[serde(default)]
    pub sink: Option<RawSinkConfig>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,
}

/// Attendance rules
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAttendanceConfig {
    /// Minimum time after a clock-out before the next clock-in
    pub cooldown_seconds: Option<u64>,

    /// Shifts open this long are closed by the sweeper
    pub max_shift_seconds: Option<u64>,

    /// How often the sweeper runs
    pub sweep_interval_seconds: Option<u64>,

    /// Offset used to render log timestamps, e.g. "+08:00"
    pub display_offset: Option<String>,
}

/// Attendance log sink
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawSinkConfig {
    None,
    /// Append one JSON object per line to a local file
    Jsonl { path: PathBuf },
    /// POST each row as JSON to an HTTP endpoint
    Webhook {
        url: String,
        timeout_seconds: Option<u64>,
    },
}
