//! Config validation CLI tool
//!
//! Validates a punchd configuration file and reports any errors.

use punch_config::{ConfigError, SinkConfig};
use punch_util::{default_config_path, format_duration_hm};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a punchd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match punch_config::load_config(&config_path) {
        Ok(policy) => {
            let attendance = &policy.attendance;
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", punch_config::CURRENT_CONFIG_VERSION);
            println!("  Cooldown:       {}s", attendance.cooldown.as_secs());
            println!("  Max shift:      {}", format_duration_hm(attendance.max_shift));
            println!("  Sweep interval: {}s", attendance.sweep_interval.as_secs());
            match attendance.display_offset {
                Some(offset) => println!("  Log timezone:   UTC{}", offset),
                None => println!("  Log timezone:   host local"),
            }
            let sink = match &policy.sink {
                SinkConfig::None => "none".to_string(),
                SinkConfig::Jsonl { path } => format!("jsonl ({})", path.display()),
                SinkConfig::Webhook { url, .. } => format!("webhook ({})", url),
            };
            println!("  Sink:           {}", sink);

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        punch_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
