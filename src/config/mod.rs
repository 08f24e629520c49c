//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::replay::ReplayCalibration;

/// Default broadcast buffer per subscriber
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::Invalid("LOG_FORMAT")),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log line format
    pub log_format: LogFormat,

    /// Directory holding the recorded session files
    pub session_dir: PathBuf,
    /// Allowed client origins for CORS, comma separated, or `*`
    pub client_origin: String,
    /// Feed broadcast capacity
    pub feed_capacity: usize,

    /// Scene mapping for replayed positions
    pub calibration: ReplayCalibration,
    /// Stop the session after this many seconds
    pub run_seconds: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let defaults = ReplayCalibration::default();
        let calibration = ReplayCalibration {
            scale_x: parse_or(&lookup, "REPLAY_SCALE_X", defaults.scale_x)?,
            scale_z: parse_or(&lookup, "REPLAY_SCALE_Z", defaults.scale_z)?,
            offset_x: parse_or(&lookup, "REPLAY_OFFSET_X", defaults.offset_x)?,
            offset_z: parse_or(&lookup, "REPLAY_OFFSET_Z", defaults.offset_z)?,
            heading_offset: parse_or(
                &lookup,
                "REPLAY_HEADING_OFFSET_DEG",
                defaults.heading_offset.to_degrees(),
            )?
            .to_radians(),
        };

        let run_seconds = match lookup("RUN_SECONDS") {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("RUN_SECONDS"))?,
            ),
            None => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: parse_or(&lookup, "LOG_FORMAT", LogFormat::Text)?,

            session_dir: lookup("SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("session")),
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
            feed_capacity: parse_or(&lookup, "FEED_CAPACITY", DEFAULT_FEED_CAPACITY)?,

            calibration,
            run_seconds,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.server_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.session_dir, PathBuf::from("session"));
        assert_eq!(config.client_origin, "*");
        assert_eq!(config.feed_capacity, DEFAULT_FEED_CAPACITY);
        assert_eq!(config.run_seconds, None);
        assert_eq!(config.calibration.scale_x, ReplayCalibration::default().scale_x);
        assert!((config.calibration.heading_offset - 1.0_f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn port_wins_over_server_addr() {
        let config = config_from(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]).unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn calibration_and_run_time_are_parsed() {
        let config = config_from(&[
            ("REPLAY_SCALE_X", "0.5"),
            ("REPLAY_OFFSET_Z", "-3"),
            ("REPLAY_HEADING_OFFSET_DEG", "90"),
            ("RUN_SECONDS", "120"),
        ])
        .unwrap();

        assert_eq!(config.calibration.scale_x, 0.5);
        assert_eq!(config.calibration.offset_z, -3.0);
        assert!((config.calibration.heading_offset - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(config.run_seconds, Some(120));
    }

    #[test]
    fn log_format_selects_json_lines() {
        let config = config_from(&[("LOG_FORMAT", "JSON")]).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);

        assert!(matches!(
            config_from(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid("LOG_FORMAT"))
        ));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            config_from(&[("FEED_CAPACITY", "lots")]),
            Err(ConfigError::Invalid("FEED_CAPACITY"))
        ));
        assert!(matches!(
            config_from(&[("SERVER_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress)
        ));
    }
}
