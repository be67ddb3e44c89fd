//! Config - TOML 設定の読み込み
//!
//! ファイルが無ければデフォルト値で動きます。
//! 値の検証は `EngineBuilder::build` で行います（fail-fast）。

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NudgeConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Home zone for timestamps that carry none: an IANA name such as
    /// `"Europe/Berlin"`, or a fixed offset such as `"+02:00"`.
    #[serde(default = "default_home_timezone")]
    pub home_timezone: String,
    #[serde(default = "default_lookahead_hours")]
    pub lookahead_hours: u32,
    /// Local time of day given to date-only reference dates (`HH:MM`).
    #[serde(default = "default_reference_time")]
    pub default_reference_time: String,
    /// Upper bound for every store / channel call.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
    #[serde(default = "default_max_concurrent_entities")]
    pub max_concurrent_entities: usize,
    #[serde(default = "default_ringtone")]
    pub default_ringtone: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            home_timezone: default_home_timezone(),
            lookahead_hours: default_lookahead_hours(),
            default_reference_time: default_reference_time(),
            io_timeout_ms: default_io_timeout_ms(),
            max_concurrent_entities: default_max_concurrent_entities(),
            default_ringtone: default_ringtone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_home_timezone() -> String {
    "UTC".to_string()
}
fn default_lookahead_hours() -> u32 {
    24
}
fn default_reference_time() -> String {
    "09:00".to_string()
}
fn default_io_timeout_ms() -> u64 {
    10_000
}
fn default_max_concurrent_entities() -> usize {
    4
}
fn default_ringtone() -> String {
    "default".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: impl AsRef<Path>) -> Result<NudgeConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!("config file not found at {}, using defaults", path.display());
        return Ok(NudgeConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let config = load("/nonexistent/nudge.toml").unwrap();
        assert_eq!(config, NudgeConfig::default());
        assert_eq!(config.engine.lookahead_hours, 24);
        assert_eq!(config.engine.max_concurrent_entities, 4);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let config: NudgeConfig = toml::from_str(
            r#"
            [engine]
            home_timezone = "America/New_York"
            io_timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.home_timezone, "America/New_York");
        assert_eq!(config.engine.io_timeout_ms, 250);
        assert_eq!(config.engine.default_reference_time, "09:00");
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn loads_from_disk() {
        let path = std::env::temp_dir().join(format!("nudge-config-{}.toml", ulid::Ulid::new()));
        std::fs::write(&path, "[log]\nlevel = \"debug\"\n").unwrap();

        let config = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.log.level, "debug");
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let path = std::env::temp_dir().join(format!("nudge-config-{}.toml", ulid::Ulid::new()));
        std::fs::write(&path, "[engine\nlookahead_hours = ").unwrap();

        let err = load(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
