use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::channel::DEFAULT_FIFO_BASE;
use crate::render::DEFAULT_OUTPUT_FORMAT;
use crate::timer::DEFAULT_INCREMENT_SECS;

pub const DEFAULT_RUN_INDICATOR: &str = ">";
pub const DEFAULT_LAP_INDICATOR: &str = "L";

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TimerConfig {
    pub fifo_base: String,
    pub output_format: String,
    pub increment_secs: u32,
    pub run_indicator: String,
    pub lap_indicator: String,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            fifo_base: DEFAULT_FIFO_BASE.to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            increment_secs: DEFAULT_INCREMENT_SECS,
            run_indicator: DEFAULT_RUN_INDICATOR.to_string(),
            lap_indicator: DEFAULT_LAP_INDICATOR.to_string(),
        }
    }
}

pub fn load_timer_config(path: &Path) -> Result<TimerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    parse_timer_config_text(&content)
}

pub fn parse_timer_config_text(content: &str) -> Result<TimerConfig> {
    let raw = serde_json::from_str::<TimerConfigFile>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    if raw.version != 1 {
        bail!(
            "unsupported config version {}; expected version 1",
            raw.version
        );
    }
    if raw.increment_secs == Some(0) {
        bail!("increment_secs must be greater than zero");
    }

    let defaults = TimerConfig::default();
    Ok(TimerConfig {
        fifo_base: raw.fifo_base.unwrap_or(defaults.fifo_base),
        output_format: raw.output_format.unwrap_or(defaults.output_format),
        increment_secs: raw.increment_secs.unwrap_or(defaults.increment_secs),
        run_indicator: raw.run_indicator.unwrap_or(defaults.run_indicator),
        lap_indicator: raw.lap_indicator.unwrap_or(defaults.lap_indicator),
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimerConfigFile {
    version: u32,
    #[serde(default)]
    fifo_base: Option<String>,
    #[serde(default)]
    output_format: Option<String>,
    #[serde(default)]
    increment_secs: Option<u32>,
    #[serde(default)]
    run_indicator: Option<String>,
    #[serde(default)]
    lap_indicator: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let json = r#"
{
  "version": 1,
  "fifo_base": "/run/user/1000/minitimer.",
  "output_format": "%dh%02dm%02ds",
  "increment_secs": 30,
  "run_indicator": "* ",
  "lap_indicator": "[lap] "
}
"#;
        let config = parse_timer_config_text(json).expect("valid config");
        assert_eq!(config.fifo_base, "/run/user/1000/minitimer.");
        assert_eq!(config.output_format, "%dh%02dm%02ds");
        assert_eq!(config.increment_secs, 30);
        assert_eq!(config.run_indicator, "* ");
        assert_eq!(config.lap_indicator, "[lap] ");
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config = parse_timer_config_text(r#"{ "version": 1 }"#).expect("valid config");
        assert_eq!(config, TimerConfig::default());
        assert_eq!(config.fifo_base, "/tmp/minitimer.");
        assert_eq!(config.output_format, "%02d:%02d:%02d");
        assert_eq!(config.increment_secs, 10);
    }

    #[test]
    fn rejects_malformed_json_with_position() {
        let err = parse_timer_config_text("{ not-valid-json ").expect_err("should fail");
        assert!(err.to_string().contains("invalid JSON at line 1"));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = parse_timer_config_text(r#"{ "version": 2 }"#).expect_err("should fail");
        assert!(err.to_string().contains("unsupported config version 2"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = parse_timer_config_text(r#"{ "version": 1, "colour": "red" }"#)
            .expect_err("should fail");
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn rejects_zero_increment() {
        let err = parse_timer_config_text(r#"{ "version": 1, "increment_secs": 0 }"#)
            .expect_err("should fail");
        assert!(err.to_string().contains("increment_secs"));
    }
}
