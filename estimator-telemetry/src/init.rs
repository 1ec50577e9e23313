//! Subscriber initialization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Console output style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}

impl LogSettings {
    pub fn new(level: impl Into<String>) -> Self {
        Self { level: level.into(), ..Default::default() }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    fn filter(&self) -> Result<EnvFilter, Box<dyn std::error::Error>> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => Ok(EnvFilter::try_new(&self.level)?),
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
///
/// # Arguments
/// * `service_name` - Name recorded on the first log line
/// * `settings` - Level and output format
pub fn init_telemetry(
    service_name: &str,
    settings: &LogSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = settings.filter()?;

    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(filter);
        match settings.format {
            LogFormat::Pretty => registry
                .with(tfmt::layer().with_target(true).with_writer(std::io::stderr))
                .init(),
            LogFormat::Json => registry
                .with(tfmt::layer().json().with_current_span(true).with_writer(std::io::stderr))
                .init(),
        }

        tracing::info!(
            service.name = service_name,
            log.format = %settings.format,
            "Telemetry initialized"
        );
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_settings_builder() {
        let settings = LogSettings::new("debug").with_format(LogFormat::Json);
        assert_eq!(settings.level, "debug");
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(serde_json::to_value(&settings).unwrap()["format"], "json");
    }

    #[test]
    fn test_init_is_idempotent() {
        let settings = LogSettings::default();
        assert!(init_telemetry("test", &settings).is_ok());
        assert!(init_telemetry("test", &settings).is_ok());
    }
}
