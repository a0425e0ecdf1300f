// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tracing initialization.
//!
//! The log file receives everything at the configured level; the terminal
//! only sees warnings and above so the REPL stays readable.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Configuration for telemetry initialization.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Default log level if RUST_LOG is not set.
    pub default_level: Level,

    /// Whether to use ANSI colors in terminal output.
    pub ansi_colors: bool,

    /// Custom filter directive (overrides default_level).
    pub filter_directive: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            ansi_colors: true,
            filter_directive: None,
        }
    }
}

impl TelemetryConfig {
    /// Build a config from a textual log level ("debug", "info", ...).
    pub fn from_level_str(level: &str) -> Self {
        let default_level = match level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        Self {
            default_level,
            ..Default::default()
        }
    }

    /// Set a custom filter directive.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_directive = Some(filter.into());
        self
    }

    /// Enable or disable ANSI colors.
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi_colors = ansi;
        self
    }
}

fn build_filter(config: &TelemetryConfig) -> EnvFilter {
    match &config.filter_directive {
        Some(directive) => EnvFilter::try_new(directive)
            .unwrap_or_else(|_| EnvFilter::new(format!("{}", config.default_level))),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{}", config.default_level))),
    }
}

/// Initialize telemetry with a terminal layer (WARN+) and a file layer at
/// the configured level.
///
/// This should be called once at application startup.
pub fn init_telemetry(config: &TelemetryConfig, log_file: &Path) -> io::Result<()> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = Arc::new(File::create(log_file)?);

    let terminal_layer = fmt::layer()
        .compact()
        .with_ansi(config.ansi_colors)
        .with_target(false)
        .with_filter(EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(move || Arc::clone(&file))
        .with_filter(build_filter(config));

    tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.default_level, Level::INFO);
        assert!(config.ansi_colors);
    }

    #[test]
    fn test_from_level_str() {
        assert_eq!(TelemetryConfig::from_level_str("debug").default_level, Level::DEBUG);
        assert_eq!(TelemetryConfig::from_level_str("WARN").default_level, Level::WARN);
        assert_eq!(TelemetryConfig::from_level_str("garbage").default_level, Level::INFO);
    }

    #[test]
    fn test_telemetry_config_builder() {
        let config = TelemetryConfig::default()
            .with_filter("valet=trace")
            .with_ansi(false);

        assert_eq!(config.filter_directive, Some("valet=trace".to_string()));
        assert!(!config.ansi_colors);
    }
}
