// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading and hardcoded safety guards.
//!
//! Runtime settings come from an optional `config.yaml` plus environment
//! variables (secrets only via the environment). The loop guards are
//! compile-time constants of this module: configuration cannot override
//! them, and [`verify_guards_integrity`] asserts them at startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Hardcoded agent-loop guards. NOT configurable at runtime.
pub mod guards {
    /// Maximum reason-act iterations per turn.
    pub const MAX_ITERATIONS: u32 = 15;
    /// Maximum total tokens per session-turn.
    pub const MAX_TOKENS_SESSION: u64 = 100_000;
    /// Per-tool execution timeout.
    pub const TOOL_TIMEOUT_SECS: u64 = 30;
    /// Per-session-turn wall-clock timeout.
    pub const SESSION_TIMEOUT_SECS: u64 = 300;
    /// Maximum characters of a single tool output before truncation.
    pub const MAX_TOOL_OUTPUT_CHARS: usize = 10_000;
    /// Timeout waiting for a user confirmation.
    pub const CONFIRMATION_TIMEOUT_SECS: u64 = 60;
}

/// Verify the hardcoded guards have not been tampered with.
///
/// Called once at startup; a mismatch aborts the process with a nonzero
/// exit code.
pub fn verify_guards_integrity() -> Result<(), ConfigError> {
    let checks: [(&str, u64, u64); 6] = [
        ("MAX_ITERATIONS", guards::MAX_ITERATIONS as u64, 15),
        ("MAX_TOKENS_SESSION", guards::MAX_TOKENS_SESSION, 100_000),
        ("TOOL_TIMEOUT_SECS", guards::TOOL_TIMEOUT_SECS, 30),
        ("SESSION_TIMEOUT_SECS", guards::SESSION_TIMEOUT_SECS, 300),
        (
            "MAX_TOOL_OUTPUT_CHARS",
            guards::MAX_TOOL_OUTPUT_CHARS as u64,
            10_000,
        ),
        (
            "CONFIRMATION_TIMEOUT_SECS",
            guards::CONFIRMATION_TIMEOUT_SECS,
            60,
        ),
    ];

    for (name, actual, expected) in checks {
        if actual != expected {
            return Err(ConfigError::GuardViolation(format!(
                "{name}: expected {expected}, found {actual}"
            )));
        }
    }
    Ok(())
}

/// Agent model settings.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Primary model for the agent loop.
    pub model: String,
    /// Cheap model for summarization.
    pub haiku_model: String,
    /// Max tokens per model response.
    pub max_tokens: u32,
    /// Directory holding the database, vector index and logs.
    pub data_dir: PathBuf,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            haiku_model: "claude-haiku-4-5-20251001".to_string(),
            max_tokens: 4096,
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Memory and context-budget settings.
#[derive(Debug, Clone)]
pub struct MemorySettings {
    /// Total prompt token budget per turn.
    pub context_budget_tokens: usize,
    /// History fraction of the available budget that triggers summarization.
    pub summarize_at_pct: f64,
    /// Database file name under the data directory.
    pub sqlite_db: String,
    /// Vector index directory name under the data directory.
    pub index_dir: String,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            context_budget_tokens: 20_000,
            summarize_at_pct: 0.80,
            sqlite_db: "valet.db".to_string(),
            index_dir: "index".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone)]
pub struct ObservabilitySettings {
    pub log_level: String,
    /// Log file path; defaults to `<data_dir>/logs/valet.log`.
    pub log_file: Option<PathBuf>,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Assembled settings from config.yaml + environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Provider API key (environment only, never from config files).
    pub anthropic_api_key: String,
    pub agent: AgentSettings,
    pub memory: MemorySettings,
    pub observability: ObservabilitySettings,
    /// Optional base system prompt override.
    pub system_prompt: Option<String>,
}

/// Raw shape of `config.yaml`.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    agent: FileAgentConfig,
    #[serde(default)]
    memory: FileMemoryConfig,
    #[serde(default)]
    observability: FileObservabilityConfig,
    system_prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileAgentConfig {
    model: Option<String>,
    haiku_model: Option<String>,
    max_tokens: Option<u32>,
    data_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileMemoryConfig {
    context_budget_tokens: Option<usize>,
    summarize_at_pct: Option<f64>,
    sqlite_db: Option<String>,
    index_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileObservabilityConfig {
    log_level: Option<String>,
    log_file: Option<String>,
}

impl Settings {
    /// Load settings from an optional config file plus the environment.
    ///
    /// `ANTHROPIC_API_KEY` is required. `VALET_MODEL`, `VALET_HAIKU_MODEL`
    /// and `VALET_DATA_DIR` override the corresponding file values.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path)?;
                serde_yaml::from_str::<FileConfig>(&raw)?
            }
            _ => FileConfig::default(),
        };

        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ConfigError::MissingField("ANTHROPIC_API_KEY".to_string()))?;

        let defaults = AgentSettings::default();
        let agent = AgentSettings {
            model: std::env::var("VALET_MODEL")
                .ok()
                .or(file.agent.model)
                .unwrap_or(defaults.model),
            haiku_model: std::env::var("VALET_HAIKU_MODEL")
                .ok()
                .or(file.agent.haiku_model)
                .unwrap_or(defaults.haiku_model),
            max_tokens: file.agent.max_tokens.unwrap_or(defaults.max_tokens),
            data_dir: std::env::var("VALET_DATA_DIR")
                .ok()
                .or(file.agent.data_dir)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        };

        let mem_defaults = MemorySettings::default();
        let memory = MemorySettings {
            context_budget_tokens: file
                .memory
                .context_budget_tokens
                .unwrap_or(mem_defaults.context_budget_tokens),
            summarize_at_pct: file
                .memory
                .summarize_at_pct
                .unwrap_or(mem_defaults.summarize_at_pct),
            sqlite_db: file.memory.sqlite_db.unwrap_or(mem_defaults.sqlite_db),
            index_dir: file.memory.index_dir.unwrap_or(mem_defaults.index_dir),
        };

        if !(0.0..=1.0).contains(&memory.summarize_at_pct) {
            return Err(ConfigError::InvalidValue {
                field: "memory.summarize_at_pct".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }

        let obs_defaults = ObservabilitySettings::default();
        let observability = ObservabilitySettings {
            log_level: file
                .observability
                .log_level
                .unwrap_or(obs_defaults.log_level),
            log_file: file.observability.log_file.map(PathBuf::from),
        };

        Ok(Self {
            anthropic_api_key: api_key,
            agent,
            memory,
            observability,
            system_prompt: file.system_prompt,
        })
    }

    /// Path of the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        self.agent.data_dir.join(&self.memory.sqlite_db)
    }

    /// Path of the vector index directory.
    pub fn index_dir(&self) -> PathBuf {
        self.agent.data_dir.join(&self.memory.index_dir)
    }

    /// Effective log file path.
    pub fn log_file(&self) -> PathBuf {
        self.observability
            .log_file
            .clone()
            .unwrap_or_else(|| self.agent.data_dir.join("logs").join("valet.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guards_integrity() {
        assert!(verify_guards_integrity().is_ok());
    }

    #[test]
    fn test_guard_values() {
        assert_eq!(guards::MAX_ITERATIONS, 15);
        assert_eq!(guards::MAX_TOKENS_SESSION, 100_000);
        assert_eq!(guards::TOOL_TIMEOUT_SECS, 30);
        assert_eq!(guards::SESSION_TIMEOUT_SECS, 300);
        assert_eq!(guards::MAX_TOOL_OUTPUT_CHARS, 10_000);
        assert_eq!(guards::CONFIRMATION_TIMEOUT_SECS, 60);
    }

    #[test]
    fn test_default_settings() {
        let agent = AgentSettings::default();
        assert_eq!(agent.max_tokens, 4096);

        let memory = MemorySettings::default();
        assert_eq!(memory.context_budget_tokens, 20_000);
        assert!((memory.summarize_at_pct - 0.80).abs() < f64::EPSILON);
    }

    #[test]
    fn test_file_config_parse() {
        let yaml = r#"
agent:
  model: claude-sonnet-4-20250514
  max_tokens: 2048
memory:
  context_budget_tokens: 10000
observability:
  log_level: debug
"#;
        let cfg: FileConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.agent.max_tokens, Some(2048));
        assert_eq!(cfg.memory.context_budget_tokens, Some(10000));
        assert_eq!(cfg.observability.log_level.as_deref(), Some("debug"));
        assert!(cfg.system_prompt.is_none());
    }

    #[test]
    fn test_derived_paths() {
        let settings = Settings {
            anthropic_api_key: "test".to_string(),
            agent: AgentSettings {
                data_dir: PathBuf::from("/tmp/valet-data"),
                ..Default::default()
            },
            memory: MemorySettings::default(),
            observability: ObservabilitySettings::default(),
            system_prompt: None,
        };

        assert_eq!(settings.db_path(), PathBuf::from("/tmp/valet-data/valet.db"));
        assert_eq!(settings.index_dir(), PathBuf::from("/tmp/valet-data/index"));
        assert!(settings.log_file().ends_with("logs/valet.log"));
    }
}
