// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the Valet agent runtime.
//!
//! This module provides strongly-typed errors for different parts of the
//! application, using `thiserror` for ergonomic error definitions and
//! `anyhow` for error propagation at application seams.

use thiserror::Error;

/// Errors that can occur during provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Response parsing error: {0}")]
    ParseError(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl ProviderError {
    /// Create an API error with status code.
    pub fn api(message: impl Into<String>, status_code: u16) -> Self {
        Self::ApiError {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Check if this error is transient and worth retrying.
    ///
    /// Retryable conditions: rate limits (429), server errors (5xx),
    /// and network timeouts.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::NetworkError(_) | Self::Timeout(_) => true,
            Self::ApiError {
                status_code: Some(code),
                ..
            } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

/// Errors that can occur during tool execution.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Safety violation: {0}")]
    SafetyViolation(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Timeout after {0}s")]
    Timeout(u64),
}

impl ToolError {
    /// Safety violations propagate unchanged through the registry;
    /// every other kind is wrapped as a tool-execution failure.
    pub fn is_safety_violation(&self) -> bool {
        matches!(self, Self::SafetyViolation(_))
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

/// Errors that can occur in the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Guard integrity violation: {0}")]
    GuardViolation(String),

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Terminal outcomes of an agent run.
///
/// Per-tool errors never surface here; they are folded into tool results.
/// These variants end the turn cleanly with a persisted failure trace.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Session token limit ({0}) exceeded")]
    ContextOverflow(u64),

    #[error("Agent loop hit max_iterations={0}")]
    MaxIterations(u32),

    #[error("Session timeout after {0}s")]
    SessionTimeout(u64),
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_retryable() {
        assert!(ProviderError::RateLimited("wait 1s".to_string()).is_retryable());
        assert!(ProviderError::NetworkError("timeout".to_string()).is_retryable());
        assert!(ProviderError::Timeout(30000).is_retryable());
        assert!(ProviderError::api("overloaded", 529).is_retryable());
        assert!(ProviderError::api("too many requests", 429).is_retryable());
        assert!(!ProviderError::api("bad request", 400).is_retryable());
        assert!(!ProviderError::AuthError("invalid key".to_string()).is_retryable());
    }

    #[test]
    fn test_tool_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let tool_err: ToolError = io_err.into();
        assert!(matches!(tool_err, ToolError::FileNotFound(_)));
    }

    #[test]
    fn test_safety_violation_predicate() {
        assert!(ToolError::SafetyViolation("blocked".to_string()).is_safety_violation());
        assert!(!ToolError::ExecutionFailed("crashed".to_string()).is_safety_violation());
    }

    #[test]
    fn test_agent_error_from_provider() {
        let provider_err = ProviderError::AuthError("invalid".to_string());
        let agent_err: AgentError = provider_err.into();
        assert!(matches!(agent_err, AgentError::Provider(_)));
    }

    #[test]
    fn test_agent_error_display() {
        let err = AgentError::MaxIterations(15);
        assert!(format!("{}", err).contains("max_iterations=15"));

        let err = AgentError::ContextOverflow(100_000);
        assert!(format!("{}", err).contains("100000"));
    }
}
