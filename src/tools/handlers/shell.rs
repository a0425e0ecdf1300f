// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shell execution tool.
//!
//! Runs a bash command with a bounded timeout and bounded output. Safety
//! tiering happens in the registry before this handler is ever invoked.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

use tracing::{info, warn};

use crate::error::ToolError;
use crate::tools::registry::{SafetyTier, ToolHandler};
use crate::tools::{parse_arguments, truncate_chars};
use crate::types::{InputSchema, ToolDefinition};

const MAX_COMMAND_LENGTH: usize = 500;
const MAX_OUTPUT_CHARS: usize = 10_000;
const MAX_STDERR_CHARS: usize = 2_000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 120;

/// Handler for the `shell_execute` tool.
pub struct ShellHandler;

impl ShellHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments for the shell tool.
#[derive(Debug, Deserialize)]
struct ShellArgs {
    /// The command to execute.
    command: String,

    /// Timeout in seconds (default 30, max 120).
    #[serde(default = "default_timeout")]
    timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn hash_command(cmd: &str) -> String {
    let digest = Sha256::digest(cmd.as_bytes());
    let hex = format!("{digest:x}");
    hex[..16].to_string()
}

#[async_trait]
impl ToolHandler for ShellHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "shell_execute",
            "Execute a bash command on the host system and return stdout/stderr. \
             Read-only commands (ls, cat, ps, grep, df, docker ps, git status, etc.) \
             are executed automatically. \
             Write commands (kill, rm, mv, docker restart, pip install, etc.) require user confirmation. \
             Destructive commands (sudo, rm -rf, curl|bash) are always blocked. \
             Output is truncated at 10,000 chars. Timeout: 30s default, max 120s.",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "command",
                    serde_json::json!({
                        "type": "string",
                        "description": "The bash command to execute. Max 500 chars.",
                        "maxLength": 500
                    }),
                )
                .with_property(
                    "timeout_seconds",
                    serde_json::json!({
                        "type": "integer",
                        "description": "Command timeout in seconds. Default 30, max 120.",
                        "default": 30,
                        "maximum": 120
                    }),
                )
                .with_required(vec!["command".to_string()]),
        )
    }

    fn default_tier(&self) -> SafetyTier {
        // Overridden dynamically by the registry's command classification
        SafetyTier::Auto
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let args: ShellArgs = parse_arguments(&input)?;
        let command = args.command.trim().to_string();

        if command.is_empty() {
            return Err(ToolError::InvalidInput("command must not be empty".to_string()));
        }

        if command.len() > MAX_COMMAND_LENGTH {
            return Err(ToolError::SafetyViolation(format!(
                "COMMAND_TOO_LONG: command exceeds {MAX_COMMAND_LENGTH} chars"
            )));
        }

        let timeout_secs = args.timeout_seconds.clamp(1, MAX_TIMEOUT_SECS);
        let command_hash = hash_command(&command);
        let command_preview: String = command.chars().take(50).collect();
        info!(
            command_hash,
            command_preview = %command_preview,
            timeout_secs,
            "shell exec start"
        );

        let start = Instant::now();
        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(&command)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            // Timed-out children must not linger
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to spawn command: {e}")))?;

        let output = match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ToolError::ExecutionFailed(format!(
                    "Failed to execute command: {e}"
                )))
            }
            Err(_) => {
                warn!(command_hash, timeout_secs, "shell exec timeout");
                return Ok(format!(
                    "Error: command timed out after {timeout_secs}s\n[exit code: -1]"
                ));
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let exit_code = output.status.code().unwrap_or(-1);

        let truncated = stdout.chars().count() > MAX_OUTPUT_CHARS;
        let stdout = truncate_chars(&stdout, MAX_OUTPUT_CHARS, "\n[... output truncated]");
        let stderr = truncate_chars(&stderr, MAX_STDERR_CHARS, "\n[... stderr truncated]");

        info!(
            command_hash,
            exit_code,
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            truncated,
            duration_ms,
            "shell exec done"
        );

        let mut parts: Vec<String> = Vec::new();
        if !stdout.is_empty() {
            parts.push(stdout);
        }
        if !stderr.is_empty() {
            parts.push(format!("[stderr]: {stderr}"));
        }
        if exit_code != 0 {
            parts.push(format!("[exit code: {exit_code}]"));
        }
        if truncated {
            parts.push("[output was truncated]".to_string());
        }

        if parts.is_empty() {
            Ok("(no output)".to_string())
        } else {
            Ok(parts.join("\n"))
        }
    }
}
