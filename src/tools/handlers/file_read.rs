// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! File read tool, sandboxed.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;

use tracing::info;

use crate::error::ToolError;
use crate::tools::handlers::sandbox::resolve_path;
use crate::tools::registry::{SafetyTier, ToolHandler};
use crate::tools::{parse_arguments, truncate_chars};
use crate::types::{InputSchema, ToolDefinition};

const MAX_READ_CHARS: usize = 10_000;

/// Handler for the `file_read` tool.
pub struct FileReadHandler {
    sandbox_root: PathBuf,
}

impl FileReadHandler {
    pub fn new(sandbox_root: PathBuf) -> Self {
        Self { sandbox_root }
    }
}

#[derive(Debug, Deserialize)]
struct FileReadArgs {
    path: String,

    /// Max characters to return (default 10000, capped at 10000).
    #[serde(default = "default_max_chars")]
    max_chars: usize,
}

fn default_max_chars() -> usize {
    MAX_READ_CHARS
}

#[async_trait]
impl ToolHandler for FileReadHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "file_read",
            "Read the content of a file. Path is relative to the sandbox root. \
             Sensitive files (.env, .ssh keys, secrets) are blocked. \
             Output is truncated at 10,000 chars.",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "path",
                    serde_json::json!({
                        "type": "string",
                        "description": "File path relative to the sandbox root (e.g., 'Documents/notes.txt')"
                    }),
                )
                .with_property(
                    "max_chars",
                    serde_json::json!({
                        "type": "integer",
                        "description": "Max characters to return. Default 10000.",
                        "default": 10000
                    }),
                )
                .with_required(vec!["path".to_string()]),
        )
    }

    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Auto
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let args: FileReadArgs = parse_arguments(&input)?;
        let max_chars = args.max_chars.min(MAX_READ_CHARS);

        let resolved = resolve_path(&self.sandbox_root, &args.path)?;

        if !resolved.exists() {
            return Ok(format!(
                "Error: FILE_NOT_FOUND: '{}' does not exist",
                resolved.display()
            ));
        }
        if !resolved.is_file() {
            return Ok(format!("Error: '{}' is not a file", resolved.display()));
        }

        let bytes = fs::read(&resolved).await?;
        let content = String::from_utf8_lossy(&bytes);

        let truncated = content.chars().count() > max_chars;
        let content = truncate_chars(&content, max_chars, "\n[... file truncated]");

        info!(path = %resolved.display(), size_bytes = bytes.len(), truncated, "file read");
        Ok(content)
    }
}
