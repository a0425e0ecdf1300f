// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! File write tool, sandboxed.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use tracing::info;

use crate::error::ToolError;
use crate::tools::handlers::sandbox::resolve_path;
use crate::tools::parse_arguments;
use crate::tools::registry::{SafetyTier, ToolHandler};
use crate::types::{InputSchema, ToolDefinition};

const MAX_WRITE_BYTES: usize = 1_024 * 1_024; // 1MB

/// Handler for the `file_write` tool.
pub struct FileWriteHandler {
    sandbox_root: PathBuf,
}

impl FileWriteHandler {
    pub fn new(sandbox_root: PathBuf) -> Self {
        Self { sandbox_root }
    }
}

#[derive(Debug, Deserialize)]
struct FileWriteArgs {
    path: String,
    content: String,

    /// Write mode: create (fails if exists), overwrite, append.
    #[serde(default = "default_mode")]
    mode: String,
}

fn default_mode() -> String {
    "create".to_string()
}

#[async_trait]
impl ToolHandler for FileWriteHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "file_write",
            "Create or write a file in the sandbox. Requires user confirmation. \
             Mode: 'create' (fails if exists), 'overwrite' (replaces), 'append' (adds to end). \
             Max content size: 1MB.",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "path",
                    serde_json::json!({
                        "type": "string",
                        "description": "File path relative to the sandbox root"
                    }),
                )
                .with_property(
                    "content",
                    serde_json::json!({
                        "type": "string",
                        "description": "Content to write"
                    }),
                )
                .with_property(
                    "mode",
                    serde_json::json!({
                        "type": "string",
                        "enum": ["create", "overwrite", "append"],
                        "description": "Write mode. Default: 'create'",
                        "default": "create"
                    }),
                )
                .with_required(vec!["path".to_string(), "content".to_string()]),
        )
    }

    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Confirm
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let args: FileWriteArgs = parse_arguments(&input)?;

        if !["create", "overwrite", "append"].contains(&args.mode.as_str()) {
            return Ok("Error: mode must be 'create', 'overwrite', or 'append'".to_string());
        }

        if args.content.len() > MAX_WRITE_BYTES {
            return Ok(format!(
                "Error: content exceeds max size of {}KB",
                MAX_WRITE_BYTES / 1024
            ));
        }

        let resolved = resolve_path(&self.sandbox_root, &args.path)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent).await?;
        }

        let action = match args.mode.as_str() {
            "create" => {
                // create_new is atomic: no TOCTOU window between the
                // existence check and the write
                match fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&resolved)
                    .await
                {
                    Ok(mut file) => {
                        file.write_all(args.content.as_bytes()).await?;
                        "created"
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                        return Ok(
                            "Error: file already exists. Use mode='overwrite' to replace it."
                                .to_string(),
                        );
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            "overwrite" => {
                fs::write(&resolved, &args.content).await?;
                "overwritten"
            }
            _ => {
                let mut file = fs::OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(&resolved)
                    .await?;
                file.write_all(args.content.as_bytes()).await?;
                "appended"
            }
        };

        info!(
            path = %resolved.display(),
            mode = %args.mode,
            bytes_written = args.content.len(),
            "file write"
        );
        Ok(format!(
            "File {action}: {} ({} bytes)",
            resolved.display(),
            args.content.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn handler() -> (TempDir, FileWriteHandler) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        (temp, FileWriteHandler::new(root))
    }

    #[tokio::test]
    async fn test_create_file() {
        let (temp, handler) = handler();
        let result = handler
            .execute(json!({"path": "out.txt", "content": "hello"}))
            .await
            .unwrap();
        assert!(result.starts_with("File created"));
        assert_eq!(std::fs::read_to_string(temp.path().join("out.txt")).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_create_existing_fails() {
        let (temp, handler) = handler();
        std::fs::write(temp.path().join("out.txt"), "old").unwrap();

        let result = handler
            .execute(json!({"path": "out.txt", "content": "new"}))
            .await
            .unwrap();
        assert!(result.contains("already exists"));
        assert_eq!(std::fs::read_to_string(temp.path().join("out.txt")).unwrap(), "old");
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (temp, handler) = handler();
        std::fs::write(temp.path().join("out.txt"), "old").unwrap();

        let result = handler
            .execute(json!({"path": "out.txt", "content": "new", "mode": "overwrite"}))
            .await
            .unwrap();
        assert!(result.starts_with("File overwritten"));
        assert_eq!(std::fs::read_to_string(temp.path().join("out.txt")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_append() {
        let (temp, handler) = handler();
        std::fs::write(temp.path().join("log.txt"), "a").unwrap();

        handler
            .execute(json!({"path": "log.txt", "content": "b", "mode": "append"}))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(temp.path().join("log.txt")).unwrap(), "ab");
    }

    #[tokio::test]
    async fn test_creates_parent_dirs() {
        let (temp, handler) = handler();
        handler
            .execute(json!({"path": "a/b/c.txt", "content": "deep"}))
            .await
            .unwrap();
        assert!(temp.path().join("a/b/c.txt").exists());
    }

    #[tokio::test]
    async fn test_invalid_mode() {
        let (_temp, handler) = handler();
        let result = handler
            .execute(json!({"path": "x.txt", "content": "x", "mode": "truncate"}))
            .await
            .unwrap();
        assert!(result.starts_with("Error: mode must be"));
    }

    #[tokio::test]
    async fn test_oversized_content() {
        let (_temp, handler) = handler();
        let result = handler
            .execute(json!({"path": "big.txt", "content": "x".repeat(MAX_WRITE_BYTES + 1)}))
            .await
            .unwrap();
        assert!(result.contains("exceeds max size"));
    }

    #[tokio::test]
    async fn test_write_sensitive_blocked() {
        let (_temp, handler) = handler();
        let err = handler
            .execute(json!({"path": "creds/.env", "content": "KEY=1"}))
            .await
            .unwrap_err();
        assert!(err.is_safety_violation());
    }
}
