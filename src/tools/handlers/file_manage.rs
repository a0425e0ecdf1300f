// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! File metadata, move and delete tools, sandboxed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;

use tracing::info;

use crate::error::ToolError;
use crate::tools::handlers::sandbox::{format_size, resolve_path};
use crate::tools::parse_arguments;
use crate::tools::registry::{SafetyTier, ToolHandler};
use crate::types::{InputSchema, ToolDefinition};

// ============================================================================
// file_info
// ============================================================================

/// Handler for the `file_info` tool.
pub struct FileInfoHandler {
    sandbox_root: PathBuf,
}

impl FileInfoHandler {
    pub fn new(sandbox_root: PathBuf) -> Self {
        Self { sandbox_root }
    }
}

#[derive(Debug, Deserialize)]
struct FileInfoArgs {
    path: String,
}

fn format_timestamp(time: std::io::Result<std::time::SystemTime>) -> String {
    time.map(|t| {
        let dt: DateTime<Utc> = t.into();
        dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    })
    .unwrap_or_else(|_| "unknown".to_string())
}

#[async_trait]
impl ToolHandler for FileInfoHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "file_info",
            "Get metadata about a file or directory: type, size, permissions, \
             modification and creation timestamps.",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "path",
                    serde_json::json!({
                        "type": "string",
                        "description": "File or directory path relative to the sandbox root"
                    }),
                )
                .with_required(vec!["path".to_string()]),
        )
    }

    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Auto
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let args: FileInfoArgs = parse_arguments(&input)?;
        let resolved = resolve_path(&self.sandbox_root, &args.path)?;

        if !resolved.exists() {
            return Ok(format!("Error: '{}' does not exist", resolved.display()));
        }

        let meta = fs::metadata(&resolved).await?;
        let file_type = if meta.is_file() {
            "file"
        } else if meta.is_dir() {
            "directory"
        } else {
            "other"
        };

        #[cfg(unix)]
        let perms = {
            use std::os::unix::fs::PermissionsExt;
            format!("{:o}", meta.permissions().mode() & 0o7777)
        };
        #[cfg(not(unix))]
        let perms = if meta.permissions().readonly() {
            "read-only".to_string()
        } else {
            "read-write".to_string()
        };

        let info_lines = [
            format!("Path: {}", resolved.display()),
            format!("Type: {file_type}"),
            format!("Size: {}", format_size(meta.len())),
            format!("Permissions: {perms}"),
            format!("Modified: {}", format_timestamp(meta.modified())),
            format!("Created: {}", format_timestamp(meta.created())),
        ];

        info!(path = %resolved.display(), "file info");
        Ok(info_lines.join("\n"))
    }
}

// ============================================================================
// file_move
// ============================================================================

/// Handler for the `file_move` tool.
pub struct FileMoveHandler {
    sandbox_root: PathBuf,
}

impl FileMoveHandler {
    pub fn new(sandbox_root: PathBuf) -> Self {
        Self { sandbox_root }
    }
}

#[derive(Debug, Deserialize)]
struct FileMoveArgs {
    source: String,
    destination: String,
}

#[async_trait]
impl ToolHandler for FileMoveHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "file_move",
            "Move or rename a file or directory within the sandbox. \
             Both source and destination must be inside the sandbox. \
             Fails if destination already exists.",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "source",
                    serde_json::json!({
                        "type": "string",
                        "description": "Source path relative to the sandbox root"
                    }),
                )
                .with_property(
                    "destination",
                    serde_json::json!({
                        "type": "string",
                        "description": "Destination path relative to the sandbox root"
                    }),
                )
                .with_required(vec!["source".to_string(), "destination".to_string()]),
        )
    }

    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Confirm
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let args: FileMoveArgs = parse_arguments(&input)?;

        let source = resolve_path(&self.sandbox_root, &args.source)?;
        let destination = resolve_path(&self.sandbox_root, &args.destination)?;

        if !source.exists() {
            return Ok(format!("Error: source '{}' does not exist", source.display()));
        }
        if destination.exists() {
            return Ok(format!(
                "Error: destination '{}' already exists",
                destination.display()
            ));
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::rename(&source, &destination).await?;

        info!(source = %source.display(), destination = %destination.display(), "file move");
        Ok(format!("Moved: {} -> {}", source.display(), destination.display()))
    }
}

// ============================================================================
// file_delete
// ============================================================================

/// Handler for the `file_delete` tool.
pub struct FileDeleteHandler {
    sandbox_root: PathBuf,
}

impl FileDeleteHandler {
    pub fn new(sandbox_root: PathBuf) -> Self {
        Self { sandbox_root }
    }
}

#[derive(Debug, Deserialize)]
struct FileDeleteArgs {
    path: String,

    #[serde(default)]
    recursive: bool,
}

#[async_trait]
impl ToolHandler for FileDeleteHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "file_delete",
            "Delete a file or directory within the sandbox. \
             Non-empty directories require recursive=true. \
             Cannot delete the sandbox root itself.",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "path",
                    serde_json::json!({
                        "type": "string",
                        "description": "Path to delete, relative to the sandbox root"
                    }),
                )
                .with_property(
                    "recursive",
                    serde_json::json!({
                        "type": "boolean",
                        "description": "Delete non-empty directories recursively. Default: false",
                        "default": false
                    }),
                )
                .with_required(vec!["path".to_string()]),
        )
    }

    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Confirm
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let args: FileDeleteArgs = parse_arguments(&input)?;
        let resolved = resolve_path(&self.sandbox_root, &args.path)?;

        if !resolved.exists() {
            return Ok(format!("Error: '{}' does not exist", resolved.display()));
        }

        if resolved == self.sandbox_root {
            return Err(ToolError::SafetyViolation(
                "PROTECTED_PATH: cannot delete sandbox root".to_string(),
            ));
        }

        if resolved.is_file() || resolved.is_symlink() {
            fs::remove_file(&resolved).await?;
            info!(path = %resolved.display(), "file delete");
            return Ok(format!("Deleted file: {}", resolved.display()));
        }

        if resolved.is_dir() {
            if !args.recursive {
                let mut entries = fs::read_dir(&resolved).await?;
                if entries.next_entry().await?.is_some() {
                    return Ok(format!(
                        "Error: directory '{}' is not empty. \
                         Use recursive=true to delete non-empty directories.",
                        resolved.display()
                    ));
                }
                fs::remove_dir(&resolved).await?;
            } else {
                fs::remove_dir_all(&resolved).await?;
            }
            info!(path = %resolved.display(), recursive = args.recursive, "directory delete");
            return Ok(format!("Deleted directory: {}", resolved.display()));
        }

        Ok(format!(
            "Error: '{}' is not a regular file or directory",
            resolved.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        (temp, root)
    }

    #[tokio::test]
    async fn test_file_info() {
        let (temp, root) = sandbox();
        std::fs::write(temp.path().join("data.txt"), "12345").unwrap();

        let handler = FileInfoHandler::new(root);
        let result = handler.execute(json!({"path": "data.txt"})).await.unwrap();

        assert!(result.contains("Type: file"));
        assert!(result.contains("Size: 5B"));
        assert!(result.contains("Modified:"));
    }

    #[tokio::test]
    async fn test_file_move() {
        let (temp, root) = sandbox();
        std::fs::write(temp.path().join("old.txt"), "content").unwrap();

        let handler = FileMoveHandler::new(root);
        let result = handler
            .execute(json!({"source": "old.txt", "destination": "new.txt"}))
            .await
            .unwrap();

        assert!(result.starts_with("Moved:"));
        assert!(!temp.path().join("old.txt").exists());
        assert!(temp.path().join("new.txt").exists());
    }

    #[tokio::test]
    async fn test_file_move_existing_destination() {
        let (temp, root) = sandbox();
        std::fs::write(temp.path().join("a.txt"), "a").unwrap();
        std::fs::write(temp.path().join("b.txt"), "b").unwrap();

        let handler = FileMoveHandler::new(root);
        let result = handler
            .execute(json!({"source": "a.txt", "destination": "b.txt"}))
            .await
            .unwrap();

        assert!(result.contains("already exists"));
    }

    #[tokio::test]
    async fn test_file_delete() {
        let (temp, root) = sandbox();
        std::fs::write(temp.path().join("gone.txt"), "x").unwrap();

        let handler = FileDeleteHandler::new(root);
        let result = handler.execute(json!({"path": "gone.txt"})).await.unwrap();

        assert!(result.starts_with("Deleted file:"));
        assert!(!temp.path().join("gone.txt").exists());
    }

    #[tokio::test]
    async fn test_delete_non_empty_dir_requires_recursive() {
        let (temp, root) = sandbox();
        std::fs::create_dir(temp.path().join("full")).unwrap();
        std::fs::write(temp.path().join("full/item.txt"), "x").unwrap();

        let handler = FileDeleteHandler::new(root.clone());
        let result = handler.execute(json!({"path": "full"})).await.unwrap();
        assert!(result.contains("not empty"));
        assert!(temp.path().join("full").exists());

        let result = handler
            .execute(json!({"path": "full", "recursive": true}))
            .await
            .unwrap();
        assert!(result.starts_with("Deleted directory:"));
        assert!(!temp.path().join("full").exists());
    }

    #[tokio::test]
    async fn test_delete_sandbox_root_blocked() {
        let (_temp, root) = sandbox();
        let handler = FileDeleteHandler::new(root);
        let err = handler.execute(json!({"path": "."})).await.unwrap_err();
        assert!(err.is_safety_violation());
        assert!(err.to_string().contains("PROTECTED_PATH"));
    }

    #[tokio::test]
    async fn test_delete_empty_dir() {
        let (temp, root) = sandbox();
        std::fs::create_dir(temp.path().join("empty")).unwrap();

        let handler = FileDeleteHandler::new(root);
        let result = handler.execute(json!({"path": "empty"})).await.unwrap();
        assert!(result.starts_with("Deleted directory:"));
    }
}
