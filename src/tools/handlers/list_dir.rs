// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Directory listing and tree tools, sandboxed.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ToolError;
use crate::tools::handlers::sandbox::{format_size, resolve_path};
use crate::tools::parse_arguments;
use crate::tools::registry::{SafetyTier, ToolHandler};
use crate::types::{InputSchema, ToolDefinition};

const MAX_TREE_ENTRIES: usize = 200;

// ============================================================================
// list_directory
// ============================================================================

/// Handler for the `list_directory` tool.
pub struct ListDirectoryHandler {
    sandbox_root: PathBuf,
}

impl ListDirectoryHandler {
    pub fn new(sandbox_root: PathBuf) -> Self {
        Self { sandbox_root }
    }
}

#[derive(Debug, Deserialize)]
struct ListDirectoryArgs {
    #[serde(default = "default_path")]
    path: String,

    #[serde(default)]
    show_hidden: bool,
}

fn default_path() -> String {
    ".".to_string()
}

#[async_trait]
impl ToolHandler for ListDirectoryHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "list_directory",
            "List contents of a directory in the sandbox. \
             Shows directories first, then files with sizes. \
             Hidden files (dotfiles) are excluded by default.",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "path",
                    serde_json::json!({
                        "type": "string",
                        "description": "Directory path relative to the sandbox root. Default: the root",
                        "default": "."
                    }),
                )
                .with_property(
                    "show_hidden",
                    serde_json::json!({
                        "type": "boolean",
                        "description": "Include hidden files/directories (dotfiles). Default: false",
                        "default": false
                    }),
                ),
        )
    }

    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Auto
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let args: ListDirectoryArgs = parse_arguments(&input)?;
        let resolved = resolve_path(&self.sandbox_root, &args.path)?;

        if !resolved.exists() {
            return Ok(format!("Error: directory '{}' does not exist", resolved.display()));
        }
        if !resolved.is_dir() {
            return Ok(format!("Error: '{}' is not a directory", resolved.display()));
        }

        let mut dirs: Vec<String> = Vec::new();
        let mut files: Vec<(String, u64)> = Vec::new();

        for entry in std::fs::read_dir(&resolved)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !args.show_hidden && name.starts_with('.') {
                continue;
            }
            if entry.path().is_dir() {
                dirs.push(name);
            } else {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                files.push((name, size));
            }
        }

        dirs.sort_by_key(|n| n.to_lowercase());
        files.sort_by_key(|(n, _)| n.to_lowercase());

        let mut lines: Vec<String> = Vec::new();
        for d in &dirs {
            lines.push(format!("[DIR]  {d}/"));
        }
        for (f, size) in &files {
            lines.push(format!("[FILE] {f} ({})", format_size(*size)));
        }

        if lines.is_empty() {
            return Ok(format!("Directory '{}' is empty", args.path));
        }

        info!(path = %resolved.display(), entries = lines.len(), "list directory");
        Ok(lines.join("\n"))
    }
}

// ============================================================================
// directory_tree
// ============================================================================

/// Handler for the `directory_tree` tool.
pub struct DirectoryTreeHandler {
    sandbox_root: PathBuf,
}

impl DirectoryTreeHandler {
    pub fn new(sandbox_root: PathBuf) -> Self {
        Self { sandbox_root }
    }
}

#[derive(Debug, Deserialize)]
struct DirectoryTreeArgs {
    #[serde(default = "default_path")]
    path: String,

    #[serde(default = "default_depth")]
    max_depth: usize,
}

fn default_depth() -> usize {
    3
}

fn build_tree(path: &Path, prefix: &str, depth: usize, max_depth: usize, lines: &mut Vec<String>) {
    if depth > max_depth || lines.len() >= MAX_TREE_ENTRIES {
        return;
    }

    let Ok(read) = std::fs::read_dir(path) else {
        return;
    };

    let mut entries: Vec<(String, PathBuf, bool)> = read
        .flatten()
        .map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            let is_dir = e.path().is_dir();
            (name, e.path(), is_dir)
        })
        .filter(|(name, _, _)| !name.starts_with('.'))
        .collect();

    // Directories first, then case-insensitive by name
    entries.sort_by_key(|(name, _, is_dir)| (!is_dir, name.to_lowercase()));

    let count = entries.len();
    for (i, (name, entry_path, is_dir)) in entries.into_iter().enumerate() {
        if lines.len() >= MAX_TREE_ENTRIES {
            lines.push(format!("{prefix}... (truncated at {MAX_TREE_ENTRIES} entries)"));
            return;
        }

        let is_last = i == count - 1;
        let connector = if is_last { "└── " } else { "├── " };
        let suffix = if is_dir { "/" } else { "" };
        lines.push(format!("{prefix}{connector}{name}{suffix}"));

        if is_dir && depth < max_depth {
            let extension = if is_last { "    " } else { "│   " };
            build_tree(&entry_path, &format!("{prefix}{extension}"), depth + 1, max_depth, lines);
        }
    }
}

#[async_trait]
impl ToolHandler for DirectoryTreeHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "directory_tree",
            "Show a recursive directory tree with configurable depth. \
             Max depth is 5, max entries is 200. Hidden files are excluded.",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "path",
                    serde_json::json!({
                        "type": "string",
                        "description": "Directory path relative to the sandbox root. Default: the root",
                        "default": "."
                    }),
                )
                .with_property(
                    "max_depth",
                    serde_json::json!({
                        "type": "integer",
                        "description": "Maximum recursion depth (1-5). Default: 3",
                        "default": 3
                    }),
                ),
        )
    }

    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Auto
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let args: DirectoryTreeArgs = parse_arguments(&input)?;
        let max_depth = args.max_depth.clamp(1, 5);

        let resolved = resolve_path(&self.sandbox_root, &args.path)?;

        if !resolved.exists() {
            return Ok(format!("Error: directory '{}' does not exist", resolved.display()));
        }
        if !resolved.is_dir() {
            return Ok(format!("Error: '{}' is not a directory", resolved.display()));
        }

        let root_name = resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());
        let mut lines = vec![format!("{root_name}/")];
        build_tree(&resolved, "", 1, max_depth, &mut lines);

        info!(path = %resolved.display(), entries = lines.len(), "directory tree");
        Ok(lines.join("\n"))
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
    async fn test_list_directory() {
        let (temp, root) = sandbox();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        std::fs::write(temp.path().join("a.txt"), "aaa").unwrap();
        std::fs::write(temp.path().join(".hidden"), "shh").unwrap();

        let handler = ListDirectoryHandler::new(root);
        let result = handler.execute(json!({})).await.unwrap();

        assert!(result.contains("[DIR]  sub/"));
        assert!(result.contains("[FILE] a.txt (3B)"));
        assert!(!result.contains(".hidden"));
    }

    #[tokio::test]
    async fn test_list_directory_show_hidden() {
        let (temp, root) = sandbox();
        std::fs::write(temp.path().join(".visible-now"), "x").unwrap();

        let handler = ListDirectoryHandler::new(root);
        let result = handler.execute(json!({"show_hidden": true})).await.unwrap();
        assert!(result.contains(".visible-now"));
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let (_temp, root) = sandbox();
        let handler = ListDirectoryHandler::new(root);
        let result = handler.execute(json!({})).await.unwrap();
        assert!(result.contains("is empty"));
    }

    #[tokio::test]
    async fn test_list_missing_directory() {
        let (_temp, root) = sandbox();
        let handler = ListDirectoryHandler::new(root);
        let result = handler.execute(json!({"path": "nope"})).await.unwrap();
        assert!(result.contains("does not exist"));
    }

    #[tokio::test]
    async fn test_directory_tree() {
        let (temp, root) = sandbox();
        std::fs::create_dir_all(temp.path().join("a/b")).unwrap();
        std::fs::write(temp.path().join("a/file.txt"), "x").unwrap();
        std::fs::write(temp.path().join("a/b/deep.txt"), "y").unwrap();

        let handler = DirectoryTreeHandler::new(root);
        let result = handler.execute(json!({"max_depth": 5})).await.unwrap();

        assert!(result.contains("a/"));
        assert!(result.contains("file.txt"));
        assert!(result.contains("deep.txt"));
        assert!(result.contains("└── ") || result.contains("├── "));
    }

    #[tokio::test]
    async fn test_directory_tree_depth_limit() {
        let (temp, root) = sandbox();
        std::fs::create_dir_all(temp.path().join("a/b/c")).unwrap();
        std::fs::write(temp.path().join("a/b/c/too-deep.txt"), "x").unwrap();

        let handler = DirectoryTreeHandler::new(root);
        let result = handler.execute(json!({"max_depth": 1})).await.unwrap();

        assert!(result.contains("a/"));
        assert!(!result.contains("too-deep.txt"));
    }
}
