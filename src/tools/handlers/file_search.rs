// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! File search tools: glob over names, grep over contents.

use async_trait::async_trait;
use globset::GlobBuilder;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use tracing::info;

use crate::error::ToolError;
use crate::tools::handlers::sandbox::resolve_path;
use crate::tools::parse_arguments;
use crate::tools::registry::{SafetyTier, ToolHandler};
use crate::types::{InputSchema, ToolDefinition};

const MAX_RESULTS_CAP: usize = 50;
const MAX_LINE_DISPLAY: usize = 200;

fn default_path() -> String {
    ".".to_string()
}

fn default_max_results() -> usize {
    20
}

/// A path component starting with '.' anywhere below the search root
/// excludes the entry.
fn is_hidden(entry: &Path, base: &Path) -> bool {
    entry
        .strip_prefix(base)
        .map(|rel| {
            rel.components()
                .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
        })
        .unwrap_or(false)
}

/// Heuristic: file is binary if the first 8KB contain null bytes.
fn is_binary(path: &Path) -> bool {
    match std::fs::read(path) {
        Ok(bytes) => bytes.iter().take(8192).any(|&b| b == 0),
        Err(_) => true,
    }
}

// ============================================================================
// search_files
// ============================================================================

/// Handler for the `search_files` tool.
pub struct SearchFilesHandler {
    sandbox_root: PathBuf,
}

impl SearchFilesHandler {
    pub fn new(sandbox_root: PathBuf) -> Self {
        Self { sandbox_root }
    }
}

#[derive(Debug, Deserialize)]
struct SearchFilesArgs {
    #[serde(default = "default_path")]
    path: String,

    pattern: String,

    #[serde(default = "default_max_results")]
    max_results: usize,
}

#[async_trait]
impl ToolHandler for SearchFilesHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "search_files",
            "Search for files matching a glob pattern recursively. \
             Pattern examples: '*.txt', 'config.*'. \
             Returns paths relative to the sandbox root.",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "path",
                    serde_json::json!({
                        "type": "string",
                        "description": "Starting directory relative to the sandbox root. Default: the root",
                        "default": "."
                    }),
                )
                .with_property(
                    "pattern",
                    serde_json::json!({
                        "type": "string",
                        "description": "Glob pattern to match (e.g., '*.txt', 'config.*')"
                    }),
                )
                .with_property(
                    "max_results",
                    serde_json::json!({
                        "type": "integer",
                        "description": "Maximum results to return (1-50). Default: 20",
                        "default": 20
                    }),
                )
                .with_required(vec!["pattern".to_string()]),
        )
    }

    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Auto
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let args: SearchFilesArgs = parse_arguments(&input)?;
        if args.pattern.is_empty() {
            return Ok("Error: pattern is required".to_string());
        }
        let max_results = args.max_results.clamp(1, MAX_RESULTS_CAP);

        let resolved = resolve_path(&self.sandbox_root, &args.path)?;
        if !resolved.is_dir() {
            return Ok(format!("Error: directory '{}' does not exist", resolved.display()));
        }

        let matcher = GlobBuilder::new(&args.pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| ToolError::InvalidInput(format!("invalid glob pattern: {e}")))?
            .compile_matcher();

        let mut results: Vec<String> = Vec::new();
        for entry in WalkDir::new(&resolved).into_iter().flatten() {
            if results.len() >= max_results {
                break;
            }
            if entry.path() == resolved {
                continue;
            }
            if is_hidden(entry.path(), &resolved) {
                continue;
            }
            if !matcher.is_match(entry.file_name().to_string_lossy().as_ref()) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.sandbox_root) else {
                continue;
            };
            let suffix = if entry.path().is_dir() { "/" } else { "" };
            results.push(format!("{}{}", rel.display(), suffix));
        }

        if results.is_empty() {
            return Ok(format!(
                "No files matching '{}' found in '{}'",
                args.pattern, args.path
            ));
        }

        info!(
            path = %resolved.display(),
            pattern = %args.pattern,
            results = results.len(),
            "search files"
        );
        Ok(format!(
            "Found {} result(s) for '{}':\n{}",
            results.len(),
            args.pattern,
            results.join("\n")
        ))
    }
}

// ============================================================================
// search_in_files
// ============================================================================

/// Handler for the `search_in_files` tool.
pub struct SearchInFilesHandler {
    sandbox_root: PathBuf,
}

impl SearchInFilesHandler {
    pub fn new(sandbox_root: PathBuf) -> Self {
        Self { sandbox_root }
    }
}

#[derive(Debug, Deserialize)]
struct SearchInFilesArgs {
    #[serde(default = "default_path")]
    path: String,

    query: String,

    #[serde(default = "default_glob")]
    glob: String,

    #[serde(default = "default_max_results")]
    max_results: usize,
}

fn default_glob() -> String {
    "*".to_string()
}

#[async_trait]
impl ToolHandler for SearchInFilesHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "search_in_files",
            "Search for text or regex patterns inside files (like grep). \
             Returns matching lines with file path and line number. \
             Skips binary files automatically.",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "path",
                    serde_json::json!({
                        "type": "string",
                        "description": "Starting directory relative to the sandbox root. Default: the root",
                        "default": "."
                    }),
                )
                .with_property(
                    "query",
                    serde_json::json!({
                        "type": "string",
                        "description": "Text or regex pattern to search for"
                    }),
                )
                .with_property(
                    "glob",
                    serde_json::json!({
                        "type": "string",
                        "description": "File glob filter (e.g., '*.txt'). Default: '*'",
                        "default": "*"
                    }),
                )
                .with_property(
                    "max_results",
                    serde_json::json!({
                        "type": "integer",
                        "description": "Maximum matches to return (1-50). Default: 20",
                        "default": 20
                    }),
                )
                .with_required(vec!["query".to_string()]),
        )
    }

    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Auto
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let args: SearchInFilesArgs = parse_arguments(&input)?;
        if args.query.is_empty() {
            return Ok("Error: query is required".to_string());
        }
        let max_results = args.max_results.clamp(1, MAX_RESULTS_CAP);

        let resolved = resolve_path(&self.sandbox_root, &args.path)?;
        if !resolved.is_dir() {
            return Ok(format!("Error: directory '{}' does not exist", resolved.display()));
        }

        // Try as regex first, fall back to a literal match
        let regex = Regex::new(&args.query)
            .unwrap_or_else(|_| Regex::new(&regex::escape(&args.query)).unwrap());

        let glob = GlobBuilder::new(&args.glob)
            .literal_separator(false)
            .build()
            .map_err(|e| ToolError::InvalidInput(format!("invalid glob filter: {e}")))?
            .compile_matcher();

        let mut matches: Vec<String> = Vec::new();
        'files: for entry in WalkDir::new(&resolved).into_iter().flatten() {
            if matches.len() >= max_results {
                break;
            }
            if !entry.path().is_file() {
                continue;
            }
            if is_hidden(entry.path(), &resolved) {
                continue;
            }
            if !glob.is_match(entry.file_name().to_string_lossy().as_ref()) {
                continue;
            }
            if is_binary(entry.path()) {
                continue;
            }

            let Ok(rel) = entry.path().strip_prefix(&self.sandbox_root) else {
                continue;
            };
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                continue;
            };

            for (line_no, line) in content.lines().enumerate() {
                if matches.len() >= max_results {
                    break 'files;
                }
                if regex.is_match(line) {
                    let mut display_line = line.trim().to_string();
                    if display_line.chars().count() > MAX_LINE_DISPLAY {
                        display_line =
                            display_line.chars().take(MAX_LINE_DISPLAY).collect::<String>() + "...";
                    }
                    matches.push(format!("{}:{}: {}", rel.display(), line_no + 1, display_line));
                }
            }
        }

        if matches.is_empty() {
            return Ok(format!("No matches for '{}' in '{}'", args.query, args.path));
        }

        info!(
            path = %resolved.display(),
            query = %args.query,
            matches = matches.len(),
            "search in files"
        );
        Ok(format!(
            "Found {} match(es) for '{}':\n{}",
            matches.len(),
            args.query,
            matches.join("\n")
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
    async fn test_search_files_glob() {
        let (temp, root) = sandbox();
        std::fs::write(temp.path().join("a.txt"), "x").unwrap();
        std::fs::write(temp.path().join("b.txt"), "y").unwrap();
        std::fs::write(temp.path().join("c.md"), "z").unwrap();

        let handler = SearchFilesHandler::new(root);
        let result = handler.execute(json!({"pattern": "*.txt"})).await.unwrap();

        assert!(result.contains("Found 2 result(s)"));
        assert!(result.contains("a.txt"));
        assert!(result.contains("b.txt"));
        assert!(!result.contains("c.md"));
    }

    #[tokio::test]
    async fn test_search_files_no_match() {
        let (_temp, root) = sandbox();
        let handler = SearchFilesHandler::new(root);
        let result = handler.execute(json!({"pattern": "*.rs"})).await.unwrap();
        assert!(result.contains("No files matching"));
    }

    #[tokio::test]
    async fn test_search_files_skips_hidden() {
        let (temp, root) = sandbox();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        std::fs::write(temp.path().join(".git/config.txt"), "x").unwrap();

        let handler = SearchFilesHandler::new(root);
        let result = handler.execute(json!({"pattern": "*.txt"})).await.unwrap();
        assert!(result.contains("No files matching"));
    }

    #[tokio::test]
    async fn test_search_in_files() {
        let (temp, root) = sandbox();
        std::fs::write(temp.path().join("log.txt"), "ok\nerror: failed\nok").unwrap();

        let handler = SearchInFilesHandler::new(root);
        let result = handler.execute(json!({"query": "error"})).await.unwrap();

        assert!(result.contains("log.txt:2: error: failed"));
    }

    #[tokio::test]
    async fn test_search_in_files_regex() {
        let (temp, root) = sandbox();
        std::fs::write(temp.path().join("data.txt"), "id=42\nid=abc").unwrap();

        let handler = SearchInFilesHandler::new(root);
        let result = handler
            .execute(json!({"query": r"id=\d+"}))
            .await
            .unwrap();

        assert!(result.contains("Found 1 match(es)"));
        assert!(result.contains("id=42"));
    }

    #[tokio::test]
    async fn test_search_in_files_invalid_regex_falls_back_to_literal() {
        let (temp, root) = sandbox();
        std::fs::write(temp.path().join("weird.txt"), "a[b\nplain").unwrap();

        let handler = SearchInFilesHandler::new(root);
        let result = handler.execute(json!({"query": "a[b"})).await.unwrap();
        assert!(result.contains("weird.txt:1"));
    }

    #[tokio::test]
    async fn test_search_in_files_skips_binary() {
        let (temp, root) = sandbox();
        std::fs::write(temp.path().join("blob.bin"), b"match\x00me").unwrap();

        let handler = SearchInFilesHandler::new(root);
        let result = handler.execute(json!({"query": "match"})).await.unwrap();
        assert!(result.contains("No matches"));
    }
}
