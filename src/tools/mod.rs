// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool system for Valet.
//!
//! This module provides the infrastructure for defining and executing the
//! capabilities the model can invoke against the local host:
//!
//! - [`ToolHandler`] trait - core abstraction for tool implementations
//! - [`ToolRegistry`] - registration, safety classification, dispatch
//! - [`safety`] - the deterministic shell command classifier
//! - Individual handlers in the [`handlers`] module

pub mod handlers;
pub mod registry;
pub mod safety;

pub use registry::{ExecutionContext, SafetyTier, ToolHandler, ToolRegistry};

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ToolError;
use crate::memory::retriever::SemanticRetriever;
use crate::memory::store::MemoryStore;
use crate::scheduler::Scheduler;

/// Parse JSON arguments into a typed struct.
///
/// Tool inputs arrive as provider-defined JSON; each handler decodes its
/// own typed input structure at this boundary.
pub fn parse_arguments<T>(arguments: &serde_json::Value) -> Result<T, ToolError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(arguments.clone())
        .map_err(|err| ToolError::InvalidInput(format!("Failed to parse arguments: {err}")))
}

/// Truncate text to at most `max_chars` characters, appending a marker.
///
/// Cuts at a char boundary so multi-byte UTF-8 never panics.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}{marker}")
}

/// Assemble the tool registry with all enabled tools.
pub fn create_registry(
    context: ExecutionContext,
    sandbox_root: PathBuf,
    store: Arc<MemoryStore>,
    retriever: Arc<SemanticRetriever>,
    scheduler: Arc<Scheduler>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new(context);

    // shell_execute - tier is classified dynamically per command
    registry.register(handlers::shell::ShellHandler::new());

    // File tools, sandboxed to one root
    registry.register(handlers::file_read::FileReadHandler::new(sandbox_root.clone()));
    registry.register(handlers::file_write::FileWriteHandler::new(sandbox_root.clone()));
    registry.register(handlers::list_dir::ListDirectoryHandler::new(sandbox_root.clone()));
    registry.register(handlers::list_dir::DirectoryTreeHandler::new(sandbox_root.clone()));
    registry.register(handlers::file_search::SearchFilesHandler::new(sandbox_root.clone()));
    registry.register(handlers::file_search::SearchInFilesHandler::new(sandbox_root.clone()));
    registry.register(handlers::file_manage::FileInfoHandler::new(sandbox_root.clone()));
    registry.register(handlers::file_manage::FileMoveHandler::new(sandbox_root.clone()));
    registry.register(handlers::file_manage::FileDeleteHandler::new(sandbox_root));

    // Network and host
    registry.register(handlers::web::WebFetchHandler::new());
    registry.register(handlers::system::SystemInfoHandler::new());

    // Memory
    registry.register(handlers::memory::MemorySearchHandler::new(retriever));
    registry.register(handlers::memory::MemoryStoreHandler::new(store));

    // Scheduling
    registry.register(handlers::cron::CronScheduleHandler::new(scheduler));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_short() {
        assert_eq!(truncate_chars("hello", 10, "..."), "hello");
    }

    #[test]
    fn test_truncate_chars_long() {
        assert_eq!(truncate_chars("hello world", 5, "..."), "hello...");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        // Multi-byte chars must not split
        let result = truncate_chars("café!", 4, "...");
        assert_eq!(result, "café...");
    }

    #[test]
    fn test_parse_arguments() {
        #[derive(Deserialize)]
        struct TestArgs {
            path: String,
        }

        let value = serde_json::json!({"path": "/test"});
        let result: Result<TestArgs, _> = parse_arguments(&value);
        assert_eq!(result.unwrap().path, "/test");
    }

    #[test]
    fn test_parse_arguments_invalid() {
        #[derive(Deserialize)]
        #[allow(dead_code)]
        struct TestArgs {
            required_field: String,
        }

        let value = serde_json::json!({"wrong_field": "value"});
        let result: Result<TestArgs, _> = parse_arguments(&value);
        assert!(matches!(result, Err(ToolError::InvalidInput(_))));
    }
}
