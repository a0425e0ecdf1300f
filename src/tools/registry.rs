// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool registry, handler trait and safety tiers.
//!
//! This module defines the core abstractions for the tool system:
//! - [`ToolHandler`] trait that all tools must implement
//! - [`ToolRegistry`] for registration, tier classification and execution
//! - [`SafetyTier`] / [`ExecutionContext`] for the safety policy

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::error::ToolError;
use crate::tools::safety::classify_command;
use crate::types::ToolDefinition;

/// Safety decision for a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyTier {
    /// Read-only: auto-execute.
    Auto,
    /// Write/execute: require user confirmation.
    Confirm,
    /// Destructive: always block.
    Blocked,
}

impl SafetyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyTier::Auto => "auto",
            SafetyTier::Confirm => "confirm",
            SafetyTier::Blocked => "blocked",
        }
    }
}

/// Execution environment the registry is configured for.
///
/// In headless context there is nobody to confirm, so `Confirm` decisions
/// are promoted to `Blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    UserSession,
    Headless,
}

/// Trait that all tool handlers must implement.
///
/// Each tool is a struct carrying whatever shared state it needs (sandbox
/// root, store handle, scheduler handle) and decoding its own typed input
/// at the handler boundary.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition (name, description, input schema).
    fn definition(&self) -> ToolDefinition;

    /// Default safety tier when no dynamic classification applies.
    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Confirm
    }

    /// Execute the tool with the given input parameters.
    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError>;
}

/// Registry of available tools, maps names to handlers.
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    context: ExecutionContext,
}

impl ToolRegistry {
    /// Create an empty registry for the given execution context.
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            handlers: HashMap::new(),
            context,
        }
    }

    /// Register a tool handler. Idempotent by name.
    pub fn register<T: ToolHandler + 'static>(&mut self, handler: T) {
        let def = handler.definition();
        self.handlers.insert(def.name, Arc::new(handler));
    }

    /// Register an already-shared handler.
    pub fn register_shared(&mut self, handler: Arc<dyn ToolHandler>) {
        let def = handler.definition();
        self.handlers.insert(def.name, handler);
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Get all tool names.
    pub fn tool_names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Export tool schemas for the provider.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.handlers.values().map(|h| h.definition()).collect()
    }

    /// The execution context this registry was configured with.
    pub fn execution_context(&self) -> ExecutionContext {
        self.context
    }

    /// Classify a tool call into a safety tier.
    ///
    /// Shell commands get dynamic pattern-based classification; file writes
    /// and cron mutations always need confirmation; unknown tools are
    /// blocked outright. Everything else uses the handler's registered
    /// default tier.
    pub fn classify(&self, tool_name: &str, input: &serde_json::Value) -> SafetyTier {
        let Some(handler) = self.handlers.get(tool_name) else {
            warn!(tool_name, "unknown tool classified as blocked");
            return SafetyTier::Blocked;
        };

        if tool_name == "shell_execute" {
            let command = input.get("command").and_then(|v| v.as_str()).unwrap_or("");
            let tier = classify_command(command);

            if tier == SafetyTier::Confirm && self.context == ExecutionContext::Headless {
                let preview: String = command.chars().take(50).collect();
                warn!(
                    tool_name,
                    command_preview = %preview,
                    "headless context: confirm promoted to blocked"
                );
                return SafetyTier::Blocked;
            }
            return tier;
        }

        if tool_name == "file_write" {
            if self.context == ExecutionContext::Headless {
                return SafetyTier::Blocked;
            }
            return SafetyTier::Confirm;
        }

        if tool_name == "cron_schedule" {
            let action = input.get("action").and_then(|v| v.as_str()).unwrap_or("");
            if action == "list" {
                return SafetyTier::Auto;
            }
            if self.context == ExecutionContext::Headless {
                return SafetyTier::Blocked;
            }
            return SafetyTier::Confirm;
        }

        handler.default_tier()
    }

    /// Execute a tool by name.
    ///
    /// Safety violations raised by handlers propagate unchanged; any other
    /// failure is wrapped as a tool-execution error.
    pub async fn execute(&self, tool_name: &str, input: serde_json::Value) -> Result<String, ToolError> {
        let handler = self
            .handlers
            .get(tool_name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;

        match handler.execute(input).await {
            Ok(output) => Ok(output),
            Err(e) if e.is_safety_violation() => Err(e),
            Err(e) => Err(ToolError::ExecutionFailed(format!(
                "Tool '{tool_name}' failed: {e}"
            ))),
        }
    }
}
