// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Valet - an autonomous personal agent runtime for your local machine.
//!
//! Valet accepts natural-language instructions, decides which capabilities
//! (tools) to invoke against the local host, executes them under a
//! deterministic safety policy, and returns a final response.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Core type definitions (Message, ToolDefinition, Provider, etc.)
//! - [`error`] - Error types and result aliases
//! - [`config`] - Settings loading and the hardcoded loop guards
//! - [`telemetry`] - Tracing initialization
//! - [`providers`] - Chat-completion provider implementations
//! - [`tools`] - Tool handlers, registry, and the safety classifier
//! - [`memory`] - Durable store, semantic index, background indexing, summarizer
//! - [`agent`] - The core reason-and-act loop and context builder
//! - [`scheduler`] - Cron jobs and maintenance passes
//! - [`channels`] - User-facing surfaces (terminal REPL)

pub mod agent;
pub mod channels;
pub mod config;
pub mod error;
pub mod memory;
pub mod providers;
pub mod scheduler;
pub mod telemetry;
pub mod tools;
pub mod types;

// Re-export commonly used types at crate root
pub use agent::{AgentRuntime, ContextBuilder, RunRequest, Trace};
pub use error::{AgentError, ConfigError, ProviderError, Result, StoreError, ToolError};
pub use tools::{ExecutionContext, SafetyTier, ToolRegistry};
pub use types::{
    ContentBlock, Message, MessageContent, Provider, ProviderResponse, Role, SharedProvider,
    StopReason, TokenUsage, ToolCall, ToolDefinition, ToolResult,
};

/// Valet version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_exports() {
        let _msg = Message::user("test");
        let _response = ProviderResponse::text("ok");
    }
}
