// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Agent runtime - the core reason-and-act loop.
//!
//! Drives the model through tool calls until a terminal response:
//!
//! 1. Build the system prompt (base + memory context)
//! 2. Call the model (with transient-error retry)
//! 3. On `tool_use`: classify -> execute/confirm/block -> append results -> goto 2
//! 4. On `end_turn`: return the text response
//!
//! Guards are hardcoded in [`crate::config::guards`] and integrity-checked
//! at startup: 15 iterations, 100k tokens, 30 s per tool, 300 s per turn,
//! 10k chars per tool output, 60 s per confirmation. Per-tool failures
//! never kill the loop; guard violations end the turn cleanly with a
//! failure trace.

pub mod context;
pub mod prompts;
pub mod types;

pub use context::{estimate_tokens, BuiltContext, ContextBuilder};
pub use prompts::{build_system_prompt, DEFAULT_SYSTEM_PROMPT};
pub use types::{model_pricing, ConfirmCallback, SharedConfirmCallback, Trace};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use uuid::Uuid;

use tracing::{error, info, warn};

use crate::config::guards;
use crate::error::{AgentError, ProviderError};
use crate::memory::store::{MemoryStore, ToolExecutionRecord};
use crate::tools::registry::SafetyTier;
use crate::tools::ToolRegistry;
use crate::types::{
    ContentBlock, Message, ProviderResponse, Role, SharedProvider, StopReason, ToolCall,
    ToolDefinition,
};

const MODEL_RETRY_ATTEMPTS: u32 = 3;
const MODEL_RETRY_MAX_BACKOFF_SECS: u64 = 30;

const BLOCKED_RESULT: &str = "BLOCKED: this command is blocked by safety policy.";
const CANCELLED_HEADLESS: &str =
    "CANCELLED: operation requires user confirmation (headless mode).";
const CANCELLED_TIMEOUT: &str = "CANCELLED: confirmation timed out.";
const CANCELLED_DENIED: &str = "CANCELLED: user declined the operation.";

/// Inputs for a single user turn.
#[derive(Default)]
pub struct RunRequest {
    pub user_message: String,
    pub session_id: String,
    pub history: Vec<Message>,
    pub user_profile: Option<String>,
    pub semantic_memories: Option<Vec<String>>,
    pub session_summary: Option<String>,
}

impl RunRequest {
    pub fn new(user_message: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            session_id: session_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct LoopState {
    iterations: u32,
    input_tokens: u64,
    output_tokens: u64,
    tools_called: Vec<String>,
}

/// Core agentic loop using the provider's native tool-use protocol.
pub struct AgentRuntime {
    provider: SharedProvider,
    registry: Option<Arc<ToolRegistry>>,
    confirm: Option<SharedConfirmCallback>,
    store: Option<Arc<MemoryStore>>,
    base_system_prompt: Option<String>,
}

impl AgentRuntime {
    pub fn new(provider: SharedProvider) -> Self {
        Self {
            provider,
            registry: None,
            confirm: None,
            store: None,
            base_system_prompt: None,
        }
    }

    /// Attach the tool registry.
    pub fn with_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Attach a default confirmation callback.
    pub fn with_confirm_callback(mut self, confirm: SharedConfirmCallback) -> Self {
        self.confirm = Some(confirm);
        self
    }

    /// Attach the store for tool-execution records.
    pub fn with_store(mut self, store: Arc<MemoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the base system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.base_system_prompt = Some(prompt.into());
        self
    }

    /// Run the agentic loop for a single user turn.
    ///
    /// Never fails outright: every terminal condition folds into a
    /// user-facing response plus a trace marking success or failure.
    pub async fn run(&self, request: RunRequest) -> (String, Trace) {
        self.run_with_confirm(request, None).await
    }

    /// Run with a per-call confirmation callback overriding the default.
    pub async fn run_with_confirm(
        &self,
        request: RunRequest,
        confirm_override: Option<SharedConfirmCallback>,
    ) -> (String, Trace) {
        let trace_id = Uuid::new_v4().to_string();
        let session_start = Instant::now();
        let confirm = confirm_override.or_else(|| self.confirm.clone());

        info!(
            trace_id = %trace_id,
            session_id = %request.session_id,
            user_message_len = request.user_message.len(),
            "agent run start"
        );

        let built_system = build_system_prompt(
            self.base_system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT),
            request.user_profile.as_deref(),
            request.semantic_memories.as_deref(),
            request.session_summary.as_deref(),
        );

        let mut messages = request.history;
        messages.push(Message::user(&request.user_message));

        let tool_defs = self
            .registry
            .as_ref()
            .map(|r| r.definitions())
            .unwrap_or_default();

        let mut state = LoopState::default();

        let outcome = match timeout(
            Duration::from_secs(guards::SESSION_TIMEOUT_SECS),
            self.run_loop(
                &mut state,
                &built_system,
                &mut messages,
                &tool_defs,
                &request.session_id,
                confirm.as_ref(),
            ),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AgentError::SessionTimeout(guards::SESSION_TIMEOUT_SECS)),
        };

        let (response_text, error_message) = match outcome {
            Ok(text) => (text, None),
            Err(e @ AgentError::SessionTimeout(_)) => {
                error!(elapsed_s = session_start.elapsed().as_secs(), "session timeout");
                (
                    "Sorry, the operation took too long and was cancelled.".to_string(),
                    Some(e.to_string()),
                )
            }
            Err(e @ AgentError::MaxIterations(_)) => {
                error!(iterations = state.iterations, "max iterations hit");
                (
                    "I hit the iteration limit. The task may be incomplete.".to_string(),
                    Some(e.to_string()),
                )
            }
            Err(e @ AgentError::ContextOverflow(_)) => {
                error!("context overflow");
                (
                    "This session's context has grown too long. Please start a new conversation."
                        .to_string(),
                    Some(e.to_string()),
                )
            }
            Err(AgentError::Provider(e)) => {
                error!(error = %e, "provider error");
                (
                    "There was an error talking to the model. Please try again.".to_string(),
                    Some(format!("API error: {e}")),
                )
            }
        };

        let pricing = model_pricing(self.provider.model());
        let total_cost = pricing.cost(state.input_tokens as u32, state.output_tokens as u32);

        let trace = Trace {
            trace_id,
            session_id: request.session_id,
            iterations: state.iterations,
            total_input_tokens: state.input_tokens,
            total_output_tokens: state.output_tokens,
            total_cost_usd: total_cost,
            duration_ms: session_start.elapsed().as_millis() as u64,
            tools_called: state.tools_called,
            success: error_message.is_none(),
            error_message,
        };

        info!(
            iterations = trace.iterations,
            total_tokens = trace.total_tokens(),
            cost_usd = trace.total_cost_usd,
            duration_ms = trace.duration_ms,
            success = trace.success,
            "agent run done"
        );

        (response_text, trace)
    }

    async fn run_loop(
        &self,
        state: &mut LoopState,
        system: &str,
        messages: &mut Vec<Message>,
        tool_defs: &[ToolDefinition],
        session_id: &str,
        confirm: Option<&SharedConfirmCallback>,
    ) -> Result<String, AgentError> {
        let pricing = model_pricing(self.provider.model());

        loop {
            if state.iterations >= guards::MAX_ITERATIONS {
                return Err(AgentError::MaxIterations(guards::MAX_ITERATIONS));
            }
            state.iterations += 1;

            if state.input_tokens + state.output_tokens >= guards::MAX_TOKENS_SESSION {
                return Err(AgentError::ContextOverflow(guards::MAX_TOKENS_SESSION));
            }

            let call_start = Instant::now();
            info!(
                iteration = state.iterations,
                messages_count = messages.len(),
                tools_count = tool_defs.len(),
                "llm call"
            );

            let response = self.call_with_retry(system, messages, tool_defs).await?;

            state.input_tokens += response.usage.input_tokens as u64;
            state.output_tokens += response.usage.output_tokens as u64;
            let call_cost = pricing.cost(response.usage.input_tokens, response.usage.output_tokens);

            info!(
                iteration = state.iterations,
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                cost_usd = call_cost,
                duration_ms = call_start.elapsed().as_millis() as u64,
                "llm call done"
            );

            push_assistant_message(messages, &response);

            match response.stop_reason {
                StopReason::ToolUse if response.has_tool_calls() => {
                    let results = self
                        .handle_tool_calls(
                            &response.tool_calls,
                            session_id,
                            &mut state.tools_called,
                            confirm,
                        )
                        .await;
                    messages.push(Message::with_blocks(Role::User, results));
                }
                StopReason::EndTurn => return Ok(response.content),
                other => {
                    warn!(stop_reason = ?other, "unexpected stop reason");
                    return Ok(response.content);
                }
            }
        }
    }

    /// Call the model with retry on transient conditions only (rate limit,
    /// server error, network timeout). Exponential backoff 1 -> 30 s.
    async fn call_with_retry(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ProviderResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.provider.chat(system, messages, tools).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < MODEL_RETRY_ATTEMPTS => {
                    let backoff_secs = (1u64 << (attempt - 1)).min(MODEL_RETRY_MAX_BACKOFF_SECS);
                    warn!(attempt, backoff_secs, error = %e, "transient provider error");
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Process all tool_use blocks from one response.
    ///
    /// Auto-tier calls execute in parallel; confirm/blocked are handled
    /// sequentially afterwards. Results come back in the original block
    /// order, each linked by `tool_use_id`.
    async fn handle_tool_calls(
        &self,
        tool_calls: &[ToolCall],
        session_id: &str,
        tools_called: &mut Vec<String>,
        confirm: Option<&SharedConfirmCallback>,
    ) -> Vec<ContentBlock> {
        let Some(registry) = self.registry.clone() else {
            return tool_calls
                .iter()
                .map(|call| {
                    ContentBlock::tool_result(&call.id, "Error: no tool registry configured", true)
                })
                .collect();
        };

        let mut auto_calls: Vec<(usize, ToolCall)> = Vec::new();
        let mut gated_calls: Vec<(usize, ToolCall, SafetyTier)> = Vec::new();

        for (index, call) in tool_calls.iter().enumerate() {
            tools_called.push(call.name.clone());
            match registry.classify(&call.name, &call.input) {
                SafetyTier::Auto => auto_calls.push((index, call.clone())),
                tier => gated_calls.push((index, call.clone(), tier)),
            }
        }

        let mut slots: Vec<Option<ContentBlock>> = vec![None; tool_calls.len()];

        // Auto-tier batch runs concurrently
        let mut handles = Vec::with_capacity(auto_calls.len());
        for (index, call) in auto_calls {
            let registry = registry.clone();
            let store = self.store.clone();
            let session_id = session_id.to_string();
            let call_id = call.id.clone();
            handles.push((
                index,
                call_id,
                tokio::spawn(async move {
                    execute_tool(registry, store, session_id, call, SafetyTier::Auto, None).await
                }),
            ));
        }
        for (index, call_id, handle) in handles {
            let (content, is_error) = match handle.await {
                Ok(result) => result,
                Err(e) => (format!("Error: {e}"), true),
            };
            slots[index] = Some(ContentBlock::tool_result(&call_id, content, is_error));
        }

        // Confirm/blocked are serialized, in order
        for (index, call, tier) in gated_calls {
            let block = match tier {
                SafetyTier::Blocked => {
                    warn!(
                        tool_name = %call.name,
                        command_preview = %command_preview(&call, 50),
                        "blocked tool call"
                    );
                    ContentBlock::tool_result(&call.id, BLOCKED_RESULT, true)
                }
                _ => {
                    let call_id = call.id.clone();
                    let (content, is_error) = self
                        .confirm_and_execute(
                            registry.clone(),
                            session_id,
                            call,
                            confirm,
                            Duration::from_secs(guards::CONFIRMATION_TIMEOUT_SECS),
                        )
                        .await;
                    ContentBlock::tool_result(&call_id, content, is_error)
                }
            };
            slots[index] = Some(block);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.unwrap_or_else(|| {
                    ContentBlock::tool_result(&tool_calls[i].id, "Error: tool result missing", true)
                })
            })
            .collect()
    }

    /// Ask the user before executing a confirm-tier tool.
    async fn confirm_and_execute(
        &self,
        registry: Arc<ToolRegistry>,
        session_id: &str,
        call: ToolCall,
        confirm: Option<&SharedConfirmCallback>,
        confirmation_timeout: Duration,
    ) -> (String, bool) {
        let preview = command_preview(&call, 80);
        info!(tool_name = %call.name, preview = %preview, "confirmation requested");

        let Some(callback) = confirm else {
            warn!(tool_name = %call.name, "no confirmation callback, auto-deny");
            return (CANCELLED_HEADLESS.to_string(), true);
        };

        let confirmed = match timeout(confirmation_timeout, callback.confirm(&call.name, &preview))
            .await
        {
            Ok(answer) => answer,
            Err(_) => {
                warn!(tool_name = %call.name, "confirmation timeout");
                return (CANCELLED_TIMEOUT.to_string(), true);
            }
        };

        if !confirmed {
            info!(tool_name = %call.name, "confirmation denied");
            return (CANCELLED_DENIED.to_string(), true);
        }

        info!(tool_name = %call.name, "confirmation approved");
        execute_tool(
            registry,
            self.store.clone(),
            session_id.to_string(),
            call,
            SafetyTier::Confirm,
            Some(true),
        )
        .await
    }
}

fn push_assistant_message(messages: &mut Vec<Message>, response: &ProviderResponse) {
    let mut blocks: Vec<ContentBlock> = Vec::new();
    if !response.content.is_empty() {
        blocks.push(ContentBlock::text(&response.content));
    }
    for call in &response.tool_calls {
        blocks.push(ContentBlock::tool_use(&call.id, &call.name, call.input.clone()));
    }
    if !blocks.is_empty() {
        messages.push(Message::with_blocks(Role::Assistant, blocks));
    }
}

fn command_preview(call: &ToolCall, max_chars: usize) -> String {
    let preview = call
        .input
        .get("command")
        .and_then(|v| v.as_str())
        .unwrap_or(&call.name);
    preview.chars().take(max_chars).collect()
}

/// Execute one tool under the per-tool timeout, truncating output and
/// recording the execution.
async fn execute_tool(
    registry: Arc<ToolRegistry>,
    store: Option<Arc<MemoryStore>>,
    session_id: String,
    call: ToolCall,
    tier: SafetyTier,
    user_confirmed: Option<bool>,
) -> (String, bool) {
    let tool_start = Instant::now();
    info!(tool_name = %call.name, tool_id = %call.id, "tool exec start");

    let (content, is_error) = match timeout(
        Duration::from_secs(guards::TOOL_TIMEOUT_SECS),
        registry.execute(&call.name, call.input.clone()),
    )
    .await
    {
        Ok(Ok(output)) => {
            let truncated = output.chars().count() > guards::MAX_TOOL_OUTPUT_CHARS;
            let mut content: String =
                output.chars().take(guards::MAX_TOOL_OUTPUT_CHARS).collect();
            if truncated {
                content.push_str("\n[... output truncated]");
            }
            (content, false)
        }
        Ok(Err(e)) => {
            error!(tool_name = %call.name, error = %e, "tool exec error");
            (format!("Error: {e}"), true)
        }
        Err(_) => {
            error!(
                tool_name = %call.name,
                timeout_s = guards::TOOL_TIMEOUT_SECS,
                "tool timeout"
            );
            (
                format!(
                    "Error: tool '{}' timed out after {}s",
                    call.name,
                    guards::TOOL_TIMEOUT_SECS
                ),
                true,
            )
        }
    };

    let duration_ms = tool_start.elapsed().as_millis() as u64;
    info!(
        tool_name = %call.name,
        duration_ms,
        output_len = content.len(),
        is_error,
        "tool exec done"
    );

    // Persistence failures are logged, never surfaced to the loop
    if let Some(store) = store {
        let record = ToolExecutionRecord {
            session_id,
            tool_name: call.name.clone(),
            input_preview: call.input.to_string(),
            output_preview: Some(content.clone()),
            safety_tier: tier.as_str().to_string(),
            user_confirmed,
            duration_ms: Some(duration_ms),
        };
        if let Err(e) = store.save_tool_execution(&record).await {
            warn!(error = %e, "tool execution record not persisted");
        }
    }

    (content, is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::tools::registry::{ExecutionContext, ToolHandler};
    use crate::types::{InputSchema, ToolDefinition};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        failures_before_success: u32,
        calls: AtomicU32,
        retryable: bool,
    }

    #[async_trait]
    impl crate::types::Provider for FlakyProvider {
        async fn chat(
            &self,
            _system: &str,
            _messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<ProviderResponse, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                if self.retryable {
                    Err(ProviderError::RateLimited("slow down".to_string()))
                } else {
                    Err(ProviderError::AuthError("bad key".to_string()))
                }
            } else {
                Ok(ProviderResponse::text("recovered"))
            }
        }

        fn model(&self) -> &str {
            "claude-sonnet-4-20250514"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_transient_errors() {
        let provider = Arc::new(FlakyProvider {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
            retryable: true,
        });
        let runtime = AgentRuntime::new(provider.clone());

        let response = runtime.call_with_retry("sys", &[], &[]).await.unwrap();
        assert_eq!(response.content, "recovered");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_three_attempts() {
        let provider = Arc::new(FlakyProvider {
            failures_before_success: 10,
            calls: AtomicU32::new(0),
            retryable: true,
        });
        let runtime = AgentRuntime::new(provider.clone());

        let err = runtime.call_with_retry("sys", &[], &[]).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_on_fatal_errors() {
        let provider = Arc::new(FlakyProvider {
            failures_before_success: 10,
            calls: AtomicU32::new(0),
            retryable: false,
        });
        let runtime = AgentRuntime::new(provider.clone());

        let err = runtime.call_with_retry("sys", &[], &[]).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthError(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    struct SlowTool;

    #[async_trait]
    impl ToolHandler for SlowTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("slow_tool", "Sleeps past the per-tool guard")
                .with_schema(InputSchema::new())
        }

        fn default_tier(&self) -> SafetyTier {
            SafetyTier::Auto
        }

        async fn execute(&self, _input: serde_json::Value) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("never".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tool_timeout_yields_error_result() {
        let mut registry = ToolRegistry::new(ExecutionContext::UserSession);
        registry.register(SlowTool);

        let (content, is_error) = execute_tool(
            Arc::new(registry),
            None,
            "s1".to_string(),
            ToolCall {
                id: "t1".to_string(),
                name: "slow_tool".to_string(),
                input: json!({}),
            },
            SafetyTier::Auto,
            None,
        )
        .await;

        assert!(is_error);
        assert!(content.contains("timed out after 30s"));
    }

    struct NeverConfirm;

    #[async_trait]
    impl ConfirmCallback for NeverConfirm {
        async fn confirm(&self, _tool_name: &str, _preview: &str) -> bool {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    struct DenyConfirm;

    #[async_trait]
    impl ConfirmCallback for DenyConfirm {
        async fn confirm(&self, _tool_name: &str, _preview: &str) -> bool {
            false
        }
    }

    fn confirm_registry() -> Arc<ToolRegistry> {
        struct EchoTool;

        #[async_trait]
        impl ToolHandler for EchoTool {
            fn definition(&self) -> ToolDefinition {
                ToolDefinition::new("echo_tool", "echoes")
            }

            fn default_tier(&self) -> SafetyTier {
                SafetyTier::Confirm
            }

            async fn execute(&self, _input: serde_json::Value) -> Result<String, ToolError> {
                Ok("echoed".to_string())
            }
        }

        let mut registry = ToolRegistry::new(ExecutionContext::UserSession);
        registry.register(EchoTool);
        Arc::new(registry)
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_timeout_cancels() {
        let registry = confirm_registry();
        let provider = Arc::new(FlakyProvider {
            failures_before_success: 0,
            calls: AtomicU32::new(0),
            retryable: true,
        });
        let runtime = AgentRuntime::new(provider).with_registry(registry.clone());

        let callback: SharedConfirmCallback = Arc::new(NeverConfirm);
        let (content, is_error) = runtime
            .confirm_and_execute(
                registry,
                "s1",
                ToolCall {
                    id: "t1".to_string(),
                    name: "echo_tool".to_string(),
                    input: json!({}),
                },
                Some(&callback),
                Duration::from_millis(50),
            )
            .await;

        assert!(is_error);
        assert!(content.contains("CANCELLED"));
        assert!(content.contains("timed out"));
    }

    #[tokio::test]
    async fn test_confirmation_denied_cancels() {
        let registry = confirm_registry();
        let provider = Arc::new(FlakyProvider {
            failures_before_success: 0,
            calls: AtomicU32::new(0),
            retryable: true,
        });
        let runtime = AgentRuntime::new(provider).with_registry(registry.clone());

        let callback: SharedConfirmCallback = Arc::new(DenyConfirm);
        let (content, is_error) = runtime
            .confirm_and_execute(
                registry,
                "s1",
                ToolCall {
                    id: "t1".to_string(),
                    name: "echo_tool".to_string(),
                    input: json!({}),
                },
                Some(&callback),
                Duration::from_secs(60),
            )
            .await;

        assert!(is_error);
        assert_eq!(content, CANCELLED_DENIED);
    }

    #[tokio::test]
    async fn test_no_callback_is_headless_cancel() {
        let registry = confirm_registry();
        let provider = Arc::new(FlakyProvider {
            failures_before_success: 0,
            calls: AtomicU32::new(0),
            retryable: true,
        });
        let runtime = AgentRuntime::new(provider).with_registry(registry.clone());

        let (content, is_error) = runtime
            .confirm_and_execute(
                registry,
                "s1",
                ToolCall {
                    id: "t1".to_string(),
                    name: "echo_tool".to_string(),
                    input: json!({}),
                },
                None,
                Duration::from_secs(60),
            )
            .await;

        assert!(is_error);
        assert_eq!(content, CANCELLED_HEADLESS);
    }

    #[test]
    fn test_command_preview_bounds() {
        let call = ToolCall {
            id: "t1".to_string(),
            name: "shell_execute".to_string(),
            input: json!({"command": "x".repeat(200)}),
        };
        assert_eq!(command_preview(&call, 80).len(), 80);

        let call = ToolCall {
            id: "t2".to_string(),
            name: "file_write".to_string(),
            input: json!({"path": "a.txt"}),
        };
        assert_eq!(command_preview(&call, 80), "file_write");
    }
}
