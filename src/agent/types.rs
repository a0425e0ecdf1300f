// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Agent runtime types: traces, confirmation callbacks, pricing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::ModelPricing;

/// Per-turn execution record, persisted once at turn completion
/// (success or failure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: String,
    pub session_id: String,
    /// Reason-act iterations consumed.
    pub iterations: u32,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost_usd: f64,
    pub duration_ms: u64,
    /// Tool names in invocation order (blocked calls included).
    pub tools_called: Vec<String>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl Trace {
    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens + self.total_output_tokens
    }
}

/// Callback asking the user to approve a tool execution.
///
/// The preview is bounded to 80 characters; the whole confirmation is
/// bounded by the 60 s guard. Timeout or refusal yields a cancellation
/// result, never a turn abort.
#[async_trait]
pub trait ConfirmCallback: Send + Sync {
    async fn confirm(&self, tool_name: &str, preview: &str) -> bool;
}

/// Arc-wrapped callback for shared ownership.
pub type SharedConfirmCallback = Arc<dyn ConfirmCallback>;

/// Cost per million tokens, keyed by model.
pub fn model_pricing(model: &str) -> ModelPricing {
    match model {
        "claude-sonnet-4-20250514" => ModelPricing {
            input_per_mtok: 3.00,
            output_per_mtok: 15.00,
        },
        "claude-haiku-4-5-20251001" => ModelPricing {
            input_per_mtok: 0.80,
            output_per_mtok: 4.00,
        },
        _ => ModelPricing {
            input_per_mtok: 3.00,
            output_per_mtok: 15.00,
        },
    }
}
