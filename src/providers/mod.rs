// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Chat-completion provider implementations.
//!
//! The agent treats the provider as an opaque request/response service;
//! see [`crate::types::Provider`] for the contract.

pub mod anthropic;

pub use anthropic::AnthropicProvider;

use std::sync::Arc;

use crate::types::SharedProvider;

/// Default Anthropic API base URL.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Create an Anthropic provider for the given model.
pub fn anthropic(
    api_key: impl Into<String>,
    model: impl Into<String>,
    max_tokens: u32,
) -> SharedProvider {
    Arc::new(AnthropicProvider::new(
        api_key,
        model,
        ANTHROPIC_BASE_URL,
        max_tokens,
    ))
}
