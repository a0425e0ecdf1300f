// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Auto-summarization of long conversations using a cheap model.

use tracing::{info, warn};

use crate::memory::store::StoredTurn;
use crate::types::{Message, Provider};

const MIN_SUMMARY_CHARS: usize = 50;
const MAX_SUMMARY_CHARS: usize = 800;
const MAX_INPUT_CHARS: usize = 4_000;
const MAX_RETRIES: u32 = 2;

const SUMMARIZER_SYSTEM: &str =
    "You are an assistant that writes concise summaries of conversations.";

/// Compress a conversation into a 2-4 sentence summary.
///
/// Returns `None` when summarization fails or the output falls outside the
/// [50, 800] character window after all retries; callers proceed without a
/// new summary.
pub async fn summarize_conversation(
    provider: &dyn Provider,
    turns: &[StoredTurn],
) -> Option<String> {
    if turns.is_empty() {
        return None;
    }

    let conversation_text = turns
        .iter()
        .map(|t| {
            let content: String = t.content.chars().take(500).collect();
            format!("[{}]: {}", t.role.to_uppercase(), content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    if conversation_text.chars().count() < MIN_SUMMARY_CHARS {
        return None;
    }

    let truncated: String = conversation_text.chars().take(MAX_INPUT_CHARS).collect();
    let prompt = format!(
        "Summarize this conversation in 2-4 sentences. \
         Focus on the main topics, decisions made, and context that matters \
         for future interactions. Be concise.\n\nCONVERSATION:\n{truncated}"
    );

    for attempt in 0..=MAX_RETRIES {
        match provider
            .chat(SUMMARIZER_SYSTEM, &[Message::user(prompt.clone())], &[])
            .await
        {
            Ok(response) => {
                let summary = response.content.trim().to_string();
                let len = summary.chars().count();
                if (MIN_SUMMARY_CHARS..=MAX_SUMMARY_CHARS).contains(&len) {
                    info!(
                        original_len = conversation_text.len(),
                        summary_len = len,
                        attempt = attempt + 1,
                        "summarization done"
                    );
                    return Some(summary);
                }
                warn!(summary_len = len, attempt = attempt + 1, "summary length out of range");
            }
            Err(e) => {
                warn!(error = %e, attempt = attempt + 1, "summarization failed");
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::types::{ProviderResponse, ToolDefinition};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn turns(content: &str) -> Vec<StoredTurn> {
        vec![
            StoredTurn {
                role: "user".to_string(),
                content: content.to_string(),
            },
            StoredTurn {
                role: "assistant".to_string(),
                content: "Understood, noted for later reference.".to_string(),
            },
        ]
    }

    struct ScriptedSummarizer {
        outputs: Vec<String>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Provider for ScriptedSummarizer {
        async fn chat(
            &self,
            _system: &str,
            _messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<ProviderResponse, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let output = self
                .outputs
                .get(call)
                .cloned()
                .unwrap_or_else(|| self.outputs.last().cloned().unwrap_or_default());
            Ok(ProviderResponse::text(output))
        }

        fn model(&self) -> &str {
            "scripted-haiku"
        }
    }

    #[tokio::test]
    async fn test_valid_summary_returned() {
        let provider = ScriptedSummarizer {
            outputs: vec![
                "The user discussed their morning routine and asked the agent to track \
                 their coffee preferences going forward."
                    .to_string(),
            ],
            calls: AtomicU32::new(0),
        };

        let summary = summarize_conversation(
            &provider,
            &turns("Please remember that I drink two espressos every morning before standup."),
        )
        .await
        .unwrap();

        assert!(summary.chars().count() >= MIN_SUMMARY_CHARS);
        assert!(summary.contains("coffee"));
    }

    #[tokio::test]
    async fn test_short_output_retried_then_accepted() {
        let provider = ScriptedSummarizer {
            outputs: vec![
                "too short".to_string(),
                "After two attempts the model produced a proper summary covering the \
                 user's schedule and their standing preferences."
                    .to_string(),
            ],
            calls: AtomicU32::new(0),
        };

        let summary = summarize_conversation(
            &provider,
            &turns("Talk about scheduling and preferences at considerable length today."),
        )
        .await;

        assert!(summary.is_some());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistently_invalid_output_returns_none() {
        let provider = ScriptedSummarizer {
            outputs: vec!["nope".to_string()],
            calls: AtomicU32::new(0),
        };

        let summary = summarize_conversation(
            &provider,
            &turns("A conversation long enough to attempt summarizing without question."),
        )
        .await;

        assert!(summary.is_none());
        // 1 initial try + 2 retries
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_or_tiny_input_skipped() {
        let provider = ScriptedSummarizer {
            outputs: vec!["irrelevant".to_string()],
            calls: AtomicU32::new(0),
        };

        assert!(summarize_conversation(&provider, &[]).await.is_none());

        let tiny = vec![StoredTurn {
            role: "user".to_string(),
            content: "hi".to_string(),
        }];
        assert!(summarize_conversation(&provider, &tiny).await.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
