// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Context window management - assembles the prompt components for each
//! turn under a fixed token budget.
//!
//! Tokens are estimated at ~4 characters per token. The system-prompt
//! floor and response buffer are reserved; the remainder is allocated to
//! history, summary, memories and profile in descending priority, with a
//! fixed truncation cascade when the total overruns.

use std::sync::Arc;

use tracing::{info, warn};

use crate::memory::retriever::SemanticRetriever;
use crate::memory::store::{MemoryStore, StoredTurn};

/// Reserved for the system prompt; never truncated.
const SYSTEM_PROMPT_TOKENS: usize = 800;
/// Reserved for the model's response; never truncated.
const RESPONSE_BUFFER_TOKENS: usize = 4_096;
/// History is never trimmed below this many turns.
const MIN_HISTORY_TURNS: usize = 4;

/// Estimate tokens for a text: ⌈chars/4⌉.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

fn estimate_history_tokens(history: &[StoredTurn]) -> usize {
    history.iter().map(|t| estimate_tokens(&t.content)).sum()
}

/// The assembled context for one turn.
#[derive(Debug, Default)]
pub struct BuiltContext {
    pub profile: Option<String>,
    pub memories: Option<Vec<String>>,
    pub summary: Option<String>,
    pub history: Vec<StoredTurn>,
}

/// Builds the context for each model call with memory injection.
pub struct ContextBuilder {
    store: Arc<MemoryStore>,
    retriever: Arc<SemanticRetriever>,
    context_budget: usize,
    summarize_at_pct: f64,
}

impl ContextBuilder {
    pub fn new(
        store: Arc<MemoryStore>,
        retriever: Arc<SemanticRetriever>,
        context_budget_tokens: usize,
        summarize_at_pct: f64,
    ) -> Self {
        Self {
            store,
            retriever,
            context_budget: context_budget_tokens,
            summarize_at_pct,
        }
    }

    fn available_budget(&self) -> usize {
        self.context_budget
            .saturating_sub(SYSTEM_PROMPT_TOKENS + RESPONSE_BUFFER_TOKENS)
    }

    /// Fetch all context components in parallel and fit them to budget.
    ///
    /// Any individual fetch failure yields the absent component; the build
    /// always proceeds.
    pub async fn build_context(
        &self,
        session_id: &str,
        current_query: &str,
        max_history_turns: usize,
    ) -> BuiltContext {
        let (profile_res, memories_vec, summary_res, history_res) = tokio::join!(
            self.store.get_profile_as_text(0.5),
            self.retriever.relevant_memories_as_text(current_query, 3),
            self.store.get_session_summary(session_id),
            self.store.get_recent_history(session_id, max_history_turns),
        );

        let mut profile = match profile_res {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "profile fetch failed");
                None
            }
        };
        let mut memories = if memories_vec.is_empty() {
            None
        } else {
            Some(memories_vec)
        };
        let mut summary = match summary_res {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "summary fetch failed");
                None
            }
        };
        let mut history = match history_res {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "history fetch failed");
                Vec::new()
            }
        };

        let available = self.available_budget();

        let profile_tokens = profile.as_deref().map(estimate_tokens).unwrap_or(0);
        let memories_tokens: usize = memories
            .as_deref()
            .map(|m| m.iter().map(|s| estimate_tokens(s)).sum())
            .unwrap_or(0);
        let summary_tokens = summary.as_deref().map(estimate_tokens).unwrap_or(0);
        let history_tokens = estimate_history_tokens(&history);

        let mut total_used = profile_tokens + memories_tokens + summary_tokens + history_tokens;

        // Truncation cascade, applied in this exact order until we fit
        if total_used > available {
            // 1. Drop the profile (lowest-priority dynamic component)
            if profile_tokens > 0 && total_used > available {
                warn!(tokens_used = total_used, "context budget: dropping profile");
                profile = None;
                total_used -= profile_tokens;
            }

            // 2. Reduce memories to the single top result
            if let Some(ref mut mems) = memories {
                if mems.len() > 1 && total_used > available {
                    warn!("context budget: reducing memories to top result");
                    mems.truncate(1);
                    total_used = total_used - memories_tokens + estimate_tokens(&mems[0]);
                }
            }

            // 3. Drop the summary only when recent history exists, so we
            //    never lose all long-range context at once
            if summary.is_some() && !history.is_empty() && total_used > available {
                warn!("context budget: dropping summary");
                summary = None;
                total_used -= summary_tokens;
            }

            // 4. Trim history from the oldest end, never below the floor
            while total_used > available && history.len() > MIN_HISTORY_TURNS {
                let removed = history.remove(0);
                total_used -= estimate_tokens(&removed.content);
                warn!(remaining = history.len(), "context budget: truncating history");
            }
        }

        info!(
            session_id,
            has_profile = profile.is_some(),
            memory_count = memories.as_deref().map(<[String]>::len).unwrap_or(0),
            has_summary = summary.is_some(),
            history_turns = history.len(),
            estimated_tokens = total_used,
            "context built"
        );

        BuiltContext {
            profile,
            memories,
            summary,
            history,
        }
    }

    /// True when the history alone is heavy enough that the caller should
    /// summarize before the next turn.
    pub fn should_summarize(&self, history: &[StoredTurn]) -> bool {
        let history_tokens = estimate_history_tokens(history);
        history_tokens as f64 > self.available_budget() as f64 * self.summarize_at_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::index::test_support::StubEmbedder;
    use crate::memory::index::SqliteVectorIndex;

    fn builder_with_budget(budget: usize) -> ContextBuilder {
        let store = Arc::new(MemoryStore::open_in_memory().unwrap());
        let index = Arc::new(SqliteVectorIndex::open_in_memory(Arc::new(StubEmbedder)).unwrap());
        let retriever = Arc::new(SemanticRetriever::new(index));
        ContextBuilder::new(store, retriever, budget, 0.80)
    }

    fn store_of(builder: &ContextBuilder) -> Arc<MemoryStore> {
        builder.store.clone()
    }

    fn turn_of(content: &str) -> StoredTurn {
        StoredTurn {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[tokio::test]
    async fn test_build_context_under_budget_keeps_everything() {
        let builder = builder_with_budget(20_000);
        let store = store_of(&builder);

        store.set_profile_key("editor", "helix", 1.0).await.unwrap();
        store.save_session_summary("s1", "previous summary").await.unwrap();
        for i in 0..6 {
            store
                .save_conversation_turn("s1", "user", &format!("turn {i}"), None, None)
                .await
                .unwrap();
        }

        let ctx = builder.build_context("s1", "query", 20).await;
        assert!(ctx.profile.is_some());
        assert!(ctx.summary.is_some());
        assert_eq!(ctx.history.len(), 6);
    }

    #[tokio::test]
    async fn test_cascade_drops_profile_then_trims_history() {
        // budget 5000 -> available = 5000 - 4896 = 104 tokens
        let builder = builder_with_budget(5_000);
        let store = store_of(&builder);

        store
            .set_profile_key("bio", &"p".repeat(200), 1.0)
            .await
            .unwrap();
        store.save_session_summary("s1", &"s".repeat(100)).await.unwrap();
        // 8 turns x 100 chars = 8 x 25 tokens = 200 tokens of history
        for i in 0..8 {
            store
                .save_conversation_turn("s1", "user", &format!("{i}{}", "h".repeat(99)), None, None)
                .await
                .unwrap();
        }

        let ctx = builder.build_context("s1", "query", 20).await;

        // Profile dropped first; summary dropped because history exists;
        // history trimmed from the oldest end but never below 4 turns
        assert!(ctx.profile.is_none());
        assert!(ctx.summary.is_none());
        assert_eq!(ctx.history.len(), 4);
        assert!(ctx.history[0].content.starts_with('4'));
        assert!(estimate_history_tokens(&ctx.history) <= builder.available_budget());
    }

    #[tokio::test]
    async fn test_cascade_keeps_summary_without_history() {
        let builder = builder_with_budget(5_000);
        let store = store_of(&builder);

        // Oversized profile and summary, no history at all
        store
            .set_profile_key("bio", &"p".repeat(600), 1.0)
            .await
            .unwrap();
        store
            .save_session_summary("s1", &"s".repeat(600))
            .await
            .unwrap();

        let ctx = builder.build_context("s1", "query", 20).await;

        // Profile goes, but the summary survives: dropping it would lose
        // all long-range context when there is no history
        assert!(ctx.profile.is_none());
        assert!(ctx.summary.is_some());
    }

    #[tokio::test]
    async fn test_history_floor_never_violated() {
        // Tiny budget, giant turns: history still keeps its last 4
        let builder = builder_with_budget(5_000);
        let store = store_of(&builder);

        for i in 0..6 {
            store
                .save_conversation_turn("s1", "user", &format!("{i}{}", "x".repeat(999)), None, None)
                .await
                .unwrap();
        }

        let ctx = builder.build_context("s1", "query", 20).await;
        assert_eq!(ctx.history.len(), 4);
    }

    #[tokio::test]
    async fn test_build_context_empty_session() {
        let builder = builder_with_budget(20_000);
        let ctx = builder.build_context("missing", "query", 20).await;

        assert!(ctx.profile.is_none());
        assert!(ctx.memories.is_none());
        assert!(ctx.summary.is_none());
        assert!(ctx.history.is_empty());
    }

    #[test]
    fn test_should_summarize_threshold() {
        let builder = builder_with_budget(5_000);
        // available = 104, threshold = 83.2 tokens

        let light = vec![turn_of(&"a".repeat(100))]; // 25 tokens
        assert!(!builder.should_summarize(&light));

        let heavy = vec![turn_of(&"a".repeat(4_000))]; // far past the threshold
        assert!(builder.should_summarize(&heavy));
    }
}
