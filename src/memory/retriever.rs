// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Semantic retrieval over the vector index.
//!
//! Turn content is chunked, indexed best-effort, and searched with cosine
//! similarity. The index is a derived cache: if it is unavailable at any
//! call site the retriever returns empty results and the caller proceeds.

use std::sync::Arc;

use tracing::{info, warn};

use crate::memory::index::{IndexMetadata, VectorIndex};
use crate::memory::store::StoredTurn;

const MIN_CHUNK_CHARS: usize = 50;
const CHUNK_SIZE: usize = 1_200;
const CHUNK_OVERLAP: usize = 200;
const MAX_RESULTS: usize = 5;
const MIN_TEXT_SCORE: f32 = 0.3;

/// Split text into overlapping chunks.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }
    chunks
}

/// A scored memory returned from semantic search.
#[derive(Debug, Clone)]
pub struct MemoryHit {
    pub content: String,
    /// Similarity score: 1 − cosine distance (1 = identical).
    pub relevance_score: f32,
    pub session_id: String,
    pub timestamp: f64,
}

/// Semantic memory retrieval over a vector index.
pub struct SemanticRetriever {
    index: Arc<dyn VectorIndex>,
}

impl SemanticRetriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Index a session's conversation turns. Best-effort: individual
    /// failures are logged and swallowed. Returns the number of chunks
    /// actually indexed.
    pub async fn upsert_session(
        &self,
        session_id: &str,
        turns: &[StoredTurn],
        timestamp: f64,
    ) -> usize {
        let mut docs_added = 0;

        for (i, turn) in turns.iter().enumerate() {
            if turn.content.chars().count() < MIN_CHUNK_CHARS {
                continue;
            }

            for (j, chunk) in chunk_text(&turn.content, CHUNK_SIZE, CHUNK_OVERLAP)
                .into_iter()
                .enumerate()
            {
                let doc_id = format!("{session_id}_{i}_{j}");
                let metadata = IndexMetadata {
                    session_id: session_id.to_string(),
                    role: turn.role.clone(),
                    turn_index: i,
                    timestamp,
                };
                match self.index.upsert(&doc_id, &chunk, &metadata).await {
                    Ok(()) => docs_added += 1,
                    Err(e) => {
                        warn!(doc_id, error = %e, "index upsert failed");
                    }
                }
            }
        }

        info!(session_id, docs = docs_added, "session indexed");
        docs_added
    }

    /// Search for semantically similar memories.
    ///
    /// Returns at most 5 results; never fails - an unavailable index
    /// yields an empty list.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<MemoryHit> {
        let n_results = top_k.min(MAX_RESULTS);

        let hits = match self.index.query(query, n_results).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "semantic search failed, returning empty");
                return Vec::new();
            }
        };

        let output: Vec<MemoryHit> = hits
            .into_iter()
            .map(|hit| MemoryHit {
                content: hit.document,
                // Cosine distance -> similarity, deliberately unclamped
                relevance_score: 1.0 - hit.distance,
                session_id: hit.metadata.session_id,
                timestamp: hit.metadata.timestamp,
            })
            .collect();

        info!(query_len = query.len(), results = output.len(), "semantic search done");
        output
    }

    /// Return memory snippets as plain text for context injection,
    /// filtering out weak matches.
    pub async fn relevant_memories_as_text(&self, query: &str, top_k: usize) -> Vec<String> {
        self.search(query, top_k)
            .await
            .into_iter()
            .filter(|hit| hit.relevance_score >= MIN_TEXT_SCORE)
            .map(|hit| hit.content)
            .collect()
    }
}
