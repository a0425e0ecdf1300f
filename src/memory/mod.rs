// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Durable memory: relational store, semantic index, background indexing
//! and conversation summarization.
//!
//! The SQLite store is the source of truth; the vector index is a derived
//! cache that can be rebuilt from it.

pub mod index;
pub mod indexer;
pub mod retriever;
pub mod store;
pub mod summarizer;

pub use index::{EmbeddingProvider, IndexMetadata, OllamaEmbedder, SqliteVectorIndex, VectorIndex};
pub use indexer::IndexWriter;
pub use retriever::{MemoryHit, SemanticRetriever};
pub use store::{MemoryStore, StoredTurn, ToolExecutionRecord};
pub use summarizer::summarize_conversation;
