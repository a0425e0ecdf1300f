// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Vector index backing the semantic retriever.
//!
//! The index is a persistent key-document store supporting k-NN queries in
//! cosine space. Documents are embedded through an [`EmbeddingProvider`];
//! the embedding model itself is an external service. The relational store
//! remains the source of truth - this index is a derived cache that can be
//! rebuilt from it at any time.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::ToolError;

/// Metadata stored alongside each indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub session_id: String,
    pub role: String,
    pub turn_index: usize,
    pub timestamp: f64,
}

/// One k-NN query hit.
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub document: String,
    pub metadata: IndexMetadata,
    /// Cosine distance (0 = identical).
    pub distance: f32,
}

/// Persistent key-document store with k-NN queries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or update a document by id.
    async fn upsert(&self, id: &str, document: &str, metadata: &IndexMetadata) -> Result<(), ToolError>;

    /// Query the `n_results` nearest documents by cosine distance.
    async fn query(&self, text: &str, n_results: usize) -> Result<Vec<IndexHit>, ToolError>;
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Generate embeddings for multiple texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ToolError>;

    /// Generate embedding for a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ToolError> {
        let results = self.embed(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| ToolError::ExecutionFailed("No embedding returned".to_string()))
    }
}

// ============================================================================
// SQLite-backed index
// ============================================================================

/// SQLite-backed cosine-space vector index.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteVectorIndex {
    /// Open or create the index under the given directory.
    pub fn open(index_dir: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, ToolError> {
        std::fs::create_dir_all(index_dir)
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to create index dir: {e}")))?;
        let db_path = index_dir.join("vectors.db");

        let conn = Connection::open(&db_path)
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to open index: {e}")))?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;

             CREATE TABLE IF NOT EXISTS documents (
                 id TEXT PRIMARY KEY,
                 document TEXT NOT NULL,
                 metadata_json TEXT NOT NULL,
                 embedding BLOB NOT NULL,
                 created_at TEXT NOT NULL DEFAULT (datetime('now'))
             );",
        )
        .map_err(|e| ToolError::ExecutionFailed(format!("Failed to create index schema: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    /// In-memory index (tests).
    pub fn open_in_memory(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, ToolError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to open index: {e}")))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                 id TEXT PRIMARY KEY,
                 document TEXT NOT NULL,
                 metadata_json TEXT NOT NULL,
                 embedding BLOB NOT NULL,
                 created_at TEXT NOT NULL DEFAULT (datetime('now'))
             );",
        )
        .map_err(|e| ToolError::ExecutionFailed(format!("Failed to create index schema: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    /// Cosine distance between two vectors (1 − cosine similarity).
    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 1.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 1.0;
        }
        1.0 - dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(&self, id: &str, document: &str, metadata: &IndexMetadata) -> Result<(), ToolError> {
        let embedding = self.embedder.embed_one(document).await?;
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| ToolError::ExecutionFailed(format!("metadata serialization: {e}")))?;

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO documents (id, document, metadata_json, embedding) \
             VALUES (?, ?, ?, ?)",
            params![id, document, metadata_json, Self::serialize_embedding(&embedding)],
        )
        .map_err(|e| ToolError::ExecutionFailed(format!("index upsert: {e}")))?;
        Ok(())
    }

    async fn query(&self, text: &str, n_results: usize) -> Result<Vec<IndexHit>, ToolError> {
        let query_embedding = self.embedder.embed_one(text).await?;

        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT document, metadata_json, embedding FROM documents")
            .map_err(|e| ToolError::ExecutionFailed(format!("index query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                let document: String = row.get(0)?;
                let metadata_json: String = row.get(1)?;
                let embedding_bytes: Vec<u8> = row.get(2)?;
                Ok((document, metadata_json, embedding_bytes))
            })
            .map_err(|e| ToolError::ExecutionFailed(format!("index query: {e}")))?;

        let mut hits: Vec<IndexHit> = Vec::new();
        for row in rows.flatten() {
            let (document, metadata_json, embedding_bytes) = row;
            let Ok(metadata) = serde_json::from_str::<IndexMetadata>(&metadata_json) else {
                continue;
            };
            let embedding = Self::deserialize_embedding(&embedding_bytes);
            let distance = Self::cosine_distance(&query_embedding, &embedding);
            hits.push(IndexHit {
                document,
                metadata,
                distance,
            });
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(n_results);
        Ok(hits)
    }
}

// ============================================================================
// Ollama embedder
// ============================================================================

/// Embedding provider backed by a local Ollama server.
///
/// When the server is unreachable, embed calls fail and the retriever
/// degrades to empty results.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Default local instance with the standard embedding model.
    pub fn local() -> Self {
        Self::new("http://localhost:11434", "nomic-embed-text")
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ToolError> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            let response = self
                .client
                .post(format!("{}/api/embeddings", self.base_url))
                .json(&OllamaEmbedRequest {
                    model: &self.model,
                    prompt: text,
                })
                .send()
                .await
                .map_err(|e| ToolError::ExecutionFailed(format!("embedding request: {e}")))?;

            if !response.status().is_success() {
                return Err(ToolError::ExecutionFailed(format!(
                    "embedding request failed with HTTP {}",
                    response.status().as_u16()
                )));
            }

            let body: OllamaEmbedResponse = response
                .json()
                .await
                .map_err(|e| ToolError::ExecutionFailed(format!("embedding response: {e}")))?;
            results.push(body.embedding);
        }
        Ok(results)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Deterministic embedder for tests: maps text onto a tiny vocabulary
    /// axis so related texts land close together in cosine space.
    pub struct StubEmbedder;

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        fn name(&self) -> &str {
            "stub"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ToolError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    let axes = ["coffee", "rust", "weather", "music"];
                    let mut v: Vec<f32> = axes
                        .iter()
                        .map(|w| lower.matches(w).count() as f32)
                        .collect();
                    // Bias axis keeps unrelated texts from being orthogonal-zero
                    v.push(1.0);
                    v
                })
                .collect())
        }
    }

    /// Embedder that always fails, for degradation tests.
    pub struct BrokenEmbedder;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        fn name(&self) -> &str {
            "broken"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ToolError> {
            Err(ToolError::ExecutionFailed("embedder offline".to_string()))
        }
    }
}
