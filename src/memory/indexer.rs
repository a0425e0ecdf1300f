// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Background index writer.
//!
//! Turn indexing happens off the foreground path through a bounded work
//! queue drained by a single worker, so the process can shut down cleanly
//! without dropping accepted writes. A full queue drops the job with a
//! warning rather than blocking the response.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tracing::{debug, warn};

use crate::memory::retriever::SemanticRetriever;
use crate::memory::store::StoredTurn;

const QUEUE_CAPACITY: usize = 64;

/// One indexing unit: a session's fresh turns.
#[derive(Debug)]
pub struct IndexJob {
    pub session_id: String,
    pub turns: Vec<StoredTurn>,
    pub timestamp: f64,
}

/// Handle for enqueueing background index writes.
#[derive(Clone)]
pub struct IndexWriter {
    tx: mpsc::Sender<IndexJob>,
}

impl IndexWriter {
    /// Spawn the worker and return the handle plus its join handle.
    pub fn spawn(retriever: Arc<SemanticRetriever>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<IndexJob>(QUEUE_CAPACITY);

        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let added = retriever
                    .upsert_session(&job.session_id, &job.turns, job.timestamp)
                    .await;
                debug!(session_id = %job.session_id, added, "background index job done");
            }
        });

        (Self { tx }, worker)
    }

    /// Enqueue turns for indexing. Never blocks the caller.
    pub fn enqueue(&self, session_id: &str, turns: Vec<StoredTurn>) {
        let job = IndexJob {
            session_id: session_id.to_string(),
            turns,
            timestamp: Utc::now().timestamp() as f64,
        };
        if let Err(e) = self.tx.try_send(job) {
            warn!(session_id, error = %e, "index queue full or closed, dropping job");
        }
    }

    /// Close the queue. The worker exits once the backlog is drained.
    pub fn close(self) {
        drop(self.tx);
    }
}
