// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Interactive terminal chat channel.
//!
//! Runs the full per-turn pipeline: build context, trigger summarization
//! when history grows heavy, run the agent with an interactive
//! confirmation prompt, persist both turns and the trace before rendering,
//! and hand the fresh turns to the background indexer.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use uuid::Uuid;

use tracing::{error, info};

use crate::agent::{AgentRuntime, ConfirmCallback, ContextBuilder, RunRequest, SharedConfirmCallback};
use crate::error::Result;
use crate::memory::indexer::IndexWriter;
use crate::memory::store::{MemoryStore, StoredTurn};
use crate::memory::summarizer::summarize_conversation;
use crate::types::{Message, SharedProvider};

const CHAT_ID: &str = "terminal";
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "q"];
const MAX_HISTORY_TURNS: usize = 20;
const KEEP_AFTER_SUMMARY: usize = 5;

/// Interactive y/N prompt on stdin. The runtime bounds the whole exchange
/// with the 60 s confirmation guard.
struct TerminalConfirm;

#[async_trait]
impl ConfirmCallback for TerminalConfirm {
    async fn confirm(&self, tool_name: &str, preview: &str) -> bool {
        println!("\n  ! Confirmation required");
        println!("  Tool:    {tool_name}");
        println!("  Command: {preview}");
        print!("  Allow? [y/N] > ");
        let _ = std::io::stdout().flush();

        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}

/// Interactive terminal chat - drives the same pipeline a remote gateway
/// would.
pub struct TerminalChannel {
    runtime: Arc<AgentRuntime>,
    store: Arc<MemoryStore>,
    context_builder: Arc<ContextBuilder>,
    summarizer_provider: SharedProvider,
    index_writer: IndexWriter,
}

impl TerminalChannel {
    pub fn new(
        runtime: Arc<AgentRuntime>,
        store: Arc<MemoryStore>,
        context_builder: Arc<ContextBuilder>,
        summarizer_provider: SharedProvider,
        index_writer: IndexWriter,
    ) -> Self {
        Self {
            runtime,
            store,
            context_builder,
            summarizer_provider,
            index_writer,
        }
    }

    /// Resolve (or create) the durable session bound to this terminal.
    async fn resolve_session(&self) -> Result<String> {
        if let Some(session_id) = self.store.get_session_id(CHAT_ID).await? {
            return Ok(session_id);
        }
        let session_id = Uuid::new_v4().to_string();
        self.store.save_session_mapping(CHAT_ID, &session_id).await?;
        Ok(session_id)
    }

    /// Main input loop - blocks until exit/quit/Ctrl+C/EOF.
    pub async fn start(&self) -> Result<()> {
        let session_id = self.resolve_session().await?;
        info!(session_id = %session_id, "terminal channel ready");
        println!("Terminal chat ready. Type exit or Ctrl+C to quit.\n");

        let mut editor = DefaultEditor::new()?;

        loop {
            let (returned_editor, readline) = tokio::task::spawn_blocking(move || {
                let mut editor = editor;
                let line = editor.readline("you > ");
                (editor, line)
            })
            .await?;
            editor = returned_editor;

            let user_text = match readline {
                Ok(line) => line.trim().to_string(),
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    error!(error = %e, "readline failed");
                    break;
                }
            };

            if user_text.is_empty() {
                continue;
            }
            if EXIT_COMMANDS.contains(&user_text.to_lowercase().as_str()) {
                break;
            }

            let _ = editor.add_history_entry(&user_text);
            self.process_message(&session_id, &user_text).await;
        }

        Ok(())
    }

    async fn process_message(&self, session_id: &str, user_text: &str) {
        info!(session_id, message_len = user_text.len(), "terminal message received");

        // Build context from memory
        let mut ctx = self
            .context_builder
            .build_context(session_id, user_text, MAX_HISTORY_TURNS)
            .await;

        // Auto-summarization when history is heavy
        if self.context_builder.should_summarize(&ctx.history) {
            if let Some(new_summary) =
                summarize_conversation(self.summarizer_provider.as_ref(), &ctx.history).await
            {
                match self.store.save_session_summary(session_id, &new_summary).await {
                    Ok(()) => {
                        info!(summary_len = new_summary.len(), "auto-summarization done");
                        ctx.summary = Some(new_summary);
                        let keep_from = ctx.history.len().saturating_sub(KEEP_AFTER_SUMMARY);
                        ctx.history.drain(..keep_from);
                    }
                    Err(e) => error!(error = %e, "summary not persisted"),
                }
            }
        }

        println!("  thinking...");

        let history: Vec<Message> = ctx
            .history
            .iter()
            .map(|turn| match turn.role.as_str() {
                "assistant" => Message::assistant(&turn.content),
                _ => Message::user(&turn.content),
            })
            .collect();

        let request = RunRequest {
            user_message: user_text.to_string(),
            session_id: session_id.to_string(),
            history,
            user_profile: ctx.profile,
            semantic_memories: ctx.memories,
            session_summary: ctx.summary,
        };

        let start = Instant::now();
        let confirm: SharedConfirmCallback = Arc::new(TerminalConfirm);
        let (response_text, trace) = self.runtime.run_with_confirm(request, Some(confirm)).await;

        // Persist both turns and the trace before the response is shown
        if let Err(e) = self
            .store
            .save_conversation_turn(session_id, "user", user_text, None, None)
            .await
        {
            error!(error = %e, "user turn not persisted");
        }
        if let Err(e) = self
            .store
            .save_conversation_turn(session_id, "assistant", &response_text, None, None)
            .await
        {
            error!(error = %e, "assistant turn not persisted");
        }
        if let Err(e) = self.store.save_trace(&trace).await {
            error!(error = %e, "trace not persisted");
        }

        // Background index upsert; its failure never reaches the user
        self.index_writer.enqueue(
            session_id,
            vec![
                StoredTurn {
                    role: "user".to_string(),
                    content: user_text.to_string(),
                },
                StoredTurn {
                    role: "assistant".to_string(),
                    content: response_text.clone(),
                },
            ],
        );

        println!("\n{response_text}");
        println!(
            "  ({:.1}s · {} tokens)\n",
            start.elapsed().as_secs_f64(),
            trace.total_tokens()
        );
    }
}
