// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Valet main entry point - wiring and the terminal REPL.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use valet::agent::{AgentRuntime, ContextBuilder, RunRequest};
use valet::channels::TerminalChannel;
use valet::config::{verify_guards_integrity, Settings};
use valet::memory::indexer::IndexWriter;
use valet::memory::{MemoryStore, OllamaEmbedder, SemanticRetriever, SqliteVectorIndex};
use valet::providers;
use valet::scheduler::{spawn_maintenance, JobFire, Scheduler};
use valet::telemetry::{init_telemetry, TelemetryConfig};
use valet::tools::{create_registry, ExecutionContext};

/// Synthetic session for cron-driven runs.
const HEADLESS_SESSION_ID: &str = "cron_headless";

/// Valet - an autonomous personal agent for your local machine.
#[derive(Parser)]
#[command(name = "valet")]
#[command(author, version, about = "An autonomous personal agent runtime", long_about = None)]
struct Cli {
    /// Path to config.yaml
    #[arg(short, long, env = "VALET_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Run a single prompt headlessly and exit
    #[arg(long)]
    prompt: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Guard integrity is checked before anything else runs; a mismatch
    // aborts with a nonzero exit code.
    if let Err(e) = verify_guards_integrity() {
        eprintln!("fatal: {e}");
        return ExitCode::from(2);
    }

    let settings = match Settings::load(Some(&cli.config)) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("fatal: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("fatal: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(settings, cli.prompt)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings, one_shot_prompt: Option<String>) -> valet::Result<()> {
    std::fs::create_dir_all(&settings.agent.data_dir)?;

    init_telemetry(
        &TelemetryConfig::from_level_str(&settings.observability.log_level),
        &settings.log_file(),
    )?;

    info!(version = valet::VERSION, model = %settings.agent.model, "valet starting");

    // Persistence: relational store plus the derived vector index
    let store = Arc::new(MemoryStore::open(&settings.db_path())?);
    let index = Arc::new(SqliteVectorIndex::open(
        &settings.index_dir(),
        Arc::new(OllamaEmbedder::local()),
    )?);
    let retriever = Arc::new(SemanticRetriever::new(index));

    let context_builder = Arc::new(ContextBuilder::new(
        store.clone(),
        retriever.clone(),
        settings.memory.context_budget_tokens,
        settings.memory.summarize_at_pct,
    ));

    let (scheduler, mut fire_rx) = Scheduler::new();
    let maintenance = spawn_maintenance(store.clone());

    let sandbox_root = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

    // Providers: primary for the loop, cheap model for summarization
    let provider = providers::anthropic(
        settings.anthropic_api_key.as_str(),
        settings.agent.model.as_str(),
        settings.agent.max_tokens,
    );
    let haiku_provider = providers::anthropic(
        settings.anthropic_api_key.as_str(),
        settings.agent.haiku_model.as_str(),
        512,
    );

    // Interactive runtime
    let registry = Arc::new(create_registry(
        ExecutionContext::UserSession,
        sandbox_root.clone(),
        store.clone(),
        retriever.clone(),
        scheduler.clone(),
    ));
    let mut agent = AgentRuntime::new(provider.clone())
        .with_registry(registry)
        .with_store(store.clone());
    if let Some(ref prompt) = settings.system_prompt {
        agent = agent.with_system_prompt(prompt.clone());
    }
    let agent = Arc::new(agent);

    // Headless runtime for cron fires: no confirmations available, so the
    // registry promotes confirm-tier calls to blocked
    let headless_registry = Arc::new(create_registry(
        ExecutionContext::Headless,
        sandbox_root,
        store.clone(),
        retriever.clone(),
        scheduler.clone(),
    ));
    let headless_agent = Arc::new(
        AgentRuntime::new(provider.clone())
            .with_registry(headless_registry)
            .with_store(store.clone()),
    );

    // Cron fires route through the channel into the agent entrypoint
    let cron_store = store.clone();
    let cron_task = tokio::spawn(async move {
        while let Some(JobFire { job_id, prompt }) = fire_rx.recv().await {
            let preview: String = prompt.chars().take(50).collect();
            info!(job_id = %job_id, prompt_preview = %preview, "cron fire");
            let (response, trace) = headless_agent
                .run(RunRequest::new(prompt, HEADLESS_SESSION_ID))
                .await;
            if let Err(e) = cron_store.save_trace(&trace).await {
                error!(error = %e, "cron trace not persisted");
            }
            info!(job_id = %job_id, response_len = response.len(), "cron run done");
        }
    });

    let (index_writer, index_worker) = IndexWriter::spawn(retriever.clone());

    let result = match one_shot_prompt {
        Some(prompt) => {
            let (response, trace) = agent.run(RunRequest::new(prompt, HEADLESS_SESSION_ID)).await;
            store.save_trace(&trace).await?;
            println!("{response}");
            Ok(())
        }
        None => {
            let channel = TerminalChannel::new(
                agent,
                store.clone(),
                context_builder,
                haiku_provider,
                index_writer.clone(),
            );
            channel.start().await
        }
    };

    // Orderly shutdown: stop triggers, drain the index queue
    scheduler.shutdown();
    cron_task.abort();
    maintenance.abort();
    index_writer.close();
    let _ = index_worker.await;

    info!("valet stopped");
    result
}
