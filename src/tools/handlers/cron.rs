// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Cron scheduling tool.
//!
//! Creates, lists and deletes scheduled jobs on the shared [`Scheduler`].
//! Job prompts are screened for destructive intent at creation time and
//! fire intervals are floored at 5 minutes.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use tracing::info;

use crate::error::ToolError;
use crate::scheduler::{min_fire_gap, parse_cron, Scheduler};
use crate::tools::parse_arguments;
use crate::tools::registry::{SafetyTier, ToolHandler};
use crate::types::{InputSchema, ToolDefinition};

const MAX_PROMPT_CHARS: usize = 500;
const MIN_INTERVAL_MINUTES: i64 = 5;

/// Lowercase substrings that mark a prompt as destructive in intent.
/// Deliberately conservative: prose like "remove " is rejected too.
const BLOCKED_INTENT: &[&str] = &[
    "rm ", "kill ", "sudo ", "delete ", "remove ", "format ", "drop ",
];

/// Handler for the `cron_schedule` tool.
pub struct CronScheduleHandler {
    scheduler: Arc<Scheduler>,
}

impl CronScheduleHandler {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }

    fn list_jobs(&self) -> String {
        let jobs = self.scheduler.list_jobs();
        if jobs.is_empty() {
            return "No scheduled jobs.".to_string();
        }

        let mut lines = vec!["Scheduled jobs:".to_string()];
        for job in jobs {
            let next = job
                .next_run
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string());
            lines.push(format!(
                "  - {}: {} | next: {next}",
                job.job_id, job.prompt
            ));
        }
        lines.join("\n")
    }

    fn create_job(&self, args: &CronScheduleArgs) -> Result<String, ToolError> {
        let Some(cron_expression) = args.cron_expression.as_deref().filter(|c| !c.is_empty())
        else {
            return Ok("Error: cron_expression is required".to_string());
        };
        let prompt = args.prompt.as_deref().unwrap_or("").trim();
        if prompt.is_empty() {
            return Ok("Error: prompt is required".to_string());
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Ok(format!("Error: prompt exceeds {MAX_PROMPT_CHARS} characters"));
        }

        let prompt_lower = prompt.to_lowercase();
        for blocked in BLOCKED_INTENT {
            if prompt_lower.contains(blocked) {
                return Err(ToolError::SafetyViolation(
                    "CRON_PROMPT_BLOCKED: cron prompts cannot contain write/destructive intent"
                        .to_string(),
                ));
            }
        }

        let schedule = match parse_cron(cron_expression) {
            Ok(schedule) => schedule,
            Err(e) => return Ok(format!("Error: {e}")),
        };

        if let Some(gap) = min_fire_gap(&schedule) {
            if gap < chrono::Duration::minutes(MIN_INTERVAL_MINUTES) {
                return Ok(format!(
                    "Error: minimum fire interval is {MIN_INTERVAL_MINUTES} minutes"
                ));
            }
        }

        let job_id = args
            .job_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()[..8].to_string());

        self.scheduler.add_job(&job_id, cron_expression, prompt)?;

        let prompt_preview: String = prompt.chars().take(50).collect();
        info!(
            job_id = %job_id,
            cron = cron_expression,
            prompt_preview = %prompt_preview,
            "cron job created"
        );
        Ok(format!("Job '{job_id}' created with cron '{cron_expression}'."))
    }

    fn delete_job(&self, args: &CronScheduleArgs) -> String {
        let Some(job_id) = args.job_id.as_deref().filter(|id| !id.is_empty()) else {
            return "Error: job_id is required".to_string();
        };
        if self.scheduler.remove_job(job_id) {
            format!("Job '{job_id}' deleted.")
        } else {
            format!("Error: job '{job_id}' not found")
        }
    }
}

#[derive(Debug, Deserialize)]
struct CronScheduleArgs {
    #[serde(default = "default_action")]
    action: String,

    #[serde(default)]
    job_id: Option<String>,

    #[serde(default)]
    cron_expression: Option<String>,

    #[serde(default)]
    prompt: Option<String>,
}

fn default_action() -> String {
    "list".to_string()
}

#[async_trait]
impl ToolHandler for CronScheduleHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "cron_schedule",
            "Create, list, or delete scheduled cron jobs. \
             Jobs run the agent with a predefined prompt at the scheduled time. \
             Cron prompts must be read-only in intent (no destructive actions). \
             Minimum interval: every 5 minutes. \
             Actions: 'create' (needs confirmation), 'list' (automatic), 'delete' (needs confirmation).",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "action",
                    serde_json::json!({
                        "type": "string",
                        "enum": ["create", "list", "delete"],
                        "description": "Action to perform"
                    }),
                )
                .with_property(
                    "job_id",
                    serde_json::json!({
                        "type": "string",
                        "description": "Job identifier (for create/delete). Auto-generated if not provided."
                    }),
                )
                .with_property(
                    "cron_expression",
                    serde_json::json!({
                        "type": "string",
                        "description": "Standard cron expression (e.g., '*/15 * * * *' for every 15min)"
                    }),
                )
                .with_property(
                    "prompt",
                    serde_json::json!({
                        "type": "string",
                        "description": "The read-only prompt to run at schedule time. Max 500 chars.",
                        "maxLength": 500
                    }),
                )
                .with_required(vec!["action".to_string()]),
        )
    }

    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Confirm
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let args: CronScheduleArgs = parse_arguments(&input)?;

        match args.action.as_str() {
            "list" => Ok(self.list_jobs()),
            "create" => self.create_job(&args),
            "delete" => Ok(self.delete_job(&args)),
            other => Ok(format!(
                "Error: unknown action '{other}'. Use 'create', 'list', or 'delete'."
            )),
        }
    }
}
