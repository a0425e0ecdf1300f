// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Job scheduler for user-defined cron jobs and maintenance passes.
//!
//! Jobs never touch agent state directly: each trigger task pushes a
//! [`JobFire`] onto a channel the runtime owner consumes, which keeps the
//! scheduler free of references back into the runtime. Maintenance (data
//! cleanup, profile decay) runs on its own task against the store.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use cron::Schedule;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tracing::{error, info, warn};

use crate::error::ToolError;
use crate::memory::store::MemoryStore;

/// A scheduled job firing: consumed by the runtime owner, which runs the
/// prompt through the agent with a synthetic headless session.
#[derive(Debug, Clone)]
pub struct JobFire {
    pub job_id: String,
    pub prompt: String,
}

/// Public view of a scheduled job.
#[derive(Debug, Clone)]
pub struct JobInfo {
    pub job_id: String,
    pub cron_expression: String,
    pub prompt: String,
    pub next_run: Option<DateTime<Utc>>,
}

struct JobEntry {
    cron_expression: String,
    prompt: String,
    schedule: Schedule,
    task: JoinHandle<()>,
}

/// Parse a cron expression.
///
/// Accepts standard 5-field crontab syntax (a seconds field of `0` is
/// prepended) as well as explicit 6/7-field expressions.
pub fn parse_cron(expression: &str) -> Result<Schedule, ToolError> {
    let fields = expression.split_whitespace().count();
    let normalized = if fields == 5 {
        format!("0 {expression}")
    } else {
        expression.to_string()
    };
    Schedule::from_str(&normalized)
        .map_err(|e| ToolError::InvalidInput(format!("invalid cron expression '{expression}': {e}")))
}

/// Smallest gap between consecutive upcoming fires, sampled over the next
/// few occurrences.
pub fn min_fire_gap(schedule: &Schedule) -> Option<ChronoDuration> {
    let fires: Vec<DateTime<Utc>> = schedule.upcoming(Utc).take(6).collect();
    fires
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .min()
}

async fn sleep_until(when: DateTime<Utc>) {
    let now = Utc::now();
    if when > now {
        if let Ok(duration) = (when - now).to_std() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// In-process job scheduler.
pub struct Scheduler {
    jobs: Mutex<HashMap<String, JobEntry>>,
    fire_tx: mpsc::Sender<JobFire>,
}

impl Scheduler {
    /// Create a scheduler and the channel its job fires arrive on.
    pub fn new() -> (Arc<Self>, mpsc::Receiver<JobFire>) {
        let (fire_tx, fire_rx) = mpsc::channel(16);
        (
            Arc::new(Self {
                jobs: Mutex::new(HashMap::new()),
                fire_tx,
            }),
            fire_rx,
        )
    }

    /// Add or replace a job. Returns the first upcoming run time.
    pub fn add_job(
        &self,
        job_id: &str,
        cron_expression: &str,
        prompt: &str,
    ) -> Result<Option<DateTime<Utc>>, ToolError> {
        let schedule = parse_cron(cron_expression)?;
        let next_run = schedule.upcoming(Utc).next();

        let task = {
            let schedule = schedule.clone();
            let fire_tx = self.fire_tx.clone();
            let job_id = job_id.to_string();
            let prompt = prompt.to_string();
            tokio::spawn(async move {
                loop {
                    let Some(next) = schedule.upcoming(Utc).next() else {
                        break;
                    };
                    sleep_until(next).await;

                    info!(job_id = %job_id, "cron job firing");
                    if fire_tx
                        .send(JobFire {
                            job_id: job_id.clone(),
                            prompt: prompt.clone(),
                        })
                        .await
                        .is_err()
                    {
                        // Consumer gone: the runtime is shutting down
                        break;
                    }
                }
            })
        };

        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| ToolError::ExecutionFailed("scheduler lock poisoned".to_string()))?;
        if let Some(old) = jobs.insert(
            job_id.to_string(),
            JobEntry {
                cron_expression: cron_expression.to_string(),
                prompt: prompt.to_string(),
                schedule,
                task,
            },
        ) {
            old.task.abort();
        }

        info!(job_id, cron = cron_expression, "cron job created");
        Ok(next_run)
    }

    /// Remove a job. Returns false when no such job exists.
    pub fn remove_job(&self, job_id: &str) -> bool {
        let Ok(mut jobs) = self.jobs.lock() else {
            return false;
        };
        match jobs.remove(job_id) {
            Some(entry) => {
                entry.task.abort();
                info!(job_id, "cron job deleted");
                true
            }
            None => false,
        }
    }

    /// List all jobs with their next run times.
    pub fn list_jobs(&self) -> Vec<JobInfo> {
        let Ok(jobs) = self.jobs.lock() else {
            return Vec::new();
        };
        let mut infos: Vec<JobInfo> = jobs
            .iter()
            .map(|(id, entry)| JobInfo {
                job_id: id.clone(),
                cron_expression: entry.cron_expression.clone(),
                prompt: entry.prompt.clone(),
                next_run: entry.schedule.upcoming(Utc).next(),
            })
            .collect();
        infos.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        infos
    }

    /// Abort all trigger tasks.
    pub fn shutdown(&self) {
        let Ok(mut jobs) = self.jobs.lock() else {
            return;
        };
        for (_, entry) in jobs.drain() {
            entry.task.abort();
        }
    }
}

/// Spawn the maintenance loop: daily data cleanup at 03:00, monthly
/// profile decay on day 1 at 04:00.
pub fn spawn_maintenance(store: Arc<MemoryStore>) -> JoinHandle<()> {
    let cleanup_schedule =
        Schedule::from_str("0 0 3 * * *").expect("static cleanup schedule");
    let decay_schedule =
        Schedule::from_str("0 0 4 1 * *").expect("static decay schedule");

    tokio::spawn(async move {
        loop {
            let next_cleanup = cleanup_schedule.upcoming(Utc).next();
            let next_decay = decay_schedule.upcoming(Utc).next();

            let (when, is_cleanup) = match (next_cleanup, next_decay) {
                (Some(c), Some(d)) if d < c => (d, false),
                (Some(c), _) => (c, true),
                (None, Some(d)) => (d, false),
                (None, None) => break,
            };

            sleep_until(when).await;

            if is_cleanup {
                if let Err(e) = store.cleanup_old_data(90, 30).await {
                    error!(error = %e, "maintenance cleanup failed");
                }
            } else if let Err(e) = store.decay_profile_confidence().await {
                error!(error = %e, "profile decay failed");
            }
        }
        warn!("maintenance loop exited");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_cron_five_field() {
        let schedule = parse_cron("*/15 * * * *").unwrap();
        assert!(schedule.upcoming(Utc).next().is_some());
    }

    #[test]
    fn test_parse_cron_invalid() {
        assert!(parse_cron("not a cron").is_err());
        assert!(parse_cron("99 * * * *").is_err());
    }

    #[test]
    fn test_min_fire_gap() {
        let every_15 = parse_cron("*/15 * * * *").unwrap();
        let gap = min_fire_gap(&every_15).unwrap();
        assert_eq!(gap, ChronoDuration::minutes(15));

        let every_minute = parse_cron("* * * * *").unwrap();
        let gap = min_fire_gap(&every_minute).unwrap();
        assert_eq!(gap, ChronoDuration::minutes(1));
    }

    #[tokio::test]
    async fn test_add_list_remove() {
        let (scheduler, _rx) = Scheduler::new();

        let next = scheduler.add_job("job-1", "*/10 * * * *", "check disk space").unwrap();
        assert!(next.is_some());

        let jobs = scheduler.list_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_id, "job-1");
        assert_eq!(jobs[0].prompt, "check disk space");
        assert!(jobs[0].next_run.is_some());

        assert!(scheduler.remove_job("job-1"));
        assert!(!scheduler.remove_job("job-1"));
        assert!(scheduler.list_jobs().is_empty());

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_add_job_replaces_existing_id() {
        let (scheduler, _rx) = Scheduler::new();

        scheduler.add_job("dup", "*/10 * * * *", "first").unwrap();
        scheduler.add_job("dup", "*/20 * * * *", "second").unwrap();

        let jobs = scheduler.list_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].prompt, "second");
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_job_fire_routed_through_channel() {
        let (scheduler, mut rx) = Scheduler::new();

        // Six-field expression firing every second
        scheduler.add_job("fast", "* * * * * *", "say hello").unwrap();

        let fire = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("job should fire within 3s")
            .expect("channel open");

        assert_eq!(fire.job_id, "fast");
        assert_eq!(fire.prompt, "say hello");
        scheduler.shutdown();
    }
}
