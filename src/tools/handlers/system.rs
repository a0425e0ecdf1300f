// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! System information tool - CPU, RAM, disk, uptime, top processes.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use sysinfo::{Disks, System};

use tracing::{debug, info};

use crate::error::ToolError;
use crate::tools::registry::{SafetyTier, ToolHandler};
use crate::types::{InputSchema, ToolDefinition};

const CACHE_TTL: Duration = Duration::from_secs(30);

/// Handler for the `system_info` tool.
///
/// Snapshots are cached for 30 seconds so repeated calls within a turn
/// don't re-sample the host.
pub struct SystemInfoHandler {
    cache: Mutex<Option<(Instant, String)>>,
}

impl SystemInfoHandler {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(None),
        }
    }
}

impl Default for SystemInfoHandler {
    fn default() -> Self {
        Self::new()
    }
}

async fn collect_snapshot() -> String {
    let mut sys = System::new_all();
    // CPU usage needs two samples separated by a short interval
    sys.refresh_all();
    tokio::time::sleep(Duration::from_millis(200)).await;
    sys.refresh_all();

    let cpu_percent = sys.global_cpu_usage();
    let ram_used = sys.used_memory() as f64 / 1e9;
    let ram_total = sys.total_memory() as f64 / 1e9;
    let ram_pct = if sys.total_memory() > 0 {
        sys.used_memory() as f64 / sys.total_memory() as f64 * 100.0
    } else {
        0.0
    };

    let disks = Disks::new_with_refreshed_list();
    let (disk_used, disk_total) = disks
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"))
        .or_else(|| disks.iter().next())
        .map(|d| {
            let total = d.total_space() as f64 / 1e9;
            let used = (d.total_space() - d.available_space()) as f64 / 1e9;
            (used, total)
        })
        .unwrap_or((0.0, 0.0));
    let disk_pct = if disk_total > 0.0 {
        disk_used / disk_total * 100.0
    } else {
        0.0
    };

    let uptime_hours = System::uptime() as f64 / 3600.0;

    // Top 5 processes by CPU
    let mut processes: Vec<_> = sys.processes().values().collect();
    processes.sort_by(|a, b| {
        b.cpu_usage()
            .partial_cmp(&a.cpu_usage())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut lines = vec![
        format!("CPU: {cpu_percent:.1}%"),
        format!("RAM: {ram_used:.1}GB / {ram_total:.1}GB ({ram_pct:.1}%)"),
        format!("Disk (/): {disk_used:.1}GB / {disk_total:.1}GB ({disk_pct:.1}%)"),
        format!("Uptime: {uptime_hours:.1}h"),
        String::new(),
        "Top processes (by CPU):".to_string(),
    ];

    for proc in processes.iter().take(5) {
        let name = proc.name().to_string_lossy();
        let name: String = name.chars().take(20).collect();
        let mem_pct = if sys.total_memory() > 0 {
            proc.memory() as f64 / sys.total_memory() as f64 * 100.0
        } else {
            0.0
        };
        lines.push(format!(
            "  PID {:>6} | {:<20} | CPU {:>5.1}% | MEM {:>5.1}%",
            proc.pid(),
            name,
            proc.cpu_usage(),
            mem_pct
        ));
    }

    info!(cpu_percent, ram_pct, "system info fetched");
    lines.join("\n")
}

#[async_trait]
impl ToolHandler for SystemInfoHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "system_info",
            "Get a snapshot of system metrics: CPU usage, RAM, disk space, uptime, \
             and top processes by CPU. No arguments required. Results cached for 30s.",
        )
        .with_schema(InputSchema::new())
    }

    fn default_tier(&self) -> SafetyTier {
        SafetyTier::Auto
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<String, ToolError> {
        {
            let cache = self
                .cache
                .lock()
                .map_err(|_| ToolError::ExecutionFailed("cache lock poisoned".to_string()))?;
            if let Some((ts, snapshot)) = cache.as_ref() {
                if ts.elapsed() < CACHE_TTL {
                    debug!("system info cache hit");
                    return Ok(snapshot.clone());
                }
            }
        }

        let snapshot = collect_snapshot().await;

        let mut cache = self
            .cache
            .lock()
            .map_err(|_| ToolError::ExecutionFailed("cache lock poisoned".to_string()))?;
        *cache = Some((Instant::now(), snapshot.clone()));

        Ok(snapshot)
    }
}
