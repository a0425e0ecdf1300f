// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! System prompt assembly.

use chrono::Local;

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Valet, an autonomous personal agent running on your owner's local machine. \
You have tools to execute shell commands, read and write files, inspect the system, \
fetch web pages, and manage your own memory.

Principles:
- Be concise and direct.
- Before running destructive commands, explain what you are about to do.
- Use your memory to recall preferences and prior context.
- If a safety policy stops you from doing something, explain why clearly.
- Respond in the same language the user writes in.";

/// Build the full system prompt, injecting memory context.
pub fn build_system_prompt(
    base_prompt: &str,
    user_profile: Option<&str>,
    semantic_memories: Option<&[String]>,
    session_summary: Option<&str>,
) -> String {
    let mut parts: Vec<String> = vec![if base_prompt.is_empty() {
        DEFAULT_SYSTEM_PROMPT.to_string()
    } else {
        base_prompt.to_string()
    }];

    let now = Local::now().format("%Y-%m-%d %H:%M");
    parts.push(format!("\nCurrent date and time: {now}"));

    if let Some(profile) = user_profile {
        parts.push(format!("\n## User profile\n{profile}"));
    }

    if let Some(memories) = semantic_memories {
        if !memories.is_empty() {
            let memories_text = memories
                .iter()
                .map(|m| format!("- {m}"))
                .collect::<Vec<_>>()
                .join("\n");
            parts.push(format!("\n## Relevant memories\n{memories_text}"));
        }
    }

    if let Some(summary) = session_summary {
        parts.push(format!("\n## Previous session summary\n{summary}"));
    }

    parts.join("\n")
}
