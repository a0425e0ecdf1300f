// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sandbox path resolution shared by the file tools.
//!
//! Every file-tool path resolves against a single sandbox root. Paths
//! escaping the root, containing `..`, or pointing at sensitive files are
//! rejected with a safety violation before any I/O happens.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::ToolError;

/// Substrings that mark a path as sensitive regardless of location.
const SENSITIVE_PATTERNS: &[&str] = &[
    ".env",
    "secrets",
    "/etc/shadow",
    "/etc/passwd",
    "/etc/sudoers",
    ".ssh/id_rsa",
    ".ssh/id_ed25519",
    ".ssh/id_ecdsa",
    ".ssh/id_dsa",
    ".ssh/authorized_keys",
    "credentials",
    "config/database",
];

/// Extensions that are never readable or writable.
const SENSITIVE_EXTENSIONS: &[&str] = &["pem", "key", "p12", "pfx"];

/// Resolve a tool-supplied path against the sandbox root.
///
/// Relative paths resolve under the root; absolute paths are accepted only
/// when they land inside the root. `..` components are rejected outright.
pub fn resolve_path(sandbox_root: &Path, path_str: &str) -> Result<PathBuf, ToolError> {
    if path_str.is_empty() {
        return Err(ToolError::InvalidInput("path is required".to_string()));
    }

    let raw = Path::new(path_str);
    if raw.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ToolError::SafetyViolation(format!(
            "PATH_TRAVERSAL: '..' not allowed in path '{path_str}'"
        )));
    }

    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        sandbox_root.join(raw)
    };

    // Prefer the symlink-resolved form when the path already exists
    let resolved = joined.canonicalize().unwrap_or(joined);

    if !resolved.starts_with(sandbox_root) {
        return Err(ToolError::SafetyViolation(format!(
            "OUTSIDE_SANDBOX: path '{path_str}' resolves outside the sandbox"
        )));
    }

    let path_lower = resolved.to_string_lossy().to_lowercase();
    for pattern in SENSITIVE_PATTERNS {
        if path_lower.contains(pattern) {
            warn!(path = %resolved.display(), pattern, "sensitive path blocked");
            return Err(ToolError::SafetyViolation(format!(
                "SENSITIVE_PATH: '{}' is a sensitive file",
                resolved.display()
            )));
        }
    }

    if let Some(ext) = resolved.extension().and_then(|e| e.to_str()) {
        if SENSITIVE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
            return Err(ToolError::SafetyViolation(format!(
                "SENSITIVE_PATH: extension '.{ext}' is blocked"
            )));
        }
    }

    Ok(resolved)
}

/// Format byte size as a human-readable string.
pub fn format_size(size: u64) -> String {
    let mut fsize = size as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if fsize < 1024.0 {
            return if unit == "B" {
                format!("{fsize:.0}{unit}")
            } else {
                format!("{fsize:.1}{unit}")
            };
        }
        fsize /= 1024.0;
    }
    format!("{fsize:.1}TB")
}
