// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! User-facing channels.
//!
//! A channel owns the per-turn pipeline: context build, summarization
//! trigger, agent run, persistence, background indexing, rendering.

pub mod terminal;

pub use terminal::TerminalChannel;
