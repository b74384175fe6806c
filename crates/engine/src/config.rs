// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration and centralized environment variable access.
//!
//! Everything tunable lives here as data: runtime binaries, quota
//! limits, the RADAR pattern pack, dependency-inference tables, entry
//! preference lists, and timing knobs. Tests build an [`EngineConfig`]
//! with their own tables instead of monkey-patching behavior.

use crate::deps::DependencyRules;
use crate::radar::{QuotaLimits, RiskRules};
use std::path::PathBuf;
use std::time::Duration;

/// Resolve the default workspace root:
/// `BOTHIVE_WORKSPACE_ROOT` > XDG state dir > `~/.local/state` > `/tmp`,
/// suffixed `bothive/workspaces`.
pub fn default_workspace_root() -> PathBuf {
    if let Ok(dir) = std::env::var("BOTHIVE_WORKSPACE_ROOT") {
        return PathBuf::from(dir);
    }
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("bothive/workspaces")
}

/// `MEMORY_MAX` — per-bot resident memory quota in megabytes.
pub fn memory_max() -> u64 {
    std::env::var("MEMORY_MAX").ok().and_then(|s| s.parse().ok()).unwrap_or(128)
}

/// `CPU_QUOTA` — per-bot CPU percentage quota.
pub fn cpu_quota() -> f32 {
    std::env::var("CPU_QUOTA").ok().and_then(|s| s.parse().ok()).unwrap_or(50.0)
}

/// `MAX_BOTS_PER_USER` — creation-time cap, enforced by the collaborator.
pub fn max_bots_per_user() -> usize {
    std::env::var("MAX_BOTS_PER_USER").ok().and_then(|s| s.parse().ok()).unwrap_or(10)
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-bot workspaces are materialized under `{workspace_root}/{bot_id}`.
    pub workspace_root: PathBuf,

    pub python_bin: String,
    pub node_bin: String,
    pub pip_bin: String,
    /// Alternate pip tool name, tried after user- and system-scoped installs.
    pub pip_alt_bin: String,
    pub npm_bin: String,

    pub limits: QuotaLimits,
    pub rules: RiskRules,
    pub dep_rules: DependencyRules,

    /// Entry filenames preferred when the bot declares no main file.
    pub python_entries: Vec<String>,
    pub node_entries: Vec<String>,

    pub sample_interval: Duration,
    pub stop_grace: Duration,
    pub restart_delay: Duration,
    pub pip_timeout: Duration,
    pub npm_timeout: Duration,

    pub max_bots_per_user: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            workspace_root: PathBuf::from("/tmp/bothive/workspaces"),
            python_bin: "python3".to_string(),
            node_bin: "node".to_string(),
            pip_bin: "pip".to_string(),
            pip_alt_bin: "pip3".to_string(),
            npm_bin: "npm".to_string(),
            limits: QuotaLimits::default(),
            rules: RiskRules::default(),
            dep_rules: DependencyRules::default(),
            python_entries: owned(&["main.py", "bot.py", "app.py", "run.py", "__main__.py", "start.py"]),
            node_entries: owned(&["index.js", "main.js", "app.js", "bot.js", "start.js", "server.js"]),
            sample_interval: Duration::from_secs(3),
            stop_grace: Duration::from_secs(5),
            restart_delay: Duration::from_secs(1),
            pip_timeout: Duration::from_secs(180),
            npm_timeout: Duration::from_secs(240),
            max_bots_per_user: 10,
        }
    }
}

impl EngineConfig {
    /// Defaults layered with environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self { workspace_root: default_workspace_root(), ..Self::default() };
        config.limits = QuotaLimits { memory_mb: memory_max(), cpu_pct: cpu_quota() };
        config.max_bots_per_user = max_bots_per_user();
        if let Ok(bin) = std::env::var("BOTHIVE_PYTHON_BIN") {
            config.python_bin = bin;
        }
        if let Ok(bin) = std::env::var("BOTHIVE_NODE_BIN") {
            config.node_bin = bin;
        }
        config
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
