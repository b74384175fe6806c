// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bot record and its status machine.

use crate::id::{BotId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which user-code runtime a bot runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// Python with the async discord.py ecosystem.
    Python,
    /// Node.js with the discord.js ecosystem.
    Node,
}

impl RuntimeKind {
    /// The dependency manifest filename for this runtime.
    pub fn manifest_file(self) -> &'static str {
        match self {
            RuntimeKind::Python => "requirements.txt",
            RuntimeKind::Node => "package.json",
        }
    }

    /// Source-file extensions belonging to this runtime.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            RuntimeKind::Python => &["py"],
            RuntimeKind::Node => &["js", "mjs", "cjs"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeKind::Python => "python",
            RuntimeKind::Node => "node",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a bot.
///
/// `Running` is only entered from `Starting` once the child prints a
/// ready marker on stdout; spawn success alone leaves the bot `Starting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    Stopped,
    Starting,
    Running,
    Error,
}

impl BotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BotStatus::Stopped => "stopped",
            BotStatus::Starting => "starting",
            BotStatus::Running => "running",
            BotStatus::Error => "error",
        }
    }
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hosted bot as persisted by the store.
///
/// The textual `memory`/`cpu`/`uptime` gauges mirror what the dashboard
/// renders; the resource sampler rewrites them every tick while the bot
/// runs and lifecycle transitions reset them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    pub id: BotId,
    pub owner: UserId,
    pub name: String,
    pub runtime: RuntimeKind,
    /// Declared entry filename; resolved against the workspace at launch
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_file: Option<String>,
    /// The bot credential. Never written into logs or pushed messages.
    pub token: String,
    pub status: BotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub memory: String,
    pub cpu: String,
    pub uptime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_start: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bot {
    /// Create a stopped bot record with zeroed gauges.
    pub fn new(
        id: BotId,
        owner: UserId,
        name: impl Into<String>,
        runtime: RuntimeKind,
        token: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner,
            name: name.into(),
            runtime,
            main_file: None,
            token: token.into(),
            status: BotStatus::Stopped,
            pid: None,
            memory: "0MB".to_string(),
            cpu: "0%".to_string(),
            uptime: "0s".to_string(),
            last_start: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update applied to a bot record.
///
/// Double-`Option` fields distinguish "leave unchanged" (`None`) from
/// "clear" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct BotPatch {
    pub status: Option<BotStatus>,
    pub pid: Option<Option<u32>>,
    pub memory: Option<String>,
    pub cpu: Option<String>,
    pub uptime: Option<String>,
    pub last_start: Option<Option<DateTime<Utc>>>,
    pub main_file: Option<Option<String>>,
    pub name: Option<String>,
}

impl BotPatch {
    pub fn status(status: BotStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    /// Patch for a terminal transition: status set, pid cleared, gauges
    /// zeroed.
    pub fn cleared(status: BotStatus) -> Self {
        Self {
            status: Some(status),
            pid: Some(None),
            memory: Some("0MB".to_string()),
            cpu: Some("0%".to_string()),
            ..Self::default()
        }
    }

    /// Apply this patch to a record, bumping `updated_at`.
    pub fn apply(self, bot: &mut Bot) {
        if let Some(status) = self.status {
            bot.status = status;
        }
        if let Some(pid) = self.pid {
            bot.pid = pid;
        }
        if let Some(memory) = self.memory {
            bot.memory = memory;
        }
        if let Some(cpu) = self.cpu {
            bot.cpu = cpu;
        }
        if let Some(uptime) = self.uptime {
            bot.uptime = uptime;
        }
        if let Some(last_start) = self.last_start {
            bot.last_start = last_start;
        }
        if let Some(main_file) = self.main_file {
            bot.main_file = main_file;
        }
        if let Some(name) = self.name {
            bot.name = name;
        }
        bot.updated_at = Utc::now();
    }
}

#[cfg(test)]
#[path = "bot_tests.rs"]
mod tests;
