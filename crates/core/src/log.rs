// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bot log records.

use crate::id::{BotId, LogId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a bot log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured log line for a bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: LogId,
    pub bot_id: BotId,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    /// Build a record with the message trimmed of surrounding whitespace.
    pub fn new(bot_id: BotId, level: LogLevel, message: &str) -> Self {
        Self {
            id: LogId::new(),
            bot_id,
            level,
            message: message.trim().to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
