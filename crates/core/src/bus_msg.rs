// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push-channel message vocabulary.
//!
//! Two live channels exist: a per-user status channel and a per-bot log
//! channel. The wire field names (`type`, `botId`) are what the browser
//! clients already parse, so they are pinned here with serde renames.

use crate::bot::BotStatus;
use crate::id::BotId;
use crate::log::LogLevel;
use serde::{Deserialize, Serialize};

/// Message on the per-user status channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusMessage {
    BotStatusUpdate {
        #[serde(rename = "botId")]
        bot_id: BotId,
        status: BotStatus,
    },
    BotDeleted {
        #[serde(rename = "botId")]
        bot_id: BotId,
    },
}

impl StatusMessage {
    pub fn status_update(bot_id: BotId, status: BotStatus) -> Self {
        StatusMessage::BotStatusUpdate { bot_id, status }
    }

    pub fn deleted(bot_id: BotId) -> Self {
        StatusMessage::BotDeleted { bot_id }
    }
}

/// Message on the per-bot log channel, consumed by live-console clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[cfg(test)]
#[path = "bus_msg_tests.rs"]
mod tests;
