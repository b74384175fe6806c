// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use bh_core::{Bot, BotFile, BotId, BotPatch, LogRecord, UserId};
use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence operations the engine consumes.
///
/// All operations are single-row; the only multi-row guarantee is the
/// delete cascade (files and logs go with the bot). Log reads return
/// newest-first.
#[async_trait]
pub trait BotStore: Send + Sync {
    async fn create_bot(&self, bot: Bot) -> Result<(), StoreError>;

    async fn get_bot(&self, id: &BotId) -> Result<Option<Bot>, StoreError>;

    async fn list_bots_by_owner(&self, owner: &UserId) -> Result<Vec<Bot>, StoreError>;

    async fn update_bot(&self, id: &BotId, patch: BotPatch) -> Result<(), StoreError>;

    async fn create_bot_file(&self, file: BotFile) -> Result<(), StoreError>;

    async fn get_bot_files(&self, bot_id: &BotId) -> Result<Vec<BotFile>, StoreError>;

    async fn update_bot_file(
        &self,
        bot_id: &BotId,
        name: &str,
        content: &str,
    ) -> Result<(), StoreError>;

    /// Last `limit` records, newest first.
    async fn get_bot_logs(&self, bot_id: &BotId, limit: usize)
        -> Result<Vec<LogRecord>, StoreError>;

    async fn create_bot_log(&self, record: LogRecord) -> Result<(), StoreError>;

    /// Delete the bot row, cascading to its files and logs.
    async fn delete_bot(&self, id: &BotId) -> Result<(), StoreError>;
}
