// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`BotStore`] used by tests and single-host deployments.

use crate::store::{BotStore, StoreError};
use async_trait::async_trait;
use bh_core::{Bot, BotFile, BotId, BotPatch, LogRecord, UserId};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct Tables {
    bots: HashMap<BotId, Bot>,
    files: HashMap<BotId, Vec<BotFile>>,
    logs: HashMap<BotId, Vec<LogRecord>>,
}

/// RwLock-guarded tables. Log vectors are append-order; reads reverse.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BotStore for MemoryStore {
    async fn create_bot(&self, bot: Bot) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables.bots.insert(bot.id, bot);
        Ok(())
    }

    async fn get_bot(&self, id: &BotId) -> Result<Option<Bot>, StoreError> {
        Ok(self.tables.read().bots.get(id).cloned())
    }

    async fn list_bots_by_owner(&self, owner: &UserId) -> Result<Vec<Bot>, StoreError> {
        let tables = self.tables.read();
        let mut bots: Vec<Bot> =
            tables.bots.values().filter(|b| &b.owner == owner).cloned().collect();
        bots.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(bots)
    }

    async fn update_bot(&self, id: &BotId, patch: BotPatch) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let bot = tables
            .bots
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("bot {}", id)))?;
        patch.apply(bot);
        Ok(())
    }

    async fn create_bot_file(&self, file: BotFile) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let files = tables.files.entry(file.bot_id).or_default();
        if let Some(existing) = files.iter_mut().find(|f| f.name == file.name) {
            *existing = file;
        } else {
            files.push(file);
        }
        Ok(())
    }

    async fn get_bot_files(&self, bot_id: &BotId) -> Result<Vec<BotFile>, StoreError> {
        Ok(self.tables.read().files.get(bot_id).cloned().unwrap_or_default())
    }

    async fn update_bot_file(
        &self,
        bot_id: &BotId,
        name: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let files = tables
            .files
            .get_mut(bot_id)
            .ok_or_else(|| StoreError::NotFound(format!("files for bot {}", bot_id)))?;
        let file = files
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| StoreError::NotFound(format!("file {}", name)))?;
        file.content = content.to_string();
        file.size = content.len() as u64;
        Ok(())
    }

    async fn get_bot_logs(
        &self,
        bot_id: &BotId,
        limit: usize,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let tables = self.tables.read();
        let logs = tables.logs.get(bot_id).map(Vec::as_slice).unwrap_or_default();
        Ok(logs.iter().rev().take(limit).cloned().collect())
    }

    async fn create_bot_log(&self, record: LogRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables.logs.entry(record.bot_id).or_default().push(record);
        Ok(())
    }

    async fn delete_bot(&self, id: &BotId) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables.files.remove(id);
        tables.logs.remove(id);
        tables
            .bots
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("bot {}", id)))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
