// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine facade the HTTP collaborator calls.
//!
//! Every operation validates ownership first, then serializes on the
//! bot's lifecycle lock. Persisted status writes always precede the
//! matching push to the event bus, and a log record is durable before
//! any live subscriber sees it.

use crate::bus::EventBus;
use crate::config::EngineConfig;
use crate::deps::{self, ManifestOutcome};
use crate::error::EngineError;
use crate::install;
use crate::supervisor::Supervisor;
use crate::workspace;
use bh_core::{Bot, BotId, BotPatch, BotStatus, LogLevel, LogRecord, StatusMessage, UserId};
use bh_storage::BotStore;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Default history window for `read_logs`.
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Discriminated result surfaced to the HTTP collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub ok: bool,
    pub message: String,
}

impl CommandOutcome {
    fn success(message: impl Into<String>) -> Self {
        Self { ok: true, message: message.into() }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self { ok: false, message: message.into() }
    }
}

pub struct BotEngine {
    store: Arc<dyn BotStore>,
    bus: EventBus,
    config: Arc<EngineConfig>,
    supervisor: Arc<Supervisor>,
    locks: Mutex<HashMap<BotId, Arc<tokio::sync::Mutex<()>>>>,
}

impl BotEngine {
    pub fn new(store: Arc<dyn BotStore>, bus: EventBus, config: EngineConfig) -> Self {
        let config = Arc::new(config);
        let supervisor = Arc::new(Supervisor::new(store.clone(), bus.clone(), config.clone()));
        Self { store, bus, config, supervisor, locks: Mutex::new(HashMap::new()) }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// True iff a process handle is currently registered for the bot.
    pub fn is_running(&self, id: &BotId) -> bool {
        self.supervisor.is_running(id)
    }

    fn lifecycle_lock(&self, id: &BotId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.lock().entry(*id).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))).clone()
    }

    async fn load_owned(&self, id: &BotId, caller: &UserId) -> Result<Bot, EngineError> {
        let bot = self.store.get_bot(id).await?.ok_or(EngineError::NotFound)?;
        if &bot.owner != caller {
            return Err(EngineError::Ownership);
        }
        Ok(bot)
    }

    pub async fn start(&self, id: &BotId, caller: &UserId) -> CommandOutcome {
        let bot = match self.load_owned(id, caller).await {
            Ok(bot) => bot,
            Err(e) => return CommandOutcome::failure(e.to_string()),
        };
        let lock = self.lifecycle_lock(id);
        let _guard = lock.lock().await;

        if self.supervisor.is_running(id) {
            return CommandOutcome::failure(EngineError::AlreadyRunning.to_string());
        }

        match self.run_start(&bot).await {
            Ok(()) => CommandOutcome::success("Bot started"),
            Err(err) => {
                if err.is_fatal_to_attempt() {
                    self.fail_start(&bot, &err).await;
                }
                CommandOutcome::failure(err.to_string())
            }
        }
    }

    /// The start pipeline: static RADAR → materialize → manifest →
    /// install (best-effort) → entry resolution → spawn.
    async fn run_start(&self, bot: &Bot) -> Result<(), EngineError> {
        tracing::info!(bot_id = %bot.id, runtime = %bot.runtime, "start requested");
        self.supervisor.apply_patch(bot.id, bot.owner, BotPatch::status(BotStatus::Starting)).await;

        if bot.token.trim().is_empty() {
            return Err(EngineError::Validation("bot token is missing".to_string()));
        }

        let files = self.store.get_bot_files(&bot.id).await?;

        let report = self.config.rules.scan(&files);
        if self.config.rules.is_suspicious(&report) {
            let reason =
                report.reasons.first().cloned().unwrap_or_else(|| "unspecified".to_string());
            self.supervisor
                .record_log(
                    bot.id,
                    LogLevel::Error,
                    &format!("RADAR blocked launch: {} (risk score {})", reason, report.score),
                    None,
                )
                .await;
            return Err(EngineError::RiskVeto { score: report.score, reason });
        }

        let dir = workspace::materialize(&self.config.workspace_root, &bot.id, &files, &bot.token)?;

        let manifest = deps::ensure_manifest(&dir, bot.runtime, &bot.name, &self.config.dep_rules)
            .map_err(|source| workspace::WorkspaceError::Io { path: dir.clone(), source })?;
        match manifest {
            ManifestOutcome::Generated { entries } => {
                self.supervisor
                    .record_log(
                        bot.id,
                        LogLevel::Info,
                        &format!(
                            "Generated {} with {} dependencies",
                            bot.runtime.manifest_file(),
                            entries
                        ),
                        None,
                    )
                    .await;
            }
            ManifestOutcome::Present | ManifestOutcome::NoSources => {}
        }

        if manifest != ManifestOutcome::NoSources {
            let outcome = install::install_dependencies(&dir, bot.runtime, &self.config).await;
            for (level, line) in &outcome.lines {
                self.supervisor.record_log(bot.id, *level, line, Some("installer")).await;
            }
            if !outcome.ok {
                // Recorded but not fatal: the program may rely on
                // pre-installed libraries.
                self.supervisor
                    .record_log(
                        bot.id,
                        LogLevel::Warn,
                        &format!("Dependency installation failed: {}; continuing", outcome.detail),
                        None,
                    )
                    .await;
            }
        }

        let (preferred, extensions) = match bot.runtime {
            bh_core::RuntimeKind::Python => (&self.config.python_entries, bot.runtime.extensions()),
            bh_core::RuntimeKind::Node => (&self.config.node_entries, bot.runtime.extensions()),
        };
        let entry = workspace::resolve_entry(&dir, bot.main_file.as_deref(), preferred, extensions)
            .ok_or_else(|| {
                EngineError::Validation(format!("no {} entry file found", bot.runtime))
            })?;

        let pid = self.supervisor.launch(bot, &dir, &entry).await?;
        self.supervisor
            .record_log(bot.id, LogLevel::Info, &format!("Bot process started (pid {})", pid), None)
            .await;
        Ok(())
    }

    /// Leave the persisted record consistent after a fatal start
    /// failure: status `error`, pid cleared, gauges zeroed.
    async fn fail_start(&self, bot: &Bot, err: &EngineError) {
        self.supervisor
            .record_log(bot.id, LogLevel::Error, &format!("Start failed: {}", err), None)
            .await;
        self.supervisor.apply_patch(bot.id, bot.owner, BotPatch::cleared(BotStatus::Error)).await;
    }

    pub async fn stop(&self, id: &BotId, caller: &UserId) -> CommandOutcome {
        let bot = match self.load_owned(id, caller).await {
            Ok(bot) => bot,
            Err(e) => return CommandOutcome::failure(e.to_string()),
        };
        let lock = self.lifecycle_lock(id);
        let _guard = lock.lock().await;

        self.do_stop(&bot).await;
        CommandOutcome::success("Bot stopped")
    }

    /// Stop under the lifecycle lock. With a live handle the exit
    /// observer persists the final record; without one this just
    /// reconciles stray fields. Workspace removal is best-effort.
    async fn do_stop(&self, bot: &Bot) {
        let had_process = self.supervisor.stop(&bot.id).await;
        if !had_process && (bot.status != BotStatus::Stopped || bot.pid.is_some()) {
            self.supervisor
                .apply_patch(bot.id, bot.owner, BotPatch::cleared(BotStatus::Stopped))
                .await;
        }
        workspace::remove_workspace(&self.config.workspace_root, &bot.id);
    }

    pub async fn restart(&self, id: &BotId, caller: &UserId) -> CommandOutcome {
        let stopped = self.stop(id, caller).await;
        if !stopped.ok {
            return stopped;
        }
        tokio::time::sleep(self.config.restart_delay).await;
        self.start(id, caller).await
    }

    /// Recent log records, newest first.
    pub async fn read_logs(
        &self,
        id: &BotId,
        caller: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<LogRecord>, EngineError> {
        self.load_owned(id, caller).await?;
        Ok(self.store.get_bot_logs(id, limit.unwrap_or(DEFAULT_LOG_LIMIT)).await?)
    }

    /// Update the content of an existing bot file. Unknown filenames
    /// are rejected; creating files is the collaborator's upload path.
    pub async fn update_file(
        &self,
        id: &BotId,
        caller: &UserId,
        name: &str,
        content: &str,
    ) -> CommandOutcome {
        if let Err(e) = self.load_owned(id, caller).await {
            return CommandOutcome::failure(e.to_string());
        }
        match self.store.update_bot_file(id, name, content).await {
            Ok(()) => CommandOutcome::success("File updated"),
            Err(bh_storage::StoreError::NotFound(_)) => {
                CommandOutcome::failure(format!("File not found: {}", name))
            }
            Err(e) => CommandOutcome::failure(e.to_string()),
        }
    }

    /// Stop if running, then delete the bot row with its files and
    /// logs, then notify the owner's status channel.
    pub async fn delete(&self, id: &BotId, caller: &UserId) -> CommandOutcome {
        let bot = match self.load_owned(id, caller).await {
            Ok(bot) => bot,
            Err(e) => return CommandOutcome::failure(e.to_string()),
        };
        let lock = self.lifecycle_lock(id);
        let _guard = lock.lock().await;

        if self.supervisor.is_running(id) {
            self.do_stop(&bot).await;
        } else {
            workspace::remove_workspace(&self.config.workspace_root, id);
        }

        if let Err(e) = self.store.delete_bot(id).await {
            return CommandOutcome::failure(e.to_string());
        }
        self.bus.drop_log_subscribers(id);
        self.bus.broadcast(&bot.owner, StatusMessage::deleted(bot.id));
        self.locks.lock().remove(id);

        tracing::info!(bot_id = %id, "bot deleted");
        CommandOutcome::success("Bot deleted")
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
