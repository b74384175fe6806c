// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process supervision.
//!
//! Owns the process-handle map: at most one handle exists per bot at
//! any instant, and every mutation goes through this module under the
//! registry lock. Stream observers classify child output, the exit
//! observer reconciles persisted state, and stop escalates SIGTERM to
//! SIGKILL after the grace period.

use crate::bus::EventBus;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::sampler;
use bh_core::{Bot, BotId, BotPatch, BotStatus, LogLevel, LogMessage, LogRecord, RuntimeKind, StatusMessage, UserId};
use bh_storage::BotStore;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_util::sync::CancellationToken;

/// Stdout substrings that mean the bot finished logging in.
const READY_MARKERS: &[&str] = &["Logged in as", "Bot is ready", "Successfully logged in"];

/// Stderr substrings that mean the credential was rejected.
const FATAL_MARKERS: &[&str] = &["LoginFailure", "Improper token", "Unauthorized", "Invalid token"];

/// In-memory record of a spawned child. Never persisted.
pub(crate) struct ProcessHandle {
    pub pid: u32,
    pub started_at: Instant,
    /// Cancels the resource sampler for this child.
    sampler: CancellationToken,
    /// Cancelled by the exit observer once bookkeeping is done, which
    /// releases any `stop` waiter.
    exited: CancellationToken,
    /// Set by `stop` so the exit observer records `stopped` no matter
    /// how the child died.
    stopping: Arc<AtomicBool>,
}

pub struct Supervisor {
    store: Arc<dyn BotStore>,
    bus: EventBus,
    pub(crate) config: Arc<EngineConfig>,
    handles: RwLock<HashMap<BotId, ProcessHandle>>,
}

impl Supervisor {
    pub fn new(store: Arc<dyn BotStore>, bus: EventBus, config: Arc<EngineConfig>) -> Self {
        Self { store, bus, config, handles: RwLock::new(HashMap::new()) }
    }

    /// True iff a process handle is currently registered for the bot.
    pub fn is_running(&self, bot_id: &BotId) -> bool {
        self.handles.read().contains_key(bot_id)
    }

    pub(crate) fn store(&self) -> &Arc<dyn BotStore> {
        &self.store
    }

    /// Persist a bot patch, then broadcast the status transition (if
    /// any) to the owner's channel. Persist-before-push ordering is what
    /// keeps subscriber views consistent with the store.
    pub(crate) async fn apply_patch(&self, bot_id: BotId, owner: UserId, patch: BotPatch) {
        let status = patch.status;
        if let Err(e) = self.store.update_bot(&bot_id, patch).await {
            tracing::warn!(bot_id = %bot_id, error = %e, "bot patch failed");
        }
        if let Some(status) = status {
            self.bus.broadcast(&owner, StatusMessage::status_update(bot_id, status));
        }
    }

    /// Append a log record, then push it to live subscribers. The record
    /// is durable in the store before any subscriber sees it.
    pub(crate) async fn record_log(
        &self,
        bot_id: BotId,
        level: LogLevel,
        message: &str,
        source: Option<&str>,
    ) {
        let record = LogRecord::new(bot_id, level, message);
        let push = LogMessage {
            level,
            message: record.message.clone(),
            source: source.map(str::to_string),
        };
        if let Err(e) = self.store.create_bot_log(record).await {
            tracing::warn!(bot_id = %bot_id, error = %e, "log append failed");
        }
        self.bus.publish_log(&bot_id, push);
    }

    /// Spawn the bot's child process, register its handle, and attach
    /// the stream observers, exit observer, and resource sampler.
    ///
    /// The caller holds the bot's lifecycle lock and has verified no
    /// handle is registered.
    pub(crate) async fn launch(
        self: &Arc<Self>,
        bot: &Bot,
        workspace: &Path,
        entry: &str,
    ) -> Result<u32, EngineError> {
        let bin = match bot.runtime {
            RuntimeKind::Python => &self.config.python_bin,
            RuntimeKind::Node => &self.config.node_bin,
        };

        let mut command = Command::new(bin);
        if bot.runtime == RuntimeKind::Python {
            command.arg("-u").env("PYTHONUNBUFFERED", "1");
        }
        command
            .arg(entry)
            .current_dir(workspace)
            .env("DISCORD_TOKEN", &bot.token)
            .env("BOT_ID", bot.id.as_str())
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| EngineError::Spawn(format!("{}: {}", bin, e)))?;
        let pid = child
            .id()
            .ok_or_else(|| EngineError::Spawn("child exited before pid capture".to_string()))?;

        let sampler_token = CancellationToken::new();
        let exited = CancellationToken::new();
        let stopping = Arc::new(AtomicBool::new(false));
        let started_at = Instant::now();
        {
            let mut handles = self.handles.write();
            handles.insert(
                bot.id,
                ProcessHandle {
                    pid,
                    started_at,
                    sampler: sampler_token.clone(),
                    exited: exited.clone(),
                    stopping: stopping.clone(),
                },
            );
        }

        // Record the pid before any observer can race the exit path.
        if let Err(e) = self
            .store
            .update_bot(
                &bot.id,
                BotPatch {
                    pid: Some(Some(pid)),
                    last_start: Some(Some(chrono::Utc::now())),
                    uptime: Some("0s".to_string()),
                    ..BotPatch::default()
                },
            )
            .await
        {
            tracing::warn!(bot_id = %bot.id, error = %e, "pid patch failed");
        }

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(Self::observe_stdout(
                Arc::clone(self),
                bot.id,
                bot.owner,
                bot.token.clone(),
                stdout,
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(Self::observe_stderr(
                Arc::clone(self),
                bot.id,
                bot.owner,
                bot.token.clone(),
                stderr,
            ));
        }
        tokio::spawn(Self::observe_exit(
            Arc::clone(self),
            bot.id,
            bot.owner,
            child,
            sampler_token.clone(),
            exited,
            stopping,
        ));
        sampler::spawn(Arc::clone(self), bot.id, pid, started_at, sampler_token);

        tracing::info!(bot_id = %bot.id, pid, entry, "bot process spawned");
        Ok(pid)
    }

    async fn observe_stdout(
        supervisor: Arc<Self>,
        bot_id: BotId,
        owner: UserId,
        token: String,
        stdout: ChildStdout,
    ) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = redact(&line, &token);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            supervisor.record_log(bot_id, LogLevel::Info, line, Some("stdout")).await;
            if READY_MARKERS.iter().any(|marker| line.contains(marker)) {
                supervisor.promote_to_running(bot_id, owner).await;
            }
        }
    }

    async fn observe_stderr(
        supervisor: Arc<Self>,
        bot_id: BotId,
        owner: UserId,
        token: String,
        stderr: ChildStderr,
    ) {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = redact(&line, &token);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            supervisor.record_log(bot_id, LogLevel::Error, line, Some("stderr")).await;
            if FATAL_MARKERS.iter().any(|marker| line.contains(marker)) {
                supervisor.fail_from_output(bot_id, owner).await;
            }
        }
    }

    /// Starting → Running on the first ready marker. Later markers (or
    /// markers after a manual stop) are no-ops.
    async fn promote_to_running(&self, bot_id: BotId, owner: UserId) {
        match self.store.get_bot(&bot_id).await {
            Ok(Some(bot)) if bot.status == BotStatus::Starting => {
                tracing::info!(bot_id = %bot_id, "bot reported ready");
                self.apply_patch(bot_id, owner, BotPatch::status(BotStatus::Running)).await;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(bot_id = %bot_id, error = %e, "ready check failed"),
        }
    }

    /// Credential rejection on stderr transitions to `error` immediately;
    /// the exit observer clears pid and gauges when the child dies.
    async fn fail_from_output(&self, bot_id: BotId, owner: UserId) {
        match self.store.get_bot(&bot_id).await {
            Ok(Some(bot)) if bot.status != BotStatus::Error => {
                tracing::warn!(bot_id = %bot_id, "bot output matched a credential failure");
                self.apply_patch(bot_id, owner, BotPatch::status(BotStatus::Error)).await;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(bot_id = %bot_id, error = %e, "failure check failed"),
        }
    }

    /// Reaps the child. The handle is removed before the status write so
    /// `running` is never observable without a live handle.
    async fn observe_exit(
        supervisor: Arc<Self>,
        bot_id: BotId,
        owner: UserId,
        mut child: Child,
        sampler_token: CancellationToken,
        exited: CancellationToken,
        stopping: Arc<AtomicBool>,
    ) {
        let wait_result = child.wait().await;
        sampler_token.cancel();
        {
            supervisor.handles.write().remove(&bot_id);
        }

        let exit_code = wait_result.as_ref().ok().and_then(|status| status.code());
        let requested = stopping.load(Ordering::SeqCst);
        let final_status = if requested || exit_code == Some(0) {
            BotStatus::Stopped
        } else {
            BotStatus::Error
        };

        tracing::info!(bot_id = %bot_id, ?exit_code, requested, "bot process exited");
        supervisor.apply_patch(bot_id, owner, BotPatch::cleared(final_status)).await;
        match (requested, exit_code) {
            (true, _) => {
                supervisor.record_log(bot_id, LogLevel::Info, "Bot stopped", None).await;
            }
            (false, Some(0)) => {
                supervisor.record_log(bot_id, LogLevel::Info, "Bot exited cleanly", None).await;
            }
            (false, Some(code)) => {
                supervisor
                    .record_log(bot_id, LogLevel::Error, &format!("Bot exited with code {}", code), None)
                    .await;
            }
            (false, None) => {
                supervisor
                    .record_log(bot_id, LogLevel::Error, "Bot terminated by signal", None)
                    .await;
            }
        }

        exited.cancel();
    }

    /// Graceful stop: SIGTERM, wait up to the grace period, then SIGKILL.
    ///
    /// Returns false when no handle was registered (nothing to stop).
    /// When a handle exists, the exit observer persists the `stopped`
    /// record before this returns.
    pub(crate) async fn stop(&self, bot_id: &BotId) -> bool {
        let (pid, started_at, exited, stopping, sampler_token) = {
            let handles = self.handles.read();
            match handles.get(bot_id) {
                None => return false,
                Some(h) => {
                    (h.pid, h.started_at, h.exited.clone(), h.stopping.clone(), h.sampler.clone())
                }
            }
        };

        stopping.store(true, Ordering::SeqCst);
        sampler_token.cancel();
        signal_pid(pid, Signal::SIGTERM);

        if tokio::time::timeout(self.config.stop_grace, exited.cancelled()).await.is_err() {
            tracing::warn!(bot_id = %bot_id, pid, "graceful stop timed out, sending SIGKILL");
            signal_pid(pid, Signal::SIGKILL);
            let _ = tokio::time::timeout(std::time::Duration::from_secs(2), exited.cancelled()).await;
        }
        tracing::info!(bot_id = %bot_id, pid, ran_for_s = started_at.elapsed().as_secs(), "bot stopped");
        true
    }

    /// Forceful termination for a runtime RADAR breach. The exit
    /// observer records the `error` status and clears the handle.
    pub(crate) fn kill_for_abuse(&self, bot_id: &BotId) {
        let pid = self.handles.read().get(bot_id).map(|h| h.pid);
        if let Some(pid) = pid {
            tracing::warn!(bot_id = %bot_id, pid, "killing bot for quota breach");
            signal_pid(pid, Signal::SIGKILL);
        }
    }
}

fn signal_pid(pid: u32, signal: Signal) {
    if let Err(e) = kill(Pid::from_raw(pid as i32), signal) {
        tracing::debug!(pid, ?signal, error = %e, "signal delivery failed");
    }
}

/// Scrub the credential from a captured output line. Children receive
/// the token via their environment, so a program that echoes its
/// environment must not leak it into logs or live consoles.
fn redact(line: &str, token: &str) -> String {
    if token.is_empty() {
        line.to_string()
    } else {
        line.replace(token, "[REDACTED]")
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
