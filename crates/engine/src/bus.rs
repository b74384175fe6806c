// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The live push plane.
//!
//! Two channel families: a per-user status channel (at most one
//! subscriber per user; re-subscribing replaces the previous channel)
//! and a per-bot log channel for live-console clients. Sends never
//! block supervisor progress: `try_send` only, full channels drop the
//! message, closed channels are pruned lazily on the next send.

use bh_core::{BotId, LogMessage, StatusMessage, UserId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct BusInner {
    status: Mutex<HashMap<UserId, mpsc::Sender<StatusMessage>>>,
    logs: Mutex<HashMap<BotId, Vec<mpsc::Sender<LogMessage>>>>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the status channel for a user, replacing any previous
    /// subscription.
    pub fn subscribe_status(&self, user: UserId) -> mpsc::Receiver<StatusMessage> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.inner.status.lock().insert(user, tx);
        rx
    }

    pub fn unsubscribe_status(&self, user: &UserId) {
        self.inner.status.lock().remove(user);
    }

    /// Deliver a status message to the user's channel, if one is
    /// registered and open. Absent or closed channels silently no-op.
    pub fn broadcast(&self, user: &UserId, message: StatusMessage) {
        let mut channels = self.inner.status.lock();
        let closed = match channels.get(user) {
            None => false,
            Some(tx) => match tx.try_send(message) {
                Ok(()) => false,
                Err(TrySendError::Full(dropped)) => {
                    tracing::debug!(user = %user, ?dropped, "status channel full, message dropped");
                    false
                }
                Err(TrySendError::Closed(_)) => true,
            },
        };
        if closed {
            channels.remove(user);
        }
    }

    /// Register a live-console subscriber for a bot's log stream.
    pub fn subscribe_logs(&self, bot_id: BotId) -> mpsc::Receiver<LogMessage> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.inner.logs.lock().entry(bot_id).or_default().push(tx);
        rx
    }

    /// Push a log message to every open subscriber of the bot, pruning
    /// closed channels.
    pub fn publish_log(&self, bot_id: &BotId, message: LogMessage) {
        let mut channels = self.inner.logs.lock();
        let Some(subscribers) = channels.get_mut(bot_id) else {
            return;
        };
        subscribers.retain(|tx| match tx.try_send(message.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Closed(_)) => false,
        });
        if subscribers.is_empty() {
            channels.remove(bot_id);
        }
    }

    /// Drop all log subscribers for a bot (used on delete).
    pub fn drop_log_subscribers(&self, bot_id: &BotId) {
        self.inner.logs.lock().remove(bot_id);
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
