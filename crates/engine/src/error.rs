// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.
//!
//! Installer faults are deliberately absent: they are logged against the
//! bot and the start attempt continues (transient registry errors must
//! not block bots that depend on pre-installed libraries).

use crate::workspace::WorkspaceError;
use bh_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Bot not found")]
    NotFound,

    #[error("Access denied")]
    Ownership,

    #[error("Bot is already running")]
    AlreadyRunning,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("RADAR flagged this bot as suspicious: {reason} (risk score {score})")]
    RiskVeto { score: u32, reason: String },

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("Failed to spawn bot process: {0}")]
    Spawn(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// True for failures that end a start attempt with the bot in `error`
    /// status. Precondition failures (`NotFound`, `Ownership`,
    /// `AlreadyRunning`) leave the persisted record untouched.
    pub fn is_fatal_to_attempt(&self) -> bool {
        !matches!(
            self,
            EngineError::NotFound | EngineError::Ownership | EngineError::AlreadyRunning
        )
    }
}
