// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted bot source files and the filename allow-list.

use crate::id::{BotId, FileId};
use serde::{Deserialize, Serialize};

/// File extensions a bot workspace may contain.
///
/// Upload-time enforcement belongs to the HTTP collaborator; the
/// materializer re-checks at launch so records written through other
/// paths cannot smuggle arbitrary files onto disk.
pub const ALLOWED_EXTENSIONS: &[&str] =
    &["py", "js", "mjs", "cjs", "json", "txt", "md", "env", "yml", "yaml"];

/// Returns true when `name` is a relative path with an allow-listed
/// extension and no traversal components.
pub fn is_allowed_filename(name: &str) -> bool {
    if name.is_empty() || name.starts_with('/') || name.contains('\\') {
        return false;
    }
    if name.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
        return false;
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        // Dotfiles like `.env` carry their extension as the whole name.
        _ => name.rsplit('/').next().is_some_and(|base| {
            base.strip_prefix('.')
                .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        }),
    }
}

/// A source file belonging to a bot, as persisted by the store.
///
/// The persisted content keeps the credential placeholder; substitution
/// happens only on the on-disk workspace copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotFile {
    pub id: FileId,
    pub bot_id: BotId,
    /// Relative filename, allow-listed extension, no traversal.
    pub name: String,
    pub content: String,
    pub size: u64,
}

impl BotFile {
    pub fn new(bot_id: BotId, name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: FileId::new(),
            bot_id,
            name: name.into(),
            size: content.len() as u64,
            content,
        }
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
