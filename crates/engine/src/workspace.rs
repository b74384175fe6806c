// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace materialization.
//!
//! Projects a bot's persisted files onto `{workspace_root}/{bot_id}`,
//! substituting the credential placeholder on the way to disk. The
//! persisted records keep the placeholder; only the on-disk copy ever
//! holds the real token.

use bh_core::{is_allowed_filename, BotFile, BotId};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("bot has no files to materialize")]
    NoFiles,

    #[error("refusing to materialize file: {name}")]
    ForbiddenFile { name: String },

    #[error("workspace I/O failed at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}

/// The workspace directory for a bot.
pub fn bot_dir(root: &Path, bot_id: &BotId) -> PathBuf {
    root.join(bot_id.as_str())
}

/// Replace the credential placeholder and common environment-access
/// idioms with a double-quoted literal of the credential.
///
/// Users routinely publish sample code with placeholder tokens;
/// substituting at materialization tolerates the common template
/// patterns without surfacing the secret anywhere but the child's disk.
/// Quoted forms are replaced before the bare token so the result is
/// always a single double-quoted literal.
pub fn substitute_token(source: &str, token: &str) -> String {
    let literal = format!("\"{}\"", token);
    let mut out = source.to_string();
    for pattern in [
        "\"YOUR_BOT_TOKEN\"",
        "'YOUR_BOT_TOKEN'",
        "YOUR_BOT_TOKEN",
        "process.env.DISCORD_TOKEN",
        "process.env.BOT_TOKEN",
        "process.env.TOKEN",
        "os.environ['DISCORD_TOKEN']",
        "os.environ[\"DISCORD_TOKEN\"]",
        "os.getenv('DISCORD_TOKEN')",
        "os.getenv(\"DISCORD_TOKEN\")",
    ] {
        out = out.replace(pattern, &literal);
    }
    out
}

/// Materialize the bot's files under `root`, creating missing ancestors.
///
/// Every filename is re-checked against the allow-list here; upload-time
/// enforcement belongs to the collaborator and is not trusted.
pub fn materialize(
    root: &Path,
    bot_id: &BotId,
    files: &[BotFile],
    token: &str,
) -> Result<PathBuf, WorkspaceError> {
    if files.is_empty() {
        return Err(WorkspaceError::NoFiles);
    }

    let dir = bot_dir(root, bot_id);
    std::fs::create_dir_all(&dir)
        .map_err(|source| WorkspaceError::Io { path: dir.clone(), source })?;

    for file in files {
        if !is_allowed_filename(&file.name) {
            return Err(WorkspaceError::ForbiddenFile { name: file.name.clone() });
        }
        let path = dir.join(&file.name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| WorkspaceError::Io { path: parent.to_path_buf(), source })?;
        }
        let content = substitute_token(&file.content, token);
        std::fs::write(&path, content)
            .map_err(|source| WorkspaceError::Io { path: path.clone(), source })?;
    }

    tracing::debug!(bot_id = %bot_id, files = files.len(), dir = %dir.display(), "workspace materialized");
    Ok(dir)
}

/// Best-effort recursive removal of a bot's workspace. Failure is
/// logged, never raised.
pub fn remove_workspace(root: &Path, bot_id: &BotId) {
    let dir = bot_dir(root, bot_id);
    if !dir.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(&dir) {
        tracing::warn!(bot_id = %bot_id, dir = %dir.display(), error = %e, "workspace removal failed");
    }
}

/// All files under `dir` with one of the given extensions, as paths
/// relative to `dir`, sorted for deterministic resolution.
pub(crate) fn collect_sources(dir: &Path, extensions: &[&str]) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.contains(&e))
            {
                if let Ok(rel) = path.strip_prefix(dir) {
                    found.push(rel.to_path_buf());
                }
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Resolve the entry file to launch.
///
/// Preference order: the declared main file when it exists on disk, the
/// runtime's preferred entry names, then the first source file with the
/// runtime's extension.
pub(crate) fn resolve_entry(
    dir: &Path,
    main_file: Option<&str>,
    preferred: &[String],
    extensions: &[&str],
) -> Option<String> {
    if let Some(main) = main_file {
        if dir.join(main).is_file() {
            return Some(main.to_string());
        }
    }
    for name in preferred {
        if dir.join(name).is_file() {
            return Some(name.clone());
        }
    }
    collect_sources(dir, extensions)
        .ok()?
        .first()
        .map(|p| p.to_string_lossy().into_owned())
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
