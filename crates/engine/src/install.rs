// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Package-tool invocation with hard wall-clock timeouts.
//!
//! Python installs fall back user-scoped → system-scoped → alternate
//! tool name; Node is a single non-interactive attempt. A failed or
//! timed-out install is reported to the caller, which logs it and
//! proceeds with the start attempt anyway.

use crate::config::EngineConfig;
use bh_core::{LogLevel, RuntimeKind};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Result of an install run: captured output lines plus a verdict.
#[derive(Debug)]
pub struct InstallOutcome {
    pub ok: bool,
    pub detail: String,
    pub lines: Vec<(LogLevel, String)>,
}

/// Run the runtime's package tool against a materialized workspace.
pub async fn install_dependencies(
    dir: &Path,
    runtime: RuntimeKind,
    config: &EngineConfig,
) -> InstallOutcome {
    match runtime {
        RuntimeKind::Python => install_python(dir, config).await,
        RuntimeKind::Node => install_node(dir, config).await,
    }
}

async fn install_python(dir: &Path, config: &EngineConfig) -> InstallOutcome {
    let attempts: [(&str, &[&str]); 3] = [
        (config.pip_bin.as_str(), &["install", "--user", "-r", "requirements.txt"]),
        (config.pip_bin.as_str(), &["install", "-r", "requirements.txt"]),
        (config.pip_alt_bin.as_str(), &["install", "-r", "requirements.txt"]),
    ];

    let mut lines = Vec::new();
    let mut last_detail = String::new();
    for (bin, args) in attempts {
        match run_tool(bin, args, dir, config.pip_timeout).await {
            Ok(attempt) => {
                lines.extend(attempt.lines);
                if attempt.success {
                    return InstallOutcome {
                        ok: true,
                        detail: format!("{} install succeeded", bin),
                        lines,
                    };
                }
                last_detail = format!("{} exited with {}", bin, attempt.status);
            }
            Err(detail) => {
                tracing::debug!(bin, %detail, "install attempt failed");
                last_detail = detail;
            }
        }
    }

    InstallOutcome { ok: false, detail: last_detail, lines }
}

async fn install_node(dir: &Path, config: &EngineConfig) -> InstallOutcome {
    match run_tool(&config.npm_bin, &["install", "--no-audit", "--no-fund"], dir, config.npm_timeout)
        .await
    {
        Ok(attempt) => InstallOutcome {
            ok: attempt.success,
            detail: if attempt.success {
                "npm install succeeded".to_string()
            } else {
                format!("npm exited with {}", attempt.status)
            },
            lines: attempt.lines,
        },
        Err(detail) => InstallOutcome { ok: false, detail, lines: Vec::new() },
    }
}

struct ToolRun {
    success: bool,
    status: String,
    lines: Vec<(LogLevel, String)>,
}

/// Run one tool invocation, bounded by `timeout`. The child is killed if
/// the bound expires. Spawn failures (tool not installed) surface as
/// `Err` so the caller can try the next fallback.
async fn run_tool(
    bin: &str,
    args: &[&str],
    dir: &Path,
    timeout: Duration,
) -> Result<ToolRun, String> {
    let mut command = Command::new(bin);
    command
        .args(args)
        .current_dir(dir)
        .env("CI", "true")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(format!("{}: {}", bin, e)),
        Err(_) => return Err(format!("{} timed out after {}s", bin, timeout.as_secs())),
    };

    let mut lines = Vec::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if !line.trim().is_empty() {
            lines.push((LogLevel::Info, line.trim().to_string()));
        }
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        if !line.trim().is_empty() {
            lines.push((LogLevel::Warn, line.trim().to_string()));
        }
    }

    Ok(ToolRun { success: output.status.success(), status: output.status.to_string(), lines })
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
