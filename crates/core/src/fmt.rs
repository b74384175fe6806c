// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Textual gauge formatting for the bot record.

use std::time::Duration;

/// Format resident memory as rounded whole megabytes, e.g. `"42MB"`.
pub fn format_memory(bytes: u64) -> String {
    let mb = (bytes as f64 / (1024.0 * 1024.0)).round() as u64;
    format!("{}MB", mb)
}

/// Format a CPU percentage with one decimal, e.g. `"3.1%"`.
pub fn format_cpu(pct: f32) -> String {
    format!("{:.1}%", pct)
}

/// Format an uptime duration, truncating leading zero components:
/// `"2d 3h 4m"`, `"3h 4m 5s"`, `"4m 5s"`, `"5s"`.
pub fn format_uptime(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let mins = (total % 3_600) / 60;
    let secs = total % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, mins)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
#[path = "fmt_tests.rs"]
mod tests;
