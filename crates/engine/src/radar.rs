// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RADAR: the static and runtime risk analyzer.
//!
//! Both arms share the reason/score vocabulary. The static arm scans
//! uploaded sources before any workspace exists; the runtime arm judges
//! sampled CPU/memory each sampler tick. Patterns and thresholds are
//! data on [`RiskRules`]/[`QuotaLimits`] so deployments and tests can
//! substitute their own tables.

use bh_core::BotFile;
use regex::Regex;

/// One static scan pattern with its score weight.
///
/// Patterns are matched against lower-cased file content, so they are
/// written lower-case. Each rule scores at most once per file.
#[derive(Debug, Clone)]
pub struct RiskRule {
    pub pattern: Regex,
    pub reason: String,
    pub weight: u32,
}

impl RiskRule {
    pub fn new(pattern: &str, reason: impl Into<String>, weight: u32) -> Result<Self, regex::Error> {
        Ok(Self { pattern: Regex::new(pattern)?, reason: reason.into(), weight })
    }
}

/// Outcome of a static scan.
#[derive(Debug, Clone, Default)]
pub struct RiskReport {
    pub score: u32,
    pub reasons: Vec<String>,
}

/// The static pattern pack plus scoring knobs.
#[derive(Debug, Clone)]
pub struct RiskRules {
    pub rules: Vec<RiskRule>,
    /// Total score at or above this value vetoes the launch.
    pub threshold: u32,
    /// Files longer than this many lines add `oversize_weight`.
    pub oversize_lines: usize,
    pub oversize_weight: u32,
}

impl Default for RiskRules {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RiskRules {
    /// The built-in pattern pack.
    // Allow expect here as the patterns are constants verified by tests
    #[allow(clippy::expect_used)]
    pub fn builtin() -> Self {
        let kw = |word: &str, reason: &str, weight: u32| {
            RiskRule::new(&format!(r"\b{}\b", word), format!("{} `{}`", reason, word), weight)
                .expect("constant pattern is valid")
        };
        let shape = |pattern: &str, reason: &str, weight: u32| {
            RiskRule::new(pattern, reason, weight).expect("constant pattern is valid")
        };

        let mut rules = Vec::new();

        // Resource extraction: mining, hashing/pool, and GPU vocabulary.
        for word in ["mining", "miner", "cryptocurrency", "bitcoin", "monero", "ethereum"] {
            rules.push(kw(word, "cryptocurrency mining keyword", 10));
        }
        for word in ["hashrate", "stratum", "nicehash", "xmrig", "cryptonight"] {
            rules.push(kw(word, "mining pool keyword", 10));
        }
        for word in ["gpu", "cuda", "opencl"] {
            rules.push(kw(word, "gpu compute keyword", 10));
        }

        // Network abuse vocabulary.
        for word in ["ddos", "botnet", "stresser", "booter"] {
            rules.push(kw(word, "network abuse keyword", 10));
        }
        rules.push(shape(r"\bflood(?:er|ing)?\b", "network abuse keyword `flood`", 10));
        rules.push(shape(r"proxy\s+list|\bproxies\b", "proxy harvesting vocabulary", 10));

        // Resource-exhaustion code shapes.
        rules.push(shape(r"while\s+(?:true|1)\s*:", "infinite loop", 10));
        rules.push(shape(r"while\s*\(\s*(?:true|1)\s*\)", "infinite loop", 10));
        rules.push(shape(r"\bos\.fork\s*\(|child_process\.fork|cluster\.fork", "process forking", 10));
        rules.push(shape(
            r"bytearray\s*\(\s*\d{8,}|buffer\.alloc\w*\s*\(\s*\d{8,}|\]\s*\*\s*\d{8,}",
            "oversized allocation",
            10,
        ));

        // Obfuscation indicators.
        rules.push(shape(r"\beval\s*\(", "dynamic eval", 15));
        rules.push(shape(r"\bexec\s*\(", "dynamic exec", 15));
        rules.push(shape(r"new\s+function\s*\(", "dynamic function constructor", 15));
        rules.push(shape(r"(?:\\x[0-9a-f]{2}){4,}", "hex escape sequence", 15));
        rules.push(shape(r"(?:\\u[0-9a-f]{4}){4,}", "unicode escape sequence", 15));

        Self { rules, threshold: 20, oversize_lines: 10_000, oversize_weight: 5 }
    }

    /// Scan the persisted sources. Each rule scores at most once per file;
    /// scores accumulate across files.
    pub fn scan(&self, files: &[BotFile]) -> RiskReport {
        let mut report = RiskReport::default();
        for file in files {
            let content = file.content.to_lowercase();
            for rule in &self.rules {
                if rule.pattern.is_match(&content) {
                    report.score += rule.weight;
                    report.reasons.push(format!("{} in {}", rule.reason, file.name));
                }
            }
            if content.lines().count() > self.oversize_lines {
                report.score += self.oversize_weight;
                report.reasons.push(format!("oversized file {}", file.name));
            }
        }
        report
    }

    pub fn is_suspicious(&self, report: &RiskReport) -> bool {
        report.score >= self.threshold
    }
}

/// Runtime quota thresholds, from `MEMORY_MAX` / `CPU_QUOTA`.
#[derive(Debug, Clone, Copy)]
pub struct QuotaLimits {
    pub memory_mb: u64,
    pub cpu_pct: f32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self { memory_mb: 128, cpu_pct: 50.0 }
    }
}

/// One sampler observation for a supervised child.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSample {
    pub memory_bytes: u64,
    pub cpu_pct: f32,
}

/// Runtime arm of RADAR: judge one sample against the quotas.
///
/// Returns the breach reason, or `None` when the sample is within limits.
pub fn check_quota(limits: &QuotaLimits, sample: &ResourceSample) -> Option<String> {
    let used_mb = sample.memory_bytes / (1024 * 1024);
    if sample.memory_bytes > limits.memory_mb * 1024 * 1024 {
        return Some(format!(
            "Memory usage exceeded: {}MB used, limit {}MB",
            used_mb, limits.memory_mb
        ));
    }
    if sample.cpu_pct > limits.cpu_pct {
        return Some(format!(
            "CPU usage exceeded: {:.1}% used, limit {:.0}%",
            sample.cpu_pct, limits.cpu_pct
        ));
    }
    None
}

#[cfg(test)]
#[path = "radar_tests.rs"]
mod tests;
