// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heuristic dependency inference.
//!
//! Runs only when the materialized workspace lacks the runtime's
//! manifest. Sources are scanned line by line, lower-cased, against
//! marker tables; the union of matched pins becomes the synthesized
//! manifest. A workspace with runtime sources but no recognized imports
//! still gets the baseline chat library.

use crate::workspace::collect_sources;
use bh_core::RuntimeKind;
use std::path::Path;

/// Python marker row: any marker substring on a line adds the pin.
#[derive(Debug, Clone)]
pub struct PinRule {
    pub markers: Vec<String>,
    pub pin: String,
}

/// Node marker row: any marker substring adds the package@version pair.
#[derive(Debug, Clone)]
pub struct PackageRule {
    pub markers: Vec<String>,
    pub package: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct DependencyRules {
    pub python: Vec<PinRule>,
    pub python_baseline: String,
    pub node: Vec<PackageRule>,
    pub node_baseline: (String, String),
}

fn pin(markers: &[&str], pin: &str) -> PinRule {
    PinRule { markers: markers.iter().map(|m| m.to_string()).collect(), pin: pin.to_string() }
}

fn pkg(markers: &[&str], package: &str, version: &str) -> PackageRule {
    PackageRule {
        markers: markers.iter().map(|m| m.to_string()).collect(),
        package: package.to_string(),
        version: version.to_string(),
    }
}

impl Default for DependencyRules {
    fn default() -> Self {
        Self {
            python: vec![
                pin(&["discord.py", "import discord", "from discord"], "discord.py>=2.3.0"),
                pin(&["aiohttp"], "aiohttp>=3.8.0"),
                pin(&["requests"], "requests>=2.28.0"),
                pin(&["dotenv", "python-dotenv"], "python-dotenv>=0.19.0"),
                pin(&["pymysql", "mysql"], "pymysql>=1.0.0"),
                pin(&["psycopg", "postgres"], "psycopg2-binary>=2.9.0"),
            ],
            python_baseline: "discord.py>=2.3.0".to_string(),
            node: vec![
                pkg(&["discord.js"], "discord.js", "^14.0.0"),
                pkg(&["@discordjs/builders"], "@discordjs/builders", "^1.0.0"),
                pkg(&["@discordjs/rest"], "@discordjs/rest", "^2.0.0"),
                pkg(&["@discordjs/voice"], "@discordjs/voice", "^0.17.0"),
                pkg(&["dotenv"], "dotenv", "^16.0.0"),
                pkg(&["axios"], "axios", "^1.6.0"),
                pkg(&["fs-extra"], "fs-extra", "^11.0.0"),
                pkg(&["moment"], "moment", "^2.29.0"),
                pkg(&["lodash"], "lodash", "^4.17.0"),
                pkg(&["sqlite3"], "sqlite3", "^5.1.0"),
                pkg(&["mysql"], "mysql2", "^3.9.0"),
                pkg(&["mongodb", "mongoose"], "mongodb", "^6.0.0"),
            ],
            node_baseline: ("discord.js".to_string(), "^14.0.0".to_string()),
        }
    }
}

/// What `ensure_manifest` found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestOutcome {
    /// The user supplied a manifest; nothing synthesized.
    Present,
    /// A manifest was synthesized with this many dependency entries.
    Generated { entries: usize },
    /// No runtime sources exist; no manifest written.
    NoSources,
}

/// Synthesize the runtime's manifest in `dir` unless one already exists.
pub fn ensure_manifest(
    dir: &Path,
    runtime: RuntimeKind,
    bot_name: &str,
    rules: &DependencyRules,
) -> std::io::Result<ManifestOutcome> {
    let manifest = dir.join(runtime.manifest_file());
    if manifest.is_file() {
        return Ok(ManifestOutcome::Present);
    }

    let sources = collect_sources(dir, runtime.extensions())?;
    if sources.is_empty() {
        return Ok(ManifestOutcome::NoSources);
    }

    let mut contents = Vec::new();
    for source in &sources {
        contents.push(std::fs::read_to_string(dir.join(source))?);
    }

    match runtime {
        RuntimeKind::Python => {
            let pins = infer_python(&contents, rules);
            let entries = pins.len();
            std::fs::write(&manifest, pins.join("\n") + "\n")?;
            Ok(ManifestOutcome::Generated { entries })
        }
        RuntimeKind::Node => {
            let packages = infer_node(&contents, rules);
            let entries = packages.len();
            let mut dependencies = serde_json::Map::new();
            for (package, version) in packages {
                dependencies.insert(package, serde_json::Value::String(version));
            }
            let manifest_json = serde_json::json!({
                "name": sanitize_package_name(bot_name),
                "version": "1.0.0",
                "main": "index.js",
                "dependencies": dependencies,
            });
            std::fs::write(&manifest, serde_json::to_string_pretty(&manifest_json)? + "\n")?;
            Ok(ManifestOutcome::Generated { entries })
        }
    }
}

/// Union of matched Python pins in table order, baseline when empty.
fn infer_python(contents: &[String], rules: &DependencyRules) -> Vec<String> {
    let mut pins = Vec::new();
    for content in contents {
        for line in content.lines() {
            let line = line.to_lowercase();
            for rule in &rules.python {
                if rule.markers.iter().any(|m| line.contains(m.as_str()))
                    && !pins.contains(&rule.pin)
                {
                    pins.push(rule.pin.clone());
                }
            }
        }
    }
    if pins.is_empty() {
        pins.push(rules.python_baseline.clone());
    }
    pins
}

/// Union of matched Node packages in table order, baseline when empty.
fn infer_node(contents: &[String], rules: &DependencyRules) -> Vec<(String, String)> {
    let mut packages: Vec<(String, String)> = Vec::new();
    for content in contents {
        for line in content.lines() {
            let line = line.to_lowercase();
            for rule in &rules.node {
                if rule.markers.iter().any(|m| line.contains(m.as_str()))
                    && !packages.iter().any(|(p, _)| p == &rule.package)
                {
                    packages.push((rule.package.clone(), rule.version.clone()));
                }
            }
        }
    }
    if packages.is_empty() {
        let (package, version) = rules.node_baseline.clone();
        packages.push((package, version));
    }
    packages
}

/// npm-safe package name: lower-cased, spaces collapsed to hyphens,
/// anything else non-alphanumeric dropped.
fn sanitize_package_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "bot".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[path = "deps_tests.rs"]
mod tests;
