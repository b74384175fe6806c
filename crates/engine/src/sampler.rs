// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-handle resource sampling.
//!
//! A recurring task polls the OS for the child's CPU percent and
//! resident memory, rewrites the bot's textual gauges, and applies the
//! runtime arm of RADAR. The task cancels itself when the process
//! vanishes; the supervisor cancels it on stop and exit.

use crate::radar::{check_quota, ResourceSample};
use crate::supervisor::Supervisor;
use bh_core::{format_cpu, format_memory, format_uptime, BotId, BotPatch, LogLevel};
use std::sync::Arc;
use std::time::Instant;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tokio_util::sync::CancellationToken;

pub(crate) fn spawn(
    supervisor: Arc<Supervisor>,
    bot_id: BotId,
    pid: u32,
    started_at: Instant,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut system = System::new();
        let mut ticker = tokio::time::interval(supervisor.config.sample_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first interval tick completes immediately; consume it so
        // the first CPU reading has a full interval behind it.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(sample) = read_sample(&mut system, pid) else {
                        tracing::debug!(bot_id = %bot_id, pid, "sampled process vanished");
                        break;
                    };

                    let patch = BotPatch {
                        memory: Some(format_memory(sample.memory_bytes)),
                        cpu: Some(format_cpu(sample.cpu_pct)),
                        uptime: Some(format_uptime(started_at.elapsed())),
                        ..BotPatch::default()
                    };
                    if let Err(e) = supervisor.store().update_bot(&bot_id, patch).await {
                        tracing::warn!(bot_id = %bot_id, error = %e, "gauge patch failed");
                    }

                    if let Some(reason) = check_quota(&supervisor.config.limits, &sample) {
                        supervisor
                            .record_log(
                                bot_id,
                                LogLevel::Error,
                                &format!("RADAR: {}. Bot terminated.", reason),
                                None,
                            )
                            .await;
                        supervisor.kill_for_abuse(&bot_id);
                        break;
                    }
                }
            }
        }
    });
}

fn read_sample(system: &mut System, pid: u32) -> Option<ResourceSample> {
    let pid = Pid::from_u32(pid);
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_cpu().with_memory(),
    );
    let process = system.process(pid)?;
    Some(ResourceSample { memory_bytes: process.memory(), cpu_pct: process.cpu_usage() })
}
