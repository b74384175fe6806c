// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RADAR specs: the static veto and the runtime abuse kill.

use super::helpers::*;
use bh_core::{BotId, BotStatus, RuntimeKind, UserId};
use bh_storage::BotStore;
use std::time::Duration;

#[tokio::test]
async fn static_veto_blocks_launch_before_materialization() {
    let host = Host::with_stub(READY_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file("b1", "miner.py", "# start mining bitcoin with gpu\nimport mining, hashrate\n")
        .await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    let outcome = host.engine.start(&id, &user).await;
    assert!(!outcome.ok);
    assert!(outcome.message.contains("RADAR"));

    assert_eq!(host.bot_status("b1").await, BotStatus::Error);
    assert!(!host.engine.is_running(&id));
    assert!(!host.workspace_dir("b1").exists(), "no workspace for a vetoed bot");

    let logs = host.engine.read_logs(&id, &user, None).await.unwrap();
    assert!(logs.iter().any(|l| l.message.contains("RADAR")));
}

#[tokio::test]
async fn runtime_breach_kills_within_a_tick() {
    // A zero-MB quota makes any live process a breach on the first
    // sample, so the test only depends on the kill path, not on the
    // stub's actual allocation pattern.
    let host = Host::with_stub_and(READY_STUB, |mut config| {
        config.limits.memory_mb = 0;
        config.sample_interval = Duration::from_millis(150);
        config
    });
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "print('hi')\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    assert!(host.engine.start(&id, &user).await.ok);

    assert!(host.wait_status("b1", BotStatus::Error).await);
    assert!(!host.engine.is_running(&id));
    assert!(host.bot_pid("b1").await.is_none());
    assert_eq!(host.store.get_bot(&id).await.unwrap().unwrap().memory, "0MB");

    let logs = host.engine.read_logs(&id, &user, None).await.unwrap();
    assert!(logs
        .iter()
        .any(|l| l.message.contains("RADAR") && l.message.contains("Memory usage exceeded")));
}

#[tokio::test]
async fn healthy_bot_survives_sampling() {
    let host = Host::with_stub_and(READY_STUB, |mut config| {
        config.sample_interval = Duration::from_millis(150);
        config
    });
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "print('hi')\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    assert!(host.engine.start(&id, &user).await.ok);
    assert!(host.wait_status("b1", BotStatus::Running).await);

    // Let several ticks pass; the gauges update and the bot stays up.
    assert!(host.wait_bot("b1", |bot| bot.memory != "0MB").await);
    assert!(host.engine.is_running(&id));

    host.engine.stop(&id, &user).await;
}
