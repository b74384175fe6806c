// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful-stop escalation specs.

use super::helpers::*;
use bh_core::{BotId, BotStatus, RuntimeKind, UserId};
use std::time::{Duration, Instant};

#[tokio::test]
async fn stop_escalates_to_sigkill_within_grace() {
    let host = Host::with_stub(STUBBORN_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Node).await;
    host.seed_file("b1", "index.js", "console.log('hi');\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    assert!(host.engine.start(&id, &user).await.ok);
    assert!(host.wait_status("b1", BotStatus::Running).await);
    let pid = host.bot_pid("b1").await.unwrap();
    assert!(pid_alive(pid));

    // The stub traps SIGTERM; stop must escalate and still return
    // within the 5s grace plus the kill window.
    let begin = Instant::now();
    let outcome = host.engine.stop(&id, &user).await;
    assert!(outcome.ok);
    assert!(begin.elapsed() < Duration::from_millis(6500), "took {:?}", begin.elapsed());

    assert!(!host.engine.is_running(&id));
    assert_eq!(host.bot_status("b1").await, BotStatus::Stopped);
    assert!(host.bot_pid("b1").await.is_none());
    assert!(!pid_alive(pid));
    assert!(!host.workspace_dir("b1").exists());
}

#[tokio::test]
async fn polite_child_stops_quickly() {
    let host = Host::with_stub(READY_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "print('hi')\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    assert!(host.engine.start(&id, &user).await.ok);
    assert!(host.wait_status("b1", BotStatus::Running).await);
    let pid = host.bot_pid("b1").await.unwrap();

    let begin = Instant::now();
    assert!(host.engine.stop(&id, &user).await.ok);
    // SIGTERM is honored, no escalation needed.
    assert!(begin.elapsed() < Duration::from_secs(3), "took {:?}", begin.elapsed());
    assert_eq!(host.bot_status("b1").await, BotStatus::Stopped);
    assert!(!pid_alive(pid));
}

#[tokio::test]
async fn stop_twice_is_idempotent() {
    let host = Host::with_stub(READY_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "print('hi')\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    assert!(host.engine.start(&id, &user).await.ok);
    assert!(host.engine.stop(&id, &user).await.ok);
    assert!(host.engine.stop(&id, &user).await.ok);
    assert_eq!(host.bot_status("b1").await, BotStatus::Stopped);
}
