// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delete cascade specs.

use super::helpers::*;
use bh_core::{BotId, BotStatus, RuntimeKind, StatusMessage, UserId};
use bh_storage::BotStore;

#[tokio::test]
async fn delete_running_bot_stops_and_cascades() {
    let host = Host::with_stub(READY_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "print('hi')\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    assert!(host.engine.start(&id, &user).await.ok);
    assert!(host.wait_status("b1", BotStatus::Running).await);
    let pid = host.bot_pid("b1").await.unwrap();
    let mut status_rx = host.bus.subscribe_status(user);

    let outcome = host.engine.delete(&id, &user).await;
    assert!(outcome.ok, "{}", outcome.message);

    // Process gone, workspace gone, rows gone.
    assert!(!host.engine.is_running(&id));
    assert!(!pid_alive(pid));
    assert!(!host.workspace_dir("b1").exists());
    assert!(host.store.get_bot(&id).await.unwrap().is_none());
    assert!(host.store.get_bot_files(&id).await.unwrap().is_empty());
    assert!(host.store.get_bot_logs(&id, 100).await.unwrap().is_empty());

    // The owner's channel hears the stop, then the deletion.
    let timeout = std::time::Duration::from_secs(5);
    let first = tokio::time::timeout(timeout, status_rx.recv()).await.unwrap().unwrap();
    assert_eq!(first, StatusMessage::status_update(id, BotStatus::Stopped));
    let second = tokio::time::timeout(timeout, status_rx.recv()).await.unwrap().unwrap();
    assert_eq!(second, StatusMessage::deleted(id));
}

#[tokio::test]
async fn delete_stopped_bot_cascades_without_stop() {
    let host = Host::with_stub(READY_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "print('hi')\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    let outcome = host.engine.delete(&id, &user).await;
    assert!(outcome.ok);
    assert!(host.store.get_bot(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_requires_ownership() {
    let host = Host::with_stub(READY_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;

    let outcome = host.engine.delete(&BotId::from_string("b1"), &UserId::from_string("other")).await;
    assert!(!outcome.ok);
    assert!(host.store.get_bot(&BotId::from_string("b1")).await.unwrap().is_some());
}
