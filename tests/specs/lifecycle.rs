// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Start/stop/restart lifecycle specs with live child processes.

use super::helpers::*;
use bh_core::{BotId, BotStatus, RuntimeKind, StatusMessage, UserId};

#[tokio::test]
async fn happy_python_start_reaches_running() {
    let host = Host::with_stub(READY_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file(
        "b1",
        "bot.py",
        "import discord\nclient = discord.Client(intents=discord.Intents.default())\nclient.run(\"YOUR_BOT_TOKEN\")\n",
    )
    .await;
    let mut status_rx = host.bus.subscribe_status(UserId::from_string("u1"));

    let outcome = host.engine.start(&BotId::from_string("b1"), &UserId::from_string("u1")).await;
    assert!(outcome.ok, "{}", outcome.message);

    // Workspace holds the substituted source and an inferred manifest.
    let materialized = std::fs::read_to_string(host.workspace_dir("b1").join("bot.py")).unwrap();
    assert!(materialized.contains("client.run(\"T\")"));
    let manifest = std::fs::read_to_string(host.workspace_dir("b1").join("requirements.txt")).unwrap();
    assert!(manifest.contains("discord.py>=2.3.0"));

    // The stdout ready marker promotes starting → running.
    assert!(host.wait_status("b1", BotStatus::Running).await);
    assert!(host.engine.is_running(&BotId::from_string("b1")));
    assert!(host.bot_pid("b1").await.is_some());

    // Broadcasts arrive in transition order.
    let bot_id = BotId::from_string("b1");
    assert_eq!(
        status_rx.recv().await.unwrap(),
        StatusMessage::status_update(bot_id, BotStatus::Starting)
    );
    assert_eq!(
        status_rx.recv().await.unwrap(),
        StatusMessage::status_update(bot_id, BotStatus::Running)
    );

    let stopped = host.engine.stop(&bot_id, &UserId::from_string("u1")).await;
    assert!(stopped.ok);
    assert_eq!(host.bot_status("b1").await, BotStatus::Stopped);
    assert!(!host.workspace_dir("b1").exists());
}

#[tokio::test]
async fn clean_exit_maps_to_stopped() {
    let host = Host::with_stub(CLEAN_EXIT_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "print('hi')\n").await;

    let outcome = host.engine.start(&BotId::from_string("b1"), &UserId::from_string("u1")).await;
    assert!(outcome.ok);

    assert!(host.wait_status("b1", BotStatus::Stopped).await);
    assert!(!host.engine.is_running(&BotId::from_string("b1")));
    assert!(host.bot_pid("b1").await.is_none());
}

#[tokio::test]
async fn nonzero_exit_maps_to_error_with_stderr_preserved() {
    let host = Host::with_stub(FAIL_EXIT_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "print('hi')\n").await;

    let outcome = host.engine.start(&BotId::from_string("b1"), &UserId::from_string("u1")).await;
    assert!(outcome.ok);

    assert!(host.wait_status("b1", BotStatus::Error).await);
    assert!(host.bot_pid("b1").await.is_none());

    let logs = host
        .engine
        .read_logs(&BotId::from_string("b1"), &UserId::from_string("u1"), None)
        .await
        .unwrap();
    assert!(logs.iter().any(|l| l.message.contains("boom: config missing")));
    assert!(logs.iter().any(|l| l.message.contains("exited with code 3")));
}

#[tokio::test]
async fn second_start_reports_already_running() {
    let host = Host::with_stub(READY_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "print('hi')\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    assert!(host.engine.start(&id, &user).await.ok);
    let second = host.engine.start(&id, &user).await;
    assert!(!second.ok);
    assert!(second.message.contains("already running"));

    host.engine.stop(&id, &user).await;
}

#[tokio::test]
async fn concurrent_starts_spawn_at_most_one_process() {
    let host = Host::with_stub(READY_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "print('hi')\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    let (a, b) = tokio::join!(host.engine.start(&id, &user), host.engine.start(&id, &user));
    assert!(a.ok != b.ok, "exactly one start wins: {:?} / {:?}", a.message, b.message);
    assert!(host.engine.is_running(&id));

    host.engine.stop(&id, &user).await;
}

#[tokio::test]
async fn restart_surfaces_start_result() {
    let host = Host::with_stub(READY_STUB);
    host.seed_bot("b1", "u1", "T", RuntimeKind::Node).await;
    host.seed_file("b1", "index.js", "console.log('hi');\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    assert!(host.engine.start(&id, &user).await.ok);
    assert!(host.wait_status("b1", BotStatus::Running).await);
    let first_pid = host.bot_pid("b1").await.unwrap();

    let outcome = host.engine.restart(&id, &user).await;
    assert!(outcome.ok, "{}", outcome.message);
    assert!(host.engine.is_running(&id));
    assert!(host.wait_bot("b1", |bot| bot.pid.is_some_and(|pid| pid != first_pid)).await);

    host.engine.stop(&id, &user).await;
}

#[tokio::test]
async fn failed_install_does_not_block_start() {
    let host = Host::with_stub_and(READY_STUB, |mut config| {
        config.pip_bin = "false".to_string();
        config.pip_alt_bin = "false".to_string();
        config
    });
    host.seed_bot("b1", "u1", "T", RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "import discord\nprint('hi')\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    // Every pip attempt exits nonzero; the start proceeds anyway.
    let outcome = host.engine.start(&id, &user).await;
    assert!(outcome.ok, "{}", outcome.message);
    assert!(host.wait_status("b1", BotStatus::Running).await);

    let logs = host.engine.read_logs(&id, &user, None).await.unwrap();
    assert!(logs.iter().any(|l| l.message.contains("Dependency installation failed")));

    host.engine.stop(&id, &user).await;
}
