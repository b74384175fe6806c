// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential non-leakage: a child that echoes its environment must not
//! surface the token in stored logs or pushed messages.

use super::helpers::*;
use bh_core::{BotId, BotStatus, RuntimeKind, UserId};
use bh_storage::BotStore;

const TOKEN: &str = "sekrit-tok-42";

#[tokio::test]
async fn echoed_credential_is_redacted_everywhere() {
    let host = Host::with_stub(ENV_ECHO_STUB);
    host.seed_bot("b1", "u1", TOKEN, RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "print('hi')\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");
    let mut log_rx = host.bus.subscribe_logs(id);

    assert!(host.engine.start(&id, &user).await.ok);
    assert!(host.wait_status("b1", BotStatus::Running).await);

    // Stored records: the echoed line is present, the token is not.
    let logs = host.engine.read_logs(&id, &user, None).await.unwrap();
    assert!(logs.iter().any(|l| l.message.contains("my token is")));
    assert!(logs.iter().all(|l| !l.message.contains(TOKEN)));
    assert!(logs.iter().any(|l| l.message.contains("[REDACTED]")));

    // Pushed messages: same guarantee on the live channel.
    let mut saw_echo = false;
    while let Ok(msg) = log_rx.try_recv() {
        assert!(!msg.message.contains(TOKEN), "token leaked: {}", msg.message);
        if msg.message.contains("my token is") {
            saw_echo = true;
        }
    }
    assert!(saw_echo, "echo line never reached the log channel");

    host.engine.stop(&id, &user).await;
}

#[tokio::test]
async fn persisted_file_keeps_placeholder_after_start() {
    let host = Host::with_stub(READY_STUB);
    host.seed_bot("b1", "u1", TOKEN, RuntimeKind::Python).await;
    host.seed_file("b1", "bot.py", "client.run(\"YOUR_BOT_TOKEN\")\n").await;
    let id = BotId::from_string("b1");
    let user = UserId::from_string("u1");

    assert!(host.engine.start(&id, &user).await.ok);

    // The on-disk copy is substituted; the stored record is not.
    let on_disk = std::fs::read_to_string(host.workspace_dir("b1").join("bot.py")).unwrap();
    assert!(on_disk.contains(TOKEN));
    let stored = host.store.get_bot_files(&id).await.unwrap();
    assert!(stored[0].content.contains("YOUR_BOT_TOKEN"));
    assert!(!stored[0].content.contains(TOKEN));

    host.engine.stop(&id, &user).await;
}
