//! Short-term-memory tier roll-over through the service facade.

use std::time::Duration;

use recall_core::config::{MemoryConfig, StmConfig};
use recall_core::types::Role;
use recall_e2e_tests::harness_with;

fn tiny_stm_config() -> MemoryConfig {
    MemoryConfig {
        stm: StmConfig {
            tier1_max_turns: 2,
            tier2_summary_turns: 3,
            tier3_summary_turns: 10_000,
            ttl: Duration::from_secs(60),
        },
        ..MemoryConfig::default()
    }
}

#[tokio::test]
async fn seven_appends_roll_through_the_tiers() {
    let h = harness_with(tiny_stm_config(), vec![]);

    let turns = [
        (Role::User, "A"),
        (Role::Assistant, "B"),
        (Role::User, "C"),
        (Role::Assistant, "D"),
        (Role::User, "E"),
        (Role::Assistant, "F"),
        (Role::User, "G"),
    ];
    for (role, content) in turns {
        h.service
            .add_message("s1", "u1", role, content)
            .await
            .unwrap();
    }

    let context = h.service.stm_context("s1").await;

    // Exactly the last two turns stay verbatim.
    let tier1: Vec<&str> = context
        .tier1_active
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(tier1, vec!["F", "G"]);

    // The overflow that has not yet hit the summarisation threshold.
    let buffered: Vec<&str> = context
        .tier2_recent
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(buffered, vec!["D", "E"]);

    // The first batch of three was summarised.
    assert_eq!(context.tier2_recent.summary.as_deref(), Some("A B C"));
    assert!(context.tier3_session.summary.is_none());
}

#[tokio::test]
async fn bounds_hold_across_a_long_conversation() {
    let h = harness_with(tiny_stm_config(), vec![]);

    for i in 0..60 {
        let content = format!("turn number {i} with some additional padding text");
        h.service
            .add_message("s1", "u1", Role::User, &content)
            .await
            .unwrap();

        let context = h.service.stm_context("s1").await;
        assert!(context.tier1_active.messages.len() <= 2);
        if let Some(summary) = &context.tier2_recent.summary {
            assert!(summary.chars().count() <= 1000);
        }
        if let Some(summary) = &context.tier3_session.summary {
            assert!(summary.chars().count() <= 1000);
        }
    }
}

#[tokio::test]
async fn sessions_are_isolated() {
    let h = harness_with(tiny_stm_config(), vec![]);
    h.service
        .add_message("s1", "u1", Role::User, "only in session one")
        .await
        .unwrap();

    let other = h.service.stm_context("s2").await;
    assert!(other.tier1_active.messages.is_empty());
}

#[tokio::test]
async fn state_expires_with_its_ttl() {
    let config = MemoryConfig {
        stm: StmConfig {
            ttl: Duration::from_millis(30),
            ..StmConfig::default()
        },
        ..MemoryConfig::default()
    };
    let h = harness_with(config, vec![]);

    h.service
        .add_message("s1", "u1", Role::User, "ephemeral")
        .await
        .unwrap();
    assert_eq!(h.service.stm_context("s1").await.tier1_active.messages.len(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.service.stm_context("s1").await.tier1_active.messages.is_empty());
}

#[tokio::test]
async fn messages_keep_roles_and_order() {
    let h = harness_with(MemoryConfig::default(), vec![]);
    h.service
        .add_message("s1", "u1", Role::User, "first")
        .await
        .unwrap();
    h.service
        .add_message("s1", "u1", Role::Assistant, "second")
        .await
        .unwrap();

    let context = h.service.stm_context("s1").await;
    let messages = &context.tier1_active.messages;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "first");
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].content, "second");
    assert_eq!(messages[1].role, Role::Assistant);
}
