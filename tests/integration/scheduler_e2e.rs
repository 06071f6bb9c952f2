//! End-to-end scheduler behavior on a paused clock.

use crate::helpers::{
    BrokenStore, Registry, ScriptedProvider, harness, local, two_provider_config,
};
use rekindle::clock::Clock;
use rekindle::commands::ACK_REPLY;
use rekindle::host::{HistoryTurn, MemoryConversationStore};
use rekindle::scheduler::ScannerState;
use rekindle::{InboundEvent, SessionKey};
use std::sync::Arc;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

fn registry() -> (Registry, Arc<ScriptedProvider>, Arc<ScriptedProvider>) {
    let topic = ScriptedProvider::replying("topic", "I watched the rain all afternoon");
    let chat = ScriptedProvider::replying("chat", "It rained all day here, how was yours?");
    let registry = Registry::default().with(topic.clone()).with(chat.clone());
    (registry, topic, chat)
}

#[tokio::test(start_paused = true)]
async fn idle_session_gets_exactly_one_delivery() {
    let (registry, _, _) = registry();
    let h = harness(
        two_provider_config(),
        registry,
        Arc::new(MemoryConversationStore::default()),
        local(14, 0),
        0,
    );
    let key = SessionKey::new("webchat:FriendMessage:alice");
    let start = h.clock.now_utc();
    h.scheduler
        .tracker()
        .record_activity(key.clone(), start - chrono::Duration::hours(25));

    let handle = h.scheduler.start().unwrap();
    tokio::time::sleep(HOUR + Duration::from_secs(60)).await;

    assert_eq!(
        h.sink.sent(),
        vec![(key.clone(), "It rained all day here, how was yours?".to_owned())]
    );
    let reset = h.scheduler.tracker().last_active(&key).unwrap();
    assert!(reset >= start + chrono::Duration::hours(1));
    assert!(reset < start + chrono::Duration::minutes(61));

    tokio::time::sleep(5 * HOUR).await;
    assert_eq!(h.sink.sent().len(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn session_detected_in_quiet_hours_is_delivered_after_window() {
    let (registry, _, chat) = registry();
    let h = harness(
        two_provider_config(),
        registry,
        Arc::new(MemoryConversationStore::default()),
        local(2, 0),
        120,
    );
    let key = SessionKey::new("telegram:bob");
    h.scheduler
        .tracker()
        .record_activity(key.clone(), h.clock.now_utc() - chrono::Duration::hours(30));

    let handle = h.scheduler.start().unwrap();

    // Detected on the 03:00 tick, deferred to 10:02.
    tokio::time::sleep(Duration::from_secs(7 * 3600 + 59 * 60)).await;
    assert!(h.clock.now_local() < local(10, 0));
    assert!(h.sink.sent().is_empty());
    assert!(chat.calls().is_empty());
    let detected_at = h.scheduler.tracker().last_active(&key).unwrap();
    assert!(detected_at.naive_utc() >= local(3, 0));
    assert!(detected_at.naive_utc() < local(3, 1));

    tokio::time::sleep(Duration::from_secs(4 * 60)).await;
    assert_eq!(h.sink.sent().len(), 1);
    // Ticks during the deferral never picked the session again.
    assert_eq!(h.scheduler.tracker().last_active(&key), Some(detected_at));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_topic_phase_makes_no_chat_call() {
    let chat = ScriptedProvider::replying("chat", "unused");
    let registry = Registry::default()
        .with(ScriptedProvider::failing("topic", "upstream 503"))
        .with(chat.clone());
    let h = harness(
        two_provider_config(),
        registry,
        Arc::new(MemoryConversationStore::default()),
        local(14, 0),
        0,
    );
    h.scheduler.tracker().record_activity(
        SessionKey::new("s1"),
        h.clock.now_utc() - chrono::Duration::hours(48),
    );

    assert_eq!(h.scheduler.scan_now().unwrap().len(), 1);
    h.scheduler.drain_dispatches().await;

    assert!(chat.calls().is_empty());
    assert!(h.sink.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn history_failure_still_delivers_with_placeholder() {
    let (registry, _, chat) = registry();
    let h = harness(
        two_provider_config(),
        registry,
        Arc::new(BrokenStore),
        local(14, 0),
        0,
    );
    h.scheduler.tracker().record_activity(
        SessionKey::new("s1"),
        h.clock.now_utc() - chrono::Duration::hours(48),
    );

    h.scheduler.scan_now().unwrap();
    h.scheduler.drain_dispatches().await;

    assert_eq!(h.sink.sent().len(), 1);
    let prompt = &chat.calls()[0];
    assert!(prompt.contains("no history available"));
    assert!(prompt.contains("I watched the rain all afternoon"));
}

#[tokio::test(start_paused = true)]
async fn chat_prompt_sees_last_five_turns() {
    let (registry, _, chat) = registry();
    let store = Arc::new(MemoryConversationStore::default());
    let key = SessionKey::new("s1");
    for i in 1..=7 {
        store.append(&key, HistoryTurn::user(format!("question {i}")));
        store.append(&key, HistoryTurn::assistant(format!("answer {i}")));
    }
    let h = harness(two_provider_config(), registry, store, local(14, 0), 0);
    h.scheduler
        .tracker()
        .record_activity(key, h.clock.now_utc() - chrono::Duration::hours(48));

    h.scheduler.scan_now().unwrap();
    h.scheduler.drain_dispatches().await;

    let prompt = &chat.calls()[0];
    assert!(prompt.contains("You: answer 5\nUser: question 6\nYou: answer 6\nUser: question 7\nYou: answer 7"));
    assert!(!prompt.contains("question 5"));
    assert!(prompt.contains("about 24 hours"));
}

#[tokio::test(start_paused = true)]
async fn stopping_the_scanner_leaves_dispatches_running() {
    let chat = ScriptedProvider::delayed("chat", "sorry I was slow", 2 * HOUR);
    let registry = Registry::default()
        .with(ScriptedProvider::replying("topic", "I lost my keys"))
        .with(chat);
    let h = harness(
        two_provider_config(),
        registry,
        Arc::new(MemoryConversationStore::default()),
        local(14, 0),
        0,
    );
    h.scheduler.tracker().record_activity(
        SessionKey::new("s1"),
        h.clock.now_utc() - chrono::Duration::hours(25),
    );

    let handle = h.scheduler.start().unwrap();
    tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
    assert_eq!(h.scheduler.dispatches().len(), 1);

    let mut state = handle.subscribe();
    handle.shutdown().await;
    assert_eq!(*state.borrow_and_update(), ScannerState::Stopped);
    assert!(h.sink.sent().is_empty());

    h.scheduler.drain_dispatches().await;
    assert_eq!(h.sink.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_trigger_inside_quiet_window_produces_text() {
    let (registry, topic, _) = registry();
    let h = harness(
        two_provider_config(),
        registry,
        Arc::new(MemoryConversationStore::default()),
        local(3, 0),
        0,
    );
    let event = InboundEvent {
        sender_id: "admin".to_owned(),
        session: SessionKey::new("telegram:admin"),
        platform: "telegram".to_owned(),
        is_admin: true,
        text: "/rekindle_talk".to_owned(),
    };

    let reply = h.scheduler.manual_trigger(&event).await;
    assert_eq!(
        reply.lines,
        vec![
            ACK_REPLY.to_owned(),
            "It rained all day here, how was yours?".to_owned()
        ]
    );
    assert_eq!(topic.calls().len(), 1);
    // Replies go back to the sender, not through the proactive sink.
    assert!(h.sink.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn fresh_activity_postpones_selection() {
    let (registry, _, _) = registry();
    let h = harness(
        two_provider_config(),
        registry,
        Arc::new(MemoryConversationStore::default()),
        local(14, 0),
        0,
    );
    let event = InboundEvent {
        sender_id: "guest".to_owned(),
        session: SessionKey::new("webchat:guest"),
        platform: "webchat".to_owned(),
        is_admin: false,
        text: "hi".to_owned(),
    };
    assert!(h.scheduler.observe(&event));

    tokio::time::sleep(23 * HOUR).await;
    assert!(h.scheduler.scan_now().unwrap().is_empty());

    tokio::time::sleep(2 * HOUR).await;
    assert_eq!(h.scheduler.scan_now().unwrap(), vec![SessionKey::new("webchat:guest")]);
    h.scheduler.drain_dispatches().await;
    assert_eq!(h.sink.sent().len(), 1);
}
