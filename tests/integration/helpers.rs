//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use harmony_events::{
    Event, EventHandler, FnHandler, HandlerClass, HarmonyEventManager, RegisteredListener,
    ScopeKey,
};

/// Event type every test manager maps.
pub const CHAT: &str = "chat";

/// Builds a manager mapping `chat` events to the scope named by their
/// `world` field. Runs the construction hook if one is installed.
pub fn chat_manager(plugin: &str) -> Arc<HarmonyEventManager> {
    HarmonyEventManager::builder(plugin)
        .mapping(CHAT, |e| e.get_string("world").map(ScopeKey::from))
        .build()
}

/// Builds a manager meant to be attached as a child of a [`chat_manager`]
/// scope. `chat` events go to the child scope named by their `member`
/// field.
pub fn member_manager(plugin: &str) -> Arc<HarmonyEventManager> {
    HarmonyEventManager::builder(plugin)
        .parent_event_mapping(CHAT, |_, e| e.get_string("member").map(ScopeKey::from))
        .build()
}

/// A `chat` event posted to `world` and addressed to `member`.
pub fn member_event(world: &str, member: &str) -> Event {
    chat_event(world).with_string("member", member)
}

/// A `chat` event posted to `world`.
pub fn chat_event(world: &str) -> Event {
    Event::new(CHAT).with_string("world", world)
}

/// Handler of `class` counting every event it receives.
pub fn counting_handler(class: &HandlerClass, hits: &Arc<AtomicUsize>) -> Arc<dyn EventHandler> {
    let hits = Arc::clone(hits);
    FnHandler::new(class.clone(), move |_| {
        hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .into_handler()
}

/// A `chat` listener of `class` that ignores every event.
pub fn chat_listener(class: &HandlerClass) -> RegisteredListener {
    RegisteredListener::new("demo", CHAT, FnHandler::noop(class.clone()).into_handler())
}
