//! Integration test for automatic registration through the process-wide
//! construction hook. Kept to a single test: the hook can only be
//! installed once per process.

mod helpers;

use std::sync::Arc;
use std::thread;

use harmony_core::error::ErrorKind;
use harmony_events::{
    HandlerClass, RegisteredListener, ScopeKey, ScopeOptions, install_construction_hook,
};
use harmony_hotswap::{HarmonyPlugin, ReloadChannel, ShapeContract};
use harmony_worker::ImmediateScheduler;

#[test]
fn test_constructed_managers_are_reconciled() {
    let channel = Arc::new(ReloadChannel::new());
    let scheduler = ImmediateScheduler::new();
    let plugin = Arc::new(HarmonyPlugin::new(
        channel.clone(),
        Arc::new(scheduler.clone()),
        ShapeContract::default(),
    ));

    assert!(!plugin.is_hook_installed());
    install_construction_hook(plugin.clone()).expect("first install succeeds");

    let handles: Vec<_> = (0..8)
        .map(|_| thread::spawn(|| helpers::chat_manager("demo")))
        .collect();
    let managers: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("builder thread"))
        .collect();

    assert!(plugin.is_hook_installed());
    assert_eq!(channel.subscriber_count(), 1);
    assert_eq!(plugin.registry().len(), managers.len());
    for manager in &managers {
        assert!(plugin.registry().contains(manager.id()));
    }

    let v1 = HandlerClass::define("demo.ChatListener");
    let manager = &managers[0];
    let original: RegisteredListener = helpers::chat_listener(&v1);
    manager
        .register_scope("lobby", ScopeOptions::validate().with_listener(original.clone()))
        .expect("lobby registers");

    let v2 = v1.redefine();
    let swapped = original.with_handler(helpers::chat_listener(&v2).handle().clone());
    manager
        .scope(&ScopeKey::from("lobby"))
        .expect("lobby scope")
        .replace(original.id(), swapped.clone())
        .expect("original present");

    channel.publish(v2);

    assert_eq!(scheduler.executor().completed(), 1);
    assert!(manager.is_routed(swapped.id()));

    let err = install_construction_hook(plugin).expect_err("second install fails");
    assert_eq!(err.kind, ErrorKind::Conflict);
}
