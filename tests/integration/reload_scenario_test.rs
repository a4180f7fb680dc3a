//! Integration tests for the reload flow: redefine, notify, reconcile,
//! dispatch.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

use harmony_core::config::{ReloadConfig, WorkerConfig};
use harmony_events::{HandlerClass, RegisteredListener, ScopeKey, ScopeOptions};
use harmony_hotswap::{HarmonyPlugin, ReloadChannel, ShapeContract};
use harmony_worker::{ImmediateScheduler, WorkerRunner};

#[test]
fn test_redefined_listener_receives_events_after_reload() {
    let channel = Arc::new(ReloadChannel::new());
    let scheduler = ImmediateScheduler::new();
    let plugin = HarmonyPlugin::new(
        channel.clone(),
        Arc::new(scheduler.clone()),
        ShapeContract::default(),
    );

    let manager = helpers::chat_manager("demo");
    plugin.register_manager(manager.clone());

    let hits = Arc::new(AtomicUsize::new(0));
    let v1 = HandlerClass::define("demo.ChatListener");
    let unrelated = HandlerClass::define("demo.AuditListener");
    let original = RegisteredListener::new("demo", helpers::CHAT, helpers::counting_handler(&v1, &hits));
    let bystander = helpers::chat_listener(&unrelated);

    manager
        .register_scope("lobby", ScopeOptions::validate().with_listener(original.clone()))
        .expect("lobby registers");
    manager
        .register_scope("arena", ScopeOptions::validate().with_listener(bystander.clone()))
        .expect("arena registers");

    assert_eq!(manager.post(&helpers::chat_event("lobby")).delivered, 1);

    let v2 = v1.redefine();
    let before_swap = plugin.reconcile_now(&v2).expect("reconcile succeeds");
    assert!(!before_swap.found);

    let swapped = original.with_handler(helpers::counting_handler(&v2, &hits));
    manager
        .scope(&ScopeKey::from("lobby"))
        .expect("lobby scope")
        .replace(original.id(), swapped.clone())
        .expect("original listener present");

    assert_eq!(manager.post(&helpers::chat_event("lobby")).delivered, 0);

    assert_eq!(channel.publish(v2.clone()), 1);
    assert_eq!(scheduler.executor().completed(), 1);

    assert!(manager.is_routed(swapped.id()));
    assert!(manager.is_routed(bystander.id()));
    assert_eq!(manager.post(&helpers::chat_event("lobby")).delivered, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let report = plugin.reconcile_now(&v2).expect("reconcile succeeds");
    assert!(report.found);
    assert_eq!(report.refreshed, 1);
    assert_eq!(report.scopes, 2);
}

#[test]
fn test_redefined_child_scope_listener_is_routed_through_parent() {
    let channel = Arc::new(ReloadChannel::new());
    let scheduler = ImmediateScheduler::new();
    let plugin = HarmonyPlugin::new(
        channel.clone(),
        Arc::new(scheduler.clone()),
        ShapeContract::default(),
    );

    let parent = helpers::chat_manager("demo");
    let child = helpers::member_manager("demo");
    plugin.register_manager(parent.clone());
    plugin.register_manager(child.clone());

    let hits = Arc::new(AtomicUsize::new(0));
    let v1 = HandlerClass::define("demo.MemberListener");
    let original = RegisteredListener::new("demo", helpers::CHAT, helpers::counting_handler(&v1, &hits));
    child
        .register_scope("alice", ScopeOptions::validate().with_listener(original.clone()))
        .expect("alice registers");
    parent
        .register_scope("lobby", ScopeOptions::validate().with_child(child.clone()))
        .expect("lobby registers");

    let event = helpers::member_event("lobby", "alice");
    assert_eq!(parent.post(&event).delivered, 1);

    let v2 = v1.redefine();
    let swapped = original.with_handler(helpers::counting_handler(&v2, &hits));
    child
        .scope(&ScopeKey::from("alice"))
        .expect("alice scope")
        .replace(original.id(), swapped.clone())
        .expect("original listener present");

    assert_eq!(parent.post(&event).delivered, 0);

    channel.publish(v2.clone());
    assert_eq!(scheduler.executor().completed(), 1);

    assert!(parent.is_routed(swapped.id()));
    assert!(!parent.is_routed(original.id()));
    assert_eq!(parent.routed_count(), 1);
    assert_eq!(parent.post(&event).delivered, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let report = plugin.reconcile_now(&v2).expect("reconcile succeeds");
    assert!(report.found);
    assert_eq!(report.managers, 2);
}

#[test]
fn test_old_generation_is_not_reregistered() {
    let plugin = HarmonyPlugin::new(
        Arc::new(ReloadChannel::new()),
        Arc::new(ImmediateScheduler::new()),
        ShapeContract::default(),
    );
    let manager = helpers::chat_manager("demo");
    plugin.register_manager(manager.clone());

    let v1 = HandlerClass::define("demo.ChatListener");
    let v2 = v1.redefine();
    manager
        .register_scope("lobby", ScopeOptions::validate().with_listener(helpers::chat_listener(&v1)))
        .expect("lobby registers");

    let report = plugin.reconcile_now(&v2).expect("reconcile succeeds");

    assert!(!report.found);
    assert_eq!(report.managers, 1);
    assert_eq!(report.scopes, 1);
}

#[test]
fn test_shape_mismatch_leaves_routes_untouched() {
    let channel = Arc::new(ReloadChannel::new());
    let scheduler = ImmediateScheduler::new();
    let config = ReloadConfig {
        listener_type: Some("legacy::RegisteredListener".to_string()),
        ..ReloadConfig::default()
    };
    let plugin = HarmonyPlugin::new(
        channel.clone(),
        Arc::new(scheduler.clone()),
        ShapeContract::from_config(&config),
    );

    let manager = helpers::chat_manager("demo");
    plugin.register_manager(manager.clone());

    let v1 = HandlerClass::define("demo.ChatListener");
    manager
        .register_scope("lobby", ScopeOptions::validate())
        .expect("lobby registers");
    let parked = helpers::chat_listener(&v1);
    manager
        .scope(&ScopeKey::from("lobby"))
        .expect("lobby scope")
        .register(parked.clone());

    channel.publish(v1);

    // The job reports success; the failure is logged.
    assert_eq!(scheduler.executor().completed(), 1);
    assert!(!manager.is_routed(parked.id()));
}

#[tokio::test]
async fn test_worker_runs_one_job_per_notification() {
    let (queue, runner) = WorkerRunner::new(WorkerConfig::default(), "reload-test");
    let executor = runner.executor();
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    let channel = Arc::new(ReloadChannel::new());
    let plugin = HarmonyPlugin::new(channel.clone(), Arc::new(queue), ShapeContract::default());
    let manager = helpers::chat_manager("demo");
    plugin.register_manager(manager.clone());

    let v1 = HandlerClass::define("demo.ChatListener");
    let listener = helpers::chat_listener(&v1);
    manager
        .register_scope("lobby", ScopeOptions::validate())
        .expect("lobby registers");
    manager
        .scope(&ScopeKey::from("lobby"))
        .expect("lobby scope")
        .register(listener.clone());

    let mut class = v1.clone();
    channel.publish(class.clone());
    for _ in 0..2 {
        class = class.redefine();
        channel.publish(class.clone());
    }

    // Dropping every queue handle lets the runner drain and stop.
    drop(plugin);
    drop(channel);
    runner.run(cancel_rx).await;

    assert_eq!(executor.completed(), 3);
    assert!(manager.is_routed(listener.id()));
}
