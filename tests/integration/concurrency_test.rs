//! Integration tests for reconciliation racing dispatch, scope mutation,
//! and manager registration.

mod helpers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use parking_lot::Mutex;

use harmony_events::{HandlerClass, HarmonyEventManager, ScopeKey, ScopeOptions};
use harmony_hotswap::{HarmonyPlugin, ReloadChannel, ShapeContract};
use harmony_worker::ImmediateScheduler;

const MANAGERS: usize = 4;
const SCOPES: usize = 3;

fn plugin() -> Arc<HarmonyPlugin> {
    Arc::new(HarmonyPlugin::new(
        Arc::new(ReloadChannel::new()),
        Arc::new(ImmediateScheduler::new()),
        ShapeContract::default(),
    ))
}

/// Managers with `SCOPES` scopes each, every scope holding one listener of
/// `class`.
fn populate(plugin: &HarmonyPlugin, class: &HandlerClass) -> Vec<Arc<HarmonyEventManager>> {
    (0..MANAGERS)
        .map(|_| {
            let manager = helpers::chat_manager("demo");
            for s in 0..SCOPES {
                manager
                    .register_scope(
                        format!("scope-{s}"),
                        ScopeOptions::validate().with_listener(helpers::chat_listener(class)),
                    )
                    .expect("scope registers");
            }
            plugin.register_manager(manager.clone());
            manager
        })
        .collect()
}

#[test]
fn test_reconcile_during_dispatch_and_mutation() {
    let plugin = plugin();
    let target = HandlerClass::define("demo.ChatListener");
    let noise = HandlerClass::define("demo.NoiseListener");
    let managers = populate(&plugin, &target);

    let stop = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(4));
    let late_managers = Arc::new(Mutex::new(Vec::new()));

    let dispatcher = {
        let managers = managers.clone();
        let stop = Arc::clone(&stop);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            while !stop.load(Ordering::SeqCst) {
                for manager in &managers {
                    for s in 0..SCOPES {
                        let result = manager.post(&helpers::chat_event(&format!("scope-{s}")));
                        assert!(result.errors.is_empty());
                    }
                }
            }
        })
    };

    let mutator = {
        let managers = managers.clone();
        let stop = Arc::clone(&stop);
        let barrier = Arc::clone(&barrier);
        let noise = noise.clone();
        thread::spawn(move || {
            barrier.wait();
            while !stop.load(Ordering::SeqCst) {
                for manager in &managers {
                    let scope = manager.scope(&ScopeKey::from("scope-0")).expect("scope-0");
                    let extra = helpers::chat_listener(&noise);
                    scope.register(extra.clone());
                    scope.unregister(extra.id());

                    let churn = ScopeOptions::validate().with_listener(helpers::chat_listener(&noise));
                    manager
                        .register_scope("churn", churn)
                        .expect("churn registers");
                    manager.unregister_scope(&ScopeKey::from("churn"));
                }
            }
        })
    };

    let registrar = {
        let plugin = Arc::clone(&plugin);
        let stop = Arc::clone(&stop);
        let barrier = Arc::clone(&barrier);
        let late_managers = Arc::clone(&late_managers);
        thread::spawn(move || {
            barrier.wait();
            while !stop.load(Ordering::SeqCst) {
                let manager = helpers::chat_manager("late");
                plugin.register_manager(manager.clone());
                late_managers.lock().push(manager);
                thread::yield_now();
            }
        })
    };

    barrier.wait();
    for _ in 0..200 {
        let report = plugin.reconcile_now(&target).expect("reconcile succeeds");
        assert_eq!(report.refreshed, MANAGERS * SCOPES);
    }
    stop.store(true, Ordering::SeqCst);

    for handle in [dispatcher, mutator, registrar] {
        handle.join().expect("worker thread");
    }

    assert_eq!(
        plugin.registry().len(),
        MANAGERS + late_managers.lock().len()
    );
    for manager in &managers {
        for scope in manager.scopes().into_iter().map(|(_, scope)| scope) {
            for listener in scope.listeners() {
                assert!(manager.is_routed(listener.id()));
            }
        }
    }
}

#[test]
fn test_concurrent_first_registrations_install_once() {
    const THREADS: usize = 24;

    let channel = Arc::new(ReloadChannel::new());
    let plugin = Arc::new(HarmonyPlugin::new(
        channel.clone(),
        Arc::new(ImmediateScheduler::new()),
        ShapeContract::default(),
    ));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let plugin = Arc::clone(&plugin);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let manager = helpers::chat_manager("demo");
                barrier.wait();
                plugin.register_manager(manager);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("registration thread");
    }

    assert_eq!(channel.subscriber_count(), 1);
    assert_eq!(plugin.registry().len(), THREADS);
}
