//! Harmony hot-swap agent
//!
//! Wires the reload plugin, the reconciliation worker, and a demo event
//! manager together, then walks one class through a reload.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use harmony_core::config::AgentConfig;
use harmony_core::error::AppError;
use harmony_events::{
    Event, FnHandler, HandlerClass, HarmonyEventManager, RegisteredListener, ScopeKey,
    ScopeOptions, install_construction_hook,
};
use harmony_hotswap::{HarmonyPlugin, ReloadChannel, ShapeContract};
use harmony_worker::WorkerRunner;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Agent error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AgentConfig, AppError> {
    let env = std::env::var("HARMONY_ENV").unwrap_or_else(|_| "development".to_string());
    AgentConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AgentConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(config.logging.thread_ids)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(config.logging.thread_ids)
                .init();
        }
    }
}

async fn run(config: AgentConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Harmony agent");

    // ── Step 1: Reconciliation worker ────────────────────────────
    let (queue, runner) = WorkerRunner::new(config.worker.clone(), "reload-worker");
    let executor = runner.executor();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let worker = tokio::spawn(runner.run(cancel_rx));

    // ── Step 2: Reload plugin ────────────────────────────────────
    let channel = Arc::new(ReloadChannel::new());
    let plugin = Arc::new(HarmonyPlugin::new(
        channel.clone(),
        Arc::new(queue),
        ShapeContract::from_config(&config.reload),
    ));
    install_construction_hook(plugin.clone())?;

    // ── Step 3: Demo manager ─────────────────────────────────────
    let manager = HarmonyEventManager::builder("demo")
        .mapping("chat", |e| e.get_string("world").map(ScopeKey::from))
        .build();

    let delivered = Arc::new(AtomicUsize::new(0));
    let v1 = HandlerClass::define("demo.ChatListener");
    let listener = RegisteredListener::new("demo", "chat", counting_handler(&v1, &delivered));
    let listener_id = listener.id();
    manager.register_scope("lobby", ScopeOptions::validate().with_listener(listener.clone()))?;

    let event = Event::new("chat").with_string("world", "lobby");
    tracing::info!(delivered = manager.post(&event).delivered, "Posted before reload");

    // ── Step 4: Redefine the handler class ───────────────────────
    let v2 = v1.redefine();
    let scope = manager
        .scope(&ScopeKey::from("lobby"))
        .ok_or_else(|| AppError::not_found("Scope 'lobby' not found"))?;
    scope.replace(
        listener_id,
        listener.with_handler(counting_handler(&v2, &delivered)),
    );
    tracing::info!(
        delivered = manager.post(&event).delivered,
        "Posted after swap, before reconciliation"
    );

    channel.publish(v2.clone());
    wait_for_jobs(&executor, 1).await;

    tracing::info!(
        delivered = manager.post(&event).delivered,
        total = delivered.load(Ordering::SeqCst),
        managers = plugin.registry().len(),
        "Posted after reconciliation"
    );

    let report = plugin.reconcile_now(&v2)?;
    tracing::info!(
        found = report.found,
        refreshed = report.refreshed,
        scopes = report.scopes,
        "Verified reconciliation"
    );

    // ── Step 5: Shutdown ─────────────────────────────────────────
    let _ = cancel_tx.send(true);
    worker
        .await
        .map_err(|e| AppError::internal(format!("Worker task failed: {}", e)))?;

    tracing::info!("Harmony agent stopped");
    Ok(())
}

fn counting_handler(
    class: &HandlerClass,
    delivered: &Arc<AtomicUsize>,
) -> Arc<dyn harmony_events::EventHandler> {
    let delivered = Arc::clone(delivered);
    FnHandler::new(class.clone(), move |_| {
        delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .into_handler()
}

/// Waits up to five seconds for the worker to finish `count` jobs.
async fn wait_for_jobs(executor: &harmony_worker::JobExecutor, count: u64) {
    let finished = tokio::time::timeout(Duration::from_secs(5), async {
        while executor.completed() + executor.failed() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    if finished.is_err() {
        tracing::warn!("Timed out waiting for reload jobs");
    }
}
