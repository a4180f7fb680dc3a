//! # harmony-events
//!
//! Scoped event dispatch. Provides:
//!
//! - Handler class identities that change on every reload
//! - Listener registrations wrapping a handler with its routing data
//! - Scoped event managers guarding their listeners with an explicit lock
//! - The top-level `HarmonyEventManager` with scope registration,
//!   event-to-scope mappings, a route table, and dispatch
//! - A construction hook invoked for every manager that gets built

pub mod class;
pub mod event;
pub mod hook;
pub mod listener;
pub mod manager;
pub mod scope;

pub use class::HandlerClass;
pub use event::{Event, Order, RouteKey, ScopeKey};
pub use hook::{ConstructionHook, install_construction_hook};
pub use listener::{EventHandler, FnHandler, RegisteredListener};
pub use manager::{
    DispatchResult, HarmonyEventManager, HarmonyEventManagerBuilder, RegisterOutcome, ScopeOptions,
};
pub use scope::ScopedEventManager;
