//! Listener registrations and handler implementations.

use std::fmt;
use std::sync::Arc;

use harmony_core::AppResult;
use harmony_core::types::ListenerId;

use crate::class::HandlerClass;
use crate::event::{Event, Order, RouteKey};

/// Trait for listener handler implementations.
pub trait EventHandler: Send + Sync + fmt::Debug {
    /// Returns the runtime class identity of this handler.
    fn class(&self) -> &HandlerClass;

    /// Handles one event.
    fn handle(&self, event: &Event) -> AppResult<()>;
}

/// A closure-based handler for quick handler creation.
pub struct FnHandler {
    /// Class identity reported by this handler.
    class: HandlerClass,
    /// Handler function.
    handler: Arc<dyn Fn(&Event) -> AppResult<()> + Send + Sync>,
}

impl fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler")
            .field("class", &self.class)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl FnHandler {
    /// Creates a new closure-based handler.
    pub fn new<F>(class: HandlerClass, handler: F) -> Self
    where
        F: Fn(&Event) -> AppResult<()> + Send + Sync + 'static,
    {
        Self {
            class,
            handler: Arc::new(handler),
        }
    }

    /// Creates a handler that accepts every event and does nothing.
    pub fn noop(class: HandlerClass) -> Self {
        Self::new(class, |_| Ok(()))
    }

    /// Wraps this handler into an `Arc<dyn EventHandler>`.
    pub fn into_handler(self) -> Arc<dyn EventHandler> {
        Arc::new(self)
    }
}

impl EventHandler for FnHandler {
    fn class(&self) -> &HandlerClass {
        &self.class
    }

    fn handle(&self, event: &Event) -> AppResult<()> {
        (self.handler)(event)
    }
}

/// A concrete listener registered in a scope.
///
/// Cloning a registration keeps its identity; [`RegisteredListener::with_handler`]
/// issues a new one with the same origin.
#[derive(Debug, Clone)]
pub struct RegisteredListener {
    id: ListenerId,
    /// Id of the first registration of this lineage.
    origin: ListenerId,
    plugin: String,
    event_type: String,
    order: Order,
    before_modifications: bool,
    handler: Arc<dyn EventHandler>,
}

impl RegisteredListener {
    /// Creates a registration with default order.
    pub fn new(
        plugin: impl Into<String>,
        event_type: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        let id = ListenerId::new();
        Self {
            id,
            origin: id,
            plugin: plugin.into(),
            event_type: event_type.into(),
            order: Order::Default,
            before_modifications: false,
            handler,
        }
    }

    /// Sets the dispatch order.
    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Marks the listener as observing events before modifications.
    pub fn before_modifications(mut self, before_modifications: bool) -> Self {
        self.before_modifications = before_modifications;
        self
    }

    /// Creates a new registration with the same routing data wrapping
    /// another handler.
    pub fn with_handler(&self, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            id: ListenerId::new(),
            origin: self.origin,
            plugin: self.plugin.clone(),
            event_type: self.event_type.clone(),
            order: self.order,
            before_modifications: self.before_modifications,
            handler,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Id shared by a registration and every replacement derived from it.
    /// A manager routes at most one registration per origin.
    pub fn origin(&self) -> ListenerId {
        self.origin
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn is_before_modifications(&self) -> bool {
        self.before_modifications
    }

    /// Returns the wrapped handler.
    pub fn handle(&self) -> &Arc<dyn EventHandler> {
        &self.handler
    }

    /// Returns the runtime class identity of the wrapped handler.
    pub fn handle_class(&self) -> &HandlerClass {
        self.handler.class()
    }

    /// Returns the route this listener is dispatched through.
    pub fn route_key(&self) -> RouteKey {
        RouteKey {
            event_type: self.event_type.clone(),
            order: self.order,
            before_modifications: self.before_modifications,
        }
    }
}
