//! Harmony event manager: scopes, event mappings, route table, dispatch.
//!
//! Events are mapped to the scope they belong to, then delivered to that
//! scope's listeners. A listener only receives events once it has been
//! registered in the route table; a listener inserted into a scope by other
//! means (e.g. swapped in after a class reload) stays silent until
//! [`HarmonyEventManager::register`] is called for it. The route table holds
//! one entry per listener origin, so registering a replacement displaces the
//! registration it was derived from.
//!
//! A scope may carry a child manager. After the scope's own listeners, the
//! event is handed to the child scope chosen by the child's parent mappings.
//! Listeners of the child whose event type the child cannot map itself are
//! routed through its parents.
//!
//! Lock order: scope map → scope → route table. Dispatch never holds a scope
//! lock while taking the route table; reconciliation may call `register`
//! while holding a scope lock.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use harmony_core::types::{ListenerId, ManagerId};
use harmony_core::{AppError, AppResult};

use crate::event::{Event, RouteKey, ScopeKey};
use crate::hook;
use crate::listener::RegisteredListener;
use crate::scope::ScopedEventManager;

/// Maps an event to the key of the scope it belongs to.
pub type EventMapper = Arc<dyn Fn(&Event) -> Option<ScopeKey> + Send + Sync>;

/// Maps a parent scope and an event to the key of a child scope.
pub type ParentMapper = Arc<dyn Fn(&ScopeKey, &Event) -> Option<ScopeKey> + Send + Sync>;

/// Instantiates the default listeners of a newly registered scope.
pub type ListenerFactory = Arc<dyn Fn(&ScopeKey) -> Vec<RegisteredListener> + Send + Sync>;

/// Additional options for scope registration.
#[derive(Debug, Clone)]
pub struct ScopeOptions {
    /// Listeners registered in addition to the manager's defaults.
    pub listeners: Vec<RegisteredListener>,
    /// Manager processing the event after this scope's own listeners.
    pub child: Option<Arc<HarmonyEventManager>>,
    /// If `true`, every listener's event type must have a mapping.
    pub validate: bool,
}

impl ScopeOptions {
    /// Options with validation enabled and no extra listeners.
    pub fn validate() -> Self {
        Self {
            listeners: Vec::new(),
            child: None,
            validate: true,
        }
    }

    /// Options with validation disabled and no extra listeners.
    pub fn skip_validation() -> Self {
        Self {
            listeners: Vec::new(),
            child: None,
            validate: false,
        }
    }

    /// Appends an extra listener.
    pub fn with_listener(mut self, listener: RegisteredListener) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Attaches a child manager to the scope.
    pub fn with_child(mut self, child: Arc<HarmonyEventManager>) -> Self {
        self.child = Some(child);
        self
    }
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self::validate()
    }
}

/// Result of [`HarmonyEventManager::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The listener was added to its route.
    Routed,
    /// The listener was already routed; nothing changed.
    AlreadyRouted,
    /// No mapping exists for the listener's event type; it was parked and
    /// handed to the parent managers.
    Unmapped,
}

/// Aggregated result of posting one event.
#[derive(Debug, Default)]
pub struct DispatchResult {
    /// Scope the event was mapped to, if any.
    pub scope: Option<ScopeKey>,
    /// Number of listeners that handled the event successfully.
    pub delivered: usize,
    /// Handler failures, in dispatch order.
    pub errors: Vec<(ListenerId, AppError)>,
}

/// Child manager attached to one scope, with the mappings resolved against
/// the parent at registration time.
#[derive(Clone)]
struct ChildLink {
    manager: Arc<HarmonyEventManager>,
    mappings: HashMap<String, ParentMapper>,
}

#[derive(Clone)]
struct ScopeEntry {
    scope: Arc<ScopedEventManager>,
    child: Option<ChildLink>,
}

/// The registration currently routed for one listener origin.
#[derive(Debug, Clone)]
struct Route {
    key: RouteKey,
    listener: ListenerId,
}

/// Top-level event manager owning a map of scopes.
pub struct HarmonyEventManager {
    /// Identity issued at construction.
    id: ManagerId,
    /// Plugin the manager belongs to.
    plugin: String,
    /// Weak self reference handed to child managers.
    this: Weak<HarmonyEventManager>,
    /// Event type → scope mapper.
    mappings: HashMap<String, EventMapper>,
    /// Event type → child scope mapper, used when this manager is a child.
    parent_mappings: HashMap<String, ParentMapper>,
    /// Child scope mapper for every event type the parent maps.
    default_parent_mapping: Option<ParentMapper>,
    /// Default listener factories run for every registered scope.
    factories: Vec<ListenerFactory>,
    /// Scope key → scope.
    scopes: RwLock<HashMap<ScopeKey, ScopeEntry>>,
    /// Listener origin → routed registration.
    routes: Mutex<HashMap<ListenerId, Route>>,
    /// Listener origin → registration whose event type has no mapping.
    unmapped: Mutex<HashMap<ListenerId, RegisteredListener>>,
    /// Managers this one is attached to as a child, once per scope.
    parents: Mutex<Vec<Weak<HarmonyEventManager>>>,
}

impl fmt::Debug for HarmonyEventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarmonyEventManager")
            .field("id", &self.id)
            .field("plugin", &self.plugin)
            .field("mappings", &self.mappings.keys().collect::<Vec<_>>())
            .field("parent_mappings", &self.parent_mappings.keys().collect::<Vec<_>>())
            .field("default_parent_mapping", &self.default_parent_mapping.is_some())
            .field("factories", &self.factories.len())
            .field("scopes", &self.scopes.read().len())
            .finish()
    }
}

impl HarmonyEventManager {
    /// Creates a builder for a manager owned by `plugin`.
    pub fn builder(plugin: impl Into<String>) -> HarmonyEventManagerBuilder {
        HarmonyEventManagerBuilder {
            plugin: plugin.into(),
            mappings: HashMap::new(),
            parent_mappings: HashMap::new(),
            default_parent_mapping: None,
            factories: Vec::new(),
        }
    }

    pub fn id(&self) -> ManagerId {
        self.id
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Returns whether an event type has a scope mapping.
    pub fn has_mapping(&self, event_type: &str) -> bool {
        self.mappings.contains_key(event_type)
    }

    /// Returns whether an event type can reach this manager, either through
    /// its own mapping or through a parent mapping.
    fn contains_mapping(&self, event_type: &str) -> bool {
        self.has_mapping(event_type)
            || self.default_parent_mapping.is_some()
            || self.parent_mappings.contains_key(event_type)
    }

    /// Resolves the child's parent mappings against this manager's event
    /// types. Event-specific mappings win over the default one.
    fn child_mappings(&self, child: &HarmonyEventManager) -> HashMap<String, ParentMapper> {
        let mut mappings = child.parent_mappings.clone();
        if let Some(default) = &child.default_parent_mapping {
            for event_type in self.mappings.keys() {
                mappings
                    .entry(event_type.clone())
                    .or_insert_with(|| Arc::clone(default));
            }
        }
        mappings
    }

    /// Registers a scope and instantiates its listeners.
    ///
    /// With `options.validate`, fails without modifying any state when a
    /// listener's event type (including the child's parked listeners) has no
    /// mapping. Re-registering an existing key replaces the previous scope;
    /// the swap happens under the scope map lock, so the displaced scope is
    /// always the one unrouted.
    pub fn register_scope(&self, scope: impl Into<ScopeKey>, options: ScopeOptions) -> AppResult<()> {
        let scope = scope.into();

        let child = match options.child {
            Some(manager) if manager.id == self.id => {
                return Err(AppError::validation(format!(
                    "Scope '{}' cannot use its own manager as child",
                    scope
                )));
            }
            Some(manager) => {
                let mappings = self.child_mappings(&manager);
                Some(ChildLink { manager, mappings })
            }
            None => None,
        };

        let mut listeners: Vec<RegisteredListener> = self
            .factories
            .iter()
            .flat_map(|factory| factory(&scope))
            .collect();
        listeners.extend(options.listeners);

        if options.validate {
            self.validate_scope(&scope, &listeners, child.as_ref())?;
        }

        let count = listeners.len();
        let entry = ScopeEntry {
            scope: Arc::new(ScopedEventManager::from_listeners(listeners)),
            child,
        };

        {
            let mut scopes = self.scopes.write();
            if let Some(previous) = scopes.remove(&scope) {
                self.detach(&previous);
                warn!(manager_id = %self.id, scope = %scope, "Scope re-registered, previous listeners dropped");
            }

            for listener in entry.scope.lock().iter() {
                self.register(listener);
            }
            if let Some(link) = &entry.child {
                self.attach(link);
            }

            scopes.insert(scope.clone(), entry);
        }

        info!(
            manager_id = %self.id,
            scope = %scope,
            listeners = count,
            "Scope registered"
        );

        Ok(())
    }

    fn validate_scope(
        &self,
        scope: &ScopeKey,
        listeners: &[RegisteredListener],
        child: Option<&ChildLink>,
    ) -> AppResult<()> {
        if let Some(link) = child {
            if let Some(event_type) = link.mappings.keys().find(|e| !self.has_mapping(e)) {
                return Err(AppError::validation(format!(
                    "Unmapped child event '{}' in scope '{}'",
                    event_type, scope
                )));
            }
        }

        let parked = child
            .map(|link| link.manager.unmapped_listeners())
            .unwrap_or_default();
        if let Some(unmapped) = listeners
            .iter()
            .chain(parked.iter())
            .find(|l| !self.contains_mapping(l.event_type()))
        {
            return Err(AppError::validation(format!(
                "Unmapped event '{}' in scope '{}'",
                unmapped.event_type(),
                scope
            )));
        }

        Ok(())
    }

    /// Links this manager as a parent of `link`'s child and routes the
    /// child's parked listeners.
    fn attach(&self, link: &ChildLink) {
        link.manager.parents.lock().push(self.this.clone());

        for listener in link.manager.unmapped_listeners() {
            self.register(&listener);
        }
    }

    /// Unroutes a removed scope's listeners and, when no other scope still
    /// uses the same child, the child's parked listeners.
    fn detach(&self, entry: &ScopeEntry) {
        for listener in entry.scope.lock().iter() {
            self.unregister(listener);
        }

        let Some(link) = &entry.child else {
            return;
        };

        let still_linked = {
            let mut parents = link.manager.parents.lock();
            if let Some(index) = parents.iter().position(|p| Weak::ptr_eq(p, &self.this)) {
                parents.remove(index);
            }
            parents.iter().any(|p| Weak::ptr_eq(p, &self.this))
        };

        if !still_linked {
            for listener in link.manager.unmapped_listeners() {
                self.unregister(&listener);
            }
        }
    }

    /// Un-registers a scope and drops its listeners from the route table.
    pub fn unregister_scope(&self, scope: &ScopeKey) -> bool {
        let removed = {
            let mut scopes = self.scopes.write();
            let Some(removed) = scopes.remove(scope) else {
                return false;
            };
            self.detach(&removed);
            removed
        };

        debug!(
            manager_id = %self.id,
            scope = %scope,
            listeners = removed.scope.len(),
            "Scope unregistered"
        );
        true
    }

    /// Returns one scope.
    pub fn scope(&self, scope: &ScopeKey) -> Option<Arc<ScopedEventManager>> {
        self.scopes.read().get(scope).map(|entry| Arc::clone(&entry.scope))
    }

    /// Returns the child manager attached to a scope.
    pub fn child(&self, scope: &ScopeKey) -> Option<Arc<HarmonyEventManager>> {
        self.scopes
            .read()
            .get(scope)
            .and_then(|entry| entry.child.as_ref())
            .map(|link| Arc::clone(&link.manager))
    }

    /// Returns a snapshot of the scope map. The map lock is released
    /// before this returns.
    pub fn scopes(&self) -> Vec<(ScopeKey, Arc<ScopedEventManager>)> {
        self.scopes
            .read()
            .iter()
            .map(|(key, entry)| (key.clone(), Arc::clone(&entry.scope)))
            .collect()
    }

    /// Registers a listener in the route table, displacing any registration
    /// of the same origin.
    ///
    /// Idempotent per listener registration. Listeners whose event type has
    /// no mapping are parked and registered with every parent manager.
    pub fn register(&self, listener: &RegisteredListener) -> RegisterOutcome {
        if !self.has_mapping(listener.event_type()) {
            self.unmapped.lock().insert(listener.origin(), listener.clone());
            debug!(
                manager_id = %self.id,
                event_type = %listener.event_type(),
                "Listener parked, event type has no mapping"
            );

            for parent in self.parent_managers() {
                parent.register(listener);
            }
            return RegisterOutcome::Unmapped;
        }

        let route = Route {
            key: listener.route_key(),
            listener: listener.id(),
        };
        let previous = self.routes.lock().insert(listener.origin(), route);

        match previous {
            Some(previous) if previous.listener == listener.id() => RegisterOutcome::AlreadyRouted,
            previous => {
                debug!(
                    manager_id = %self.id,
                    route = %listener.route_key(),
                    class = %listener.handle_class(),
                    displaced = ?previous.map(|p| p.listener),
                    "Listener routed"
                );
                RegisterOutcome::Routed
            }
        }
    }

    fn unregister(&self, listener: &RegisteredListener) {
        let origin = listener.origin();
        self.routes.lock().remove(&origin);

        let parked = self.unmapped.lock().remove(&origin).is_some();
        if parked {
            for parent in self.parent_managers() {
                parent.unregister(listener);
            }
        }
    }

    fn parent_managers(&self) -> Vec<Arc<HarmonyEventManager>> {
        self.parents.lock().iter().filter_map(Weak::upgrade).collect()
    }

    fn unmapped_listeners(&self) -> Vec<RegisteredListener> {
        self.unmapped.lock().values().cloned().collect()
    }

    fn routed_ids(&self, event_type: &str) -> HashSet<ListenerId> {
        self.routes
            .lock()
            .values()
            .filter(|route| route.key.event_type == event_type)
            .map(|route| route.listener)
            .collect()
    }

    /// Returns whether a listener is routed.
    pub fn is_routed(&self, id: ListenerId) -> bool {
        self.routes.lock().values().any(|route| route.listener == id)
    }

    /// Returns the number of distinct routes in the table.
    pub fn route_count(&self) -> usize {
        self.routes
            .lock()
            .values()
            .map(|route| &route.key)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Returns the number of routed listeners.
    pub fn routed_count(&self) -> usize {
        self.routes.lock().len()
    }

    /// Returns the number of parked listeners.
    pub fn unmapped_count(&self) -> usize {
        self.unmapped.lock().len()
    }

    /// Posts an event to the scope it maps to, then down the child chain.
    ///
    /// Handler failures are logged and collected; they do not stop dispatch.
    pub fn post(&self, event: &Event) -> DispatchResult {
        let mut result = DispatchResult::default();

        let Some(mapper) = self.mappings.get(&event.event_type) else {
            return result;
        };
        let Some(scope_key) = mapper(event) else {
            return result;
        };
        result.scope = Some(scope_key.clone());

        let mut targets = Vec::new();
        self.collect_targets(&scope_key, event, &HashSet::new(), &mut targets);
        // Stable: within one (before_modifications, order) slot, parents run
        // before children.
        targets.sort_by_key(|l| (!l.is_before_modifications(), l.order()));

        for listener in targets {
            match listener.handle().handle(event) {
                Ok(()) => result.delivered += 1,
                Err(e) => {
                    warn!(
                        manager_id = %self.id,
                        scope = %scope_key,
                        class = %listener.handle_class(),
                        error = %e,
                        "Listener failed to handle event"
                    );
                    result.errors.push((listener.id(), e));
                }
            }
        }

        result
    }

    /// Collects the routed listeners of `scope_key` and of the child scopes
    /// it maps to. `inherited` holds the ids routed by the ancestors.
    fn collect_targets(
        &self,
        scope_key: &ScopeKey,
        event: &Event,
        inherited: &HashSet<ListenerId>,
        out: &mut Vec<RegisteredListener>,
    ) {
        let Some(entry) = self.scopes.read().get(scope_key).cloned() else {
            return;
        };

        let mut routed = self.routed_ids(&event.event_type);
        routed.extend(inherited.iter().copied());
        out.extend(entry.scope.dispatch_targets(&event.event_type, &routed));

        let Some(link) = entry.child else {
            return;
        };
        let Some(mapper) = link.mappings.get(&event.event_type) else {
            return;
        };
        if let Some(child_key) = mapper(scope_key, event) {
            link.manager.collect_targets(&child_key, event, &routed, out);
        }
    }
}

/// Builder for [`HarmonyEventManager`].
pub struct HarmonyEventManagerBuilder {
    plugin: String,
    mappings: HashMap<String, EventMapper>,
    parent_mappings: HashMap<String, ParentMapper>,
    default_parent_mapping: Option<ParentMapper>,
    factories: Vec<ListenerFactory>,
}

impl fmt::Debug for HarmonyEventManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarmonyEventManagerBuilder")
            .field("plugin", &self.plugin)
            .field("mappings", &self.mappings.keys().collect::<Vec<_>>())
            .field("parent_mappings", &self.parent_mappings.keys().collect::<Vec<_>>())
            .field("factories", &self.factories.len())
            .finish()
    }
}

impl HarmonyEventManagerBuilder {
    /// Adds an event mapper. The first mapper for an event type wins.
    pub fn mapping<F>(mut self, event_type: impl Into<String>, mapper: F) -> Self
    where
        F: Fn(&Event) -> Option<ScopeKey> + Send + Sync + 'static,
    {
        self.mappings
            .entry(event_type.into())
            .or_insert_with(|| Arc::new(mapper));
        self
    }

    /// Sets the child scope mapper used, when this manager is attached as a
    /// child, for every event type the parent maps.
    pub fn parent_mapping<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&ScopeKey) -> Option<ScopeKey> + Send + Sync + 'static,
    {
        self.default_parent_mapping = Some(Arc::new(move |parent, _| mapper(parent)));
        self
    }

    /// Adds a child scope mapper for one event type. The first mapper for
    /// an event type wins.
    pub fn parent_event_mapping<F>(mut self, event_type: impl Into<String>, mapper: F) -> Self
    where
        F: Fn(&ScopeKey, &Event) -> Option<ScopeKey> + Send + Sync + 'static,
    {
        self.parent_mappings
            .entry(event_type.into())
            .or_insert_with(|| Arc::new(mapper));
        self
    }

    /// Adds a default listener factory run for every registered scope.
    pub fn listener<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ScopeKey) -> Vec<RegisteredListener> + Send + Sync + 'static,
    {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Builds the manager and runs the construction hook.
    pub fn build(self) -> Arc<HarmonyEventManager> {
        let manager = Arc::new_cyclic(|this| HarmonyEventManager {
            id: ManagerId::new(),
            plugin: self.plugin,
            this: this.clone(),
            mappings: self.mappings,
            parent_mappings: self.parent_mappings,
            default_parent_mapping: self.default_parent_mapping,
            factories: self.factories,
            scopes: RwLock::new(HashMap::new()),
            routes: Mutex::new(HashMap::new()),
            unmapped: Mutex::new(HashMap::new()),
            parents: Mutex::new(Vec::new()),
        });

        debug!(manager_id = %manager.id, plugin = %manager.plugin, "Event manager constructed");
        hook::notify_constructed(&manager);

        manager
    }
}
