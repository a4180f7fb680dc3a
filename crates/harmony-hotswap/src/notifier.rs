//! Reload notifications: "this class was just redefined".

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use harmony_events::HandlerClass;

/// Notification that a class was redefined. Carries the new identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    pub class: HandlerClass,
}

/// Callback invoked once per notification.
pub type ReloadCallback = Arc<dyn Fn(&ReloadEvent) + Send + Sync>;

/// Source of reload notifications.
pub trait ReloadNotifier: Send + Sync + fmt::Debug {
    /// Registers a callback for all future notifications.
    fn subscribe(&self, callback: ReloadCallback);
}

/// In-process notifier fanning each published reload out to every
/// subscriber.
#[derive(Default)]
pub struct ReloadChannel {
    subscribers: RwLock<Vec<ReloadCallback>>,
}

impl fmt::Debug for ReloadChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadChannel")
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}

impl ReloadChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifies every subscriber that `class` was redefined. Returns the
    /// number of subscribers notified.
    ///
    /// Callbacks run on the calling thread, outside the subscriber lock.
    pub fn publish(&self, class: HandlerClass) -> usize {
        let subscribers: Vec<ReloadCallback> = self.subscribers.read().clone();
        let event = ReloadEvent { class };

        debug!(class = %event.class, subscribers = subscribers.len(), "Publishing reload");
        for callback in &subscribers {
            callback(&event);
        }
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl ReloadNotifier for ReloadChannel {
    fn subscribe(&self, callback: ReloadCallback) {
        self.subscribers.write().push(callback);
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let channel = ReloadChannel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            channel.subscribe(Arc::new(move |event: &ReloadEvent| {
                seen.lock().push(event.class.clone());
            }));
        }

        let class = HandlerClass::define("demo.Listener");
        assert_eq!(channel.publish(class.clone()), 2);
        assert_eq!(*seen.lock(), vec![class.clone(), class]);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let channel = ReloadChannel::new();
        assert_eq!(channel.publish(HandlerClass::define("demo.Listener")), 0);
    }
}
