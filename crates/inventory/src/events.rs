//! In-process publish/subscribe bus for inventory change notifications.
//!
//! One [`EventBus`] is created at application start and handed to every
//! store. Any component can announce that the backend cache was invalidated
//! or that shared inventory data changed; every store subscribed to the bus
//! hears it and decides, by comparing the message [`Origin`] with its own,
//! whether it needs to reload.
//!
//! Delivery is synchronous and in registration order. Handlers run outside
//! the registry lock, so a handler may publish or subscribe without
//! deadlocking.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tarimas_core::{OrderId, PalletCode};
use tracing::debug;
use uuid::Uuid;

/// Tag naming the component that caused a bus message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(String);

impl Origin {
    /// Origin with an explicit tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Fresh unique origin, `"{prefix}-{uuid}"`.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}-{}", Uuid::new_v4()))
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two message kinds carried by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CacheInvalidated,
    DataUpdated,
}

impl EventKind {
    /// Wire-style name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CacheInvalidated => "cache-invalidated",
            Self::DataUpdated => "data-updated",
        }
    }
}

/// What changed in a `data-updated` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataChange {
    /// Pallets were attached to a client order.
    PalletsAssigned {
        order_id: OrderId,
        pallet_codes: Vec<PalletCode>,
    },
    /// Pallets were released from their client orders.
    PalletsUnassigned { pallet_codes: Vec<PalletCode> },
    /// A change announced by a component outside the inventory engine.
    Other(String),
}

impl DataChange {
    /// Short name of the change, as logged.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::PalletsAssigned { .. } => "tarima-assigned",
            Self::PalletsUnassigned { .. } => "tarima-unassigned",
            Self::Other(name) => name,
        }
    }
}

/// A message published on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// A read-through cache was emptied.
    CacheInvalidated {
        origin: Origin,
        /// Which cache, e.g. `"inventario"`.
        scope: String,
    },
    /// Shared inventory data changed.
    DataUpdated { origin: Origin, change: DataChange },
}

impl BusEvent {
    /// Kind used to route the message.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::CacheInvalidated { .. } => EventKind::CacheInvalidated,
            Self::DataUpdated { .. } => EventKind::DataUpdated,
        }
    }

    /// Component that caused the message.
    #[must_use]
    pub const fn origin(&self) -> &Origin {
        match self {
            Self::CacheInvalidated { origin, .. } | Self::DataUpdated { origin, .. } => origin,
        }
    }
}

type Handler = Arc<dyn Fn(&BusEvent) + Send + Sync>;

struct Subscriber {
    id: u64,
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

/// Shared publish/subscribe channel. Cloning yields another handle to the
/// same subscriber registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for messages of `kind`.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// dropped or explicitly unsubscribed.
    #[must_use = "dropping the subscription unsubscribes the handler"]
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&BusEvent) + Send + Sync + 'static,
    {
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.push(Subscriber {
            id,
            kind,
            handler: Arc::new(handler),
        });
        debug!(kind = kind.as_str(), id, "Bus subscriber registered");

        Subscription {
            registry: Arc::downgrade(&self.registry),
            id,
        }
    }

    /// Deliver `event` to every current subscriber of its kind, in
    /// registration order. Returns how many handlers ran.
    pub fn publish(&self, event: &BusEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .lock()
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.kind == kind)
            .map(|subscriber| Arc::clone(&subscriber.handler))
            .collect();

        debug!(
            kind = kind.as_str(),
            origin = %event.origin(),
            subscribers = handlers.len(),
            "Publishing bus event"
        );

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Announce that a cache was invalidated.
    pub fn publish_cache_invalidated(&self, scope: impl Into<String>, origin: &Origin) -> usize {
        self.publish(&BusEvent::CacheInvalidated {
            origin: origin.clone(),
            scope: scope.into(),
        })
    }

    /// Announce that shared data changed.
    pub fn publish_data_updated(&self, change: DataChange, origin: &Origin) -> usize {
        self.publish(&BusEvent::DataUpdated {
            origin: origin.clone(),
            change,
        })
    }

    /// Number of live subscriptions across both kinds.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration handle returned by [`EventBus::subscribe`].
///
/// Dropping it removes the handler from the bus.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    id: u64,
}

impl Subscription {
    /// Remove the handler now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry.subscribers.retain(|subscriber| subscriber.id != self.id);
            debug!(id = self.id, "Bus subscriber released");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Handler) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = Arc::clone(&log);
            move |name: &str| -> Handler {
                let log = Arc::clone(&log);
                let name = name.to_owned();
                Arc::new(move |event: &BusEvent| {
                    log.lock()
                        .unwrap()
                        .push(format!("{name}:{}", event.origin()));
                })
            }
        };
        (log, make)
    }

    #[test]
    fn test_publish_routes_by_kind() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let data = make("data");
        let cache = make("cache");
        let _data = bus.subscribe(EventKind::DataUpdated, move |e| data(e));
        let _cache = bus.subscribe(EventKind::CacheInvalidated, move |e| cache(e));

        let delivered = bus.publish_data_updated(DataChange::Other("x".into()), &Origin::new("X"));

        assert_eq!(delivered, 1);
        assert_eq!(*log.lock().unwrap(), vec!["data:X".to_string()]);
    }

    #[test]
    fn test_publish_in_registration_order() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let subs: Vec<_> = ["first", "second", "third"]
            .into_iter()
            .map(|name| {
                let handler = make(name);
                bus.subscribe(EventKind::CacheInvalidated, move |e| handler(e))
            })
            .collect();

        bus.publish_cache_invalidated("inventario", &Origin::new("O"));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:O", "second:O", "third:O"]
        );
        drop(subs);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = bus.subscribe(EventKind::DataUpdated, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(bus.subscriber_count(), 1);

        subscription.unsubscribe();
        bus.publish_data_updated(DataChange::Other("x".into()), &Origin::new("X"));

        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_may_publish_without_deadlock() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let inner_bus = bus.clone();
        let _forward = bus.subscribe(EventKind::DataUpdated, move |event| {
            inner_bus.publish_cache_invalidated("inventario", event.origin());
        });
        let counter = Arc::clone(&calls);
        let _count = bus.subscribe(EventKind::CacheInvalidated, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish_data_updated(DataChange::Other("x".into()), &Origin::new("X"));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_outliving_bus_is_harmless() {
        let bus = EventBus::new();
        let subscription = bus.subscribe(EventKind::DataUpdated, |_| {});
        drop(bus);
        drop(subscription);
    }

    #[test]
    fn test_generated_origins_are_unique() {
        let a = Origin::generate("inventario");
        let b = Origin::generate("inventario");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("inventario-"));
    }

    #[test]
    fn test_change_names() {
        let assigned = DataChange::PalletsAssigned {
            order_id: OrderId::new(1),
            pallet_codes: vec![PalletCode::from("P1")],
        };
        assert_eq!(assigned.name(), "tarima-assigned");
        let released = DataChange::PalletsUnassigned {
            pallet_codes: vec![],
        };
        assert_eq!(released.name(), "tarima-unassigned");
    }
}
