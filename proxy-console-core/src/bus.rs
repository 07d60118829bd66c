//! Event bus for fanning store changes out to subscribed units

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::HandlerError;
use crate::event::{BusEvent, SubscriptionId};

/// Result a bus handler reports back
pub type HandlerResult = Result<(), HandlerError>;

type Handler<E> = Rc<RefCell<dyn FnMut(&E) -> HandlerResult>>;

struct Subscription<E: BusEvent> {
    id: SubscriptionId,
    event_type: E::Type,
    handler: Handler<E>,
}

/// Outcome of a single [`EventBus::publish`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Handlers that ran to completion
    pub delivered: usize,
    /// Handlers that returned an error or panicked
    pub failed: usize,
    /// Handlers skipped because they were already running or were
    /// unsubscribed earlier in the same delivery
    pub skipped: usize,
}

/// Single-threaded publish/subscribe channel
///
/// Delivery is synchronous and in subscription order. Nothing is retained:
/// a handler registered after a publish never sees that event.
///
/// Handlers are isolated from each other. A handler that returns an error or
/// panics is logged and the remaining handlers still run.
///
/// The bus is shared through `Rc` and mutated through `&self`, so handlers
/// may publish, subscribe or unsubscribe while an event is being delivered.
pub struct EventBus<E: BusEvent> {
    /// Subscriptions in registration order
    subscriptions: RefCell<Vec<Subscription<E>>>,
    next_id: Cell<u64>,
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.len())
            .finish()
    }
}

impl<E: BusEvent> EventBus<E> {
    /// Create an empty event bus
    pub fn new() -> Self {
        Self {
            subscriptions: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    fn allocate_id(&self) -> SubscriptionId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        SubscriptionId(id)
    }

    /// Subscribe a handler to an event type
    pub fn subscribe<F>(&self, event_type: E::Type, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) -> HandlerResult + 'static,
    {
        let handler: Handler<E> = Rc::new(RefCell::new(handler));
        self.insert(event_type, handler)
    }

    /// Subscribe one handler to several event types
    ///
    /// Returns one handle per event type, in the order given.
    pub fn subscribe_many<F>(&self, event_types: &[E::Type], handler: F) -> Vec<SubscriptionId>
    where
        F: FnMut(&E) -> HandlerResult + 'static,
    {
        let handler: Handler<E> = Rc::new(RefCell::new(handler));
        event_types
            .iter()
            .map(|&event_type| self.insert(event_type, Rc::clone(&handler)))
            .collect()
    }

    fn insert(&self, event_type: E::Type, handler: Handler<E>) -> SubscriptionId {
        let id = self.allocate_id();
        self.subscriptions.borrow_mut().push(Subscription {
            id,
            event_type,
            handler,
        });
        debug!(subscription = id.0, ?event_type, "Subscribed");
        id
    }

    /// Remove a subscription
    ///
    /// Returns `false` if the handle was already released.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        let removed = subscriptions.len() != before;
        if removed {
            debug!(subscription = id.0, "Unsubscribed");
        }
        removed
    }

    /// Remove several subscriptions, returning how many were still live
    pub fn unsubscribe_all(&self, ids: &[SubscriptionId]) -> usize {
        ids.iter().filter(|&&id| self.unsubscribe(id)).count()
    }

    /// Whether a handle is still registered
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscriptions.borrow().iter().any(|s| s.id == id)
    }

    /// Number of handlers registered for an event type
    pub fn subscriber_count(&self, event_type: E::Type) -> usize {
        self.subscriptions
            .borrow()
            .iter()
            .filter(|s| s.event_type == event_type)
            .count()
    }

    /// Total number of live subscriptions
    pub fn len(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Whether no subscriptions are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every handler subscribed to its type
    pub fn publish(&self, event: E) -> Delivery {
        let event_type = event.event_type();
        // Snapshot the targets so handlers can (un)subscribe during delivery.
        let targets: Vec<(SubscriptionId, Handler<E>)> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|s| s.event_type == event_type)
            .map(|s| (s.id, Rc::clone(&s.handler)))
            .collect();

        let mut delivery = Delivery::default();
        for (id, handler) in targets {
            if !self.is_subscribed(id) {
                delivery.skipped += 1;
                continue;
            }
            let Ok(mut handler) = handler.try_borrow_mut() else {
                debug!(subscription = id.0, ?event_type, "Skipping re-entrant handler");
                delivery.skipped += 1;
                continue;
            };
            match panic::catch_unwind(AssertUnwindSafe(|| (&mut *handler)(&event))) {
                Ok(Ok(())) => delivery.delivered += 1,
                Ok(Err(error)) => {
                    warn!(subscription = id.0, ?event_type, %error, "Event handler failed");
                    delivery.failed += 1;
                }
                Err(payload) => {
                    warn!(
                        subscription = id.0,
                        ?event_type,
                        panic = panic_message(payload.as_ref()),
                        "Event handler panicked"
                    );
                    delivery.failed += 1;
                }
            }
        }

        debug!(
            ?event_type,
            delivered = delivery.delivered,
            failed = delivery.failed,
            skipped = delivery.skipped,
            "Event published"
        );
        delivery
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
