//! Test utilities for proxy-console units
//!
//! - [`StaticFetcher`]: a [`Fetcher`] serving canned responses, with request
//!   counting, failures, delays and stalls
//! - [`EventRecorder`]: captures every change event published on a bus
//! - Assertion macros for verifying published events
//!
//! # Example
//!
//! ```ignore
//! use proxy_console::testing::{EventRecorder, StaticFetcher};
//!
//! let page = PageContext::new(config, Rc::new(MemoryJar::new()), Rc::new(StaticFetcher::new()));
//! let mut recorder = EventRecorder::attach(page.bus());
//!
//! page.store().clear_all("mitm-");
//!
//! let events = recorder.drain_emitted();
//! assert_emitted!(events, ChangeEvent { kind: ChangeKind::ClearedAll, .. });
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::assets::{FetchFuture, Fetcher};
use crate::bus::EventBus;
use crate::error::FetchError;
use crate::event::{ChangeEvent, EventType, SubscriptionId};

#[derive(Debug, Clone)]
enum Response {
    Body(String),
    Delayed(String, Duration),
    Status(u16, String),
    Failure(String),
    Stall,
}

/// In-memory [`Fetcher`] for tests
///
/// Unknown URLs answer `404 Not Found`. Responses can be replaced between
/// requests with [`insert`](Self::insert).
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: RefCell<HashMap<String, Response>>,
    requests: RefCell<HashMap<String, usize>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`
    pub fn with(self, url: &str, body: impl Into<String>) -> Self {
        self.insert(url, body);
        self
    }

    /// Serve `value` serialized as JSON
    pub fn with_json(self, url: &str, value: &serde_json::Value) -> Self {
        self.insert(url, value.to_string());
        self
    }

    /// Serve `body` after `delay`
    pub fn with_delay(self, url: &str, body: impl Into<String>, delay: Duration) -> Self {
        self.respond(url, Response::Delayed(body.into(), delay));
        self
    }

    /// Answer with a non-2xx status
    pub fn with_status(self, url: &str, status: u16, reason: &str) -> Self {
        self.respond(url, Response::Status(status, reason.to_string()));
        self
    }

    /// Fail before any response arrives
    pub fn with_failure(self, url: &str, reason: &str) -> Self {
        self.respond(url, Response::Failure(reason.to_string()));
        self
    }

    /// Never answer
    pub fn with_stall(self, url: &str) -> Self {
        self.respond(url, Response::Stall);
        self
    }

    /// Replace the response for `url` with `body`
    pub fn insert(&self, url: &str, body: impl Into<String>) {
        self.respond(url, Response::Body(body.into()));
    }

    fn respond(&self, url: &str, response: Response) {
        self.responses.borrow_mut().insert(url.to_string(), response);
    }

    /// Requests issued for `url` so far
    pub fn request_count(&self, url: &str) -> usize {
        self.requests.borrow().get(url).copied().unwrap_or(0)
    }

    /// Requests issued for any URL
    pub fn total_requests(&self) -> usize {
        self.requests.borrow().values().sum()
    }
}

impl Fetcher for StaticFetcher {
    fn fetch_text<'a>(&'a self, url: &'a str) -> FetchFuture<'a, String> {
        Box::pin(async move {
            *self.requests.borrow_mut().entry(url.to_string()).or_default() += 1;
            let response = self.responses.borrow().get(url).cloned();
            match response {
                Some(Response::Body(body)) => Ok(body),
                Some(Response::Delayed(body, delay)) => {
                    tokio::time::sleep(delay).await;
                    Ok(body)
                }
                Some(Response::Status(status, reason)) => Err(FetchError::Status { status, reason }),
                Some(Response::Failure(reason)) => Err(FetchError::Request {
                    url: url.to_string(),
                    reason,
                }),
                Some(Response::Stall) => std::future::pending().await,
                None => Err(FetchError::Status {
                    status: 404,
                    reason: "Not Found".to_string(),
                }),
            }
        })
    }
}

/// Records every [`ChangeEvent`] published on a bus
///
/// Subscribes to all event types on attach and releases the subscriptions
/// when dropped.
pub struct EventRecorder {
    bus: Rc<EventBus<ChangeEvent>>,
    ids: Vec<SubscriptionId>,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl EventRecorder {
    pub fn attach(bus: &Rc<EventBus<ChangeEvent>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let ids = bus.subscribe_many(&EventType::ALL, move |event: &ChangeEvent| {
            let _ = tx.send(event.clone());
            Ok(())
        });
        Self {
            bus: Rc::clone(bus),
            ids,
            rx,
        }
    }

    /// Drain all events recorded since the last drain
    pub fn drain_emitted(&mut self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Check if any event was recorded since the last drain
    pub fn has_emitted(&mut self) -> bool {
        !self.drain_emitted().is_empty()
    }
}

impl Drop for EventRecorder {
    fn drop(&mut self) {
        self.bus.unsubscribe_all(&self.ids);
    }
}

/// Assert that an event matching a pattern was published
///
/// # Example
///
/// ```ignore
/// let events = recorder.drain_emitted();
/// assert_emitted!(events, ChangeEvent { kind: ChangeKind::Deleted, .. });
/// ```
#[macro_export]
macro_rules! assert_emitted {
    ($events:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $events.iter().any(|e| matches!(e, $pattern $(if $guard)?)),
            "Expected event matching `{}` to be published, but got: {:?}",
            stringify!($pattern),
            $events
        );
    };
}

/// Assert that no event matching a pattern was published
#[macro_export]
macro_rules! assert_not_emitted {
    ($events:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$events.iter().any(|e| matches!(e, $pattern $(if $guard)?)),
            "Expected no event matching `{}`, but got: {:?}",
            stringify!($pattern),
            $events
        );
    };
}

/// Find the first event matching a pattern
#[macro_export]
macro_rules! find_emitted {
    ($events:expr, $pattern:pat $(if $guard:expr)?) => {
        $events.iter().find(|e| matches!(e, $pattern $(if $guard)?))
    };
}

/// Count the events matching a pattern
///
/// # Example
///
/// ```ignore
/// let events = recorder.drain_emitted();
/// assert_eq!(count_emitted!(events, ChangeEvent { kind: ChangeKind::ClearedAll, .. }), 1);
/// ```
#[macro_export]
macro_rules! count_emitted {
    ($events:expr, $pattern:pat $(if $guard:expr)?) => {
        $events.iter().filter(|e| matches!(e, $pattern $(if $guard)?)).count()
    };
}
