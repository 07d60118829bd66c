//! Event types for the pub/sub system

use std::fmt::Debug;
use std::hash::Hash;

use bitflags::bitflags;

/// Handle returned by [`EventBus::subscribe`](crate::EventBus::subscribe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// A payload that can travel over an [`EventBus`](crate::EventBus)
///
/// The event type is the topic subscribers register for; the payload is
/// delivered by reference to every handler of that topic.
pub trait BusEvent: Debug + 'static {
    /// Topic identifier
    type Type: Copy + Eq + Hash + Debug + 'static;

    /// Topic this event is published under
    fn event_type(&self) -> Self::Type;
}

/// What happened to the cookie jar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A key was written
    Changed,
    /// A key was tombstoned
    Deleted,
    /// Every key under a prefix was tombstoned in one batch
    ClearedAll,
}

/// Event types units can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    CookieChanged,
    CookieDeleted,
    CookiesCleared,
}

impl EventType {
    /// All change event types, in publication-kind order
    pub const ALL: [EventType; 3] = [
        EventType::CookieChanged,
        EventType::CookieDeleted,
        EventType::CookiesCleared,
    ];

    /// Wire name of the event (as dispatched on the page)
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::CookieChanged => "cookie-changed",
            EventType::CookieDeleted => "cookie-deleted",
            EventType::CookiesCleared => "cookies-cleared",
        }
    }
}

bitflags! {
    /// Set of event types a unit listens to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventMask: u8 {
        const CHANGED = 1 << 0;
        const DELETED = 1 << 1;
        const CLEARED_ALL = 1 << 2;
        const ANY_CHANGE = Self::CHANGED.bits() | Self::DELETED.bits() | Self::CLEARED_ALL.bits();
    }
}

impl EventMask {
    /// Expand the mask into the event types it contains
    pub fn event_types(self) -> Vec<EventType> {
        EventType::ALL
            .into_iter()
            .filter(|ty| self.contains(EventMask::from(*ty)))
            .collect()
    }
}

impl From<EventType> for EventMask {
    fn from(ty: EventType) -> Self {
        match ty {
            EventType::CookieChanged => EventMask::CHANGED,
            EventType::CookieDeleted => EventMask::DELETED,
            EventType::CookiesCleared => EventMask::CLEARED_ALL,
        }
    }
}

/// Notification published by the cookie store after every successful write
///
/// Events are a freshness nudge, not a source of truth: a unit that
/// subscribes after a write never sees it and must read the store itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub key: Option<String>,
    pub value: Option<String>,
}

impl ChangeEvent {
    pub fn changed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Changed,
            key: Some(key.into()),
            value: Some(value.into()),
        }
    }

    pub fn deleted(key: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            key: Some(key.into()),
            value: None,
        }
    }

    pub fn cleared_all() -> Self {
        Self {
            kind: ChangeKind::ClearedAll,
            key: None,
            value: None,
        }
    }
}

impl BusEvent for ChangeEvent {
    type Type = EventType;

    fn event_type(&self) -> EventType {
        match self.kind {
            ChangeKind::Changed => EventType::CookieChanged,
            ChangeKind::Deleted => EventType::CookieDeleted,
            ChangeKind::ClearedAll => EventType::CookiesCleared,
        }
    }
}
