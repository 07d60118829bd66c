//! Core traits and types for proxy-console
//!
//! This crate provides the lifecycle and state-synchronization layer of the
//! proxy admin console: self-contained UI units that load their own assets,
//! own their state and re-render deterministically, kept consistent with the
//! cookie jar through a shared event bus.
//!
//! # Core Concepts
//!
//! - **CookieStore**: list/set/remove/clear over the ambient cookie jar,
//!   publishing a change event after every write
//! - **EventBus**: synchronous pub/sub with per-handler error isolation
//! - **Unit**: one renderable piece of UI, driven by a [`UnitHost`]
//! - **AssetLoader**: idempotent style, template and script loading
//! - **DefinitionTable**: declared control cookies with strict parse/format
//! - **PageContext**: the page root that owns and hands out all of the above
//!
//! # Basic Example
//!
//! ```ignore
//! use proxy_console_core::prelude::*;
//!
//! let page = PageContext::new(ConsoleConfig::default(), jar, fetcher);
//!
//! let hits = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&hits);
//! page.bus().subscribe(EventType::CookieChanged, move |_event| {
//!     counter.set(counter.get() + 1);
//!     Ok(())
//! });
//!
//! page.store().set("mitm-debug", "true")?;
//! assert_eq!(hits.get(), 1);
//! ```
//!
//! # Submission Pattern
//!
//! Form input is validated against the definitions table before it reaches
//! the store. A rejected submission writes nothing and publishes nothing:
//!
//! ```ignore
//! match validate_submission(page.definitions(), Some("mitm-rating"), "5") {
//!     Ok(submission) => page.store().set(&submission.key, &submission.value)?,
//!     Err(error) => show_message(&error.to_string()),
//! }
//! ```

pub mod assets;
pub mod bus;
pub mod config;
pub mod definition;
pub mod error;
pub mod event;
#[cfg(feature = "http")]
pub mod http;
pub mod jar;
pub mod markup;
pub mod page;
pub mod store;
pub mod testing;
pub mod unit;

// Store exports
pub use jar::{CookieJar, MemoryJar};
pub use store::{
    parse_cookie_string, parse_jar_items, CookieAttributes, CookieStore, JarItem, PersistentEntry,
    SameSite, DEFAULT_MAX_AGE,
};

#[cfg(feature = "browser")]
pub use jar::DocumentJar;

// Event system exports
pub use bus::{Delivery, EventBus, HandlerResult};
pub use event::{BusEvent, ChangeEvent, ChangeKind, EventMask, EventType, SubscriptionId};

// Unit lifecycle exports
pub use assets::{with_timeout, AssetLoader, Dependency, FetchFuture, Fetcher, LoadPlan, UnitAssets};
pub use markup::{error_panel, escape, RenderRoot, Template};
pub use page::PageContext;
pub use unit::{Unit, UnitHost, UnitPhase};

#[cfg(feature = "http")]
pub use http::HttpFetcher;

// Definition exports
pub use definition::{
    validate_submission, ChoiceOption, DefinitionEntry, DefinitionTable, InputKind, NumericRange,
    Submission, TypedValue, ValueDomain,
};

pub use config::ConsoleConfig;
pub use error::{AssetError, FetchError, HandlerError, StoreError, UnitError, ValidationError};

// Testing exports
pub use testing::{EventRecorder, StaticFetcher};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::assets::{Dependency, Fetcher, UnitAssets};
    pub use crate::bus::{EventBus, HandlerResult};
    pub use crate::config::ConsoleConfig;
    pub use crate::definition::{
        validate_submission, DefinitionEntry, DefinitionTable, InputKind, Submission,
    };
    pub use crate::error::{FetchError, UnitError, ValidationError};
    pub use crate::event::{ChangeEvent, ChangeKind, EventMask, EventType};
    pub use crate::jar::{CookieJar, MemoryJar};
    pub use crate::markup::escape;
    pub use crate::page::PageContext;
    pub use crate::store::CookieStore;
    pub use crate::unit::{Unit, UnitHost, UnitPhase};

    #[cfg(feature = "http")]
    pub use crate::http::HttpFetcher;
}
