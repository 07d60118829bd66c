//! proxy-console: component lifecycle and cookie-state synchronization for a
//! proxy admin console
//!
//! Units load their own assets, own their state and re-render from it. A
//! shared event bus keeps them consistent whenever any one of them writes to
//! the cookie jar.
//!
//! # Example
//! ```ignore
//! use proxy_console::prelude::*;
//!
//! let page = PageContext::new(ConsoleConfig::default(), Rc::new(MemoryJar::new()), fetcher);
//!
//! let table = UnitHost::new(CookieTable::new(&page), &page)?;
//! table.mount().await?;
//!
//! page.store().set("mitm-show", "url-to-html-xxx")?;
//! assert!(table.html().contains("url-to-html-xxx"));
//! ```

// Re-export everything from core
pub use proxy_console_core::*;

// Re-export the pre-built units
pub use proxy_console_components as components;
pub use proxy_console_components::{
    ApiDataViewer, CookieForm, CookieTable, FormBuilder, StatsCard, TopNav,
};

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use proxy_console_core::{BusEvent, CookieJar, Fetcher, Unit};

    // Store and events
    pub use proxy_console_core::{
        ChangeEvent, ChangeKind, CookieStore, EventBus, EventMask, EventType, MemoryJar,
    };

    // Lifecycle
    pub use proxy_console_core::{escape, PageContext, UnitAssets, UnitHost, UnitPhase};

    // Definitions
    pub use proxy_console_core::{validate_submission, DefinitionEntry, DefinitionTable};

    // Config and errors
    pub use proxy_console_core::{ConsoleConfig, FetchError, UnitError, ValidationError};

    #[cfg(feature = "http")]
    pub use proxy_console_core::HttpFetcher;

    // Units
    pub use proxy_console_components::prelude::*;
}
