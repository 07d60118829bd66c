//! Pre-built UI units for proxy-console
//!
//! Each unit implements [`Unit`](proxy_console_core::Unit) and is driven by a
//! [`UnitHost`](proxy_console_core::UnitHost). Units receive the page's store,
//! definitions and fetcher at construction from a
//! [`PageContext`](proxy_console_core::PageContext).
//!
//! # Units
//!
//! - [`CookieTable`] - Active proxy cookies with a delete action per row
//! - [`CookieForm`] - Set a control cookie or clear them all
//! - [`ApiDataViewer`] - Read-only statistics snapshot from the proxy
//! - [`StatsCard`] - Titled label/value card
//! - [`TopNav`] - Navigation banner with the current page marked
//!
//! # Example
//!
//! ```ignore
//! use proxy_console_components::{CookieForm, CookieTable};
//!
//! let table = UnitHost::new(CookieTable::new(&page), &page)?;
//! let form = UnitHost::new(CookieForm::new(&page), &page)?;
//! table.mount().await?;
//! form.mount().await?;
//!
//! // The table re-renders through the bus; the form never talks to it directly
//! form.update(|state| Some(form.unit().submit(&state.cloned().unwrap_or_default(), Some("mitm-debug"), "true")));
//! assert!(table.html().contains("mitm-debug"));
//! ```

mod api_data_viewer;
mod cookie_form;
mod cookie_table;
mod form_builder;
mod stats_card;
mod top_nav;

pub use api_data_viewer::{render_json_object, ApiDataViewer, Snapshot, ViewerState};
pub use cookie_form::{
    CookieForm, FormMessage, FormState, MessageKind, CLEAR_SUCCESS, MESSAGE_TIMEOUT, SET_SUCCESS,
};
pub use cookie_table::{CookieTable, EMPTY_STATE};
pub use form_builder::{FormBuilder, DEFAULT_PLACEHOLDER};
pub use stats_card::{Stat, StatsCard, StatsCardData};
pub use top_nav::{default_links, NavLink, NavState, TopNav};

/// Asset locations of the pre-built units
pub mod asset_urls {
    pub use crate::api_data_viewer::{STYLE_URL as API_DATA_VIEWER_STYLE, TEMPLATE_URL as API_DATA_VIEWER_TEMPLATE};
    pub use crate::cookie_form::{STYLE_URL as COOKIE_FORM_STYLE, TEMPLATE_URL as COOKIE_FORM_TEMPLATE};
    pub use crate::cookie_table::{STYLE_URL as COOKIE_TABLE_STYLE, TEMPLATE_URL as COOKIE_TABLE_TEMPLATE};
    pub use crate::top_nav::STYLE_URL as TOP_NAV_STYLE;
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ApiDataViewer, CookieForm, CookieTable, FormBuilder, FormState, NavLink, Stat, StatsCard,
        StatsCardData, TopNav,
    };
}
