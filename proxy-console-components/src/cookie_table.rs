//! Table of the proxy cookies currently set

use std::collections::BTreeMap;
use std::rc::Rc;

use proxy_console_core::{
    escape, ChangeEvent, CookieStore, EventMask, FetchError, PageContext, StoreError, Unit,
    UnitAssets,
};

pub const TEMPLATE_URL: &str = "components/cookie-table/cookie-table.html";
pub const STYLE_URL: &str = "components/cookie-table/cookie-table.css";

/// Shown instead of an empty table
pub const EMPTY_STATE: &str = "No proxy cookies are currently active";

/// Lists every prefixed cookie with a delete action per row
///
/// The table re-reads the store on every change event. Deleting a row goes
/// through [`CookieStore::remove`], which publishes the resulting event; the
/// table itself never publishes.
pub struct CookieTable {
    store: Rc<CookieStore>,
    prefix: String,
}

impl CookieTable {
    pub fn new(page: &PageContext) -> Self {
        Self {
            store: Rc::clone(page.store()),
            prefix: page.config().cookie_prefix.clone(),
        }
    }

    /// Row delete action
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.store.remove(name)
    }

    fn current(&self) -> BTreeMap<String, String> {
        self.store.list(&self.prefix)
    }
}

impl Unit for CookieTable {
    type State = BTreeMap<String, String>;

    fn name(&self) -> &'static str {
        "cookie-table"
    }

    fn slot(&self) -> &str {
        "cookie-table"
    }

    fn assets(&self) -> UnitAssets {
        UnitAssets::none().style(STYLE_URL).template(TEMPLATE_URL)
    }

    fn subscriptions(&self) -> EventMask {
        EventMask::ANY_CHANGE
    }

    async fn load(&self, _current: Option<&Self::State>) -> Result<Self::State, FetchError> {
        Ok(self.current())
    }

    fn refresh(&self, _event: &ChangeEvent, _current: Option<&Self::State>) -> Option<Self::State> {
        Some(self.current())
    }

    fn render(&self, cookies: &Self::State) -> String {
        if cookies.is_empty() {
            return format!("<div class=\"empty-state\">{EMPTY_STATE}</div>");
        }

        let rows: String = cookies
            .iter()
            .map(|(name, value)| {
                let name = escape(name);
                format!(
                    "<tr>\
                     <td><strong>{name}</strong></td>\
                     <td class=\"cookie-value\">{}</td>\
                     <td class=\"cookie-actions\">\
                     <button class=\"btn-delete\" data-cookie=\"{name}\" title=\"Delete this cookie\">\u{1f5d1}\u{fe0f} Delete</button>\
                     </td>\
                     </tr>",
                    escape(value)
                )
            })
            .collect();

        format!(
            "<table class=\"cookie-table\">\
             <thead><tr><th>Cookie Name</th><th>Value</th><th>Actions</th></tr></thead>\
             <tbody>{rows}</tbody>\
             </table>"
        )
    }
}
