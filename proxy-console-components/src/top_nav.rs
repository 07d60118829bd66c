//! Navigation banner shared by every admin page

use proxy_console_core::{escape, FetchError, Unit, UnitAssets};
use serde::{Deserialize, Serialize};

pub const STYLE_URL: &str = "components/top-nav/top-nav.css";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
    /// Marks the link active when the current path contains it
    pub page: String,
}

impl NavLink {
    pub fn new(label: &str, href: &str, page: &str) -> Self {
        Self {
            label: label.to_string(),
            href: href.to_string(),
            page: page.to_string(),
        }
    }

    pub fn is_active(&self, current_path: &str) -> bool {
        !self.page.is_empty() && current_path.contains(&self.page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavState {
    pub links: Vec<NavLink>,
    pub current_path: String,
}

/// Admin pages linked from the banner
pub fn default_links() -> Vec<NavLink> {
    vec![
        NavLink::new("Dashboard", "index.html", "index"),
        NavLink::new("Cookies", "cookies.html", "cookies"),
        NavLink::new("API Data", "api-data.html", "api-data"),
    ]
}

/// Banner with the current page's link marked active
#[derive(Debug, Clone)]
pub struct TopNav {
    links: Vec<NavLink>,
    current_path: String,
}

impl TopNav {
    pub fn new(current_path: impl Into<String>) -> Self {
        Self {
            links: default_links(),
            current_path: current_path.into(),
        }
    }

    pub fn with_links(mut self, links: Vec<NavLink>) -> Self {
        self.links = links;
        self
    }
}

impl Unit for TopNav {
    type State = NavState;

    fn name(&self) -> &'static str {
        "top-nav"
    }

    fn slot(&self) -> &str {
        "top-nav"
    }

    fn assets(&self) -> UnitAssets {
        UnitAssets::none().style(STYLE_URL)
    }

    async fn load(&self, current: Option<&NavState>) -> Result<NavState, FetchError> {
        Ok(current.cloned().unwrap_or_else(|| NavState {
            links: self.links.clone(),
            current_path: self.current_path.clone(),
        }))
    }

    fn render(&self, state: &NavState) -> String {
        let links: String = state
            .links
            .iter()
            .map(|link| {
                let class = if link.is_active(&state.current_path) {
                    " class=\"active\""
                } else {
                    ""
                };
                format!(
                    "<a href=\"{}\" data-page=\"{}\"{class}>{}</a>",
                    escape(&link.href),
                    escape(&link.page),
                    escape(&link.label)
                )
            })
            .collect();
        format!(
            "<nav class=\"top-nav\"><div class=\"nav-brand\">MITM Proxy Admin</div>\
             <div class=\"nav-links\">{links}</div></nav>"
        )
    }
}
