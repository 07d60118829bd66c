//! Read-only view of the proxy's statistics snapshot
//!
//! Fetches `{timestamp, stats, cookies, request, server}` from the admin
//! endpoint and renders each object as an indented JSON listing, followed by
//! the pretty-printed document. Refreshing is a reload of the host:
//!
//! ```ignore
//! let viewer = UnitHost::new(ApiDataViewer::new(&page), &page)?;
//! viewer.mount().await?;
//! viewer.reload().await?;
//! ```

use std::rc::Rc;

use proxy_console_core::{escape, FetchError, Fetcher, PageContext, Unit, UnitAssets};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TEMPLATE_URL: &str = "components/api-data-viewer/api-data-viewer.html";
pub const STYLE_URL: &str = "components/api-data-viewer/api-data-viewer.css";

/// Indentation per nesting level of the JSON listing, in pixels
const INDENT_PX: usize = 20;

/// Server-reported statistics document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// ISO 8601 time the snapshot was taken
    pub timestamp: String,
    #[serde(default)]
    pub stats: Map<String, Value>,
    #[serde(default)]
    pub cookies: Map<String, Value>,
    #[serde(default)]
    pub request: Map<String, Value>,
    #[serde(default)]
    pub server: Map<String, Value>,
}

/// Loaded snapshot plus the document it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub snapshot: Snapshot,
    pub raw: Value,
}

impl ViewerState {
    /// Interpret a fetched document
    pub fn from_value(url: &str, raw: Value) -> Result<Self, FetchError> {
        let snapshot = Snapshot::deserialize(&raw).map_err(|error| FetchError::Decode {
            url: url.to_string(),
            reason: error.to_string(),
        })?;
        Ok(Self { snapshot, raw })
    }
}

/// Statistics snapshot viewer
pub struct ApiDataViewer {
    fetcher: Rc<dyn Fetcher>,
    endpoint: String,
}

impl ApiDataViewer {
    pub fn new(page: &PageContext) -> Self {
        Self {
            fetcher: Rc::clone(page.fetcher()),
            endpoint: page.config().api_data_endpoint.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "<span class=\"null\">null</span>".to_string(),
        Value::Bool(flag) => format!("<span class=\"boolean\">{flag}</span>"),
        Value::Number(number) => format!("<span class=\"number\">{number}</span>"),
        Value::String(text) => format!("<span class=\"string\">\"{}\"</span>", escape(text)),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(_) => escape(&value.to_string()),
    }
}

/// Render an object as an indented listing of its keys
///
/// Nested objects are listed recursively one level deeper; an empty object
/// renders as `{}`.
pub fn render_json_object(object: &Map<String, Value>, level: usize) -> String {
    if object.is_empty() {
        return "{}".to_string();
    }
    let margin = level * INDENT_PX;
    object
        .iter()
        .map(|(key, value)| {
            let key = escape(key);
            match value {
                Value::Object(nested) => format!(
                    "<div class=\"json-line\" style=\"margin-left: {margin}px\">\
                     <span class=\"json-key\">\"{key}\"</span>: {{{}\
                     <div style=\"margin-left: {margin}px\">}}</div>\
                     </div>",
                    render_json_object(nested, level + 1)
                ),
                _ => format!(
                    "<div class=\"json-line\" style=\"margin-left: {margin}px\">\
                     <span class=\"json-key\">\"{key}\"</span>: {}\
                     </div>",
                    format_value(value)
                ),
            }
        })
        .collect()
}

fn section(title: &str, object: &Map<String, Value>) -> String {
    format!(
        "<div class=\"data-section\"><h4>{title}</h4><div class=\"json-display\">{}</div></div>",
        render_json_object(object, 0)
    )
}

impl Unit for ApiDataViewer {
    type State = ViewerState;

    fn name(&self) -> &'static str {
        "api-data-viewer"
    }

    fn slot(&self) -> &str {
        "api-data"
    }

    fn assets(&self) -> UnitAssets {
        UnitAssets::none().style(STYLE_URL).template(TEMPLATE_URL)
    }

    async fn load(&self, _current: Option<&ViewerState>) -> Result<ViewerState, FetchError> {
        let raw = self.fetcher.fetch_json(&self.endpoint).await?;
        ViewerState::from_value(&self.endpoint, raw)
    }

    fn render(&self, state: &ViewerState) -> String {
        let snapshot = &state.snapshot;
        let raw = serde_json::to_string_pretty(&state.raw).unwrap_or_else(|_| state.raw.to_string());
        format!(
            "<div class=\"data-header\">\
             <div><h3>\u{1f4ca} Live API Data</h3>\
             <p class=\"timestamp\">Last updated: {}</p></div>\
             <button class=\"btn btn-refresh\" data-action=\"refresh\">\u{1f504} Refresh</button>\
             </div>\
             <div class=\"data-sections\">{}{}{}{}</div>\
             <div class=\"data-section\"><h4>\u{1f4c4} Raw JSON</h4>\
             <div class=\"raw-json\"><pre><code>{}</code></pre></div></div>",
            escape(&snapshot.timestamp),
            section("\u{1f4c8} Statistics", &snapshot.stats),
            section("\u{1f36a} Cookie Summary", &snapshot.cookies),
            section("\u{1f310} Request Information", &snapshot.request),
            section("\u{2699}\u{fe0f} Server Information", &snapshot.server),
            escape(&raw)
        )
    }

    fn render_loading(&self) -> Option<String> {
        Some(
            "<div class=\"loading-state\"><div class=\"spinner\"></div><p>Loading API data...</p></div>"
                .to_string(),
        )
    }
}
