//! Assets compiled into the binary

use proxy_console::components::asset_urls::*;
use proxy_console::{FetchError, FetchFuture, Fetcher};
use tracing::trace;

/// Snapshot served in place of a running proxy
pub const SNAPSHOT_URL: &str = "/mitm-proxy/admin-ui.json";

const BUNDLE: &[(&str, &str)] = &[
    (
        TOP_NAV_STYLE,
        include_str!("../assets/components/top-nav/top-nav.css"),
    ),
    (
        COOKIE_TABLE_TEMPLATE,
        include_str!("../assets/components/cookie-table/cookie-table.html"),
    ),
    (
        COOKIE_TABLE_STYLE,
        include_str!("../assets/components/cookie-table/cookie-table.css"),
    ),
    (
        COOKIE_FORM_TEMPLATE,
        include_str!("../assets/components/cookie-form/html/cookie-form.html"),
    ),
    (
        COOKIE_FORM_STYLE,
        include_str!("../assets/components/cookie-form/css/cookie-form.css"),
    ),
    (
        "components/cookie-form/js/cookie-definitions.js",
        include_str!("../assets/components/cookie-form/js/cookie-definitions.js"),
    ),
    (
        "components/cookie-form/js/form-builder.js",
        include_str!("../assets/components/cookie-form/js/form-builder.js"),
    ),
    (
        "components/cookie-form/js/message-handler.js",
        include_str!("../assets/components/cookie-form/js/message-handler.js"),
    ),
    (
        "components/cookie-form/js/event-handlers.js",
        include_str!("../assets/components/cookie-form/js/event-handlers.js"),
    ),
    (
        API_DATA_VIEWER_TEMPLATE,
        include_str!("../assets/components/api-data-viewer/api-data-viewer.html"),
    ),
    (
        API_DATA_VIEWER_STYLE,
        include_str!("../assets/components/api-data-viewer/api-data-viewer.css"),
    ),
    (SNAPSHOT_URL, include_str!("../assets/mitm-proxy/admin-ui.json")),
];

/// Serves the bundled copies of every unit asset
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledFetcher;

impl Fetcher for BundledFetcher {
    fn fetch_text<'a>(&'a self, url: &'a str) -> FetchFuture<'a, String> {
        Box::pin(async move {
            trace!(url, "Serving bundled asset");
            BUNDLE
                .iter()
                .find(|(path, _)| *path == url)
                .map(|(_, body)| body.to_string())
                .ok_or_else(|| FetchError::Status {
                    status: 404,
                    reason: "Not Found".to_string(),
                })
        })
    }
}
