//! Page assembly

use clap::ValueEnum;
use proxy_console::components::ViewerState;
use proxy_console::prelude::*;
use proxy_console::with_timeout;
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Admin pages the console can assemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Page {
    Dashboard,
    Cookies,
    ApiData,
}

impl Page {
    pub fn path(self) -> &'static str {
        match self {
            Page::Dashboard => "/mitm-proxy/index.html",
            Page::Cookies => "/mitm-proxy/cookies.html",
            Page::ApiData => "/mitm-proxy/api-data.html",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Dashboard => "MITM Proxy Admin - Dashboard",
            Page::Cookies => "MITM Proxy Admin - Cookie Management",
            Page::ApiData => "MITM Proxy Admin - API Data",
        }
    }
}

/// Request shown on the dashboard's request card
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub host: String,
    pub path: String,
}

const PROXY_STATS: [(&str, &str); 4] = [
    ("Total Requests", "total_requests"),
    ("Total Responses", "total_responses"),
    ("Bytes Processed", "total_bytes_processed"),
    ("Content Modifications", "content_modifications"),
];

/// Mount a unit and return its markup
///
/// A failed unit still contributes its error panel.
async fn mount<U: Unit>(host: &UnitHost<U>) -> String {
    if let Err(error) = host.mount().await {
        warn!(unit = host.unit().name(), %error, "Unit failed to mount");
    }
    host.html()
}

/// Build the full HTML document for `kind`
pub async fn render(kind: Page, page: &PageContext, request: &RequestInfo) -> Result<String, UnitError> {
    let nav = UnitHost::new(TopNav::new(kind.path()), page)?;
    let mut body = vec![mount(&nav).await];

    match kind {
        Page::Dashboard => body.extend(dashboard(page, request).await?),
        Page::Cookies => {
            let form = UnitHost::new(CookieForm::new(page), page)?;
            let table = UnitHost::new(CookieTable::new(page), page)?;
            let (form_html, table_html) = tokio::join!(mount(&form), mount(&table));
            body.push(form_html);
            body.push(table_html);
        }
        Page::ApiData => {
            let viewer = UnitHost::new(ApiDataViewer::new(page), page)?;
            body.push(mount(&viewer).await);
        }
    }

    info!(page = ?kind, fetches = page.loader().fetch_count(), "Page assembled");
    Ok(document(kind.title(), &page.head_markup(), &body.join("\n")))
}

async fn dashboard(page: &PageContext, request: &RequestInfo) -> Result<Vec<String>, UnitError> {
    let cookies = page.store().list(&page.config().cookie_prefix);
    let cards = [
        ("proxy-stats", proxy_stats(page).await),
        ("cookie-status", StatsCardData::cookie_status(&cookies)),
        (
            "current-request",
            StatsCardData::new(
                "\u{1f310} Current Request",
                vec![
                    Stat::new("Host", &request.host),
                    Stat::new("Method", "GET"),
                    Stat::new("Path", &request.path),
                ],
            ),
        ),
    ];

    let mut markup = Vec::with_capacity(cards.len());
    for (slot, data) in cards {
        let card = UnitHost::new(StatsCard::new(slot), page)?;
        card.set_data(data);
        markup.push(mount(&card).await);
    }
    Ok(markup)
}

/// Proxy counters from the snapshot endpoint, zeros when it is unreachable
async fn proxy_stats(page: &PageContext) -> StatsCardData {
    let endpoint = page.config().api_data_endpoint.as_str();
    let fetched = with_timeout(
        endpoint,
        page.config().fetch_timeout(),
        page.fetcher().fetch_json(endpoint),
    )
    .await
    .and_then(|raw| ViewerState::from_value(endpoint, raw));
    let stats = match fetched {
        Ok(state) => state.snapshot.stats,
        Err(error) => {
            warn!(endpoint, %error, "Proxy statistics unavailable");
            Map::new()
        }
    };

    let rows = PROXY_STATS
        .iter()
        .map(|&(label, key)| {
            let value = stats.get(key).and_then(Value::as_u64).unwrap_or(0);
            if key == "total_bytes_processed" {
                Stat::new(label, group_thousands(value))
            } else {
                Stat::new(label, value)
            }
        })
        .collect();
    StatsCardData::new("\u{1f4ca} Proxy Statistics", rows)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

fn document(title: &str, head: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n{head}\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape(title)
    )
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::bundled::BundledFetcher;

    fn page(cookies: &str) -> PageContext {
        PageContext::new(
            ConsoleConfig::default(),
            Rc::new(MemoryJar::from_cookie_string(cookies)),
            Rc::new(BundledFetcher),
        )
    }

    fn request() -> RequestInfo {
        RequestInfo {
            host: "localhost".to_string(),
            path: "/".to_string(),
        }
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_024), "1,024");
        assert_eq!(group_thousands(5_242_880), "5,242,880");
    }

    #[tokio::test]
    async fn test_cookies_page_holds_form_and_table() {
        let page = page("mitm-debug=true; session=abc");
        let html = render(Page::Cookies, &page, &request()).await.unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("id=\"cookieForm\""));
        assert!(html.contains("data-cookie=\"mitm-debug\""));
        assert!(!html.contains("session"));
        assert!(html.contains("class=\"active\">Cookies</a>"));
        assert_eq!(html.matches("data-asset=\"form-builder\"").count(), 1);
    }

    #[tokio::test]
    async fn test_dashboard_reads_bundled_snapshot() {
        let page = page("mitm-show=url-to-html-xxx");
        let html = render(Page::Dashboard, &page, &request()).await.unwrap();

        assert!(html.contains("<span class=\"stat-value\">1284</span>"));
        assert!(html.contains("<span class=\"stat-value\">5,242,880</span>"));
        assert!(html.contains("url-to-html-xxx"));
        assert!(html.contains("Current Request"));
    }

    #[tokio::test]
    async fn test_unreachable_snapshot_shows_error_panel() {
        let page = PageContext::new(
            ConsoleConfig::default().with_api_data_endpoint("/missing.json"),
            Rc::new(MemoryJar::new()),
            Rc::new(BundledFetcher),
        );
        let html = render(Page::ApiData, &page, &request()).await.unwrap();

        assert!(html.contains("HTTP 404: Not Found"));
        assert!(html.contains("data-action=\"retry\""));
    }
}
