//! Titled card of label/value statistics

use std::collections::BTreeMap;

use proxy_console_core::{escape, FetchError, Unit};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub label: String,
    pub value: String,
}

impl Stat {
    pub fn new(label: impl Into<String>, value: impl ToString) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsCardData {
    pub title: String,
    pub stats: Vec<Stat>,
}

impl StatsCardData {
    pub fn new(title: impl Into<String>, stats: Vec<Stat>) -> Self {
        Self {
            title: title.into(),
            stats,
        }
    }

    /// Active proxy cookie count followed by one row per cookie
    pub fn cookie_status(cookies: &BTreeMap<String, String>) -> Self {
        let mut stats = vec![Stat::new("Active Proxy Cookies", cookies.len())];
        stats.extend(cookies.iter().map(|(name, value)| Stat::new(name.as_str(), value)));
        Self::new("\u{1f36a} Cookie Status", stats)
    }
}

/// Presentational card; data is pushed with `set_data`
///
/// Loads nothing of its own: mounting keeps whatever was set before.
#[derive(Debug, Clone)]
pub struct StatsCard {
    slot: String,
}

impl StatsCard {
    /// Card rendering into `slot`, so one page can hold several
    pub fn new(slot: impl Into<String>) -> Self {
        Self { slot: slot.into() }
    }
}

impl Default for StatsCard {
    fn default() -> Self {
        Self::new("stats-card")
    }
}

impl Unit for StatsCard {
    type State = StatsCardData;

    fn name(&self) -> &'static str {
        "stats-card"
    }

    fn slot(&self) -> &str {
        &self.slot
    }

    async fn load(&self, current: Option<&StatsCardData>) -> Result<StatsCardData, FetchError> {
        Ok(current.cloned().unwrap_or_default())
    }

    fn render(&self, data: &StatsCardData) -> String {
        let stats: String = data
            .stats
            .iter()
            .map(|stat| {
                format!(
                    "<div class=\"stat\"><span class=\"stat-label\">{}</span><span class=\"stat-value\">{}</span></div>",
                    escape(&stat.label),
                    escape(&stat.value)
                )
            })
            .collect();
        format!(
            "<div class=\"card\"><div class=\"card-title\">{}</div>{stats}</div>",
            escape(&data.title)
        )
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use proxy_console_core::{ConsoleConfig, MemoryJar, PageContext, StaticFetcher, UnitHost};

    #[test]
    fn test_cookie_status_rows() {
        let mut cookies = BTreeMap::new();
        cookies.insert("mitm-debug".to_string(), "true".to_string());
        let data = StatsCardData::cookie_status(&cookies);

        assert_eq!(data.stats[0], Stat::new("Active Proxy Cookies", 1));
        assert_eq!(data.stats[1], Stat::new("mitm-debug", "true"));
    }

    #[tokio::test]
    async fn test_data_set_before_mount_survives_mount() {
        let page = PageContext::new(
            ConsoleConfig::default(),
            Rc::new(MemoryJar::new()),
            Rc::new(StaticFetcher::new()),
        );
        let host = UnitHost::new(StatsCard::default(), &page).unwrap();
        host.set_data(StatsCardData::new(
            "\u{1f4ca} Proxy Statistics",
            vec![Stat::new("Total Requests", 0), Stat::new("Bytes Processed", "1,024")],
        ));

        host.mount().await.unwrap();

        let html = host.html();
        assert!(html.contains("<div class=\"card-title\">\u{1f4ca} Proxy Statistics</div>"));
        assert!(html.contains("<span class=\"stat-value\">1,024</span>"));
        assert_eq!(host.render_count(), 2);
    }
}
