//! Ambient cookie jar abstraction
//!
//! The jar is the browser's per-origin text key-value store. Reading returns
//! every visible cookie as one `name=value; name=value` string; writing takes
//! one assignment line with opaque attributes (`path`, `max-age`,
//! `samesite`) that only the jar understands.

use std::cell::RefCell;
use std::time::Duration;

use tokio::time::Instant;

/// The ambient per-origin cookie store
///
/// Implementations hold all state; adapters on top of a jar cache nothing.
pub trait CookieJar {
    /// Full jar contents in `document.cookie` format
    fn read(&self) -> String;

    /// Apply one `name=value; attr=...` assignment
    fn write(&self, assignment: &str);
}

#[derive(Debug, Clone)]
struct JarEntry {
    name: String,
    value: String,
    /// `None` for session cookies
    expires_at: Option<Instant>,
    /// Written with `max-age <= 0`; dropped on the next read
    tombstone: bool,
}

impl JarEntry {
    fn is_live(&self, now: Instant) -> bool {
        !self.tombstone && self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-memory jar with browser semantics
///
/// - entries keep insertion order; rewriting a name replaces it in place
/// - `max-age=0` leaves a tombstone that the next [`read`](CookieJar::read)
///   purges
/// - positive `max-age` values expire against the tokio clock
#[derive(Debug, Default)]
pub struct MemoryJar {
    entries: RefCell<Vec<JarEntry>>,
}

impl MemoryJar {
    /// Create an empty jar
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a jar from a raw `document.cookie` string
    ///
    /// Items are stored verbatim as session cookies. An item without `=` is
    /// kept as a nameless cookie, the way browsers keep it.
    pub fn from_cookie_string(raw: &str) -> Self {
        let entries = raw
            .split(';')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                let (name, value) = item.split_once('=').unwrap_or(("", item));
                JarEntry {
                    name: name.to_string(),
                    value: value.to_string(),
                    expires_at: None,
                    tombstone: false,
                }
            })
            .collect();
        Self {
            entries: RefCell::new(entries),
        }
    }

    /// Number of entries still stored, tombstones included
    pub fn stored_len(&self) -> usize {
        self.entries.borrow().len()
    }

    fn purge(&self, now: Instant) {
        self.entries.borrow_mut().retain(|entry| entry.is_live(now));
    }
}

impl CookieJar for MemoryJar {
    fn read(&self) -> String {
        self.purge(Instant::now());
        self.entries
            .borrow()
            .iter()
            .map(|entry| {
                if entry.name.is_empty() {
                    entry.value.clone()
                } else {
                    format!("{}={}", entry.name, entry.value)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn write(&self, assignment: &str) {
        let mut parts = assignment.split(';');
        let pair = parts.next().unwrap_or_default().trim();
        let (name, value) = pair.split_once('=').unwrap_or(("", pair));
        let name = name.trim().to_string();

        let max_age = parts
            .filter_map(|attr| attr.trim().split_once('='))
            .find(|(attr, _)| attr.trim().eq_ignore_ascii_case("max-age"))
            .and_then(|(_, seconds)| seconds.trim().parse::<i64>().ok());

        let (tombstone, expires_at) = match max_age {
            Some(seconds) if seconds <= 0 => (true, None),
            // An expiry past what `Instant` can hold never expires.
            Some(seconds) => (
                false,
                Instant::now().checked_add(Duration::from_secs(seconds.unsigned_abs())),
            ),
            None => (false, None),
        };

        let entry = JarEntry {
            name,
            value: value.to_string(),
            expires_at,
            tombstone,
        };

        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|existing| existing.name == entry.name) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }
}

/// Jar backed by `document.cookie`
#[cfg(feature = "browser")]
pub struct DocumentJar {
    document: web_sys::HtmlDocument,
}

#[cfg(feature = "browser")]
impl DocumentJar {
    /// Bind to the current window's document
    ///
    /// Returns `None` outside a browser page.
    pub fn from_window() -> Option<Self> {
        use wasm_bindgen::JsCast;

        let document = web_sys::window()?.document()?;
        document
            .dyn_into::<web_sys::HtmlDocument>()
            .ok()
            .map(|document| Self { document })
    }
}

#[cfg(feature = "browser")]
impl CookieJar for DocumentJar {
    fn read(&self) -> String {
        self.document.cookie().unwrap_or_default()
    }

    fn write(&self, assignment: &str) {
        if let Err(error) = self.document.set_cookie(assignment) {
            tracing::warn!(?error, "document.cookie write rejected");
        }
    }
}
