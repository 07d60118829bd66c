//! Cookie store adapter
//!
//! [`CookieStore`] wraps a [`CookieJar`] with list/set/remove/clear
//! operations and publishes a [`ChangeEvent`] after every successful write.
//! It keeps no state of its own: every [`list`](CookieStore::list) reflects
//! the jar at call time.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use proxy_console_core::{CookieAttributes, CookieStore, EventBus, MemoryJar};
//!
//! let bus = Rc::new(EventBus::new());
//! let store = CookieStore::new(Rc::new(MemoryJar::new()), bus, CookieAttributes::default());
//!
//! store.set("mitm-replace", "old:new; v=2").unwrap();
//! assert_eq!(
//!     store.list("mitm-").get("mitm-replace").map(String::as_str),
//!     Some("old:new; v=2")
//! );
//! ```

use std::collections::BTreeMap;
use std::rc::Rc;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::bus::EventBus;
use crate::error::StoreError;
use crate::event::ChangeEvent;
use crate::jar::CookieJar;

/// Default lifetime of a control cookie, in seconds
pub const DEFAULT_MAX_AGE: u64 = 360_000;

/// `SameSite` attribute carried on writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Opaque write parameters understood only by the jar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub path: String,
    pub same_site: SameSite,
    /// Lifetime used by [`CookieStore::set`]
    pub default_max_age: u64,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            same_site: SameSite::Lax,
            default_max_age: DEFAULT_MAX_AGE,
        }
    }
}

/// One cookie-backed control value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentEntry {
    pub key: String,
    pub value: String,
    pub max_age: u64,
}

impl PersistentEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, max_age: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            max_age,
        }
    }

    /// Entry that logically deletes `key`
    pub fn tombstone(key: impl Into<String>) -> Self {
        Self::new(key, "", 0)
    }

    pub fn is_tombstone(&self) -> bool {
        self.max_age == 0
    }

    /// Serialize into a jar assignment
    ///
    /// Only characters that would corrupt the jar are escaped, so values
    /// like `old:new` or `google/gemini-2.0-flash-lite-001` reach the proxy
    /// as written.
    pub fn to_assignment(&self, attributes: &CookieAttributes) -> String {
        let name = utf8_percent_encode(&self.key, NAME_ESCAPES).to_string();
        let value = utf8_percent_encode(&self.value, VALUE_ESCAPES).to_string();
        assignment(&name, &value, self.max_age, attributes)
    }
}

/// Escaped in names: controls, whitespace, `%` and the jar delimiters
const NAME_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'%')
    .add(b';')
    .add(b'=')
    .add(b',');

/// Escaped in values: a value may keep its `=`, the jar splits on the first one
const VALUE_ESCAPES: &AsciiSet = &CONTROLS.add(b' ').add(b'%').add(b';').add(b',');

fn assignment(name: &str, value: &str, max_age: u64, attributes: &CookieAttributes) -> String {
    let mut assignment = format!("{name}={value}; path={}; max-age={max_age}", attributes.path);
    if max_age > 0 {
        assignment.push_str("; samesite=");
        assignment.push_str(attributes.same_site.as_str());
    }
    assignment
}

/// One item of a raw jar string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JarItem {
    /// Name exactly as the jar holds it
    pub raw_name: String,
    /// Decoded name
    pub key: String,
    /// Decoded value
    pub value: String,
}

/// Split a raw jar string into its items
///
/// Items are separated by `;`. Each item splits on its FIRST `=` only, so a
/// value that itself contains `=` is kept whole. Items without `=`, with an
/// empty name, or with escapes that do not decode to UTF-8 are skipped.
pub fn parse_jar_items(raw: &str) -> Vec<JarItem> {
    raw.split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| {
            let Some((name, value)) = item.split_once('=') else {
                trace!(item, "Skipping cookie item without '='");
                return None;
            };
            let name = name.trim();
            if name.is_empty() {
                trace!(item, "Skipping cookie item with empty name");
                return None;
            }
            let decoded = (
                percent_decode_str(name).decode_utf8(),
                percent_decode_str(value.trim()).decode_utf8(),
            );
            match decoded {
                (Ok(key), Ok(value)) => Some(JarItem {
                    raw_name: name.to_string(),
                    key: key.into_owned(),
                    value: value.into_owned(),
                }),
                _ => {
                    trace!(item, "Skipping cookie item with undecodable escapes");
                    None
                }
            }
        })
        .collect()
}

/// Split a raw jar string into decoded `(key, value)` pairs
pub fn parse_cookie_string(raw: &str) -> Vec<(String, String)> {
    parse_jar_items(raw)
        .into_iter()
        .map(|item| (item.key, item.value))
        .collect()
}

/// Adapter between the cookie jar and the event bus
pub struct CookieStore {
    jar: Rc<dyn CookieJar>,
    bus: Rc<EventBus<ChangeEvent>>,
    attributes: CookieAttributes,
}

impl std::fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieStore")
            .field("attributes", &self.attributes)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl CookieStore {
    pub fn new(
        jar: Rc<dyn CookieJar>,
        bus: Rc<EventBus<ChangeEvent>>,
        attributes: CookieAttributes,
    ) -> Self {
        Self {
            jar,
            bus,
            attributes,
        }
    }

    /// Bus this store publishes on
    pub fn bus(&self) -> &Rc<EventBus<ChangeEvent>> {
        &self.bus
    }

    pub fn attributes(&self) -> &CookieAttributes {
        &self.attributes
    }

    /// Every cookie whose decoded key starts with `prefix`
    ///
    /// If the jar holds the same key twice, the first occurrence wins.
    pub fn list(&self, prefix: &str) -> BTreeMap<String, String> {
        let mut entries = BTreeMap::new();
        for (key, value) in parse_cookie_string(&self.jar.read()) {
            if key.starts_with(prefix) {
                entries.entry(key).or_insert(value);
            }
        }
        entries
    }

    /// Current value of a single key
    pub fn get(&self, key: &str) -> Option<String> {
        parse_cookie_string(&self.jar.read())
            .into_iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Write `key` with the default lifetime and publish `Changed`
    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_with_max_age(key, value, self.attributes.default_max_age)
    }

    /// Write `key` with an explicit lifetime and publish `Changed`
    ///
    /// A lifetime of zero is a delete and is handled by
    /// [`remove`](Self::remove).
    pub fn set_with_max_age(&self, key: &str, value: &str, max_age: u64) -> Result<(), StoreError> {
        if max_age == 0 {
            return self.remove(key);
        }
        let entry = PersistentEntry::new(key, value, max_age);
        self.write_entry(&entry)?;
        debug!(key, max_age, "Cookie set");
        self.bus.publish(ChangeEvent::changed(entry.key, entry.value));
        Ok(())
    }

    /// Tombstone `key` and publish `Deleted`
    ///
    /// Every jar name that decodes to `key` is tombstoned, so cookies written
    /// with a different escaping are removed too.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let raw_names: Vec<String> = parse_jar_items(&self.jar.read())
            .into_iter()
            .filter(|item| item.key == key)
            .map(|item| item.raw_name)
            .collect();
        if raw_names.is_empty() {
            self.write_entry(&PersistentEntry::tombstone(key))?;
        }
        for raw_name in &raw_names {
            self.write_tombstone(raw_name)?;
        }
        debug!(key, "Cookie removed");
        self.bus.publish(ChangeEvent::deleted(key));
        Ok(())
    }

    /// Tombstone every key under `prefix` and publish one `ClearedAll`
    ///
    /// The aggregate event is published even when nothing matched. Returns
    /// the number of jar items removed.
    pub fn clear_all(&self, prefix: &str) -> usize {
        let mut removed = 0;
        for item in parse_jar_items(&self.jar.read()) {
            if !item.key.starts_with(prefix) {
                continue;
            }
            match self.write_tombstone(&item.raw_name) {
                Ok(()) => removed += 1,
                Err(error) => debug!(name = %item.raw_name, %error, "Cookie not cleared"),
            }
        }
        debug!(prefix, removed, "Cookies cleared");
        self.bus.publish(ChangeEvent::cleared_all());
        removed
    }

    /// Tombstone a name exactly as the jar holds it
    fn write_tombstone(&self, raw_name: &str) -> Result<(), StoreError> {
        if raw_name.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        self.jar.write(&assignment(raw_name, "", 0, &self.attributes));
        Ok(())
    }

    fn write_entry(&self, entry: &PersistentEntry) -> Result<(), StoreError> {
        if entry.key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        self.jar.write(&entry.to_assignment(&self.attributes));
        Ok(())
    }
}
