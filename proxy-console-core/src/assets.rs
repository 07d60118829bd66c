//! Presentation asset loading
//!
//! Units declare a style sheet, a structural template and the scripts their
//! markup depends on ([`UnitAssets`]). At registration the script graph is
//! resolved once into a [`LoadPlan`]; at mount the [`AssetLoader`] makes the
//! plan ready before the template is fetched.
//!
//! Loading is idempotent per asset identifier: a second request for an
//! asset that already loaded neither refetches it nor injects it into the
//! page head again, and concurrent requests share a single fetch. Failures
//! are not cached, so a manual retry fetches again.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{AssetError, FetchError};
use crate::markup::Template;

/// Boxed local future returned by [`Fetcher`] methods
pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + 'a>>;

/// External collaborator that serves assets and data by URL
pub trait Fetcher {
    /// GET `url` and return the body as text
    ///
    /// Non-2xx answers must surface as [`FetchError::Status`].
    fn fetch_text<'a>(&'a self, url: &'a str) -> FetchFuture<'a, String>;

    /// GET `url` and parse the body as JSON
    fn fetch_json<'a>(&'a self, url: &'a str) -> FetchFuture<'a, serde_json::Value> {
        Box::pin(async move {
            let text = self.fetch_text(url).await?;
            serde_json::from_str(&text).map_err(|error| FetchError::Decode {
                url: url.to_string(),
                reason: error.to_string(),
            })
        })
    }
}

/// Bound a fetch by `timeout`
pub async fn with_timeout<T, F>(url: &str, timeout: Duration, fetch: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    tokio::time::timeout(timeout, fetch)
        .await
        .unwrap_or_else(|_| {
            Err(FetchError::Timeout {
                url: url.to_string(),
                after: timeout,
            })
        })
}

/// A script a unit depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Identifier used for the presence check
    pub id: String,
    pub url: String,
    /// Ids that must be loaded first
    pub requires: Vec<String>,
}

impl Dependency {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            requires: Vec::new(),
        }
    }

    pub fn requires(mut self, ids: &[&str]) -> Self {
        self.requires.extend(ids.iter().map(|id| id.to_string()));
        self
    }
}

/// Presentation assets declared by a unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitAssets {
    pub style: Option<String>,
    pub template: Option<String>,
    pub scripts: Vec<Dependency>,
}

impl UnitAssets {
    /// No assets: the unit renders into a bare slot
    pub fn none() -> Self {
        Self::default()
    }

    pub fn style(mut self, url: impl Into<String>) -> Self {
        self.style = Some(url.into());
        self
    }

    pub fn template(mut self, url: impl Into<String>) -> Self {
        self.template = Some(url.into());
        self
    }

    pub fn script(mut self, dependency: Dependency) -> Self {
        self.scripts.push(dependency);
        self
    }
}

/// Assets in the order they must load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadPlan {
    /// Scripts, each after everything it requires
    pub scripts: Vec<Dependency>,
    pub style: Option<String>,
    pub template: Option<String>,
}

impl LoadPlan {
    /// Order a unit's scripts by their `requires` edges
    ///
    /// Declaration order is kept wherever the graph allows it.
    pub fn resolve(assets: &UnitAssets) -> Result<Self, AssetError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            dependency: &'a Dependency,
            by_id: &HashMap<&'a str, &'a Dependency>,
            marks: &mut HashMap<&'a str, Mark>,
            ordered: &mut Vec<Dependency>,
        ) -> Result<(), AssetError> {
            match marks.get(dependency.id.as_str()) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => return Err(AssetError::Cycle(dependency.id.clone())),
                None => {}
            }
            marks.insert(&dependency.id, Mark::Visiting);
            for required in &dependency.requires {
                let next = by_id.get(required.as_str()).copied().ok_or_else(|| {
                    AssetError::UnknownDependency {
                        dependent: dependency.id.clone(),
                        missing: required.clone(),
                    }
                })?;
                visit(next, by_id, marks, ordered)?;
            }
            marks.insert(&dependency.id, Mark::Done);
            ordered.push(dependency.clone());
            Ok(())
        }

        let by_id: HashMap<&str, &Dependency> = assets
            .scripts
            .iter()
            .map(|dependency| (dependency.id.as_str(), dependency))
            .collect();
        let mut marks = HashMap::new();
        let mut scripts = Vec::with_capacity(assets.scripts.len());
        for dependency in &assets.scripts {
            visit(dependency, &by_id, &mut marks, &mut scripts)?;
        }

        Ok(Self {
            scripts,
            style: assets.style.clone(),
            template: assets.template.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeadKind {
    Style,
    Script,
}

#[derive(Debug, Clone)]
struct HeadEntry {
    kind: HeadKind,
    id: String,
    body: Rc<str>,
}

/// Shared, idempotent loader for every unit on a page
pub struct AssetLoader {
    fetcher: Rc<dyn Fetcher>,
    timeout: Duration,
    /// One cell per URL; filled at most once
    cache: RefCell<HashMap<String, Rc<OnceCell<Rc<str>>>>>,
    /// Styles and scripts initialized on the page, in load order
    head: RefCell<Vec<HeadEntry>>,
    fetches: Cell<usize>,
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader")
            .field("timeout", &self.timeout)
            .field("cached", &self.cache.borrow().len())
            .field("fetches", &self.fetches.get())
            .finish_non_exhaustive()
    }
}

impl AssetLoader {
    pub fn new(fetcher: Rc<dyn Fetcher>, timeout: Duration) -> Self {
        Self {
            fetcher,
            timeout,
            cache: RefCell::new(HashMap::new()),
            head: RefCell::new(Vec::new()),
            fetches: Cell::new(0),
        }
    }

    /// The collaborator assets are fetched from
    pub fn fetcher(&self) -> &Rc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of network fetches actually issued
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }

    async fn load(&self, url: &str) -> Result<Rc<str>, AssetError> {
        let cell = Rc::clone(self.cache.borrow_mut().entry(url.to_string()).or_default());
        let body = cell
            .get_or_try_init(|| async {
                self.fetches.set(self.fetches.get() + 1);
                debug!(url, "Fetching asset");
                let text = with_timeout(url, self.timeout, self.fetcher.fetch_text(url)).await?;
                Ok::<_, FetchError>(Rc::<str>::from(text))
            })
            .await
            .map_err(|source| AssetError::Fetch {
                url: url.to_string(),
                source,
            })?;
        Ok(Rc::clone(body))
    }

    /// Whether a style or script with this identifier is initialized
    pub fn is_loaded(&self, id: &str) -> bool {
        self.head.borrow().iter().any(|entry| entry.id == id)
    }

    fn inject(&self, kind: HeadKind, id: &str, body: Rc<str>) {
        if self.is_loaded(id) {
            return;
        }
        debug!(id, ?kind, "Initializing asset");
        self.head.borrow_mut().push(HeadEntry {
            kind,
            id: id.to_string(),
            body,
        });
    }

    /// Load a style sheet and inject it into the page head once
    pub async fn ensure_style(&self, url: &str) -> Result<(), AssetError> {
        if self.is_loaded(url) {
            return Ok(());
        }
        let body = self.load(url).await?;
        self.inject(HeadKind::Style, url, body);
        Ok(())
    }

    /// Load a script dependency and initialize it once
    pub async fn ensure_script(&self, dependency: &Dependency) -> Result<(), AssetError> {
        if self.is_loaded(&dependency.id) {
            return Ok(());
        }
        let body = self.load(&dependency.url).await?;
        self.inject(HeadKind::Script, &dependency.id, body);
        Ok(())
    }

    /// Resolve when every script and the style of `plan` are initialized
    pub async fn ready(&self, plan: &LoadPlan) -> Result<(), AssetError> {
        for dependency in &plan.scripts {
            self.ensure_script(dependency).await?;
        }
        if let Some(style) = &plan.style {
            self.ensure_style(style).await?;
        }
        Ok(())
    }

    /// Fetch and parse a structural template
    pub async fn template(&self, url: &str) -> Result<Template, AssetError> {
        let source = self.load(url).await?;
        Ok(Template::parse(&source))
    }

    /// `<style>`/`<script>` elements for everything initialized so far
    pub fn head_markup(&self) -> String {
        self.head
            .borrow()
            .iter()
            .map(|entry| match entry.kind {
                HeadKind::Style => format!(
                    "<style data-asset=\"{}\">{}</style>",
                    crate::markup::escape(&entry.id),
                    entry.body
                ),
                HeadKind::Script => format!(
                    "<script data-asset=\"{}\">{}</script>",
                    crate::markup::escape(&entry.id),
                    entry.body
                ),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
