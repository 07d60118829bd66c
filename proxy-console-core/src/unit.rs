//! UI unit lifecycle
//!
//! A [`Unit`] describes one self-contained piece of the console: the assets
//! it needs, the change events it listens to, how it loads its data and how
//! that data renders to markup. A [`UnitHost`] drives the unit through its
//! phases:
//!
//! ```text
//! Unmounted -> LoadingAssets -> LoadingData -> Ready (re-render on change) -> Unmounted
//!                    |               |
//!                    +-> Failed <----+        (retry re-runs the failed phase)
//! ```
//!
//! The template is in place before the host subscribes or loads data, so a
//! render always has a container to fill. Rendering into a root that lacks
//! the unit's slot is skipped, never an error.
//!
//! # Example
//!
//! ```ignore
//! struct Greeting;
//!
//! impl Unit for Greeting {
//!     type State = String;
//!
//!     fn name(&self) -> &'static str { "greeting" }
//!     fn slot(&self) -> &str { "greeting" }
//!
//!     async fn load(&self, _current: Option<&String>) -> Result<String, FetchError> {
//!         Ok("hello".to_string())
//!     }
//!
//!     fn render(&self, state: &String) -> String {
//!         format!("<p>{}</p>", escape(state))
//!     }
//! }
//!
//! let host = UnitHost::new(Greeting, &page)?;
//! host.mount().await?;
//! assert_eq!(host.html(), "<p>hello</p>");
//! ```

use std::cell::RefCell;
use std::fmt::Debug;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::assets::{with_timeout, AssetLoader, LoadPlan, UnitAssets};
use crate::bus::EventBus;
use crate::error::{FetchError, UnitError};
use crate::event::{ChangeEvent, EventMask, SubscriptionId};
use crate::markup::{error_panel, RenderRoot, Template};
use crate::page::PageContext;

/// A renderable piece of UI with its own state
pub trait Unit: 'static {
    /// Internal state, replaced wholesale on every update
    type State: Clone + Debug + 'static;

    /// Name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Slot of the template that [`render`](Unit::render) output fills
    fn slot(&self) -> &str;

    /// Presentation assets to load before any data
    fn assets(&self) -> UnitAssets {
        UnitAssets::none()
    }

    /// Change events that trigger [`refresh`](Unit::refresh)
    fn subscriptions(&self) -> EventMask {
        EventMask::empty()
    }

    /// Produce the unit's data
    ///
    /// `current` is the state set before the load started, if any.
    fn load(
        &self,
        current: Option<&Self::State>,
    ) -> impl Future<Output = Result<Self::State, FetchError>>;

    /// Next state after a change event, or `None` to keep the current one
    fn refresh(&self, _event: &ChangeEvent, _current: Option<&Self::State>) -> Option<Self::State> {
        None
    }

    /// Markup for `state`
    ///
    /// Must be a pure function of `state`: the host calls it again on every
    /// update and replaces the whole slot with its output.
    fn render(&self, state: &Self::State) -> String;

    /// Placeholder shown while the first data load is in flight
    fn render_loading(&self) -> Option<String> {
        None
    }
}

/// Lifecycle phase of a hosted unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitPhase {
    Unmounted,
    LoadingAssets,
    LoadingData,
    Ready,
    Failed(UnitError),
}

impl UnitPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, UnitPhase::LoadingAssets | UnitPhase::LoadingData)
    }
}

struct UnitCell<S> {
    phase: UnitPhase,
    state: Option<S>,
    root: RenderRoot,
    subscriptions: Vec<SubscriptionId>,
    /// Bumped on every state replacement; a load that started under an
    /// older epoch is stale
    epoch: u64,
    renders: usize,
}

impl<S> Default for UnitCell<S> {
    fn default() -> Self {
        Self {
            phase: UnitPhase::Unmounted,
            state: None,
            root: RenderRoot::new(),
            subscriptions: Vec::new(),
            epoch: 0,
            renders: 0,
        }
    }
}

impl<S> UnitCell<S> {
    fn replace_state(&mut self, state: S) {
        self.state = Some(state);
        self.epoch += 1;
    }
}

/// Fill the unit's slot from its current state
fn render_into<U: Unit>(unit: &U, cell: &mut UnitCell<U::State>) {
    let Some(state) = &cell.state else {
        return;
    };
    let markup = unit.render(state);
    if cell.root.fill(unit.slot(), markup) {
        cell.renders += 1;
    } else {
        debug!(
            unit = unit.name(),
            slot = unit.slot(),
            "Render target not in place, skipping"
        );
    }
}

/// Drives one [`Unit`] through mount, updates and unmount
pub struct UnitHost<U: Unit> {
    unit: Rc<U>,
    plan: LoadPlan,
    bus: Rc<EventBus<ChangeEvent>>,
    loader: Rc<AssetLoader>,
    timeout: Duration,
    cell: Rc<RefCell<UnitCell<U::State>>>,
    cancel: RefCell<CancellationToken>,
}

impl<U: Unit> std::fmt::Debug for UnitHost<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cell = self.cell.borrow();
        f.debug_struct("UnitHost")
            .field("unit", &self.unit.name())
            .field("phase", &cell.phase)
            .field("subscriptions", &cell.subscriptions.len())
            .field("renders", &cell.renders)
            .finish()
    }
}

impl<U: Unit> UnitHost<U> {
    /// Register a unit on a page
    ///
    /// Resolves the unit's script dependencies into a load order once, here,
    /// so a broken dependency graph is reported before anything is fetched.
    pub fn new(unit: U, page: &PageContext) -> Result<Self, UnitError> {
        let plan = LoadPlan::resolve(&unit.assets()).map_err(|source| UnitError::Registration {
            unit: unit.name(),
            source,
        })?;
        debug!(unit = unit.name(), scripts = plan.scripts.len(), "Unit registered");
        Ok(Self {
            unit: Rc::new(unit),
            plan,
            bus: Rc::clone(page.bus()),
            loader: Rc::clone(page.loader()),
            timeout: page.config().fetch_timeout(),
            cell: Rc::new(RefCell::new(UnitCell::default())),
            cancel: RefCell::new(CancellationToken::new()),
        })
    }

    pub fn unit(&self) -> &U {
        &self.unit
    }

    pub fn phase(&self) -> UnitPhase {
        self.cell.borrow().phase.clone()
    }

    /// Copy of the current state
    pub fn state(&self) -> Option<U::State> {
        self.cell.borrow().state.clone()
    }

    /// Current markup of the unit's render root
    pub fn html(&self) -> String {
        self.cell.borrow().root.html()
    }

    /// Number of renders that reached the slot
    pub fn render_count(&self) -> usize {
        self.cell.borrow().renders
    }

    /// Number of bus subscriptions currently held
    pub fn subscription_count(&self) -> usize {
        self.cell.borrow().subscriptions.len()
    }

    /// Token that cancels the mount or reload in flight
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.borrow().clone()
    }

    fn set_phase(&self, phase: UnitPhase) {
        debug!(unit = self.unit.name(), ?phase, "Unit phase");
        self.cell.borrow_mut().phase = phase;
    }

    /// Load assets, subscribe, load data and render
    ///
    /// A unit that is already loading or ready is left alone. Failures are
    /// rendered into the root as an error panel and also returned.
    pub async fn mount(&self) -> Result<(), UnitError> {
        {
            let cell = self.cell.borrow();
            if cell.phase.is_loading() || cell.phase == UnitPhase::Ready {
                return Ok(());
            }
        }
        let token = CancellationToken::new();
        *self.cancel.borrow_mut() = token.clone();

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(UnitError::Cancelled),
            result = self.mount_inner() => result,
        };
        if let Err(error) = &result {
            self.fail(error.clone());
        }
        result
    }

    async fn mount_inner(&self) -> Result<(), UnitError> {
        self.set_phase(UnitPhase::LoadingAssets);
        self.loader.ready(&self.plan).await?;
        let template = match &self.plan.template {
            Some(url) => self.loader.template(url).await?,
            None => Template::bare(self.unit.slot()),
        };
        {
            let mut cell = self.cell.borrow_mut();
            cell.root.set_template(template);
            render_into(&*self.unit, &mut cell);
        }
        self.subscribe();
        self.load_data().await
    }

    fn subscribe(&self) {
        let mask = self.unit.subscriptions();
        if mask.is_empty() || !self.cell.borrow().subscriptions.is_empty() {
            return;
        }
        let unit = Rc::clone(&self.unit);
        let cell = Rc::downgrade(&self.cell);
        let ids = self
            .bus
            .subscribe_many(&mask.event_types(), move |event: &ChangeEvent| {
                let Some(cell) = cell.upgrade() else {
                    return Ok(());
                };
                let mut cell = cell.try_borrow_mut()?;
                if let Some(next) = unit.refresh(event, cell.state.as_ref()) {
                    cell.replace_state(next);
                    render_into(&*unit, &mut cell);
                }
                Ok(())
            });
        debug!(unit = self.unit.name(), count = ids.len(), "Unit subscribed");
        self.cell.borrow_mut().subscriptions = ids;
    }

    async fn load_data(&self) -> Result<(), UnitError> {
        let (epoch, current) = {
            let mut cell = self.cell.borrow_mut();
            cell.phase = UnitPhase::LoadingData;
            if cell.state.is_none() {
                if let Some(loading) = self.unit.render_loading() {
                    cell.root.fill(self.unit.slot(), loading);
                }
            }
            (cell.epoch, cell.state.clone())
        };

        let loaded = with_timeout(
            self.unit.name(),
            self.timeout,
            self.unit.load(current.as_ref()),
        )
        .await;

        let mut cell = self.cell.borrow_mut();
        if cell.epoch != epoch {
            debug!(unit = self.unit.name(), "Discarding stale data load");
            if cell.phase == UnitPhase::LoadingData {
                cell.phase = UnitPhase::Ready;
            }
            return Ok(());
        }
        if cell.phase != UnitPhase::LoadingData {
            return Ok(());
        }
        let state = loaded.map_err(UnitError::DataFetch)?;
        cell.replace_state(state);
        cell.phase = UnitPhase::Ready;
        render_into(&*self.unit, &mut cell);
        debug!(unit = self.unit.name(), "Unit ready");
        Ok(())
    }

    fn fail(&self, error: UnitError) {
        let mut cell = self.cell.borrow_mut();
        if cell.phase == UnitPhase::Unmounted {
            debug!(unit = self.unit.name(), %error, "Dropping failure of unmounted unit");
            return;
        }
        debug!(unit = self.unit.name(), %error, "Unit failed");
        let panel = error_panel(error.headline(), &error.reason());
        if !cell.root.fill(self.unit.slot(), panel.clone()) {
            cell.root.set_fallback(panel);
        }
        cell.phase = UnitPhase::Failed(error);
    }

    /// Replace the state wholesale and render
    pub fn set_data(&self, state: U::State) {
        let mut cell = self.cell.borrow_mut();
        cell.replace_state(state);
        if matches!(cell.phase, UnitPhase::Failed(UnitError::DataFetch(_))) {
            cell.phase = UnitPhase::Ready;
        }
        render_into(&*self.unit, &mut cell);
    }

    /// Compute the next state from a copy of the current one
    ///
    /// No borrow is held while `f` runs, so it may write to the store.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(Option<&U::State>) -> Option<U::State>,
    {
        let current = self.state();
        if let Some(next) = f(current.as_ref()) {
            self.set_data(next);
        }
    }

    /// Re-run the data phase
    ///
    /// Does nothing unless the template is in place.
    pub async fn reload(&self) -> Result<(), UnitError> {
        match self.phase() {
            UnitPhase::Ready | UnitPhase::Failed(UnitError::DataFetch(_)) => {}
            _ => return Ok(()),
        }
        let token = self.cancel_token();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(UnitError::Cancelled),
            result = self.load_data() => result,
        };
        if let Err(error) = &result {
            self.fail(error.clone());
        }
        result
    }

    /// Re-run whichever phase failed
    pub async fn retry(&self) -> Result<(), UnitError> {
        match self.phase() {
            UnitPhase::Failed(UnitError::DataFetch(_)) => self.reload().await,
            UnitPhase::Failed(_) => self.mount().await,
            _ => Ok(()),
        }
    }

    /// Cancel pending work, release subscriptions, drop state and markup
    pub fn unmount(&self) {
        self.cancel.borrow().cancel();
        let ids = {
            let mut cell = self.cell.borrow_mut();
            let ids = std::mem::take(&mut cell.subscriptions);
            cell.state = None;
            cell.epoch += 1;
            cell.root.clear();
            cell.phase = UnitPhase::Unmounted;
            ids
        };
        let released = self.bus.unsubscribe_all(&ids);
        debug!(unit = self.unit.name(), released, "Unit unmounted");
    }
}

impl<U: Unit> Drop for UnitHost<U> {
    fn drop(&mut self) {
        let ids = match self.cell.try_borrow_mut() {
            Ok(mut cell) => std::mem::take(&mut cell.subscriptions),
            Err(_) => return,
        };
        self.bus.unsubscribe_all(&ids);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::ConsoleConfig;
    use crate::event::EventType;
    use crate::jar::MemoryJar;
    use crate::markup::escape;
    use crate::store::CookieStore;
    use crate::testing::StaticFetcher;

    struct Probe {
        store: Rc<CookieStore>,
        assets: UnitAssets,
        refreshes: Rc<Cell<usize>>,
    }

    impl Unit for Probe {
        type State = BTreeMap<String, String>;

        fn name(&self) -> &'static str {
            "probe"
        }

        fn slot(&self) -> &str {
            "probe"
        }

        fn assets(&self) -> UnitAssets {
            self.assets.clone()
        }

        fn subscriptions(&self) -> EventMask {
            EventMask::ANY_CHANGE
        }

        async fn load(&self, _current: Option<&Self::State>) -> Result<Self::State, FetchError> {
            Ok(self.store.list("mitm-"))
        }

        fn refresh(&self, _event: &ChangeEvent, _current: Option<&Self::State>) -> Option<Self::State> {
            self.refreshes.set(self.refreshes.get() + 1);
            Some(self.store.list("mitm-"))
        }

        fn render(&self, state: &Self::State) -> String {
            state
                .iter()
                .map(|(key, value)| format!("<li>{}={}</li>", escape(key), escape(value)))
                .collect()
        }
    }

    /// Unit whose data is the body of one URL
    struct Remote {
        fetcher: Rc<StaticFetcher>,
    }

    impl Unit for Remote {
        type State = String;

        fn name(&self) -> &'static str {
            "remote"
        }

        fn slot(&self) -> &str {
            "remote"
        }

        async fn load(&self, _current: Option<&String>) -> Result<String, FetchError> {
            use crate::assets::Fetcher;
            self.fetcher.fetch_text("/data").await
        }

        fn render(&self, state: &String) -> String {
            format!("<p>{}</p>", escape(state))
        }

        fn render_loading(&self) -> Option<String> {
            Some("<p>loading</p>".to_string())
        }
    }

    fn page(fetcher: Rc<StaticFetcher>, timeout: Duration) -> PageContext {
        PageContext::new(
            ConsoleConfig::default().with_fetch_timeout(timeout),
            Rc::new(MemoryJar::new()),
            fetcher,
        )
    }

    fn probe(page: &PageContext, assets: UnitAssets) -> (UnitHost<Probe>, Rc<Cell<usize>>) {
        let refreshes = Rc::new(Cell::new(0));
        let unit = Probe {
            store: Rc::clone(page.store()),
            assets,
            refreshes: Rc::clone(&refreshes),
        };
        (UnitHost::new(unit, page).unwrap(), refreshes)
    }

    #[tokio::test]
    async fn test_mount_renders_into_template() {
        let fetcher = Rc::new(
            StaticFetcher::new()
                .with("/probe.html", "<ul><!-- slot:probe --></ul>")
                .with("/probe.css", "ul {}"),
        );
        let page = page(fetcher, Duration::from_secs(1));
        page.store().set("mitm-debug", "true").unwrap();
        let (host, _) = probe(
            &page,
            UnitAssets::none().template("/probe.html").style("/probe.css"),
        );

        host.mount().await.unwrap();

        assert_eq!(host.phase(), UnitPhase::Ready);
        assert_eq!(host.html(), "<ul><li>mitm-debug=true</li></ul>");
        assert!(page.head_markup().contains("ul {}"));
    }

    #[tokio::test]
    async fn test_change_event_rerenders() {
        let page = page(Rc::new(StaticFetcher::new()), Duration::from_secs(1));
        let (host, refreshes) = probe(&page, UnitAssets::none());
        host.mount().await.unwrap();
        assert_eq!(host.html(), "");

        page.store().set("mitm-show", "x").unwrap();

        assert_eq!(refreshes.get(), 1);
        assert_eq!(host.html(), "<li>mitm-show=x</li>");
    }

    #[tokio::test]
    async fn test_render_is_idempotent() {
        let page = page(Rc::new(StaticFetcher::new()), Duration::from_secs(1));
        page.store().set("mitm-mode", "a").unwrap();
        let (host, _) = probe(&page, UnitAssets::none());
        host.mount().await.unwrap();

        let first = host.html();
        host.set_data(host.state().unwrap());
        assert_eq!(host.html(), first);
        assert_eq!(host.render_count(), 2);
    }

    #[tokio::test]
    async fn test_unmount_releases_subscriptions() {
        let page = page(Rc::new(StaticFetcher::new()), Duration::from_secs(1));
        let (host, refreshes) = probe(&page, UnitAssets::none());
        host.mount().await.unwrap();
        assert_eq!(host.subscription_count(), 3);
        assert_eq!(page.bus().subscriber_count(EventType::CookieChanged), 1);

        host.unmount();
        page.store().set("mitm-show", "x").unwrap();
        page.store().clear_all("mitm-");

        assert_eq!(refreshes.get(), 0);
        assert!(page.bus().is_empty());
        assert_eq!(host.phase(), UnitPhase::Unmounted);
        assert_eq!(host.html(), "");
    }

    #[tokio::test]
    async fn test_set_data_before_mount_waits_for_template() {
        let fetcher = Rc::new(StaticFetcher::new().with("/probe.html", "<ul><!-- slot:other --></ul>"));
        let page = page(fetcher, Duration::from_secs(1));
        let (host, _) = probe(&page, UnitAssets::none().template("/probe.html"));

        let mut state = BTreeMap::new();
        state.insert("mitm-a".to_string(), "1".to_string());
        host.set_data(state);
        assert_eq!(host.render_count(), 0);

        // Template without the unit's slot: renders are skipped, not errors
        host.mount().await.unwrap();
        assert_eq!(host.render_count(), 0);
        assert_eq!(host.html(), "<ul></ul>");
    }

    #[tokio::test]
    async fn test_asset_failure_shows_error_panel() {
        let fetcher = Rc::new(StaticFetcher::new().with_status("/probe.html", 404, "Not Found"));
        let page = page(fetcher.clone(), Duration::from_secs(1));
        let (host, _) = probe(&page, UnitAssets::none().template("/probe.html"));

        let error = host.mount().await.unwrap_err();

        assert!(matches!(error, UnitError::AssetLoad(_)));
        assert!(matches!(host.phase(), UnitPhase::Failed(UnitError::AssetLoad(_))));
        assert!(host.html().contains("Failed to Load Component"));
        assert!(host.html().contains("data-action=\"retry\""));
        assert_eq!(host.subscription_count(), 0);

        fetcher.insert("/probe.html", "<ul><!-- slot:probe --></ul>");
        host.retry().await.unwrap();
        assert_eq!(host.phase(), UnitPhase::Ready);
        assert_eq!(host.html(), "<ul></ul>");
    }

    #[test]
    fn test_registration_rejects_bad_dependency_graph() {
        let page = page(Rc::new(StaticFetcher::new()), Duration::from_secs(1));
        let unit = Probe {
            store: Rc::clone(page.store()),
            assets: UnitAssets::none()
                .script(crate::assets::Dependency::new("a", "/a.js").requires(&["missing"])),
            refreshes: Rc::new(Cell::new(0)),
        };
        let error = UnitHost::new(unit, &page).unwrap_err();
        assert!(matches!(error, UnitError::Registration { unit: "probe", .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_data_load_times_out() {
        let fetcher = Rc::new(StaticFetcher::new().with_stall("/data"));
        let page = page(fetcher.clone(), Duration::from_millis(500));
        let host = UnitHost::new(Remote { fetcher: fetcher.clone() }, &page).unwrap();

        let error = host.mount().await.unwrap_err();

        assert!(matches!(error, UnitError::DataFetch(FetchError::Timeout { .. })));
        assert!(host.html().contains("Failed to Load Data"));

        fetcher.insert("/data", "back");
        host.retry().await.unwrap();
        assert_eq!(host.html(), "<p>back</p>");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_load_is_discarded() {
        let fetcher = Rc::new(StaticFetcher::new().with_delay("/data", "slow", Duration::from_millis(300)));
        let page = page(fetcher.clone(), Duration::from_secs(5));
        let host = UnitHost::new(Remote { fetcher }, &page).unwrap();

        let ((), mounted) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                assert_eq!(host.html(), "<p>loading</p>");
                host.set_data("fresh".to_string());
            },
            host.mount()
        );

        mounted.unwrap();
        assert_eq!(host.state().as_deref(), Some("fresh"));
        assert_eq!(host.html(), "<p>fresh</p>");
        assert_eq!(host.phase(), UnitPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_cancels_mount() {
        let fetcher = Rc::new(StaticFetcher::new().with_stall("/data"));
        let page = page(fetcher.clone(), Duration::from_secs(60));
        let host = UnitHost::new(Remote { fetcher }, &page).unwrap();

        let (mounted, ()) = tokio::join!(host.mount(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            host.unmount();
        });

        assert_eq!(mounted, Err(UnitError::Cancelled));
        assert_eq!(host.phase(), UnitPhase::Unmounted);
        assert_eq!(host.html(), "");
    }
}
