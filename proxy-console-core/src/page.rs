//! Page assembly root
//!
//! One [`PageContext`] exists per page. It constructs the shared store,
//! event bus and asset loader and hands them to every unit, so units never
//! reach for a process-wide instance.
//!
//! ```ignore
//! let page = PageContext::new(ConsoleConfig::default(), jar, fetcher);
//!
//! let table = UnitHost::new(CookieTable::new(&page), &page)?;
//! let form = UnitHost::new(CookieForm::new(&page), &page)?;
//!
//! table.mount().await?;
//! form.mount().await?;
//! ```

use std::rc::Rc;

use crate::assets::{AssetLoader, Fetcher};
use crate::bus::EventBus;
use crate::config::ConsoleConfig;
use crate::definition::DefinitionTable;
use crate::event::ChangeEvent;
use crate::jar::CookieJar;
use crate::store::CookieStore;

/// Shared collaborators for the units on one page
pub struct PageContext {
    config: ConsoleConfig,
    bus: Rc<EventBus<ChangeEvent>>,
    store: Rc<CookieStore>,
    loader: Rc<AssetLoader>,
    definitions: Rc<DefinitionTable>,
}

impl std::fmt::Debug for PageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContext")
            .field("config", &self.config)
            .field("bus", &self.bus)
            .field("loader", &self.loader)
            .field("definitions", &self.definitions.len())
            .finish()
    }
}

impl PageContext {
    /// Build the page root with the default definitions table
    pub fn new(config: ConsoleConfig, jar: Rc<dyn CookieJar>, fetcher: Rc<dyn Fetcher>) -> Self {
        let bus = Rc::new(EventBus::new());
        let store = Rc::new(CookieStore::new(
            jar,
            Rc::clone(&bus),
            config.cookie_attributes(),
        ));
        let loader = Rc::new(AssetLoader::new(fetcher, config.fetch_timeout()));
        Self {
            config,
            bus,
            store,
            loader,
            definitions: Rc::new(DefinitionTable::mitm_defaults()),
        }
    }

    /// Replace the definitions table
    pub fn with_definitions(mut self, definitions: DefinitionTable) -> Self {
        self.definitions = Rc::new(definitions);
        self
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn bus(&self) -> &Rc<EventBus<ChangeEvent>> {
        &self.bus
    }

    pub fn store(&self) -> &Rc<CookieStore> {
        &self.store
    }

    pub fn loader(&self) -> &Rc<AssetLoader> {
        &self.loader
    }

    pub fn fetcher(&self) -> &Rc<dyn Fetcher> {
        self.loader.fetcher()
    }

    pub fn definitions(&self) -> &Rc<DefinitionTable> {
        &self.definitions
    }

    /// Styles and scripts initialized so far, for the page `<head>`
    pub fn head_markup(&self) -> String {
        self.loader.head_markup()
    }
}
