//! Several units mounted on one page

use std::rc::Rc;

use proxy_console::components::asset_urls::*;
use proxy_console::components::{FormState, StatsCardData, EMPTY_STATE, SET_SUCCESS};
use proxy_console::prelude::*;
use proxy_console::{count_emitted, EventRecorder, StaticFetcher};

const FORM_SCRIPTS: [&str; 4] = [
    "components/cookie-form/js/event-handlers.js",
    "components/cookie-form/js/form-builder.js",
    "components/cookie-form/js/cookie-definitions.js",
    "components/cookie-form/js/message-handler.js",
];

fn cookies_page_fetcher() -> StaticFetcher {
    let fetcher = StaticFetcher::new()
        .with(
            COOKIE_TABLE_TEMPLATE,
            "<div class=\"cookie-table-container\"><!-- slot:cookie-table --></div>",
        )
        .with(COOKIE_TABLE_STYLE, ".cookie-table {}")
        .with(
            COOKIE_FORM_TEMPLATE,
            "<div class=\"cookie-form-container\"><!-- slot:cookie-form --></div>",
        )
        .with(COOKIE_FORM_STYLE, ".cookie-form {}")
        .with(TOP_NAV_STYLE, ".top-nav {}");
    FORM_SCRIPTS
        .iter()
        .fold(fetcher, |fetcher, url| fetcher.with(url, "/* script */"))
}

fn page(fetcher: Rc<StaticFetcher>) -> PageContext {
    PageContext::new(
        ConsoleConfig::default(),
        Rc::new(MemoryJar::from_cookie_string("session=abc")),
        fetcher,
    )
}

#[tokio::test]
async fn test_form_submission_reaches_the_table() {
    let page = page(Rc::new(cookies_page_fetcher()));
    let table = UnitHost::new(CookieTable::new(&page), &page).unwrap();
    let form = UnitHost::new(CookieForm::new(&page), &page).unwrap();
    table.mount().await.unwrap();
    form.mount().await.unwrap();
    assert!(table.html().contains(EMPTY_STATE));
    let mut recorder = EventRecorder::attach(page.bus());

    form.update(|state| {
        let current = state.cloned().unwrap_or_default();
        Some(form.unit().submit(&current, Some("mitm-debug"), "true"))
    });

    assert!(table.html().contains("data-cookie=\"mitm-debug\""));
    assert!(form.html().contains(SET_SUCCESS));
    let events = recorder.drain_emitted();
    assert_eq!(count_emitted!(events, ChangeEvent { kind: ChangeKind::Changed, .. }), 1);
}

#[tokio::test]
async fn test_table_delete_reaches_the_form() {
    let page = page(Rc::new(cookies_page_fetcher()));
    page.store().set("mitm-mode", "xxx").unwrap();
    let table = UnitHost::new(CookieTable::new(&page), &page).unwrap();
    let form = UnitHost::new(CookieForm::new(&page), &page).unwrap();
    table.mount().await.unwrap();
    form.mount().await.unwrap();
    form.update(|state| {
        let current = state.cloned().unwrap_or_default();
        Some(form.unit().select(&current, Some("mitm-mode")))
    });
    assert!(form.html().contains("Current value: <code>xxx</code>"));

    table.unit().delete("mitm-mode").unwrap();

    assert_eq!(form.state().and_then(|state| state.current_value), None);
    assert!(!form.html().contains("Current value"));
    assert!(table.html().contains(EMPTY_STATE));
}

#[tokio::test]
async fn test_clear_all_resets_every_unit() {
    let page = page(Rc::new(cookies_page_fetcher()));
    page.store().set("mitm-show", "x").unwrap();
    page.store().set("mitm-debug", "true").unwrap();
    let table = UnitHost::new(CookieTable::new(&page), &page).unwrap();
    let form = UnitHost::new(CookieForm::new(&page), &page).unwrap();
    table.mount().await.unwrap();
    form.mount().await.unwrap();

    form.update(|state| Some(form.unit().clear_all(&state.cloned().unwrap_or_default())));

    assert_eq!(table.state(), Some(Default::default()));
    assert!(table.html().contains(EMPTY_STATE));
    assert_eq!(page.store().get("session").as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_shared_assets_are_fetched_once_per_page() {
    let fetcher = Rc::new(cookies_page_fetcher());
    let page = page(Rc::clone(&fetcher));
    let first = UnitHost::new(CookieTable::new(&page), &page).unwrap();
    let second = UnitHost::new(CookieTable::new(&page), &page).unwrap();
    let form = UnitHost::new(CookieForm::new(&page), &page).unwrap();

    let (a, b, c) = tokio::join!(first.mount(), second.mount(), form.mount());
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    assert_eq!(fetcher.request_count(COOKIE_TABLE_STYLE), 1);
    assert_eq!(fetcher.request_count(COOKIE_TABLE_TEMPLATE), 1);
    for url in FORM_SCRIPTS {
        assert_eq!(fetcher.request_count(url), 1, "{url}");
    }
    let head = page.head_markup();
    assert_eq!(head.matches("data-asset=\"form-builder\"").count(), 1);
    assert_eq!(head.matches("<style").count(), 2);
    // cookie-definitions must be initialized before form-builder
    let definitions = head.find("cookie-definitions").unwrap();
    let builder = head.find("data-asset=\"form-builder\"").unwrap();
    assert!(definitions < builder);
}

#[tokio::test]
async fn test_unit_without_template_renders_into_its_own_slot() {
    let page = page(Rc::new(cookies_page_fetcher()));
    let nav = UnitHost::new(TopNav::new("/mitm-proxy/cookies.html"), &page).unwrap();
    let card = UnitHost::new(StatsCard::new("cookie-status"), &page).unwrap();
    card.set_data(StatsCardData::cookie_status(&page.store().list("mitm-")));

    nav.mount().await.unwrap();
    card.mount().await.unwrap();

    assert!(nav.html().contains("class=\"active\">Cookies</a>"));
    assert!(card.html().contains("Active Proxy Cookies"));
    assert_eq!(nav.phase(), UnitPhase::Ready);
}

#[tokio::test]
async fn test_unmounted_units_stop_receiving_changes() {
    let page = page(Rc::new(cookies_page_fetcher()));
    let table = UnitHost::new(CookieTable::new(&page), &page).unwrap();
    table.mount().await.unwrap();
    let renders = table.render_count();

    table.unmount();
    page.store().set("mitm-show", "x").unwrap();

    assert_eq!(table.render_count(), renders);
    assert_eq!(table.subscription_count(), 0);
    assert_eq!(page.bus().len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_status_message_dismisses_itself() {
    let page = page(Rc::new(cookies_page_fetcher()));
    let form = UnitHost::new(CookieForm::new(&page), &page).unwrap();
    form.mount().await.unwrap();
    form.update(|_| Some(form.unit().submit(&FormState::default(), Some("mitm-debug"), "true")));
    assert!(form.html().contains(SET_SUCCESS));

    CookieForm::auto_dismiss(&form).await;

    assert!(!form.html().contains(SET_SUCCESS));
    assert_eq!(form.state().and_then(|state| state.message), None);
}
