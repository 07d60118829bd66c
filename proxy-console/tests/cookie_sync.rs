//! Store, bus and unit behaviour across a whole page

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use proxy_console::components::{FormState, MessageKind};
use proxy_console::prelude::*;
use proxy_console::{assert_emitted, EventRecorder, StaticFetcher};

fn page_with(raw_jar: &str) -> PageContext {
    PageContext::new(
        ConsoleConfig::default(),
        Rc::new(MemoryJar::from_cookie_string(raw_jar)),
        Rc::new(StaticFetcher::new()),
    )
}

fn expected(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn test_set_then_list_round_trip() {
    let page = page_with("");
    page.store().set("mitm-show", "url-to-html-xxx").unwrap();
    assert_eq!(
        page.store().list("mitm-"),
        expected(&[("mitm-show", "url-to-html-xxx")])
    );
}

#[test]
fn test_remove_then_list_excludes_key() {
    let page = page_with("mitm-debug=true; mitm-show=x");
    page.store().remove("mitm-debug").unwrap();
    assert_eq!(page.store().list("mitm-"), expected(&[("mitm-show", "x")]));
}

#[test]
fn test_delimiters_survive_round_trip() {
    let page = page_with("");
    for value in ["a;b", "k=v", "old:new; x=y=z", "  padded  "] {
        page.store().set("mitm-replace", value).unwrap();
        assert_eq!(page.store().get("mitm-replace").as_deref(), Some(value));
    }
}

#[test]
fn test_clear_all_publishes_one_event_for_any_count() {
    for count in [0usize, 1, 7] {
        let page = page_with("session=keep");
        for n in 0..count {
            page.store().set(&format!("mitm-k{n}"), "v").unwrap();
        }
        let mut recorder = EventRecorder::attach(page.bus());

        page.store().clear_all("mitm-");

        let events = recorder.drain_emitted();
        assert_eq!(events, vec![ChangeEvent::cleared_all()], "count = {count}");
        assert_eq!(page.store().get("session").as_deref(), Some("keep"));
    }
}

#[test]
fn test_clear_all_scenario() {
    let page = page_with("");
    page.store().set("mitm-show", "x").unwrap();
    page.store().set("mitm-debug", "true").unwrap();
    let seen = Rc::new(Cell::new(0));
    let counter = Rc::clone(&seen);
    page.bus().subscribe(EventType::CookiesCleared, move |_event| {
        counter.set(counter.get() + 1);
        Ok(())
    });

    page.store().clear_all("mitm-");

    assert_eq!(page.store().list("mitm-"), BTreeMap::new());
    assert_eq!(seen.get(), 1);
}

#[test]
fn test_rating_scenario() {
    let page = page_with("");
    let form = CookieForm::new(&page);
    let mut recorder = EventRecorder::attach(page.bus());

    let accepted = form.submit(&FormState::default(), Some("mitm-rating"), "0.5");
    assert_eq!(accepted.message.map(|m| m.kind), Some(MessageKind::Success));
    assert_eq!(page.store().list("mitm-"), expected(&[("mitm-rating", "0.5")]));
    let events = recorder.drain_emitted();
    assert_emitted!(events, ChangeEvent { kind: ChangeKind::Changed, .. });

    // Out of range is rejected, never clamped to 1
    let rejected = form.submit(&FormState::default(), Some("mitm-rating"), "5");
    assert_eq!(rejected.message.map(|m| m.kind), Some(MessageKind::Error));
    assert_eq!(
        validate_submission(form.definitions(), Some("mitm-rating"), "5"),
        Err(ValidationError::OutOfRange {
            value: 5.0,
            min: 0.0,
            max: 1.0
        })
    );
    assert_eq!(page.store().get("mitm-rating").as_deref(), Some("0.5"));
    assert!(!recorder.has_emitted());
}

#[tokio::test]
async fn test_rendering_twice_is_identical() {
    let page = page_with("mitm-debug=true; mitm-mode=xxx");
    let table = CookieTable::new(&page);
    let state = table.load(None).await.unwrap();

    let first = table.render(&state);
    let second = table.render(&state);

    assert_eq!(first, second);
}
