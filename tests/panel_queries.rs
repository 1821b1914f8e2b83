//! Page loading and search against the in-memory store.

mod common;

use std::collections::HashSet;
use std::time::Duration;

use common::{ids, numbered, panel, settle, Recorded};
use saved_panel::config::PanelConfig;
use saved_panel::store::memory::{InMemoryStore, StoreOp};
use saved_panel::{Document, ErrorKind, PanelStatus, SearchPhase};

fn alpha_fixture() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.seed([
        Document::new("alpha-1"),
        Document::new("beta-1").with_field("headers", "beta"),
        Document::new("c").with_field("payload", "alpha"),
    ]);
    store
}

#[tokio::test(start_paused = true)]
async fn test_two_pages_of_sixty() {
    let store = InMemoryStore::new();
    store.seed(numbered(60));
    let (panel, _) = panel(&store);

    panel.load_next();
    settle().await;
    assert_eq!(panel.len(), 50);
    let state = panel.query_state();
    assert_eq!(state.cursor.start_key.as_deref(), Some("doc-11"));
    assert_eq!(state.cursor.skip, 1);

    panel.load_next();
    settle().await;
    assert_eq!(panel.len(), 60);
    let docs = ids(&panel.documents());
    assert_eq!(docs[0], "doc-11");
    assert_eq!(docs[49], "doc-60");
    assert_eq!(docs[50], "doc-01");
    assert_eq!(docs[59], "doc-10");

    panel.load_next();
    settle().await;
    assert_eq!(panel.len(), 60);
    assert_eq!(store.calls(StoreOp::Scan), 3);
}

#[tokio::test(start_paused = true)]
async fn test_ascending_pages() {
    let store = InMemoryStore::new();
    store.seed(numbered(7));
    let config = PanelConfig {
        page_size: 3,
        descending: false,
        ..PanelConfig::default()
    };
    let (panel, _) = common::panel_with(&store, config);

    for _ in 0..4 {
        panel.load_page().await;
    }
    assert_eq!(
        ids(&panel.documents()),
        ["doc-01", "doc-02", "doc-03", "doc-04", "doc-05", "doc-06", "doc-07"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_load_next_bursts_coalesce() {
    let store = InMemoryStore::new();
    store.seed(numbered(5));
    let (panel, _) = panel(&store);

    for _ in 0..5 {
        panel.load_next();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(panel.has_pending_work());
    assert_eq!(store.calls(StoreOp::Scan), 0);

    settle().await;
    assert_eq!(store.calls(StoreOp::Scan), 1);
    assert_eq!(panel.len(), 5);
    assert!(!panel.has_pending_work());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_is_idempotent() {
    let store = alpha_fixture();
    store.seed(numbered(4));
    let (panel, _) = panel(&store);

    panel.refresh().await;
    settle().await;
    let first = panel.documents();

    panel.refresh().await;
    settle().await;
    assert_eq!(panel.documents(), first);
    assert_eq!(first.len(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_filter_isolation() {
    let store = alpha_fixture();
    let (panel, _) = panel(&store);

    panel.load_next();
    settle().await;
    assert_eq!(panel.len(), 3);

    panel.query("alpha").await;
    assert_eq!(ids(&panel.documents()), ["alpha-1", "c"]);
    assert!(panel.query_state().cursor.is_reset());

    // An empty query clears the filter and pages again.
    panel.query("").await;
    assert!(!panel.query_state().has_filter());
    assert!(panel.documents().is_empty());
    settle().await;
    assert_eq!(ids(&panel.documents()), ["c", "beta-1", "alpha-1"]);
}

#[tokio::test(start_paused = true)]
async fn test_whitespace_query_is_a_search() {
    let store = alpha_fixture();
    let (panel, recorder) = panel(&store);

    panel.query("  ").await;

    assert_eq!(panel.query_state().filter.as_deref(), Some("  "));
    assert_eq!(store.calls(StoreOp::Search), 1);
    assert!(panel.documents().is_empty());
    assert!(recorder.notices().is_empty());
    assert!(!panel.has_pending_work());
}

#[tokio::test(start_paused = true)]
async fn test_page_load_is_not_repeated_while_running() {
    let store = InMemoryStore::new();
    store.seed(numbered(60));
    store.set_latency(Some(Duration::from_millis(300)));
    let (panel, _) = panel(&store);

    // The second request fires while the first scan is still running.
    panel.load_next();
    tokio::time::sleep(Duration::from_millis(250)).await;
    panel.load_next();
    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert_eq!(store.calls(StoreOp::Scan), 1);
    let docs = ids(&panel.documents());
    assert_eq!(docs.len(), 50);
    assert_eq!(docs.iter().collect::<HashSet<_>>().len(), 50);
    assert!(!panel.is_busy());

    store.set_latency(None);
    panel.load_next();
    settle().await;
    let docs = ids(&panel.documents());
    assert_eq!(docs.len(), 60);
    assert_eq!(docs.iter().collect::<HashSet<_>>().len(), 60);
}

#[tokio::test(start_paused = true)]
async fn test_load_next_ignored_while_filtered() {
    let store = alpha_fixture();
    let (panel, _) = panel(&store);

    panel.query("alpha").await;
    panel.load_next();
    assert!(!panel.has_pending_work());
    panel.load_page().await;
    settle().await;

    assert_eq!(store.calls(StoreOp::Scan), 1);
    assert_eq!(ids(&panel.documents()), ["alpha-1", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_reruns_active_search() {
    let store = alpha_fixture();
    let (panel, _) = panel(&store);

    panel.query("alpha").await;
    store.seed([Document::new("z").with_field("headers", "Alpha")]);
    panel.refresh().await;

    assert_eq!(ids(&panel.documents()), ["alpha-1", "c", "z"]);
    assert!(!panel.has_pending_work());
    assert_eq!(panel.query_state().filter.as_deref(), Some("alpha"));
}

#[tokio::test(start_paused = true)]
async fn test_design_documents_never_surface() {
    let store = alpha_fixture();
    store.seed([Document::new("_design/saved")
        .with_name("alpha")
        .with_field("headers", "alpha")]);
    let (panel, _) = panel(&store);

    panel.load_next();
    settle().await;
    assert_eq!(panel.len(), 3);

    panel.query("design").await;
    assert!(panel.documents().is_empty());

    panel.query("alpha").await;
    assert!(panel.documents().iter().all(|d| !d.is_design()));
}

#[tokio::test(start_paused = true)]
async fn test_search_phases_deduplicate() {
    let store = InMemoryStore::new();
    store.seed([
        Document::new("http%3A%2F%2Fexample.com%2Ffoo%20bar").with_field("headers", "foo bar"),
        Document::new("x-headers").with_field("headers", "foo"),
        Document::new("y").with_field("payload", "bar baz"),
        Document::new("z").with_field("payload", "nothing"),
    ]);
    let (panel, _) = panel(&store);

    panel.query("Foo Bar").await;

    assert_eq!(
        ids(&panel.documents()),
        ["http%3A%2F%2Fexample.com%2Ffoo%20bar", "x-headers", "y"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_search_phase_attribution() {
    let store = InMemoryStore::new();
    store.seed([
        Document::new("alpha-1"),
        Document::new("b").with_field("payload", "alpha"),
    ]);
    let (panel, recorder) = panel(&store);

    panel.query("alpha").await;

    assert_eq!(
        recorder.statuses(),
        [
            PanelStatus::Searching(SearchPhase::Exact),
            PanelStatus::Searching(SearchPhase::Fuzzy),
            PanelStatus::Idle,
        ]
    );

    let events = recorder.events();
    let fuzzy = events
        .iter()
        .position(|e| *e == Recorded::Status(PanelStatus::Searching(SearchPhase::Fuzzy)))
        .unwrap();
    let before: Vec<&Vec<String>> = events[..fuzzy]
        .iter()
        .filter_map(|e| match e {
            Recorded::Collection(ids) => Some(ids),
            _ => None,
        })
        .collect();
    assert_eq!(before.last().unwrap().as_slice(), ["alpha-1"]);
    assert_eq!(
        events.last().unwrap(),
        &Recorded::Collection(vec!["alpha-1".to_string(), "b".to_string()])
    );
    assert!(!panel.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_busy_brackets_every_operation() {
    let store = alpha_fixture();
    let (panel, recorder) = panel(&store);
    assert!(panel.is_empty());

    panel.load_next();
    settle().await;
    panel.query("alpha").await;
    panel.query("nothing-matches-this").await;
    panel.refresh().await;

    recorder.assert_never_busy_and_empty();
    let busy: Vec<bool> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Recorded::Busy(b) => Some(b),
            _ => None,
        })
        .collect();
    assert_eq!(busy, [true, false, true, false, true, false, true, false]);
    assert!(!panel.is_busy());
    assert!(panel.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stale_page_is_discarded() {
    let store = alpha_fixture();
    store.seed(numbered(5));
    store.set_latency(Some(Duration::from_millis(100)));
    let (panel, _) = panel(&store);

    panel.load_next();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(panel.status(), PanelStatus::Loading);

    let searching = tokio::spawn({
        let panel = panel.clone();
        async move { panel.query("alpha").await }
    });

    // The page scan lands at ~400ms while the id scan is still running.
    tokio::time::sleep(Duration::from_millis(170)).await;
    assert_eq!(store.calls(StoreOp::Scan), 2);
    assert!(panel.is_busy());
    assert_eq!(panel.status(), PanelStatus::Searching(SearchPhase::Exact));
    assert!(panel.documents().is_empty());

    searching.await.unwrap();
    settle().await;
    assert_eq!(ids(&panel.documents()), ["alpha-1", "c"]);
    assert!(!panel.is_busy());
    assert_eq!(store.opens(), store.closes());
}

#[tokio::test(start_paused = true)]
async fn test_id_phase_failure_still_runs_full_text() {
    let store = alpha_fixture();
    store.fail_on(StoreOp::Scan);
    let (panel, recorder) = panel(&store);

    panel.query("alpha").await;

    assert_eq!(ids(&panel.documents()), ["c"]);
    let notices = recorder.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, ErrorKind::Store);
    assert!(notices[0]
        .message
        .starts_with("Error querying saved documents. "));
    assert_eq!(store.calls(StoreOp::Search), 1);
    assert!(!panel.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_full_text_failure_keeps_id_matches() {
    let store = alpha_fixture();
    store.fail_on(StoreOp::Search);
    let (panel, recorder) = panel(&store);

    panel.query("alpha").await;

    assert_eq!(ids(&panel.documents()), ["alpha-1"]);
    assert_eq!(recorder.notices().len(), 1);
    assert_eq!(panel.status(), PanelStatus::Idle);
    assert!(!panel.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_page_load_failure_releases_busy() {
    let store = alpha_fixture();
    store.fail_on(StoreOp::Scan);
    let (panel, recorder) = panel(&store);

    panel.load_next();
    settle().await;

    assert!(!panel.is_busy());
    assert!(panel.is_empty());
    let notices = recorder.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(
        notices[0].message,
        "Error loading saved documents. store error: injected Scan failure"
    );
    recorder.assert_never_busy_and_empty();
}

#[tokio::test(start_paused = true)]
async fn test_open_failure_is_reported() {
    let store = alpha_fixture();
    store.fail_on(StoreOp::Open);
    let (panel, recorder) = panel(&store);

    panel.load_page().await;
    panel.query("alpha").await;

    assert_eq!(recorder.notices().len(), 2);
    assert_eq!(store.total_calls(), 0);
    assert!(!panel.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_search_uses_one_handle() {
    let store = alpha_fixture();
    let (panel, _) = panel(&store);

    panel.query("alpha").await;

    assert_eq!(store.calls(StoreOp::Scan), 1);
    assert_eq!(store.calls(StoreOp::Search), 1);
    assert_eq!(store.opens(), 1);
    assert_eq!(store.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_every_open_is_closed() {
    let store = alpha_fixture();
    let (panel, _) = panel(&store);

    panel.load_next();
    settle().await;
    panel.query("alpha beta").await;
    store.fail_on(StoreOp::Get);
    panel.query("alpha").await;
    store.clear_failures();
    store.fail_on(StoreOp::Search);
    panel.refresh().await;

    assert!(store.opens() > 0);
    assert_eq!(store.opens(), store.closes());
}
