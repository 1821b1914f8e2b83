//! Shared fixtures for the controller integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use saved_panel::config::PanelConfig;
use saved_panel::store::memory::InMemoryStore;
use saved_panel::{Document, Notice, PanelObserver, PanelStatus, SavedPanel, StoreGateway};

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Busy(bool),
    Empty(bool),
    Status(PanelStatus),
    Collection(Vec<String>),
    Notice(Notice),
}

/// Observer that keeps every callback in order.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Recorded>>,
}

impl Recorder {
    fn push(&self, event: Recorded) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<PanelStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Replays busy/empty changes and fails if both were ever true together.
    pub fn assert_never_busy_and_empty(&self) {
        let mut busy = false;
        let mut empty = true;
        for event in self.events() {
            match event {
                Recorded::Busy(b) => busy = b,
                Recorded::Empty(e) => empty = e,
                _ => continue,
            }
            assert!(!(busy && empty), "observer saw busy and empty at once");
        }
    }
}

impl PanelObserver for Recorder {
    fn on_busy_change(&self, busy: bool) {
        self.push(Recorded::Busy(busy));
    }

    fn on_empty_change(&self, is_empty: bool) {
        self.push(Recorded::Empty(is_empty));
    }

    fn on_status_change(&self, status: PanelStatus) {
        self.push(Recorded::Status(status));
    }

    fn on_collection_change(&self, documents: &[Document]) {
        self.push(Recorded::Collection(
            documents.iter().map(|d| d.id.clone()).collect(),
        ));
    }

    fn on_notice(&self, notice: &Notice) {
        self.push(Recorded::Notice(notice.clone()));
    }
}

pub fn panel_with(store: &InMemoryStore, config: PanelConfig) -> (SavedPanel, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let panel = SavedPanel::new(
        StoreGateway::new(Arc::new(store.clone())),
        config,
        recorder.clone(),
    );
    (panel, recorder)
}

pub fn panel(store: &InMemoryStore) -> (SavedPanel, Arc<Recorder>) {
    panel_with(store, PanelConfig::default())
}

/// Let the debounce window elapse and any fired work complete.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(500)).await;
}

pub fn ids(docs: &[Document]) -> Vec<String> {
    docs.iter().map(|d| d.id.clone()).collect()
}

/// `doc-01` .. `doc-{n}`, each named after its id.
pub fn numbered(n: usize) -> Vec<Document> {
    (1..=n)
        .map(|i| {
            let id = format!("doc-{:02}", i);
            Document::new(&id).with_name(&id)
        })
        .collect()
}
