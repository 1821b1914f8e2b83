//! The saved-documents controller.
//!
//! [`SavedPanel`] owns the query state, the loaded [`ResultCollection`],
//! the selection handed over by the view and the busy flag. Operations are
//! split across two coordinators:
//!
//! | Module | Operations |
//! |--------|------------|
//! | [`query`] | `load_next`, `load_page`, `query`, `refresh` |
//! | [`mutate`] | `delete_items`, `delete_selected`, `update_item`, `clear_all` |
//!
//! # State Model
//!
//! All state sits behind one `std::sync::Mutex` that is never held across
//! an `.await`; store calls are the only suspension points. Every state
//! change goes through [`SavedPanel::update`], which derives the busy and
//! empty flags, then notifies the observer after the lock is released.
//!
//! Every running operation holds a ticket in the in-flight list; the panel
//! is busy while the list is non-empty and reports the status of the newest
//! entry. An operation only ever removes its own ticket, so a mutation or a
//! superseded load finishing early never clears busy underneath a search
//! that is still running. Query cycles also capture the generation of the
//! [`QueryState`]; results are applied only while it is unchanged, and at
//! most one page load per generation is in flight.

pub mod mutate;
pub mod query;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::collection::ResultCollection;
use crate::config::PanelConfig;
use crate::cursor::QueryState;
use crate::debounce::Debouncer;
use crate::error::{ErrorKind, PanelError};
use crate::models::{Document, QueryOptions};
use crate::observer::{Notice, PanelObserver, PanelStatus};
use crate::store::StoreGateway;

/// Debounce key for page loads.
pub const PAGE_LOAD_KEY: &str = "page-load";
/// Debounce key for the refresh following a delete.
pub const POST_DELETE_REFRESH_KEY: &str = "post-delete-refresh";

/// Identifies one running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    id: u64,
    generation: u64,
}

struct Operation {
    ticket: Ticket,
    status: PanelStatus,
}

struct PanelState {
    query: QueryState,
    collection: ResultCollection,
    collection_version: u64,
    selection: Vec<Document>,
    in_flight: Vec<Operation>,
    next_ticket: u64,
    is_empty: bool,
}

impl PanelState {
    fn new() -> Self {
        Self {
            query: QueryState::default(),
            collection: ResultCollection::new(),
            collection_version: 0,
            selection: Vec::new(),
            in_flight: Vec::new(),
            next_ticket: 0,
            is_empty: true,
        }
    }

    fn is_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Status of the most recently started operation still running.
    fn status(&self) -> PanelStatus {
        self.in_flight
            .last()
            .map(|op| op.status)
            .unwrap_or_default()
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.query.generation == ticket.generation
    }

    /// Whether a page load for the current generation is still running.
    fn is_loading_page(&self) -> bool {
        self.in_flight
            .iter()
            .any(|op| op.status == PanelStatus::Loading && self.is_current(op.ticket))
    }

    /// Register a new operation; the panel stays busy until it finishes.
    fn begin(&mut self, status: PanelStatus) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket {
            id: self.next_ticket,
            generation: self.query.generation,
        };
        self.in_flight.push(Operation { ticket, status });
        ticket
    }

    fn set_status(&mut self, ticket: Ticket, status: PanelStatus) {
        if let Some(op) = self.in_flight.iter_mut().find(|op| op.ticket == ticket) {
            op.status = status;
        }
    }

    /// Drop `ticket` from the in-flight list.
    fn finish(&mut self, ticket: Ticket) {
        self.in_flight.retain(|op| op.ticket != ticket);
    }

    fn clear_collection(&mut self) {
        self.collection.clear();
        self.collection_version += 1;
    }

    fn append(&mut self, docs: impl IntoIterator<Item = Document>) {
        let before = self.collection.len();
        self.collection.extend(docs);
        if self.collection.len() != before {
            self.collection_version += 1;
        }
    }

    fn replace(&mut self, index: usize, doc: Document) -> bool {
        let replaced = self.collection.replace(index, doc);
        if replaced {
            self.collection_version += 1;
        }
        replaced
    }
}

enum Event {
    Busy(bool),
    Empty(bool),
    Status(PanelStatus),
    Collection(Vec<Document>),
}

struct Inner {
    gateway: StoreGateway,
    config: PanelConfig,
    page_options: QueryOptions,
    state: Mutex<PanelState>,
    observer: Arc<dyn PanelObserver>,
    debouncer: Debouncer,
}

/// Query and mutation controller for the saved-documents view.
///
/// Cheap to clone; clones share state. Debounced operations spawn tokio
/// tasks, so the panel must be driven from inside a tokio runtime.
#[derive(Clone)]
pub struct SavedPanel {
    inner: Arc<Inner>,
}

impl SavedPanel {
    pub fn new(
        gateway: StoreGateway,
        config: PanelConfig,
        observer: Arc<dyn PanelObserver>,
    ) -> Self {
        let page_options = QueryOptions::page(config.page_size, config.descending);
        Self {
            inner: Arc::new(Inner {
                gateway,
                config,
                page_options,
                state: Mutex::new(PanelState::new()),
                observer,
                debouncer: Debouncer::new(),
            }),
        }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.inner.config
    }

    /// Snapshot of the loaded documents, in display order.
    pub fn documents(&self) -> Vec<Document> {
        self.lock().collection.to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().collection.len()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.lock().collection.position(id)
    }

    pub fn is_busy(&self) -> bool {
        self.lock().is_busy()
    }

    /// True only when idle with nothing loaded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty
    }

    pub fn status(&self) -> PanelStatus {
        self.lock().status()
    }

    pub fn query_state(&self) -> QueryState {
        self.lock().query.clone()
    }

    /// Replace the selection chosen by the view.
    pub fn set_selection(&self, docs: Vec<Document>) {
        self.lock().selection = docs;
    }

    pub fn selection(&self) -> Vec<Document> {
        self.lock().selection.clone()
    }

    pub fn has_selection(&self) -> bool {
        !self.lock().selection.is_empty()
    }

    /// Whether a debounced page load or refresh is waiting to fire.
    pub fn has_pending_work(&self) -> bool {
        self.inner.debouncer.is_pending(PAGE_LOAD_KEY)
            || self.inner.debouncer.is_pending(POST_DELETE_REFRESH_KEY)
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to the state, then notify the observer of what changed.
    fn update<R>(&self, f: impl FnOnce(&mut PanelState) -> R) -> R {
        let (result, events) = {
            let mut state = self.lock();
            let busy = state.is_busy();
            let status = state.status();
            let version = state.collection_version;

            let result = f(&mut state);

            let mut events = Vec::new();
            let is_empty = !state.is_busy() && state.collection.is_empty();
            let empty_changed = is_empty != state.is_empty;
            state.is_empty = is_empty;

            if state.status() != status {
                events.push(Event::Status(state.status()));
            }
            // Never let the observer see busy and empty at the same time.
            if empty_changed && !is_empty {
                events.push(Event::Empty(false));
            }
            if state.is_busy() != busy {
                events.push(Event::Busy(state.is_busy()));
            }
            if state.collection_version != version {
                events.push(Event::Collection(state.collection.to_vec()));
            }
            if empty_changed && is_empty {
                events.push(Event::Empty(true));
            }
            (result, events)
        };

        let observer = &self.inner.observer;
        for event in events {
            match event {
                Event::Busy(busy) => observer.on_busy_change(busy),
                Event::Empty(empty) => observer.on_empty_change(empty),
                Event::Status(status) => observer.on_status_change(status),
                Event::Collection(docs) => observer.on_collection_change(&docs),
            }
        }
        result
    }

    /// Log `err` and surface it to the view.
    fn report(&self, context: &str, err: PanelError) {
        match err.kind() {
            ErrorKind::Store => tracing::error!(error = %err, "{}", context),
            ErrorKind::Validation => tracing::info!(reason = %err, "{}", context),
        }
        self.inner.observer.on_notice(&Notice::from_error(context, &err));
    }
}
