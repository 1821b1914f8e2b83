//! Query coordinator: paged loading and two-phase search.
//!
//! # Page Load
//!
//! `Idle -> Loading -> Idle`. One scan per call, resuming from the cursor.
//!
//! # Search
//!
//! `Idle -> Searching(Exact) -> Searching(Fuzzy) -> Idle`.
//!
//! 1. **Exact**: scan every identifier, keep those containing the lowercased,
//!    URI-encoded query, fetch them and append in key order.
//! 2. **Fuzzy**: full-text search over the configured fields with a
//!    minimum-match percentage of `round(100 / terms)`; hits already
//!    matched in phase 1 are dropped.
//!
//! Both phases run over one store handle and the busy flag stays set
//! across them. A failed id phase is reported and the full-text phase
//! still runs.

use std::collections::HashSet;

use futures_util::future::try_join_all;

use crate::collection::prepare_page;
use crate::error::StoreResult;
use crate::models::{Document, QueryOptions, SearchRequest};
use crate::observer::{PanelStatus, SearchPhase};
use crate::search::{encode_component, min_match_percent};
use crate::store::StoreHandle;

use super::{SavedPanel, PAGE_LOAD_KEY};

impl SavedPanel {
    /// Request the next page.
    ///
    /// Ignored while a search filter is active. Bursts of calls within the
    /// debounce window collapse into one [`load_page`](Self::load_page).
    pub fn load_next(&self) {
        if self.query_state().has_filter() {
            return;
        }
        let panel = self.clone();
        self.inner
            .debouncer
            .schedule(PAGE_LOAD_KEY, self.inner.config.debounce(), async move {
                panel.load_page().await;
            });
    }

    /// Fetch one page now, without debouncing.
    ///
    /// Ignored while another page load of the same cycle is still running,
    /// since both would read the same cursor.
    pub async fn load_page(&self) {
        let started = self.update(|state| {
            if state.query.has_filter() {
                return None;
            }
            if state.is_loading_page() {
                tracing::debug!("page load already running for this cycle");
                return None;
            }
            let options = state.query.cursor.apply(&self.inner.page_options);
            Some((state.begin(PanelStatus::Loading), options))
        });
        let Some((ticket, options)) = started else {
            return;
        };
        tracing::debug!(start_key = ?options.start_key, skip = options.skip, "loading page");

        let result = self
            .inner
            .gateway
            .with_store(|store| async move { store.scan(&options).await })
            .await;

        match result {
            Ok(rows) => self.update(|state| {
                if !state.is_current(ticket) {
                    tracing::debug!(rows = rows.len(), "discarding page from a stale cycle");
                } else if let Some(last_key) = rows.last().map(|r| r.key.clone()) {
                    state.query = state.query.advanced(&last_key);
                    let docs = prepare_page(rows.into_iter().filter_map(|r| r.doc).collect());
                    state.append(docs);
                }
                state.finish(ticket);
            }),
            Err(e) => {
                self.update(|state| state.finish(ticket));
                self.report("Error loading saved documents", e.into());
            }
        }
    }

    /// Show the documents matching `text`, or everything when it is empty.
    ///
    /// Setting the filter resets the cursor and clears the collection
    /// before anything is fetched.
    pub async fn query(&self, text: &str) {
        let (filter, generation) = self.update(|state| {
            state.query = state.query.with_filter(Some(text));
            state.clear_collection();
            (state.query.filter.clone(), state.query.generation)
        });
        tracing::debug!(filter = ?filter, generation, "filter changed");
        self.reload(filter, generation).await;
    }

    /// Clear the cursor and collection and load again.
    ///
    /// Reloads the first page when no filter is active, otherwise re-runs
    /// the active search.
    pub async fn refresh(&self) {
        let (filter, generation) = self.update(|state| {
            state.query = state.query.refreshed();
            state.clear_collection();
            (state.query.filter.clone(), state.query.generation)
        });
        tracing::debug!(generation, "refresh");
        self.reload(filter, generation).await;
    }

    async fn reload(&self, filter: Option<String>, generation: u64) {
        match filter {
            Some(text) => self.run_search(&text, generation).await,
            None => self.load_next(),
        }
    }

    async fn run_search(&self, text: &str, generation: u64) {
        let ticket = self.update(|state| {
            (state.query.generation == generation)
                .then(|| state.begin(PanelStatus::Searching(SearchPhase::Exact)))
        });
        let Some(ticket) = ticket else {
            return;
        };

        let encoded = encode_component(&text.to_lowercase());
        let request = SearchRequest {
            query: text.to_string(),
            fields: self.inner.config.search_fields.clone(),
            min_match_percent: min_match_percent(text),
        };

        // Both phases share one handle; only a phase-2 failure is returned.
        let result = self
            .inner
            .gateway
            .with_store(|store| async move {
                let matched = match id_matches(store.as_ref(), &encoded).await {
                    Ok(docs) => {
                        let applied = self.update(|state| {
                            if !state.is_current(ticket) {
                                return None;
                            }
                            let ids: HashSet<String> = docs.iter().map(|d| d.id.clone()).collect();
                            state.append(docs);
                            Some(ids)
                        });
                        match applied {
                            Some(ids) => ids,
                            None => {
                                tracing::debug!("search superseded after id phase");
                                return Ok(());
                            }
                        }
                    }
                    Err(e) => {
                        self.report("Error querying saved documents", e.into());
                        HashSet::new()
                    }
                };
                self.update(|state| {
                    state.set_status(ticket, PanelStatus::Searching(SearchPhase::Fuzzy))
                });

                let hits = store.search(&request).await?;
                self.update(|state| {
                    if state.is_current(ticket) {
                        state.append(
                            hits.into_iter()
                                .filter(|hit| !matched.contains(&hit.id))
                                .map(|hit| hit.doc),
                        );
                    } else {
                        tracing::debug!("search superseded after full-text phase");
                    }
                });
                Ok(())
            })
            .await;

        self.update(|state| state.finish(ticket));
        if let Err(e) = result {
            self.report("Error querying saved documents", e.into());
        }
    }
}

/// Documents whose id contains `encoded`, in key order.
///
/// `_design` documents are left out here as well as in page loads.
async fn id_matches(store: &dyn StoreHandle, encoded: &str) -> StoreResult<Vec<Document>> {
    let rows = store.scan(&QueryOptions::all_keys()).await?;
    let docs = try_join_all(
        rows.iter()
            .filter(|row| row.id.contains(encoded))
            .map(|row| store.get(&row.id)),
    )
    .await?;
    Ok(docs.into_iter().filter(|d| !d.is_design()).collect())
}
