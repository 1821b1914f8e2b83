//! Mutation coordinator: delete, rename and clear-all.
//!
//! Every mutation holds the busy flag with status
//! [`Mutating`](PanelStatus::Mutating) while its store calls are in flight.
//! Failures are reported as notices; nothing is rolled back.

use futures_util::future::join_all;

use crate::error::{PanelError, StoreError};
use crate::models::Document;
use crate::observer::PanelStatus;

use super::{SavedPanel, POST_DELETE_REFRESH_KEY};

impl SavedPanel {
    /// Delete `docs` concurrently over one store handle.
    ///
    /// On success a refresh is scheduled under the post-delete debounce key.
    /// If any removal fails one notice covers the batch; removals that did
    /// succeed stay applied.
    pub async fn delete_items(&self, docs: Vec<Document>) {
        if docs.is_empty() {
            self.report(
                "Cannot delete entries",
                PanelError::Validation("Nothing is selected".to_string()),
            );
            return;
        }

        let count = docs.len();
        let ticket = self.update(|state| state.begin(PanelStatus::Mutating));
        let result = self
            .inner
            .gateway
            .with_store(|store| async move {
                let results = join_all(docs.iter().map(|doc| store.remove(doc))).await;
                let mut first_error: Option<StoreError> = None;
                for (doc, result) in docs.iter().zip(results) {
                    if let Err(e) = result {
                        tracing::debug!(id = %doc.id, error = %e, "remove failed");
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
                match first_error {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            })
            .await;
        self.update(|state| state.finish(ticket));

        match result {
            Ok(()) => {
                tracing::debug!(count, "deleted entries");
                let panel = self.clone();
                self.inner.debouncer.schedule(
                    POST_DELETE_REFRESH_KEY,
                    self.inner.config.debounce(),
                    async move { panel.refresh().await },
                );
            }
            Err(e) => self.report("Error deleting entries", e.into()),
        }
    }

    /// Delete whatever the view has selected.
    pub async fn delete_selected(&self) {
        let selection = self.selection();
        self.delete_items(selection).await;
    }

    /// Store `doc` and swap it into the collection at `index`.
    ///
    /// The slot is only replaced if it still holds the same id; otherwise the
    /// store write stands but the collection is left alone.
    pub async fn update_item(&self, doc: Document, index: usize) {
        let ticket = self.update(|state| state.begin(PanelStatus::Mutating));
        let result = self
            .inner
            .gateway
            .with_store(|store| {
                let doc = doc.clone();
                async move { store.put(&doc).await }
            })
            .await;

        match result {
            Ok(response) => {
                let mut updated = doc;
                updated.id = response.id;
                updated.rev = Some(response.rev);
                self.update(|state| {
                    let id = updated.id.clone();
                    if !state.replace(index, updated) {
                        tracing::debug!(%id, index, "slot changed before rename landed");
                    }
                    state.finish(ticket);
                });
            }
            Err(e) => {
                self.update(|state| state.finish(ticket));
                self.report("Error renaming entry", e.into());
            }
        }
    }

    /// Destroy every document, then refresh whether or not that worked.
    pub async fn clear_all(&self) {
        let ticket = self.update(|state| state.begin(PanelStatus::Mutating));
        let result = self
            .inner
            .gateway
            .with_store(|store| async move { store.destroy().await })
            .await;
        self.update(|state| state.finish(ticket));

        if let Err(e) = result {
            self.report("Error deleting database", e.into());
        }
        self.refresh().await;
    }
}
