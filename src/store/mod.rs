//! Storage abstraction for saved documents.
//!
//! A [`StoreProvider`] opens short-lived [`StoreHandle`]s; the
//! [`StoreGateway`] scopes one handle to one controller operation and
//! guarantees it is closed on every exit path. Backends:
//!
//! | Backend | Module |
//! |---------|--------|
//! | In-memory (tests, embedding) | [`memory`] |
//! | SQLite + FTS5 | [`crate::sqlite_store`] |
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::StoreResult;
use crate::models::{Document, PutResponse, QueryOptions, ScanRow, SearchHit, SearchRequest};

/// An open connection to the document store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`scan`](StoreHandle::scan) | Key-ordered page of rows |
/// | [`get`](StoreHandle::get) | Fetch one document by id |
/// | [`put`](StoreHandle::put) | Insert or update (revision-checked) |
/// | [`remove`](StoreHandle::remove) | Delete one document (revision-checked) |
/// | [`destroy`](StoreHandle::destroy) | Delete everything |
/// | [`search`](StoreHandle::search) | Fuzzy full-text search over fields |
/// | [`close`](StoreHandle::close) | Release the handle |
#[async_trait]
pub trait StoreHandle: Send + Sync {
    /// Rows ordered by key, honoring `start_key`, `skip` and `page_size`.
    async fn scan(&self, options: &QueryOptions) -> StoreResult<Vec<ScanRow>>;

    /// Fails with `NotFound` for unknown ids.
    async fn get(&self, id: &str) -> StoreResult<Document>;

    /// Store `doc`. A new document must have no `_rev`; an existing one must
    /// carry the current `_rev`, otherwise `Conflict`.
    async fn put(&self, doc: &Document) -> StoreResult<PutResponse>;

    /// Delete `doc`. `doc._rev` must match the stored revision.
    async fn remove(&self, doc: &Document) -> StoreResult<()>;

    /// Delete every document and index entry. The store remains usable.
    async fn destroy(&self) -> StoreResult<()>;

    async fn search(&self, request: &SearchRequest) -> StoreResult<Vec<SearchHit>>;

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Source of store handles.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    async fn open(&self) -> StoreResult<Arc<dyn StoreHandle>>;
}

/// Scoped access to a [`StoreProvider`].
#[derive(Clone)]
pub struct StoreGateway {
    provider: Arc<dyn StoreProvider>,
}

impl StoreGateway {
    pub fn new(provider: Arc<dyn StoreProvider>) -> Self {
        Self { provider }
    }

    /// Open a handle, run `f` with it, close it.
    ///
    /// The handle is closed exactly once whether `f` succeeds or fails. A
    /// close failure is logged and never replaces `f`'s own result. No
    /// retries are attempted.
    pub async fn with_store<T, F, Fut>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(Arc<dyn StoreHandle>) -> Fut + Send,
        Fut: Future<Output = StoreResult<T>> + Send,
        T: Send,
    {
        let handle = self.provider.open().await?;
        let result = f(Arc::clone(&handle)).await;
        if let Err(e) = handle.close().await {
            tracing::warn!(error = %e, "failed to close store handle");
        }
        result
    }
}

/// Revision following `current` for `doc`: `"{seq}-{hash}"`.
///
/// `seq` counts updates from 1; `hash` is a SHA-256 prefix of the body.
pub(crate) fn next_revision(current: Option<&str>, doc: &Document) -> StoreResult<String> {
    let seq = current
        .and_then(|rev| rev.split('-').next())
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    let body = serde_json::to_vec(doc)?;
    let digest = hex::encode(Sha256::digest(&body));
    Ok(format!("{}-{}", seq, &digest[..32]))
}
