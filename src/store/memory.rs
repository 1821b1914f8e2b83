//! In-memory store for tests and embedding.
//!
//! Uses a `BTreeMap` behind `std::sync::RwLock`, so scans come out in key
//! order for free. Every handle shares the same data. The store counts
//! opens, closes and per-operation calls, and can be told to fail specific
//! operations or to delay every call, which lets tests observe the
//! controller's resource discipline and interleavings.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::models::{Document, PutResponse, QueryOptions, ScanRow, SearchHit, SearchRequest};
use crate::search::{rank_hits, required_matches, score_document, terms};

use super::{next_revision, StoreHandle, StoreProvider};

/// Store primitives, for call accounting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Open,
    Scan,
    Get,
    Put,
    Remove,
    Destroy,
    Search,
}

#[derive(Default)]
struct Inner {
    docs: RwLock<BTreeMap<String, Document>>,
    failures: RwLock<HashSet<StoreOp>>,
    latency: RwLock<Option<Duration>>,
    calls: RwLock<HashMap<StoreOp, usize>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

/// Shared in-memory document store. Cloning shares the data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert documents directly, bypassing revision checks and counters.
    pub fn seed(&self, docs: impl IntoIterator<Item = Document>) {
        let mut stored = self.inner.docs.write().unwrap();
        for mut doc in docs {
            if doc.rev.is_none() {
                doc.rev = next_revision(None, &doc).ok();
            }
            stored.insert(doc.id.clone(), doc);
        }
    }

    /// Current copy of a document, bypassing counters.
    pub fn peek(&self, id: &str) -> Option<Document> {
        self.inner.docs.read().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.docs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent `op` fail with [`StoreError::Backend`].
    pub fn fail_on(&self, op: StoreOp) {
        self.inner.failures.write().unwrap().insert(op);
    }

    pub fn clear_failures(&self) {
        self.inner.failures.write().unwrap().clear();
    }

    /// Delay every store call by `latency` (tokio time).
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.inner.latency.write().unwrap() = latency;
    }

    pub fn calls(&self, op: StoreOp) -> usize {
        self.inner.calls.read().unwrap().get(&op).copied().unwrap_or(0)
    }

    /// Calls across all primitives, opens excluded.
    pub fn total_calls(&self) -> usize {
        self.inner
            .calls
            .read()
            .unwrap()
            .iter()
            .filter(|(op, _)| **op != StoreOp::Open)
            .map(|(_, n)| n)
            .sum()
    }

    pub fn opens(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }
}

impl Inner {
    async fn enter(&self, op: StoreOp) -> StoreResult<()> {
        *self.calls.write().unwrap().entry(op).or_insert(0) += 1;
        let latency = *self.latency.read().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.failures.read().unwrap().contains(&op) {
            return Err(StoreError::Backend(format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreProvider for InMemoryStore {
    async fn open(&self) -> StoreResult<Arc<dyn StoreHandle>> {
        self.inner.enter(StoreOp::Open).await?;
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryHandle {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MemoryHandle {
    inner: Arc<Inner>,
}

#[async_trait]
impl StoreHandle for MemoryHandle {
    async fn scan(&self, options: &QueryOptions) -> StoreResult<Vec<ScanRow>> {
        self.inner.enter(StoreOp::Scan).await?;
        let docs = self.inner.docs.read().unwrap();

        let ordered: Box<dyn Iterator<Item = (&String, &Document)> + '_> = if options.descending {
            Box::new(docs.iter().rev())
        } else {
            Box::new(docs.iter())
        };

        let rows = ordered
            .filter(|(key, _)| match options.start_key.as_deref() {
                Some(start) if options.descending => key.as_str() <= start,
                Some(start) => key.as_str() >= start,
                None => true,
            })
            .skip(options.skip)
            .take(options.page_size.unwrap_or(usize::MAX))
            .map(|(key, doc)| ScanRow {
                key: key.clone(),
                id: doc.id.clone(),
                rev: doc.rev.clone().unwrap_or_default(),
                doc: options.include_docs.then(|| doc.clone()),
            })
            .collect();
        Ok(rows)
    }

    async fn get(&self, id: &str) -> StoreResult<Document> {
        self.inner.enter(StoreOp::Get).await?;
        self.inner
            .docs
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn put(&self, doc: &Document) -> StoreResult<PutResponse> {
        self.inner.enter(StoreOp::Put).await?;
        if doc.id.is_empty() {
            return Err(StoreError::InvalidDocument("missing _id".to_string()));
        }
        let mut docs = self.inner.docs.write().unwrap();
        let current = docs.get(&doc.id).and_then(|d| d.rev.clone());
        if current != doc.rev {
            return Err(StoreError::Conflict { id: doc.id.clone() });
        }
        let rev = next_revision(current.as_deref(), doc)?;
        let mut stored = doc.clone();
        stored.rev = Some(rev.clone());
        docs.insert(doc.id.clone(), stored);
        Ok(PutResponse {
            id: doc.id.clone(),
            rev,
        })
    }

    async fn remove(&self, doc: &Document) -> StoreResult<()> {
        self.inner.enter(StoreOp::Remove).await?;
        let mut docs = self.inner.docs.write().unwrap();
        let current = match docs.get(&doc.id) {
            Some(stored) => stored.rev.clone(),
            None => return Err(StoreError::NotFound(doc.id.clone())),
        };
        if current != doc.rev {
            return Err(StoreError::Conflict { id: doc.id.clone() });
        }
        docs.remove(&doc.id);
        Ok(())
    }

    async fn destroy(&self) -> StoreResult<()> {
        self.inner.enter(StoreOp::Destroy).await?;
        self.inner.docs.write().unwrap().clear();
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> StoreResult<Vec<SearchHit>> {
        self.inner.enter(StoreOp::Search).await?;
        let terms = terms(&request.query);
        let needed = required_matches(terms.len(), request.min_match_percent);
        if needed == 0 {
            return Ok(Vec::new());
        }

        let docs = self.inner.docs.read().unwrap();
        let mut hits: Vec<SearchHit> = docs
            .values()
            .filter(|doc| !doc.is_design())
            .filter_map(|doc| {
                let score = score_document(doc, &request.fields, &terms);
                (score >= needed).then(|| SearchHit {
                    id: doc.id.clone(),
                    score,
                    doc: doc.clone(),
                })
            })
            .collect();
        rank_hits(&mut hits);
        Ok(hits)
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
