//! SQLite-backed store.
//!
//! Documents live in `documents` as JSON bodies keyed by id; every field's
//! text is mirrored into the `documents_fts` FTS5 table (one row per
//! document field) for full-text search. Ordering of scans is SQLite's
//! binary collation on `id`, matching the in-memory backend.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::db;
use crate::error::{StoreError, StoreResult};
use crate::migrate;
use crate::models::{Document, PutResponse, QueryOptions, ScanRow, SearchHit, SearchRequest};
use crate::search::{rank_hits, required_matches, terms, tokenize};
use crate::store::{next_revision, StoreHandle, StoreProvider};

/// Opens a fresh [`SqliteStore`] per operation on the database at `path`.
///
/// The schema is created on the first successful open.
pub struct SqliteProvider {
    path: PathBuf,
    migrated: AtomicBool,
}

impl SqliteProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            migrated: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl StoreProvider for SqliteProvider {
    async fn open(&self) -> StoreResult<Arc<dyn StoreHandle>> {
        let pool = db::connect(&self.path).await?;
        if !self.migrated.load(Ordering::Acquire) {
            if let Err(e) = migrate::run_migrations(&pool).await {
                pool.close().await;
                return Err(e);
            }
            self.migrated.store(true, Ordering::Release);
        }
        Ok(Arc::new(SqliteStore::new(pool)))
    }
}

/// SQLite implementation of [`StoreHandle`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn decode(row: &SqliteRow) -> StoreResult<Document> {
    let id: String = row.try_get("id")?;
    let rev: String = row.try_get("rev")?;
    let body: String = row.try_get("body")?;
    let mut doc: Document = serde_json::from_str(&body)?;
    doc.id = id;
    doc.rev = Some(rev);
    Ok(doc)
}

async fn current_rev(tx: &mut Transaction<'_, Sqlite>, id: &str) -> StoreResult<Option<String>> {
    let rev: Option<String> = sqlx::query_scalar("SELECT rev FROM documents WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(rev)
}

/// Field name and text of every searchable field of `doc`.
fn index_entries(doc: &Document) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    if let Some(name) = &doc.name {
        entries.push(("name".to_string(), name.clone()));
    }
    for key in doc.fields.keys() {
        if let Some(text) = doc.field_text(key) {
            if !text.is_empty() {
                entries.push((key.clone(), text));
            }
        }
    }
    entries
}

/// Quote `term` as an FTS5 phrase.
fn fts_phrase(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

#[async_trait]
impl StoreHandle for SqliteStore {
    async fn scan(&self, options: &QueryOptions) -> StoreResult<Vec<ScanRow>> {
        let (cmp, order) = if options.descending {
            ("<=", "DESC")
        } else {
            (">=", "ASC")
        };
        let sql = format!(
            "SELECT id, rev, body FROM documents \
             WHERE (?1 IS NULL OR id {cmp} ?1) \
             ORDER BY id {order} LIMIT ?2 OFFSET ?3"
        );
        let limit = options.page_size.map(|n| n as i64).unwrap_or(-1);

        let rows = sqlx::query(&sql)
            .bind(options.start_key.as_deref())
            .bind(limit)
            .bind(options.skip as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> StoreResult<ScanRow> {
                let id: String = row.try_get("id")?;
                let rev: String = row.try_get("rev")?;
                let doc = if options.include_docs {
                    Some(decode(row)?)
                } else {
                    None
                };
                Ok(ScanRow {
                    key: id.clone(),
                    id,
                    rev,
                    doc,
                })
            })
            .collect()
    }

    async fn get(&self, id: &str) -> StoreResult<Document> {
        let row = sqlx::query("SELECT id, rev, body FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => decode(&row),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn put(&self, doc: &Document) -> StoreResult<PutResponse> {
        if doc.id.is_empty() {
            return Err(StoreError::InvalidDocument("missing _id".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        let current = current_rev(&mut tx, &doc.id).await?;
        if current != doc.rev {
            return Err(StoreError::Conflict { id: doc.id.clone() });
        }

        let rev = next_revision(current.as_deref(), doc)?;
        let mut stored = doc.clone();
        stored.rev = None;
        let body = serde_json::to_string(&stored)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO documents (id, rev, name, body, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                rev = excluded.rev,
                name = excluded.name,
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&doc.id)
        .bind(&rev)
        .bind(&doc.name)
        .bind(&body)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM documents_fts WHERE doc_id = ?")
            .bind(&doc.id)
            .execute(&mut *tx)
            .await?;

        for (field, text) in index_entries(doc) {
            sqlx::query("INSERT INTO documents_fts (doc_id, field, text) VALUES (?, ?, ?)")
                .bind(&doc.id)
                .bind(&field)
                .bind(&text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(PutResponse {
            id: doc.id.clone(),
            rev,
        })
    }

    async fn remove(&self, doc: &Document) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        match current_rev(&mut tx, &doc.id).await? {
            None => return Err(StoreError::NotFound(doc.id.clone())),
            Some(rev) if Some(&rev) != doc.rev.as_ref() => {
                return Err(StoreError::Conflict { id: doc.id.clone() })
            }
            Some(_) => {}
        }

        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(&doc.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents_fts WHERE doc_id = ?")
            .bind(&doc.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn destroy(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM documents").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM documents_fts").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> StoreResult<Vec<SearchHit>> {
        let terms: Vec<String> = terms(&request.query)
            .into_iter()
            .filter(|t| !tokenize(t).is_empty())
            .collect();
        let needed = required_matches(terms.len(), request.min_match_percent);
        if needed == 0 {
            return Ok(Vec::new());
        }
        let fields: HashSet<&str> = request.fields.iter().map(String::as_str).collect();

        let mut matched: HashMap<String, HashSet<usize>> = HashMap::new();
        for (index, term) in terms.iter().enumerate() {
            let rows = sqlx::query("SELECT doc_id, field FROM documents_fts WHERE documents_fts MATCH ?")
                .bind(fts_phrase(term))
                .fetch_all(&self.pool)
                .await?;
            for row in rows {
                let field: String = row.try_get("field")?;
                if fields.contains(field.as_str()) {
                    let id: String = row.try_get("doc_id")?;
                    matched.entry(id).or_default().insert(index);
                }
            }
        }

        let mut hits = Vec::new();
        for (id, matched_terms) in matched {
            if matched_terms.len() < needed {
                continue;
            }
            let doc = self.get(&id).await?;
            if doc.is_design() {
                continue;
            }
            hits.push(SearchHit {
                id,
                score: matched_terms.len(),
                doc,
            });
        }
        rank_hits(&mut hits);
        Ok(hits)
    }

    async fn close(&self) -> StoreResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
