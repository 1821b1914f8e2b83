//! Command implementations behind the `saved` binary.
//!
//! Each `run_*` function drives a [`SavedPanel`] over the SQLite backend
//! and prints to stdout. Notices go to stderr through [`ConsoleObserver`];
//! a run that produced any error notice fails.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures_util::future::try_join_all;
use serde_json::Value;

use crate::config::Config;
use crate::models::Document;
use crate::observer::{Notice, PanelObserver, Severity};
use crate::panel::SavedPanel;
use crate::sqlite_store::SqliteProvider;
use crate::store::StoreGateway;
use crate::{db, migrate};

/// Prints notices to stderr and counts the errors among them.
#[derive(Default)]
pub struct ConsoleObserver {
    errors: AtomicUsize,
}

impl ConsoleObserver {
    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }
}

impl PanelObserver for ConsoleObserver {
    fn on_notice(&self, notice: &Notice) {
        let label = match notice.severity {
            Severity::Warning => "warning",
            Severity::Error => {
                self.errors.fetch_add(1, Ordering::SeqCst);
                "error"
            }
        };
        eprintln!("{}: {}", label, notice.message);
    }
}

struct Session {
    gateway: StoreGateway,
    panel: SavedPanel,
    observer: Arc<ConsoleObserver>,
}

impl Session {
    fn open(config: &Config) -> Self {
        let gateway = StoreGateway::new(Arc::new(SqliteProvider::new(config.db.path.clone())));
        let observer = Arc::new(ConsoleObserver::default());
        let panel = SavedPanel::new(gateway.clone(), config.panel.clone(), observer.clone());
        Self {
            gateway,
            panel,
            observer,
        }
    }

    fn finish(self) -> Result<()> {
        match self.observer.errors() {
            0 => Ok(()),
            1 => bail!("1 operation failed"),
            n => bail!("{} operations failed", n),
        }
    }
}

fn print_documents(docs: &[Document]) {
    for doc in docs {
        println!(
            "{:<40} {:<12} {}",
            doc.id,
            doc.rev.as_deref().map(short_rev).unwrap_or("-"),
            doc.name.as_deref().unwrap_or("")
        );
    }
}

fn short_rev(rev: &str) -> &str {
    match rev.char_indices().nth(10) {
        Some((i, _)) => &rev[..i],
        None => rev,
    }
}

/// Documents from a JSON file holding one object or an array of them.
///
/// Documents without an `_id` get a random UUID; any `_rev` is dropped.
pub fn parse_import(content: &str) -> Result<Vec<Document>> {
    let value: Value = serde_json::from_str(content).context("Invalid JSON")?;
    let items = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => bail!("Expected a JSON object or an array of objects"),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let mut doc: Document = serde_json::from_value(item)
                .with_context(|| format!("Entry {} is not a document", i))?;
            if doc.id.trim().is_empty() {
                doc.id = uuid::Uuid::new_v4().to_string();
            }
            doc.rev = None;
            Ok(doc)
        })
        .collect()
}

pub async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db.path)
        .await
        .with_context(|| format!("Failed to open {}", config.db.path.display()))?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    println!("Database initialized at {}", config.db.path.display());
    Ok(())
}

pub async fn run_add(config: &Config, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let docs = parse_import(&content)?;
    let session = Session::open(config);

    let stored = session
        .gateway
        .with_store(|store| async move {
            let mut stored = Vec::with_capacity(docs.len());
            for doc in &docs {
                stored.push(store.put(doc).await?);
            }
            Ok(stored)
        })
        .await?;

    for response in &stored {
        println!("added {} ({})", response.id, response.rev);
    }
    session.finish()
}

pub async fn run_list(config: &Config, pages: usize) -> Result<()> {
    let session = Session::open(config);
    for _ in 0..pages.max(1) {
        let before = session.panel.len();
        session.panel.load_page().await;
        if session.panel.len() == before {
            break;
        }
    }
    let docs = session.panel.documents();
    print_documents(&docs);
    println!("{} document(s)", docs.len());
    session.finish()
}

pub async fn run_search(config: &Config, query: &str) -> Result<()> {
    let session = Session::open(config);
    session.panel.query(query).await;
    let docs = session.panel.documents();
    print_documents(&docs);
    println!("{} match(es)", docs.len());
    session.finish()
}

pub async fn run_rename(config: &Config, id: &str, name: &str) -> Result<()> {
    let session = Session::open(config);
    let mut doc = session
        .gateway
        .with_store(|store| async move { store.get(id).await })
        .await?;
    doc.name = Some(name.to_string());

    // Only replaced in the collection if it happens to be loaded.
    let index = session.panel.position(id).unwrap_or(session.panel.len());
    session.panel.update_item(doc, index).await;
    if session.observer.errors() == 0 {
        println!("renamed {} to {:?}", id, name);
    }
    session.finish()
}

pub async fn run_delete(config: &Config, ids: &[String]) -> Result<()> {
    let session = Session::open(config);
    let docs = session
        .gateway
        .with_store(|store| async move { try_join_all(ids.iter().map(|id| store.get(id))).await })
        .await?;
    let count = docs.len();
    session.panel.delete_items(docs).await;
    if session.observer.errors() == 0 {
        println!("deleted {} document(s)", count);
    }
    session.finish()
}

pub async fn run_clear(config: &Config, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("Refusing to delete every saved document without --yes");
    }
    let session = Session::open(config);
    session.panel.clear_all().await;
    if session.observer.errors() == 0 {
        println!("all saved documents deleted");
    }
    session.finish()
}
