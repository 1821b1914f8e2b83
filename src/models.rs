//! Core data models shared by the controller and the store backends.
//!
//! These types represent the saved documents, the options used to page
//! through them, and the requests/responses of the store primitives.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Id prefix reserved for index/metadata documents.
pub const DESIGN_PREFIX: &str = "_design";

/// A saved document.
///
/// `_id` and `_rev` are store-managed; `name` is the display name used for
/// sorting. Everything else (url, method, headers, payload, ...) is kept
/// verbatim in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: None,
            name: None,
            fields: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Whether this is an index/metadata document rather than user data.
    pub fn is_design(&self) -> bool {
        self.id.starts_with(DESIGN_PREFIX)
    }

    /// All string leaves of `field`, joined with spaces.
    ///
    /// `name` is addressable like any other field. Returns `None` when the
    /// field is absent.
    pub fn field_text(&self, field: &str) -> Option<String> {
        if field == "name" {
            return self.name.clone();
        }
        let value = self.fields.get(field)?;
        let mut parts = Vec::new();
        collect_text(value, &mut parts);
        Some(parts.join(" "))
    }
}

fn collect_text(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => items.iter().for_each(|v| collect_text(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_text(v, out)),
        Value::Null => {}
    }
}

/// Identifier and new revision of a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResponse {
    pub id: String,
    pub rev: String,
}

/// Options for a key-ordered scan of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Maximum rows to return; `None` scans everything.
    pub page_size: Option<usize>,
    pub descending: bool,
    /// First key to return (inclusive).
    pub start_key: Option<String>,
    /// Rows to drop after `start_key` before collecting.
    pub skip: usize,
    /// Attach the full document to each row.
    pub include_docs: bool,
}

impl QueryOptions {
    /// Paged scan returning documents.
    pub fn page(page_size: usize, descending: bool) -> Self {
        Self {
            page_size: Some(page_size),
            descending,
            start_key: None,
            skip: 0,
            include_docs: true,
        }
    }

    /// Unbounded ascending scan of identifiers only.
    pub fn all_keys() -> Self {
        Self {
            page_size: None,
            descending: false,
            start_key: None,
            skip: 0,
            include_docs: false,
        }
    }
}

/// One row of a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRow {
    pub key: String,
    pub id: String,
    pub rev: String,
    pub doc: Option<Document>,
}

/// Fuzzy full-text query over selected document fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub fields: Vec<String>,
    /// Percentage of query terms a document must match.
    pub min_match_percent: u32,
}

/// A document matched by a full-text search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    /// Number of query terms matched.
    pub score: usize,
    pub doc: Document,
}
