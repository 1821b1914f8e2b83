//! Full-text helpers shared by the controller and the store backends.
//!
//! # Matching Model
//!
//! 1. The query is split on whitespace into terms.
//! 2. The controller asks for `round(100 / terms)` percent of terms to match,
//!    so longer queries tolerate a lower per-term ratio.
//! 3. A backend turns the percentage into a term count with
//!    [`required_matches`] and keeps documents whose searched fields contain
//!    at least that many terms.
//! 4. Hits are ordered by matched-term count (desc), then id (asc).

use std::collections::HashSet;

use crate::models::{Document, SearchHit};

/// Query terms, lowercased, split on whitespace.
pub fn terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(|t| t.to_lowercase()).collect()
}

/// Minimum-match percentage for a query: `round(100 / term_count)`.
///
/// Blank queries return 100.
pub fn min_match_percent(query: &str) -> u32 {
    let count = query.split_whitespace().count();
    if count == 0 {
        return 100;
    }
    (100.0 / count as f64).round() as u32
}

/// Number of terms out of `term_count` needed to satisfy `percent`.
///
/// Never less than one when there is at least one term.
pub fn required_matches(term_count: usize, percent: u32) -> usize {
    if term_count == 0 {
        return 0;
    }
    let needed = (term_count * percent as usize).div_ceil(100);
    needed.clamp(1, term_count)
}

/// Lowercased alphanumeric tokens of `text`.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Whether every alphanumeric part of `term` appears among `tokens`.
fn term_matches(term: &str, tokens: &HashSet<String>) -> bool {
    let parts = tokenize(term);
    !parts.is_empty() && parts.iter().all(|p| tokens.contains(p))
}

/// Count how many `terms` the searched `fields` of `doc` contain.
pub fn score_document(doc: &Document, fields: &[String], terms: &[String]) -> usize {
    let mut tokens = HashSet::new();
    for field in fields {
        if let Some(text) = doc.field_text(field) {
            tokens.extend(tokenize(&text));
        }
    }
    if tokens.is_empty() {
        return 0;
    }
    terms.iter().filter(|t| term_matches(t, &tokens)).count()
}

/// Sort hits by score (desc), then id (asc).
pub fn rank_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
}

/// Percent-encode `text` the way `encodeURIComponent` does.
///
/// Saved documents use encoded URLs as their ids, so an id search compares
/// against the encoded form of the query.
pub fn encode_component(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
