//! # Saved Panel
//!
//! Query and mutation controller for a locally persisted collection of
//! saved documents.
//!
//! The controller pages through the store in key order, runs a two-phase
//! search (identifier substring, then full-text over configured fields),
//! deletes, renames and wipes documents, and keeps one de-duplicated,
//! name-sorted result list plus a single busy flag consistent while loads
//! and searches overlap.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   View   │──▶│  SavedPanel   │──▶│ StoreGateway │──▶│ Memory/SQLite│
//! │ observer │◀──│ query/mutate  │   │  with_store  │   │  (+ FTS5)    │
//! └──────────┘   └──────┬───────┘   └──────────────┘   └──────────────┘
//!                       │
//!                ┌──────┴──────┐
//!                │  Debouncer  │
//!                └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! saved init                      # create database
//! saved add requests.json         # import documents
//! saved list --pages 2            # first two pages, newest key first
//! saved search "alpha beta"       # exact id match, then full-text
//! saved rename <id> "New name"
//! saved delete <id> <id>
//! saved clear --yes
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`panel`] | The controller: query and mutation coordinators |
//! | [`store`] | Store traits, scoped gateway, in-memory backend |
//! | [`sqlite_store`] | SQLite + FTS5 backend |
//! | [`cursor`] | Pagination cursor and query state |
//! | [`collection`] | Result list and page post-processing |
//! | [`debounce`] | Keyed debounce scheduler |
//! | [`search`] | Term splitting, scoring, id encoding |
//! | [`observer`] | Observer trait and notices |
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error types |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`cli`] | Commands of the `saved` binary |

pub mod cli;
pub mod collection;
pub mod config;
pub mod cursor;
pub mod db;
pub mod debounce;
pub mod error;
pub mod migrate;
pub mod models;
pub mod observer;
pub mod panel;
pub mod search;
pub mod sqlite_store;
pub mod store;

pub use error::{ErrorKind, PanelError, StoreError, StoreResult};
pub use models::Document;
pub use observer::{Notice, PanelObserver, PanelStatus, SearchPhase, Severity};
pub use panel::SavedPanel;
pub use store::{StoreGateway, StoreHandle, StoreProvider};
