//! Notifications from the controller to whatever presents it.

use crate::error::{ErrorKind, PanelError};
use crate::models::Document;

/// How loudly a notice should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A user-visible message about a failed or rejected operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    /// Notice for `err`, prefixed with what was being attempted.
    pub fn from_error(context: &str, err: &PanelError) -> Self {
        let severity = match err.kind() {
            ErrorKind::Store => Severity::Error,
            ErrorKind::Validation => Severity::Warning,
        };
        Self {
            kind: err.kind(),
            severity,
            message: format!("{}. {}", context, err),
        }
    }
}

/// Which search phase is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Substring match on identifiers.
    Exact,
    /// Full-text match on document fields.
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelStatus {
    #[default]
    Idle,
    Loading,
    Searching(SearchPhase),
    Mutating,
}

/// Receives state changes from a [`SavedPanel`](crate::panel::SavedPanel).
///
/// Called after the controller's state lock is released, so implementations
/// may read the panel back. Every method defaults to doing nothing.
pub trait PanelObserver: Send + Sync {
    fn on_busy_change(&self, _busy: bool) {}

    fn on_empty_change(&self, _is_empty: bool) {}

    fn on_status_change(&self, _status: PanelStatus) {}

    fn on_collection_change(&self, _documents: &[Document]) {}

    fn on_notice(&self, _notice: &Notice) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl PanelObserver for NoopObserver {}
