//! Pagination cursor and the immutable per-cycle query state.

use crate::models::QueryOptions;

/// Position after the last page fetched.
///
/// The store returns `start_key` itself as the first row of the next scan,
/// so an advanced cursor skips exactly one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationCursor {
    pub start_key: Option<String>,
    pub skip: usize,
}

impl PaginationCursor {
    pub fn advance(&self, last_key: impl Into<String>) -> Self {
        Self {
            start_key: Some(last_key.into()),
            skip: 1,
        }
    }

    pub fn reset(&self) -> Self {
        Self::default()
    }

    pub fn is_reset(&self) -> bool {
        self.start_key.is_none() && self.skip == 0
    }

    /// `base` with this cursor's position applied.
    pub fn apply(&self, base: &QueryOptions) -> QueryOptions {
        QueryOptions {
            start_key: self.start_key.clone(),
            skip: self.skip,
            ..base.clone()
        }
    }
}

/// Filter, cursor and generation of the current query cycle.
///
/// Never mutated in place: every transition returns a new value which the
/// controller swaps in under its state lock. `generation` increases whenever
/// the filter changes or a refresh is requested; work started under an older
/// generation must not apply its results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub filter: Option<String>,
    pub cursor: PaginationCursor,
    pub generation: u64,
}

impl QueryState {
    /// New cycle for `filter`; an empty string clears it.
    ///
    /// Whitespace is a filter like any other text.
    pub fn with_filter(&self, filter: Option<&str>) -> Self {
        let filter = filter.filter(|f| !f.is_empty()).map(str::to_string);
        Self {
            filter,
            cursor: self.cursor.reset(),
            generation: self.generation + 1,
        }
    }

    /// New cycle keeping the current filter.
    pub fn refreshed(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            cursor: self.cursor.reset(),
            generation: self.generation + 1,
        }
    }

    /// Same cycle, cursor moved past `last_key`.
    pub fn advanced(&self, last_key: &str) -> Self {
        Self {
            filter: self.filter.clone(),
            cursor: self.cursor.advance(last_key),
            generation: self.generation,
        }
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_and_reset() {
        let cursor = PaginationCursor::default();
        assert!(cursor.is_reset());

        let advanced = cursor.advance("doc-11");
        assert_eq!(advanced.start_key.as_deref(), Some("doc-11"));
        assert_eq!(advanced.skip, 1);

        assert!(advanced.reset().is_reset());
    }

    #[test]
    fn test_apply_keeps_base_options() {
        let base = QueryOptions::page(50, true);
        let options = PaginationCursor::default().advance("k").apply(&base);
        assert_eq!(options.page_size, Some(50));
        assert!(options.descending);
        assert!(options.include_docs);
        assert_eq!(options.start_key.as_deref(), Some("k"));
        assert_eq!(options.skip, 1);
    }

    #[test]
    fn test_filter_change_resets_cursor_and_bumps_generation() {
        let state = QueryState::default().advanced("last");
        assert_eq!(state.generation, 0);

        let searching = state.with_filter(Some("alpha"));
        assert_eq!(searching.filter.as_deref(), Some("alpha"));
        assert!(searching.cursor.is_reset());
        assert_eq!(searching.generation, 1);

        let cleared = searching.with_filter(Some(""));
        assert!(!cleared.has_filter());
        assert_eq!(cleared.generation, 2);

        let spaces = cleared.with_filter(Some("  "));
        assert_eq!(spaces.filter.as_deref(), Some("  "));
        assert_eq!(spaces.generation, 3);
    }

    #[test]
    fn test_refreshed_keeps_filter() {
        let state = QueryState::default().with_filter(Some("beta")).advanced("x");
        let refreshed = state.refreshed();
        assert_eq!(refreshed.filter.as_deref(), Some("beta"));
        assert!(refreshed.cursor.is_reset());
        assert_eq!(refreshed.generation, state.generation + 1);
    }
}
