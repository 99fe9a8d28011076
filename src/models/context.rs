//! Run-scoped collection counters.

/// Counters for one collection run; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionContext {
    /// Pages yielded so far (1-based once the first page is read)
    pub page_index: usize,

    /// Containers discovered across all pages
    pub record_count: usize,

    /// Scroll iterations the last lazy-load pass needed to stabilize
    pub stable_scrolls: usize,
}

impl CollectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
