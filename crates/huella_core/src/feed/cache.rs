//! crates/huella_core/src/feed/cache.rs
//!
//! In-memory result set for the active feed query.

use std::collections::HashSet;

use crate::domain::{Report, ReportId};

/// The loaded records of one feed view.
///
/// Every filter change starts a new generation. Live snapshots are tagged with
/// the generation of the subscription that produced them, so a snapshot that
/// was already in flight when the filters changed is recognised and dropped.
#[derive(Debug)]
pub struct LiveResultCache {
    records: Vec<Report>,
    page_size: usize,
    has_more: bool,
    generation: u64,
}

impl LiveResultCache {
    pub fn new(page_size: usize) -> Self {
        Self {
            records: Vec::new(),
            page_size: page_size.max(1),
            has_more: false,
            generation: 0,
        }
    }

    /// Empties the cache and returns the id of the new generation.
    pub fn begin_generation(&mut self) -> u64 {
        self.generation += 1;
        self.records.clear();
        self.has_more = false;
        self.generation
    }

    /// Replaces the result set with a page-one snapshot.
    /// Returns `false` (and changes nothing) for a stale generation.
    pub fn apply_snapshot(&mut self, generation: u64, snapshot: Vec<Report>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.has_more = snapshot.len() == self.page_size;
        self.records = snapshot;
        true
    }

    /// Appends a "load more" page, skipping records already present.
    /// Returns how many records were added.
    pub fn append_page(&mut self, page: Vec<Report>) -> usize {
        self.has_more = page.len() == self.page_size;
        let known: HashSet<ReportId> = self.records.iter().map(|r| r.id).collect();
        let before = self.records.len();
        self.records
            .extend(page.into_iter().filter(|r| !known.contains(&r.id)));
        self.records.len() - before
    }

    pub fn records(&self) -> &[Report] {
        &self.records
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}
