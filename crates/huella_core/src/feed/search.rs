//! crates/huella_core/src/feed/search.rs
//!
//! Free-text search over the records already loaded in a feed. Runs entirely
//! in memory on top of the store-level filters.

use std::time::Duration;
use tokio::time::Instant;

use crate::domain::Report;

/// A normalized (trimmed, lower-cased) search string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive substring match on title, city, neighborhood and description.
    pub fn matches(&self, report: &Report) -> bool {
        if self.is_empty() {
            return true;
        }
        let needle = self.0.as_str();
        [
            Some(report.title.as_str()),
            Some(report.city.as_str()),
            report.neighborhood.as_deref(),
            Some(report.description.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
    }

    pub fn apply<'a>(&self, records: &'a [Report]) -> Vec<&'a Report> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Holds back keystrokes until the user pauses typing.
#[derive(Debug)]
pub struct SearchDebounce {
    delay: Duration,
    pending: Option<(SearchQuery, Instant)>,
}

impl SearchDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Records a keystroke; restarts the quiet period.
    pub fn push(&mut self, raw: &str, now: Instant) {
        self.pending = Some((SearchQuery::new(raw), now + self.delay));
    }

    /// When the pending query becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    /// Takes the pending query once its quiet period has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<SearchQuery> {
        match &self.pending {
            Some((_, due)) if *due <= now => self.pending.take().map(|(query, _)| query),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::test_support::report;

    #[test]
    fn matches_any_searchable_field_ignoring_case() {
        let mut luna = report("Luna", "Bogotá", 1);
        luna.neighborhood = Some("Chapinero".to_string());
        luna.description = "Gata siamesa con collar ROJO".to_string();

        assert!(SearchQuery::new("  LUNA ").matches(&luna));
        assert!(SearchQuery::new("bogotá").matches(&luna));
        assert!(SearchQuery::new("chapi").matches(&luna));
        assert!(SearchQuery::new("collar rojo").matches(&luna));
        assert!(!SearchQuery::new("perro").matches(&luna));
    }

    #[test]
    fn empty_query_keeps_everything() {
        let records = vec![report("Luna", "Cali", 2), report("Max", "Cali", 1)];
        assert_eq!(SearchQuery::new("   ").apply(&records).len(), 2);
        assert_eq!(SearchQuery::new("max").apply(&records)[0].title, "Max");
    }

    #[test]
    fn debounce_releases_only_after_quiet_period() {
        let start = Instant::now();
        let mut debounce = SearchDebounce::new(Duration::from_millis(300));

        debounce.push("Lu", start);
        debounce.push("Luna", start + Duration::from_millis(200));
        assert!(debounce.take_due(start + Duration::from_millis(400)).is_none());

        let due = debounce.deadline().unwrap();
        assert_eq!(due, start + Duration::from_millis(500));
        assert_eq!(debounce.take_due(due), Some(SearchQuery::new("luna")));
        assert!(debounce.deadline().is_none());
    }
}
