//! crates/huella_core/src/feed/cursor.rs
//!
//! Pagination cursor: the sort position of the last record of a page.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::{Report, ReportId};

/// Position of a report in the newest-first ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub id: ReportId,
}

impl Cursor {
    pub fn of(report: &Report) -> Self {
        Self {
            created_at: report.created_at,
            id: report.id,
        }
    }

    /// True when `report` sorts strictly after this cursor (i.e. is older).
    pub fn precedes(&self, report: &Report) -> bool {
        (report.created_at, report.id) < (self.created_at, self.id)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid cursor '{0}'")]
pub struct InvalidCursor(String);

/// Opaque text form used in `?after=` query strings: `<rfc3339>~<uuid>`.
impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}~{}",
            self.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.id
        )
    }
}

impl FromStr for Cursor {
    type Err = InvalidCursor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (created_at, id) = s.split_once('~').ok_or_else(|| InvalidCursor(s.to_string()))?;
        let created_at = DateTime::parse_from_rfc3339(created_at)
            .map_err(|_| InvalidCursor(s.to_string()))?
            .with_timezone(&Utc);
        let id = id.parse().map_err(|_| InvalidCursor(s.to_string()))?;
        Ok(Self { created_at, id })
    }
}

/// Remembers where the most recently received page ended.
#[derive(Debug, Default)]
pub struct CursorTracker {
    last: Option<Cursor>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty page clears the cursor: there is nothing after it to ask for.
    pub fn record_page(&mut self, page: &[Report]) {
        self.last = page.last().map(Cursor::of);
    }

    pub fn current(&self) -> Option<Cursor> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::test_support::report;

    #[test]
    fn precedes_is_strict() {
        let newer = report("Luna", "Cali", 20);
        let older = report("Max", "Cali", 10);
        let cursor = Cursor::of(&newer);
        assert!(cursor.precedes(&older));
        assert!(!cursor.precedes(&newer));
    }

    #[test]
    fn ties_on_timestamp_are_broken_by_id() {
        let a = report("Luna", "Cali", 10);
        let mut b = report("Max", "Cali", 10);
        b.created_at = a.created_at;
        let (high, low) = if a.id > b.id { (a, b) } else { (b, a) };
        assert!(Cursor::of(&high).precedes(&low));
        assert!(!Cursor::of(&low).precedes(&high));
    }

    #[test]
    fn text_form_parses_back() {
        let cursor = Cursor::of(&report("Luna", "Cali", 3));
        let parsed: Cursor = cursor.to_string().parse().unwrap();
        assert_eq!(parsed, cursor);
        assert!("not-a-cursor".parse::<Cursor>().is_err());
    }

    #[test]
    fn text_form_keeps_sub_microsecond_order() {
        use chrono::TimeZone;

        let mut newer = report("Luna", "Cali", 3);
        newer.created_at = Utc.timestamp_opt(1_709_280_000, 123_456_789).unwrap();
        let mut older = report("Max", "Cali", 3);
        older.created_at = Utc.timestamp_opt(1_709_280_000, 123_456_001).unwrap();

        let parsed: Cursor = Cursor::of(&newer).to_string().parse().unwrap();
        assert_eq!(parsed, Cursor::of(&newer));
        assert!(parsed.precedes(&older));
    }

    #[test]
    fn tracker_follows_last_record_of_latest_page() {
        let mut tracker = CursorTracker::new();
        assert!(tracker.current().is_none());

        let page = vec![report("Luna", "Cali", 30), report("Max", "Cali", 20)];
        tracker.record_page(&page);
        assert_eq!(tracker.current(), Some(Cursor::of(&page[1])));

        tracker.record_page(&[]);
        assert!(tracker.current().is_none());
    }
}
