//! crates/huella_core/src/feed/mod.rs
//!
//! The report feed: query building, live result caching, cursor pagination
//! and local search, composed by [`FeedSession`].

pub mod cache;
pub mod cursor;
pub mod query;
pub mod search;
pub mod session;

pub use cache::LiveResultCache;
pub use cursor::{Cursor, CursorTracker, InvalidCursor};
pub use query::{newest_first, Constraint, FeedFilters, FeedQuery, FilterField, SortOrder};
pub use search::{SearchDebounce, SearchQuery};
pub use session::{FeedError, FeedEvent, FeedSession, LiveSubscription};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use crate::domain::{Report, ReportStatus};

    /// A lost-pet report created `minutes` after a fixed epoch.
    pub fn report(title: &str, city: &str, minutes: i64) -> Report {
        let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Report {
            id: Uuid::new_v4(),
            status: ReportStatus::Lost,
            title: title.to_string(),
            description: String::new(),
            contact: "555-1234".to_string(),
            department: String::new(),
            city: city.to_string(),
            neighborhood: None,
            photo_urls: Vec::new(),
            author_id: Uuid::nil(),
            author_name: "Ana".to_string(),
            created_at: epoch + Duration::minutes(minutes),
            updated_at: None,
            found_date: None,
            found_place_details: None,
            microchipped: false,
            chip_id: None,
        }
    }
}
