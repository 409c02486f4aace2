//! crates/huella_core/src/feed/query.rs
//!
//! Turns the active feed filters into a store query: equality constraints,
//! newest-first ordering and a row limit.

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;

use crate::domain::{Report, ReportStatus, UserId};
use crate::feed::cursor::Cursor;

/// The fields a feed may be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Department,
    City,
    Neighborhood,
    Status,
    Author,
}

impl FilterField {
    /// Column name in the relational schema.
    pub fn column(&self) -> &'static str {
        match self {
            FilterField::Department => "department",
            FilterField::City => "city",
            FilterField::Neighborhood => "neighborhood",
            FilterField::Status => "status",
            FilterField::Author => "author_id",
        }
    }
}

/// `field == value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub field: FilterField,
    pub value: String,
}

impl Constraint {
    pub fn matches(&self, report: &Report) -> bool {
        match self.field {
            FilterField::Department => report.department == self.value,
            FilterField::City => report.city == self.value,
            FilterField::Neighborhood => report.neighborhood.as_deref() == Some(self.value.as_str()),
            FilterField::Status => report.status.as_str() == self.value,
            FilterField::Author => report.author_id.to_string() == self.value,
        }
    }
}

/// The only ordering feeds use: newest first, id descending on ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    CreatedAtDesc,
}

/// Filter values selected in a feed view. Blank values are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFilters {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, alias = "barrio")]
    pub neighborhood: Option<String>,
    #[serde(default, alias = "estado", deserialize_with = "blank_as_none")]
    pub status: Option<ReportStatus>,
    /// Set server-side for the "my reports" view; never taken from a client.
    #[serde(skip)]
    pub author_id: Option<UserId>,
}

impl FeedFilters {
    pub fn for_author(author_id: UserId) -> Self {
        Self {
            author_id: Some(author_id),
            ..Self::default()
        }
    }

    fn constraints(&self) -> Vec<Constraint> {
        let mut constraints = Vec::new();
        let mut push = |field: FilterField, value: Option<&str>| {
            if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
                constraints.push(Constraint {
                    field,
                    value: value.to_string(),
                });
            }
        };
        push(FilterField::Department, self.department.as_deref());
        push(FilterField::City, self.city.as_deref());
        push(FilterField::Neighborhood, self.neighborhood.as_deref());
        push(FilterField::Status, self.status.map(|s| s.as_str()));
        let author = self.author_id.map(|id| id.to_string());
        push(FilterField::Author, author.as_deref());
        constraints
    }
}

// Select boxes submit "" for "any status".
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<ReportStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => ReportStatus::parse(value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("unknown status '{}'", value))),
    }
}

/// A complete store query for one feed page.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    constraints: Vec<Constraint>,
    order: SortOrder,
    limit: usize,
    start_after: Option<Cursor>,
}

impl FeedQuery {
    pub fn build(filters: &FeedFilters, page_size: usize) -> Self {
        Self {
            constraints: filters.constraints(),
            order: SortOrder::CreatedAtDesc,
            limit: page_size.max(1),
            start_after: None,
        }
    }

    /// The same query, continuing strictly after `cursor`.
    pub fn after(&self, cursor: Cursor) -> Self {
        Self {
            start_after: Some(cursor),
            ..self.clone()
        }
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn start_after(&self) -> Option<&Cursor> {
        self.start_after.as_ref()
    }

    /// Whether `report` belongs to this query's result set (ignoring the limit).
    pub fn matches(&self, report: &Report) -> bool {
        self.constraints.iter().all(|c| c.matches(report))
            && self.start_after.map_or(true, |cursor| cursor.precedes(report))
    }
}

/// Orders two reports the way every feed is sorted.
pub fn newest_first(a: &Report, b: &Report) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::test_support::report;

    #[test]
    fn unset_and_blank_filters_emit_no_constraints() {
        let filters = FeedFilters {
            city: Some("  ".to_string()),
            ..FeedFilters::default()
        };
        let query = FeedQuery::build(&filters, 9);
        assert!(query.constraints().is_empty());
        assert_eq!(query.order(), SortOrder::CreatedAtDesc);
        assert_eq!(query.limit(), 9);
        assert!(query.start_after().is_none());
    }

    #[test]
    fn every_set_filter_becomes_an_equality_constraint() {
        let filters = FeedFilters {
            department: Some("Valle del Cauca".to_string()),
            city: Some("Cali".to_string()),
            neighborhood: Some("San Antonio".to_string()),
            status: Some(ReportStatus::Found),
            author_id: None,
        };
        let query = FeedQuery::build(&filters, 9);
        let fields: Vec<_> = query.constraints().iter().map(|c| c.field).collect();
        assert_eq!(
            fields,
            vec![
                FilterField::Department,
                FilterField::City,
                FilterField::Neighborhood,
                FilterField::Status
            ]
        );
        assert_eq!(query.constraints()[3].value, "encontrada");
    }

    #[test]
    fn query_matches_only_reports_satisfying_all_constraints() {
        let filters = FeedFilters {
            city: Some("Cali".to_string()),
            status: Some(ReportStatus::Lost),
            ..FeedFilters::default()
        };
        let query = FeedQuery::build(&filters, 9);

        let mut cali = report("Luna", "Cali", 10);
        assert!(query.matches(&cali));
        cali.status = ReportStatus::Found;
        assert!(!query.matches(&cali));
        assert!(!query.matches(&report("Max", "Cartagena", 10)));
    }

    #[test]
    fn after_keeps_constraints_and_adds_cursor() {
        let filters = FeedFilters {
            city: Some("Cali".to_string()),
            ..FeedFilters::default()
        };
        let base = FeedQuery::build(&filters, 3);
        let newer = report("Luna", "Cali", 20);
        let older = report("Max", "Cali", 10);
        let next = base.after(Cursor::of(&newer));

        assert_eq!(next.constraints(), base.constraints());
        assert_eq!(next.limit(), 3);
        assert!(next.matches(&older));
        assert!(!next.matches(&newer));
    }

    #[test]
    fn filters_deserialize_blank_status_as_unset() {
        let filters: FeedFilters =
            serde_json::from_str(r#"{"city":"Cali","estado":""}"#).unwrap();
        assert_eq!(filters.city.as_deref(), Some("Cali"));
        assert_eq!(filters.status, None);

        let filters: FeedFilters = serde_json::from_str(r#"{"status":"perdido"}"#).unwrap();
        assert_eq!(filters.status, Some(ReportStatus::Lost));
    }

    #[test]
    fn zero_page_size_is_clamped() {
        assert_eq!(FeedQuery::build(&FeedFilters::default(), 0).limit(), 1);
    }
}
