//! crates/huella_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Serialization names follow the wire format used by the web client.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ReportId = Uuid;
pub type UserId = Uuid;

/// Whether a pet was lost by its owner or found by someone else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportStatus {
    #[default]
    #[serde(rename = "perdida", alias = "perdido")]
    Lost,
    #[serde(rename = "encontrada", alias = "encontrado")]
    Found,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Lost => "perdida",
            ReportStatus::Found => "encontrada",
        }
    }

    /// Every lowercase spelling a stored record may carry for this status.
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            ReportStatus::Lost => &["perdida", "perdido"],
            ReportStatus::Found => &["encontrada", "encontrado"],
        }
    }

    /// Lenient parse used at the storage boundary. Older records carry the
    /// masculine spelling, and casing was never enforced.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "perdida" | "perdido" => Some(ReportStatus::Lost),
            "encontrada" | "encontrado" => Some(ReportStatus::Found),
            _ => None,
        }
    }
}

/// A single lost/found pet posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    #[serde(rename = "estado")]
    pub status: ReportStatus,
    pub title: String,
    pub description: String,
    pub contact: String,
    pub department: String,
    pub city: String,
    #[serde(rename = "barrio")]
    pub neighborhood: Option<String>,
    #[serde(rename = "photoURLs")]
    pub photo_urls: Vec<String>,
    #[serde(rename = "authorUid")]
    pub author_id: UserId,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub found_date: Option<NaiveDate>,
    pub found_place_details: Option<String>,
    pub microchipped: bool,
    pub chip_id: Option<String>,
}

/// A fully validated report, ready to be written by a store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub status: ReportStatus,
    pub title: String,
    pub description: String,
    pub contact: String,
    pub department: String,
    pub city: String,
    pub neighborhood: Option<String>,
    pub photo_urls: Vec<String>,
    pub author_id: UserId,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub found_date: Option<NaiveDate>,
    pub found_place_details: Option<String>,
    pub microchipped: bool,
    pub chip_id: Option<String>,
}

impl NewReport {
    pub fn into_report(self, id: ReportId) -> Report {
        Report {
            id,
            status: self.status,
            title: self.title,
            description: self.description,
            contact: self.contact,
            department: self.department,
            city: self.city,
            neighborhood: self.neighborhood,
            photo_urls: self.photo_urls,
            author_id: self.author_id,
            author_name: self.author_name,
            created_at: self.created_at,
            updated_at: None,
            found_date: self.found_date,
            found_place_details: self.found_place_details,
            microchipped: self.microchipped,
            chip_id: self.chip_id,
        }
    }
}

/// The editable fields of a report. Authorship and creation time never change.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportUpdate {
    pub status: ReportStatus,
    pub title: String,
    pub description: String,
    pub contact: String,
    pub department: String,
    pub city: String,
    pub neighborhood: Option<String>,
    pub photo_urls: Vec<String>,
    pub found_date: Option<NaiveDate>,
    pub found_place_details: Option<String>,
    pub microchipped: bool,
    pub chip_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ReportUpdate {
    pub fn apply_to(self, report: &mut Report) {
        report.status = self.status;
        report.title = self.title;
        report.description = self.description;
        report.contact = self.contact;
        report.department = self.department;
        report.city = self.city;
        report.neighborhood = self.neighborhood;
        report.photo_urls = self.photo_urls;
        report.found_date = self.found_date;
        report.found_place_details = self.found_place_details;
        report.microchipped = self.microchipped;
        report.chip_id = self.chip_id;
        report.updated_at = Some(self.updated_at);
    }
}

/// An image selected by the user, not yet sent to the media host.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "uid")]
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl UserProfile {
    /// The name shown as a report's author.
    pub fn display_name(&self) -> String {
        if self.first_name.trim().is_empty() {
            return self.email.clone();
        }
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// Partial profile edit. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: UserId,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(first: &str, last: &str) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: "ana@example.com".to_string(),
            photo_url: None,
        }
    }

    #[test]
    fn status_parse_accepts_legacy_spellings() {
        assert_eq!(ReportStatus::parse("Perdido"), Some(ReportStatus::Lost));
        assert_eq!(ReportStatus::parse(" encontrado "), Some(ReportStatus::Found));
        assert_eq!(ReportStatus::parse("adopcion"), None);
    }

    #[test]
    fn every_spelling_parses_back_to_its_status() {
        for status in [ReportStatus::Lost, ReportStatus::Found] {
            assert_eq!(status.spellings()[0], status.as_str());
            for spelling in status.spellings() {
                assert_eq!(ReportStatus::parse(spelling), Some(status));
            }
        }
    }

    #[test]
    fn status_serializes_with_spanish_names() {
        assert_eq!(serde_json::to_string(&ReportStatus::Lost).unwrap(), "\"perdida\"");
        let found: ReportStatus = serde_json::from_str("\"encontrado\"").unwrap();
        assert_eq!(found, ReportStatus::Found);
    }

    #[test]
    fn display_name_falls_back_to_email() {
        assert_eq!(profile("Ana", "Gómez").display_name(), "Ana Gómez");
        assert_eq!(profile("Ana", "").display_name(), "Ana");
        assert_eq!(profile("  ", "Gómez").display_name(), "ana@example.com");
    }
}
