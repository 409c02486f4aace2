//! crates/huella_core/src/validation.rs
//!
//! Report form data and the rules it must satisfy before anything is uploaded
//! or written.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::ReportStatus;

pub const MAX_PHOTOS: usize = 4;

pub const LOST_TITLE_REQUIRED: &str = "El nombre es requerido para mascotas perdidas";
pub const CITY_AND_CONTACT_REQUIRED: &str = "Ciudad y contacto son requeridos";
pub const FOUND_DETAILS_REQUIRED: &str =
    "Indica al menos la fecha o lugar donde se encontró la mascota";
pub const TOO_MANY_PHOTOS: &str = "Máximo 4 imágenes por reporte";

/// A rule violation, carrying the message shown next to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub &'static str);

/// The user-editable fields of a report as submitted from the form.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportDraft {
    #[serde(alias = "estado")]
    pub status: ReportStatus,
    /// The pet's name for lost reports; optional for found ones.
    #[serde(alias = "name")]
    pub title: String,
    pub description: String,
    pub department: String,
    pub city: String,
    #[serde(alias = "barrio")]
    pub neighborhood: Option<String>,
    pub contact: String,
    pub found_date: Option<NaiveDate>,
    pub found_place_details: Option<String>,
    pub microchipped: bool,
    pub chip_id: Option<String>,
}

fn present(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ReportDraft {
    /// Checks the draft together with the number of photos it will carry.
    pub fn validate(&self, photo_count: usize) -> Result<(), ValidationError> {
        if self.status == ReportStatus::Lost && self.title.trim().is_empty() {
            return Err(ValidationError(LOST_TITLE_REQUIRED));
        }
        if self.city.trim().is_empty() || self.contact.trim().is_empty() {
            return Err(ValidationError(CITY_AND_CONTACT_REQUIRED));
        }
        if self.status == ReportStatus::Found
            && self.found_date.is_none()
            && present(self.found_place_details.as_deref()).is_none()
        {
            return Err(ValidationError(FOUND_DETAILS_REQUIRED));
        }
        if photo_count > MAX_PHOTOS {
            return Err(ValidationError(TOO_MANY_PHOTOS));
        }
        Ok(())
    }

    /// Trims every field and drops the ones that do not apply to the status:
    /// found details on lost reports, the chip id without a microchip.
    pub fn normalized(&self) -> Self {
        let found = self.status == ReportStatus::Found;
        let microchipped = found && self.microchipped;
        Self {
            status: self.status,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            department: self.department.trim().to_string(),
            city: self.city.trim().to_string(),
            neighborhood: present(self.neighborhood.as_deref()),
            contact: self.contact.trim().to_string(),
            found_date: self.found_date.filter(|_| found),
            found_place_details: present(self.found_place_details.as_deref()).filter(|_| found),
            microchipped,
            chip_id: present(self.chip_id.as_deref()).filter(|_| microchipped),
        }
    }

    /// The title to store. Found reports without one get a descriptive title
    /// built from the location.
    pub fn resolved_title(&self) -> String {
        let title = self.title.trim();
        if self.status == ReportStatus::Lost || !title.is_empty() {
            return title.to_string();
        }
        let mut generated = format!("Mascota encontrada en {}", self.city.trim());
        if let Some(neighborhood) = present(self.neighborhood.as_deref()) {
            generated.push_str(" - ");
            generated.push_str(&neighborhood);
        }
        generated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lost(title: &str) -> ReportDraft {
        ReportDraft {
            status: ReportStatus::Lost,
            title: title.to_string(),
            city: "Bogotá".to_string(),
            contact: "555-1234".to_string(),
            ..ReportDraft::default()
        }
    }

    fn found() -> ReportDraft {
        ReportDraft {
            status: ReportStatus::Found,
            city: "Medellín".to_string(),
            contact: "a@b.com".to_string(),
            ..ReportDraft::default()
        }
    }

    #[test]
    fn lost_report_requires_title() {
        assert_eq!(lost("   ").validate(0), Err(ValidationError(LOST_TITLE_REQUIRED)));
        assert_eq!(lost("Firulais").validate(0), Ok(()));
    }

    #[test]
    fn city_and_contact_are_always_required() {
        let mut draft = lost("Firulais");
        draft.contact = " ".to_string();
        assert_eq!(draft.validate(0), Err(ValidationError(CITY_AND_CONTACT_REQUIRED)));

        let mut draft = found();
        draft.city.clear();
        draft.found_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(draft.validate(0), Err(ValidationError(CITY_AND_CONTACT_REQUIRED)));
    }

    #[test]
    fn found_report_requires_date_or_place() {
        let mut draft = found();
        assert_eq!(draft.validate(0), Err(ValidationError(FOUND_DETAILS_REQUIRED)));

        draft.found_place_details = Some("  ".to_string());
        assert_eq!(draft.validate(0), Err(ValidationError(FOUND_DETAILS_REQUIRED)));

        draft.found_place_details = Some("Parque Lleras".to_string());
        assert_eq!(draft.validate(0), Ok(()));

        let mut draft = found();
        draft.found_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(draft.validate(0), Ok(()));
    }

    #[test]
    fn more_than_four_photos_is_rejected() {
        assert_eq!(lost("Firulais").validate(4), Ok(()));
        assert_eq!(lost("Firulais").validate(5), Err(ValidationError(TOO_MANY_PHOTOS)));
    }

    #[test]
    fn found_title_is_generated_from_location() {
        let mut draft = found();
        assert_eq!(draft.resolved_title(), "Mascota encontrada en Medellín");

        draft.neighborhood = Some("El Poblado".to_string());
        assert_eq!(draft.resolved_title(), "Mascota encontrada en Medellín - El Poblado");

        draft.title = "Perrita café".to_string();
        assert_eq!(draft.resolved_title(), "Perrita café");
    }

    #[test]
    fn normalization_drops_fields_that_do_not_apply() {
        let mut draft = lost(" Firulais ");
        draft.found_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        draft.microchipped = true;
        draft.chip_id = Some("985".to_string());
        draft.neighborhood = Some(" ".to_string());

        let normalized = draft.normalized();
        assert_eq!(normalized.title, "Firulais");
        assert_eq!(normalized.found_date, None);
        assert!(!normalized.microchipped);
        assert_eq!(normalized.chip_id, None);
        assert_eq!(normalized.neighborhood, None);

        let mut draft = found();
        draft.chip_id = Some("985".to_string());
        assert_eq!(draft.normalized().chip_id, None);
        draft.microchipped = true;
        assert_eq!(draft.normalized().chip_id.as_deref(), Some("985"));
    }

    #[test]
    fn draft_accepts_form_field_names() {
        let draft: ReportDraft = serde_json::from_str(
            r#"{"estado":"encontrada","name":"","city":"Cali","barrio":"Granada","contact":"x","foundDate":"2024-01-01"}"#,
        )
        .unwrap();
        assert_eq!(draft.status, ReportStatus::Found);
        assert_eq!(draft.neighborhood.as_deref(), Some("Granada"));
        assert_eq!(draft.found_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }
}
