//! services/api/src/web/forms.rs
//!
//! Reads `multipart/form-data` report and photo submissions.

use axum::extract::multipart::{Field, Multipart};
use axum::http::StatusCode;
use chrono::NaiveDate;
use huella_core::domain::{PhotoUpload, ReportStatus};
use huella_core::ReportDraft;

use crate::error::{reject, HandlerError};

pub const NOT_AN_IMAGE: &str = "El archivo debe ser una imagen";
pub const IMAGE_TOO_LARGE: &str = "La imagen no debe superar 5MB";

/// A parsed report form: the fields, new images and (on edit) kept photo URLs.
#[derive(Debug, Default)]
pub struct ReportForm {
    pub draft: ReportDraft,
    pub photos: Vec<PhotoUpload>,
    pub kept_photos: Vec<String>,
}

fn bad_form(message: impl Into<String>) -> HandlerError {
    reject(StatusCode::BAD_REQUEST, "invalid_form", message)
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn checkbox(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "on" | "1" | "si" | "sí" | "yes"
    )
}

/// Reads one uploaded image, enforcing `image/*` and the size limit.
pub async fn read_image(field: Field<'_>, max_bytes: usize) -> Result<PhotoUpload, HandlerError> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    if !content_type.starts_with("image/") {
        return Err(bad_form(NOT_AN_IMAGE));
    }
    let file_name = field.file_name().unwrap_or("foto").to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| bad_form(format!("No se pudo leer la imagen: {}", e)))?;
    if bytes.len() > max_bytes {
        return Err(bad_form(IMAGE_TOO_LARGE));
    }
    Ok(PhotoUpload {
        file_name,
        content_type,
        bytes,
    })
}

async fn text(field: Field<'_>) -> Result<String, HandlerError> {
    field
        .text()
        .await
        .map_err(|e| bad_form(format!("Formulario inválido: {}", e)))
}

/// Collects a report form. Photo parts are `photos`; kept URLs are repeated
/// `keptPhotos` parts, in display order.
pub async fn read_report_form(
    mut multipart: Multipart,
    max_photo_bytes: usize,
) -> Result<ReportForm, HandlerError> {
    let mut form = ReportForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_form(format!("Formulario inválido: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let draft = &mut form.draft;
        match name.as_str() {
            "photos" | "photo" | "images" => {
                // Browsers send an empty part when no file was chosen.
                if field.file_name() == Some("") {
                    continue;
                }
                form.photos.push(read_image(field, max_photo_bytes).await?);
            }
            "keptPhotos" => {
                if let Some(url) = optional(text(field).await?) {
                    form.kept_photos.push(url);
                }
            }
            "status" | "estado" => {
                let raw = text(field).await?;
                draft.status = ReportStatus::parse(&raw)
                    .ok_or_else(|| bad_form(format!("Estado desconocido: {}", raw.trim())))?;
            }
            "title" | "name" => draft.title = text(field).await?,
            "description" => draft.description = text(field).await?,
            "department" => draft.department = text(field).await?,
            "city" => draft.city = text(field).await?,
            "neighborhood" | "barrio" => draft.neighborhood = optional(text(field).await?),
            "contact" => draft.contact = text(field).await?,
            "foundDate" => {
                draft.found_date = match optional(text(field).await?) {
                    Some(raw) => Some(
                        NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                            .map_err(|_| bad_form(format!("Fecha inválida: {}", raw)))?,
                    ),
                    None => None,
                };
            }
            "foundPlaceDetails" => draft.found_place_details = optional(text(field).await?),
            "microchipped" => draft.microchipped = checkbox(&text(field).await?),
            "chipId" => draft.chip_id = optional(text(field).await?),
            _ => {}
        }
    }

    Ok(form)
}
