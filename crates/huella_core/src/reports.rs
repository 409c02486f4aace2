//! crates/huella_core/src/reports.rs
//!
//! Creating, editing and deleting reports: validation first, then photo
//! uploads (one at a time, in order), then a single store write.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::{
    NewReport, PhotoUpload, Report, ReportId, ReportUpdate, UserId, UserProfile,
};
use crate::ports::{MediaHost, PortError, ReportStore};
use crate::validation::{ReportDraft, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("No tienes permiso para editar este reporte")]
    Forbidden,
    #[error("Reporte no encontrado")]
    NotFound,
    #[error("Confirma la eliminación del reporte")]
    NotConfirmed,
    #[error("Error al subir la foto")]
    Upload(#[source] PortError),
    #[error("{message}")]
    Store {
        message: &'static str,
        #[source]
        source: PortError,
    },
}

impl ReportError {
    fn store(message: &'static str) -> impl FnOnce(PortError) -> ReportError {
        move |source| {
            error!("{}: {:?}", message, source);
            ReportError::Store { message, source }
        }
    }
}

/// Photos an edit keeps plus the ones it adds.
#[derive(Debug, Default)]
pub struct PhotoChanges {
    /// URLs of current photos to keep, in display order.
    pub kept: Vec<String>,
    /// New images to upload and append after the kept ones.
    pub added: Vec<PhotoUpload>,
}

pub struct ReportService {
    store: Arc<dyn ReportStore>,
    media: Arc<dyn MediaHost>,
}

impl ReportService {
    pub fn new(store: Arc<dyn ReportStore>, media: Arc<dyn MediaHost>) -> Self {
        Self { store, media }
    }

    pub async fn create(
        &self,
        author: &UserProfile,
        draft: ReportDraft,
        photos: Vec<PhotoUpload>,
    ) -> Result<Report, ReportError> {
        draft.validate(photos.len())?;
        let draft = draft.normalized();

        let photo_urls = self.upload_all(&photos).await?;

        let report = NewReport {
            status: draft.status,
            title: draft.resolved_title(),
            description: draft.description,
            contact: draft.contact,
            department: draft.department,
            city: draft.city,
            neighborhood: draft.neighborhood,
            photo_urls,
            author_id: author.id,
            author_name: author.display_name(),
            created_at: Utc::now(),
            found_date: draft.found_date,
            found_place_details: draft.found_place_details,
            microchipped: draft.microchipped,
            chip_id: draft.chip_id,
        };

        let created = self
            .store
            .create_report(report)
            .await
            .map_err(ReportError::store("Error publicando el reporte"))?;
        info!(report_id = %created.id, author_id = %author.id, "Report created.");
        Ok(created)
    }

    /// Loads a report for editing, refusing anyone but its author.
    pub async fn load_for_edit(&self, actor: UserId, id: ReportId) -> Result<Report, ReportError> {
        let report = self.store.get_report(id).await.map_err(|e| match e {
            PortError::NotFound(_) => ReportError::NotFound,
            other => ReportError::store("Error cargando el reporte")(other),
        })?;
        if report.author_id != actor {
            warn!(report_id = %id, actor = %actor, "Rejected edit from non-author.");
            return Err(ReportError::Forbidden);
        }
        Ok(report)
    }

    pub async fn edit(
        &self,
        actor: UserId,
        id: ReportId,
        draft: ReportDraft,
        photos: PhotoChanges,
    ) -> Result<Report, ReportError> {
        let current = self.load_for_edit(actor, id).await?;

        // Only photos the report already has may be kept.
        let mut kept: Vec<String> = Vec::with_capacity(photos.kept.len());
        for url in photos.kept {
            if current.photo_urls.contains(&url) && !kept.contains(&url) {
                kept.push(url);
            } else {
                warn!(report_id = %id, %url, "Ignoring unknown kept photo.");
            }
        }

        draft.validate(kept.len() + photos.added.len())?;
        let draft = draft.normalized();

        let mut photo_urls = kept;
        photo_urls.extend(self.upload_all(&photos.added).await?);

        let update = ReportUpdate {
            status: draft.status,
            title: draft.resolved_title(),
            description: draft.description,
            contact: draft.contact,
            department: draft.department,
            city: draft.city,
            neighborhood: draft.neighborhood,
            photo_urls,
            found_date: draft.found_date,
            found_place_details: draft.found_place_details,
            microchipped: draft.microchipped,
            chip_id: draft.chip_id,
            updated_at: Utc::now(),
        };

        let updated = self
            .store
            .update_report(id, update)
            .await
            .map_err(ReportError::store("Error actualizando el reporte"))?;
        info!(report_id = %id, "Report updated.");
        Ok(updated)
    }

    pub async fn delete(&self, actor: UserId, id: ReportId, confirmed: bool) -> Result<(), ReportError> {
        if !confirmed {
            return Err(ReportError::NotConfirmed);
        }
        self.load_for_edit(actor, id).await?;
        self.store
            .delete_report(id)
            .await
            .map_err(ReportError::store("Error al eliminar el reporte"))?;
        info!(report_id = %id, "Report deleted.");
        Ok(())
    }

    /// Uploads photos sequentially, preserving their order.
    async fn upload_all(&self, photos: &[PhotoUpload]) -> Result<Vec<String>, ReportError> {
        let mut urls = Vec::with_capacity(photos.len());
        for photo in photos {
            let url = self.media.upload(photo).await.map_err(|e| {
                error!("Failed to upload {}: {:?}", photo.file_name, e);
                ReportError::Upload(e)
            })?;
            urls.push(url);
        }
        Ok(urls)
    }
}
