//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the report REST endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use huella_core::feed::{Cursor, FeedFilters, FeedQuery};
use huella_core::ports::PortError;
use huella_core::{PhotoChanges, Report, ReportId, ReportStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::error::{internal, reject, report_rejection, ErrorResponse, HandlerError};
use crate::web::auth::{AuthResponse, LoginRequest, SignupRequest};
use crate::web::forms::read_report_form;
use crate::web::middleware::CurrentUser;
use crate::web::profile::{ProfileResponse, UpdateProfileRequest};
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::session_handler,
        crate::web::profile::get_profile_handler,
        crate::web::profile::update_profile_handler,
        crate::web::profile::upload_profile_photo_handler,
        list_reports_handler,
        get_report_handler,
        create_report_handler,
        update_report_handler,
        delete_report_handler,
        my_reports_handler,
    ),
    components(
        schemas(
            ErrorResponse,
            SignupRequest,
            LoginRequest,
            AuthResponse,
            ProfileResponse,
            UpdateProfileRequest,
            ReportBody,
            FeedPage
        )
    ),
    tags(
        (name = "Huella de Regreso API", description = "Lost and found pet reports.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// One report, in the same JSON shape the live feed pushes.
#[derive(Serialize, ToSchema)]
#[schema(value_type = Object)]
pub struct ReportBody(pub Report);

/// One page of a feed.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    #[schema(value_type = Vec<Object>)]
    pub reports: Vec<Report>,
    /// A full page came back, so there may be more.
    pub has_more: bool,
    /// Pass as `after` to fetch the next page.
    pub next_cursor: Option<String>,
}

/// Feed filters plus the pagination cursor. Blank values mean "any".
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(default)]
pub struct ListParams {
    pub department: Option<String>,
    pub city: Option<String>,
    #[serde(alias = "barrio")]
    pub neighborhood: Option<String>,
    /// `perdida` or `encontrada`.
    #[serde(alias = "estado")]
    pub status: Option<String>,
    /// Cursor returned as `nextCursor` by the previous page.
    pub after: Option<String>,
}

impl ListParams {
    fn filters(&self) -> Result<FeedFilters, HandlerError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(ReportStatus::parse(raw).ok_or_else(|| {
                reject(StatusCode::BAD_REQUEST, "invalid_filter", format!("Estado desconocido: {}", raw))
            })?),
        };
        Ok(FeedFilters {
            department: self.department.clone(),
            city: self.city.clone(),
            neighborhood: self.neighborhood.clone(),
            status,
            author_id: None,
        })
    }

    fn cursor(&self) -> Result<Option<Cursor>, HandlerError> {
        match self.after.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<Cursor>()
                .map(Some)
                .map_err(|e| reject(StatusCode::BAD_REQUEST, "invalid_cursor", e.to_string())),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(default)]
pub struct DeleteParams {
    /// Must be `true`; deleting is irreversible.
    pub confirm: bool,
}

async fn fetch_feed_page(
    state: &AppState,
    filters: &FeedFilters,
    after: Option<Cursor>,
) -> Result<FeedPage, HandlerError> {
    let mut query = FeedQuery::build(filters, state.config.feed_page_size);
    if let Some(cursor) = after {
        query = query.after(cursor);
    }
    let reports = state
        .reports
        .fetch_page(&query)
        .await
        .map_err(|e| internal("Error cargando publicaciones", e))?;
    let has_more = reports.len() == query.limit();
    let next_cursor = if has_more {
        reports.last().map(|r| Cursor::of(r).to_string())
    } else {
        None
    };
    Ok(FeedPage {
        reports,
        has_more,
        next_cursor,
    })
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// One page of the public feed, newest first.
#[utoipa::path(
    get,
    path = "/reports",
    params(ListParams),
    responses(
        (status = 200, description = "A feed page", body = FeedPage),
        (status = 400, description = "Unknown status or malformed cursor", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_reports_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<FeedPage>, HandlerError> {
    let filters = params.filters()?;
    let page = fetch_feed_page(&state, &filters, params.cursor()?).await?;
    Ok(Json(page))
}

/// The caller's own reports, newest first.
#[utoipa::path(
    get,
    path = "/me/reports",
    params(ListParams),
    responses(
        (status = 200, description = "A page of the caller's reports", body = FeedPage),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
pub async fn my_reports_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<FeedPage>, HandlerError> {
    let filters = FeedFilters::for_author(user.id);
    let page = fetch_feed_page(&state, &filters, params.cursor()?).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/reports/{id}",
    params(("id" = Uuid, Path, description = "Report id")),
    responses(
        (status = 200, description = "The report", body = ReportBody),
        (status = 404, description = "No such report", body = ErrorResponse)
    )
)]
pub async fn get_report_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ReportId>,
) -> Result<Json<ReportBody>, HandlerError> {
    let report = state.reports.get_report(id).await.map_err(|e| match e {
        PortError::NotFound(_) => reject(StatusCode::NOT_FOUND, "not_found", "Reporte no encontrado"),
        other => internal("Error cargando el reporte", other),
    })?;
    Ok(Json(ReportBody(report)))
}

/// Publish a new report.
///
/// Text fields use the form names (`status`, `title`, `city`, `contact`, ...);
/// images are repeated `photos` parts, uploaded in the order sent.
#[utoipa::path(
    post,
    path = "/reports",
    request_body(content_type = "multipart/form-data", description = "Report fields and up to 4 images."),
    responses(
        (status = 201, description = "Report created", body = ReportBody),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 502, description = "Image host failed", body = ErrorResponse)
    )
)]
pub async fn create_report_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let form = read_report_form(multipart, state.config.max_photo_bytes).await?;
    let author = state
        .accounts
        .get_profile(user.id)
        .await
        .map_err(|e| internal("Error publicando el reporte", e))?;

    let report = state
        .report_service
        .create(&author, form.draft, form.photos)
        .await
        .map_err(report_rejection)?;
    Ok((StatusCode::CREATED, Json(ReportBody(report))))
}

/// Edit a report the caller wrote.
///
/// Repeated `keptPhotos` parts list the current photo URLs to keep; new
/// `photos` parts are appended after them.
#[utoipa::path(
    put,
    path = "/reports/{id}",
    params(("id" = Uuid, Path, description = "Report id")),
    request_body(content_type = "multipart/form-data", description = "Report fields, kept photo URLs and new images."),
    responses(
        (status = 200, description = "Report updated", body = ReportBody),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "No such report", body = ErrorResponse)
    )
)]
pub async fn update_report_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<ReportId>,
    multipart: Multipart,
) -> Result<Json<ReportBody>, HandlerError> {
    // Authorship is checked before the body (and its images) is read.
    state
        .report_service
        .load_for_edit(user.id, id)
        .await
        .map_err(report_rejection)?;

    let form = read_report_form(multipart, state.config.max_photo_bytes).await?;
    let changes = PhotoChanges {
        kept: form.kept_photos,
        added: form.photos,
    };
    let report = state
        .report_service
        .edit(user.id, id, form.draft, changes)
        .await
        .map_err(report_rejection)?;
    Ok(Json(ReportBody(report)))
}

#[utoipa::path(
    delete,
    path = "/reports/{id}",
    params(
        ("id" = Uuid, Path, description = "Report id"),
        DeleteParams
    ),
    responses(
        (status = 204, description = "Report deleted"),
        (status = 400, description = "Missing confirmation", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "No such report", body = ErrorResponse)
    )
)]
pub async fn delete_report_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<ReportId>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, HandlerError> {
    state
        .report_service
        .delete(user.id, id, params.confirm)
        .await
        .map_err(report_rejection)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_params_mean_any() {
        let params = ListParams {
            city: Some("Cali".to_string()),
            status: Some(" ".to_string()),
            ..ListParams::default()
        };
        let filters = params.filters().unwrap();
        assert_eq!(filters.status, None);
        assert_eq!(filters.city.as_deref(), Some("Cali"));
        assert_eq!(params.cursor().unwrap(), None);
    }

    #[test]
    fn unknown_status_and_bad_cursor_are_rejected() {
        let params = ListParams {
            status: Some("adoptada".to_string()),
            after: Some("yesterday".to_string()),
            ..ListParams::default()
        };
        assert_eq!(params.filters().unwrap_err().0, StatusCode::BAD_REQUEST);
        assert_eq!(params.cursor().unwrap_err().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_doc_describes_single_report_as_object() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert_eq!(doc["components"]["schemas"]["ReportBody"]["type"], "object");
        assert!(doc["paths"]["/reports/{id}"]["get"].is_object());
    }
}
