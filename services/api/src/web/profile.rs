//! services/api/src/web/profile.rs
//!
//! Profile endpoints: read, edit names, and replace the profile photo.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use huella_core::domain::{ProfileUpdate, UserProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{internal, reject, ErrorResponse, HandlerError};
use crate::web::forms::read_image;
use crate::web::middleware::CurrentUser;
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub uid: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    /// First and last name, or the email when no name is set.
    pub display_name: String,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        let display_name = profile.display_name();
        Self {
            uid: profile.id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            photo_url: profile.photo_url,
            display_name,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// GET /profile
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ProfileResponse>, HandlerError> {
    let profile = state
        .accounts
        .get_profile(user.id)
        .await
        .map_err(|e| internal("Error cargando el perfil", e))?;
    Ok(Json(profile.into()))
}

/// PUT /profile
#[utoipa::path(
    put,
    path = "/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "First name missing", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, HandlerError> {
    if req.first_name.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "validation", "El nombre es requerido"));
    }
    let update = ProfileUpdate {
        first_name: Some(req.first_name.trim().to_string()),
        last_name: Some(req.last_name.trim().to_string()),
        photo_url: None,
    };
    let profile = state
        .accounts
        .update_profile(user.id, update)
        .await
        .map_err(|e| internal("Error al actualizar el perfil", e))?;
    info!(user_id = %user.id, "Profile updated.");
    Ok(Json(profile.into()))
}

/// POST /profile/photo
///
/// Accepts a multipart/form-data request with a single `photo` image part.
#[utoipa::path(
    post,
    path = "/profile/photo",
    request_body(content_type = "multipart/form-data", description = "The new profile image (image/*, at most 5 MB)."),
    responses(
        (status = 200, description = "Photo replaced", body = ProfileResponse),
        (status = 400, description = "Not an image or too large", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 502, description = "Image host failed", body = ErrorResponse)
    )
)]
pub async fn upload_profile_photo_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<ProfileResponse>, HandlerError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| reject(StatusCode::BAD_REQUEST, "invalid_form", e.to_string()))?
        .ok_or_else(|| {
            reject(StatusCode::BAD_REQUEST, "invalid_form", "Selecciona una imagen")
        })?;
    let photo = read_image(field, state.config.max_photo_bytes).await?;

    let url = state.media.upload(&photo).await.map_err(|e| {
        error!("Failed to upload profile photo: {:?}", e);
        reject(StatusCode::BAD_GATEWAY, "upload_failed", "Error al subir la foto")
    })?;

    let update = ProfileUpdate {
        photo_url: Some(url),
        ..ProfileUpdate::default()
    };
    let profile = state
        .accounts
        .update_profile(user.id, update)
        .await
        .map_err(|e| internal("Error al actualizar el perfil", e))?;
    info!(user_id = %user.id, "Profile photo replaced.");
    Ok(Json(profile.into()))
}
