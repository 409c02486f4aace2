//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, logout and the current
//! session.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use huella_core::ports::PortError;
use huella_core::UserId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{internal, reject, ErrorResponse, HandlerError};
use crate::web::middleware::{session_cookie, CurrentUser, SESSION_COOKIE};
use crate::web::profile::ProfileResponse;
use crate::web::state::AppState;

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

pub const MIN_PASSWORD_LEN: usize = 6;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// The route the user was on before being sent to sign in.
    #[serde(default)]
    pub redirect_to: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: ProfileResponse,
    /// Where the client should navigate after signing in.
    pub redirect_to: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn bad_request(message: &str) -> HandlerError {
    reject(StatusCode::BAD_REQUEST, "validation", message)
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Only same-origin paths are honoured; anything else goes home.
pub fn safe_redirect(requested: Option<&str>) -> String {
    match requested.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}

/// `/signup?email=...` so the sign-up form can be prefilled.
fn signup_redirect(email: &str) -> String {
    match reqwest::Url::parse("http://localhost/signup") {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("email", email);
            match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_string(),
            }
        }
        Err(_) => "/signup".to_string(),
    }
}

fn session_cookie_header(session_id: &str, max_age: Duration) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        max_age.num_seconds()
    )
}

/// Creates an auth session for the user and returns its `Set-Cookie` value.
async fn start_session(state: &AppState, user_id: UserId) -> Result<String, HandlerError> {
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);
    state
        .accounts
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await
        .map_err(|e| internal("Error iniciando sesión", e))?;
    Ok(session_cookie_header(&auth_session_id, ttl))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(bad_request("Ingrese un correo válido"));
    }
    if !EMAIL_SHAPE.is_match(&email) {
        return Err(bad_request("El correo no es válido"));
    }
    if req.password.is_empty() {
        return Err(bad_request("Ingrese una contraseña"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(bad_request("La contraseña debe tener al menos 6 caracteres"));
    }
    if req.first_name.trim().is_empty() {
        return Err(bad_request("Ingrese su nombre"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| internal("Error creando la cuenta", e))?
        .to_string();

    let user = state
        .accounts
        .create_user_with_email(
            &email,
            &password_hash,
            req.first_name.trim(),
            req.last_name.trim(),
        )
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => reject(
                StatusCode::CONFLICT,
                "email_in_use",
                "Este correo ya está registrado. Intenta iniciar sesión",
            ),
            other => internal("Error creando la cuenta", other),
        })?;

    let cookie = start_session(&state, user.id).await?;
    info!(user_id = %user.id, "User signed up.");

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: user.into(),
            redirect_to: "/".to_string(),
        }),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Wrong password", body = ErrorResponse),
        (status = 404, description = "No account for this email; see redirectTo", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(bad_request("Ingrese su correo"));
    }
    if req.password.is_empty() {
        return Err(bad_request("Ingrese su contraseña"));
    }

    let user_creds = state
        .accounts
        .get_user_by_email(&email)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => {
                let (status, Json(mut body)) = reject(
                    StatusCode::NOT_FOUND,
                    "account_not_found",
                    "No existe una cuenta con este correo",
                );
                body.redirect_to = Some(signup_redirect(&email));
                (status, Json(body))
            }
            other => internal("Error al iniciar sesión", other),
        })?;

    let parsed_hash = PasswordHash::new(&user_creds.hashed_password)
        .map_err(|e| internal("Error al iniciar sesión", e))?;
    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(reject(
            StatusCode::UNAUTHORIZED,
            "wrong_password",
            "Contraseña incorrecta",
        ));
    }

    let profile = state
        .accounts
        .get_profile(user_creds.user_id)
        .await
        .map_err(|e| internal("Error al iniciar sesión", e))?;
    let cookie = start_session(&state, user_creds.user_id).await?;
    info!(user_id = %user_creds.user_id, "User signed in.");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: profile.into(),
            redirect_to: safe_redirect(req.redirect_to.as_deref()),
        }),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session", body = ErrorResponse)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let auth_session_id = session_cookie(&headers).ok_or_else(|| {
        reject(StatusCode::UNAUTHORIZED, "unauthorized", "No hay una sesión activa")
    })?;

    state
        .accounts
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| internal("Error al cerrar sesión", e))?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie_header("", Duration::zero()))],
    ))
}

/// GET /auth/session - The profile behind the current session cookie
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Signed in", body = ProfileResponse),
        (status = 401, description = "No active session", body = ErrorResponse)
    )
)]
pub async fn session_handler(
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
