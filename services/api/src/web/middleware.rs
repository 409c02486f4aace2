//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use huella_core::ports::PortError;
use huella_core::UserId;
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::{reject, HandlerError};
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// The signed-in user, resolved once per request from the session cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub session_id: String,
}

/// Reads the auth session id from the `Cookie` header.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

pub fn unauthorized() -> HandlerError {
    reject(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        "Inicia sesión para continuar",
    )
}

/// Middleware that validates the auth session cookie.
///
/// If valid, inserts a `CurrentUser` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HandlerError> {
    let session_id = session_cookie(req.headers())
        .ok_or_else(unauthorized)?
        .to_string();

    let user_id = match state.accounts.validate_auth_session(&session_id).await {
        Ok(user_id) => user_id,
        Err(PortError::Unauthorized) => {
            warn!("Rejected an unknown or expired auth session.");
            return Err(unauthorized());
        }
        Err(e) => {
            error!("Failed to validate auth session: {:?}", e);
            return Err(unauthorized());
        }
    };

    req.extensions_mut().insert(CurrentUser {
        id: user_id,
        session_id,
    });
    Ok(next.run(req).await)
}
