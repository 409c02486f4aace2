pub mod auth;
pub mod forms;
pub mod middleware;
pub mod profile;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use huella_core::MAX_PHOTOS;
use std::sync::Arc;

pub use middleware::require_auth;
pub use state::AppState;
pub use ws_handler::{feed_ws_handler, my_feed_ws_handler};

/// Builds every API route. CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/reports", get(rest::list_reports_handler))
        .route("/reports/{id}", get(rest::get_report_handler))
        .route("/ws/feed", get(feed_ws_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/session", get(auth::session_handler))
        .route(
            "/profile",
            get(profile::get_profile_handler).put(profile::update_profile_handler),
        )
        .route("/profile/photo", post(profile::upload_profile_photo_handler))
        .route("/reports", post(rest::create_report_handler))
        .route(
            "/reports/{id}",
            axum::routing::put(rest::update_report_handler).delete(rest::delete_report_handler),
        )
        .route("/me/reports", get(rest::my_reports_handler))
        .route("/ws/mine", get(my_feed_ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Room for a full set of photos plus the text fields.
    let body_limit = app_state.config.max_photo_bytes * MAX_PHOTOS + 1024 * 1024;

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}
