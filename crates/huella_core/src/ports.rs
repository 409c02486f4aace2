//! crates/huella_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! core independent of the concrete database, session store and media host.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;

use crate::domain::{
    NewReport, PhotoUpload, ProfileUpdate, Report, ReportId, ReportUpdate, UserCredentials,
    UserId, UserProfile,
};
use crate::feed::FeedQuery;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A write that happened in the report store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    Created(ReportId),
    Updated(ReportId),
    Deleted(ReportId),
    /// The watcher fell behind and missed notifications; treat as "anything changed".
    Lagged,
}

/// Push-based change notifications from a store.
pub type ChangeStream = Pin<Box<dyn Stream<Item = StoreChange> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Registers a watcher. The watcher is live as soon as this returns and is
    /// released when the stream is dropped.
    fn watch(&self) -> ChangeStream;

    /// Returns the reports matching every constraint of `query`, newest first,
    /// strictly after the query's cursor, at most `query.limit()` of them.
    async fn fetch_page(&self, query: &FeedQuery) -> PortResult<Vec<Report>>;

    async fn get_report(&self, id: ReportId) -> PortResult<Report>;

    async fn create_report(&self, report: NewReport) -> PortResult<Report>;

    async fn update_report(&self, id: ReportId, update: ReportUpdate) -> PortResult<Report>;

    async fn delete_report(&self, id: ReportId) -> PortResult<()>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    // --- User Management ---
    /// Fails with `PortError::Conflict` when the email is already registered.
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        first_name: &str,
        last_name: &str,
    ) -> PortResult<UserProfile>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_profile(&self, user_id: UserId) -> PortResult<UserProfile>;

    async fn update_profile(&self, user_id: UserId, update: ProfileUpdate)
        -> PortResult<UserProfile>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live (unexpired) session to its user.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Uploads one image and returns its public URL.
    async fn upload(&self, photo: &PhotoUpload) -> PortResult<String>;
}
