//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of
//! the `ReportStore` and `AccountStore` ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use huella_core::domain::{
    NewReport, ProfileUpdate, Report, ReportId, ReportStatus, ReportUpdate, UserCredentials,
    UserId, UserProfile,
};
use huella_core::feed::{FeedQuery, FilterField};
use huella_core::ports::{
    AccountStore, ChangeStream, PortError, PortResult, ReportStore, StoreChange,
};
use huella_core::MAX_PHOTOS;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::warn;
use uuid::Uuid;

use crate::adapters::changes::ChangeFeed;

const REPORT_COLUMNS: &str = "id, status, title, description, contact, department, city, \
     neighborhood, photo_urls, author_id, author_name, created_at, updated_at, found_date, \
     found_place_details, microchipped, chip_id";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ReportStore` and `AccountStore` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    changes: ChangeFeed,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            changes: ChangeFeed::default(),
        }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

/// A `reports` row. Every optional column is nullable and gets its default here.
#[derive(FromRow)]
struct ReportRecord {
    id: Uuid,
    status: String,
    title: Option<String>,
    description: Option<String>,
    contact: Option<String>,
    department: Option<String>,
    city: Option<String>,
    neighborhood: Option<String>,
    photo_urls: Option<Vec<String>>,
    author_id: Uuid,
    author_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    found_date: Option<NaiveDate>,
    found_place_details: Option<String>,
    microchipped: Option<bool>,
    chip_id: Option<String>,
}

impl ReportRecord {
    /// Returns `None` for rows that cannot be shown (unknown status).
    fn to_domain(self) -> Option<Report> {
        let Some(status) = ReportStatus::parse(&self.status) else {
            warn!(report_id = %self.id, status = %self.status, "Skipping report with unknown status.");
            return None;
        };
        let mut photo_urls = self.photo_urls.unwrap_or_default();
        if photo_urls.len() > MAX_PHOTOS {
            warn!(report_id = %self.id, count = photo_urls.len(), "Truncating oversized photo list.");
            photo_urls.truncate(MAX_PHOTOS);
        }
        let neighborhood = self.neighborhood.filter(|n| !n.trim().is_empty());
        Some(Report {
            id: self.id,
            status,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            contact: self.contact.unwrap_or_default(),
            department: self.department.unwrap_or_default(),
            city: self.city.unwrap_or_default(),
            neighborhood,
            photo_urls,
            author_id: self.author_id,
            author_name: self.author_name.unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            found_date: self.found_date,
            found_place_details: self.found_place_details,
            microchipped: self.microchipped.unwrap_or(false),
            chip_id: self.chip_id,
        })
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    photo_url: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            photo_url: self.photo_url,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}

/// Builds the SELECT for one feed page. `None` when no record can match.
fn page_query(query: &FeedQuery) -> Option<QueryBuilder<'static, Postgres>> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {} FROM reports WHERE TRUE", REPORT_COLUMNS));

    for constraint in query.constraints() {
        let column = constraint.field.column();
        match constraint.field {
            FilterField::Author => {
                // Not a user id, so nobody can have written it.
                let author_id = constraint.value.parse::<Uuid>().ok()?;
                builder.push(format!(" AND {} = ", column)).push_bind(author_id);
            }
            FilterField::Status => {
                // Legacy rows use the masculine spelling and mixed case.
                let status = ReportStatus::parse(&constraint.value)?;
                let spellings: Vec<String> =
                    status.spellings().iter().map(|s| s.to_string()).collect();
                builder
                    .push(format!(" AND lower(trim({})) = ANY(", column))
                    .push_bind(spellings)
                    .push(")");
            }
            _ => {
                builder
                    .push(format!(" AND {} = ", column))
                    .push_bind(constraint.value.clone());
            }
        }
    }
    if let Some(cursor) = query.start_after() {
        builder
            .push(" AND (created_at, id) < (")
            .push_bind(cursor.created_at)
            .push(", ")
            .push_bind(cursor.id)
            .push(")");
    }
    builder
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(query.limit() as i64);
    Some(builder)
}

//=========================================================================================
// `ReportStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ReportStore for DbAdapter {
    fn watch(&self) -> ChangeStream {
        self.changes.watch()
    }

    async fn fetch_page(&self, query: &FeedQuery) -> PortResult<Vec<Report>> {
        let Some(mut builder) = page_query(query) else {
            return Ok(Vec::new());
        };
        let records = builder
            .build_query_as::<ReportRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().filter_map(ReportRecord::to_domain).collect())
    }

    async fn get_report(&self, id: ReportId) -> PortResult<Report> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {} FROM reports WHERE id = $1",
            REPORT_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Report {} not found", id)),
            _ => unexpected(e),
        })?;
        record
            .to_domain()
            .ok_or_else(|| PortError::Unexpected(format!("Report {} is unreadable", id)))
    }

    async fn create_report(&self, report: NewReport) -> PortResult<Report> {
        let report = report.into_report(Uuid::new_v4());
        sqlx::query(
            "INSERT INTO reports (id, status, title, description, contact, department, city, \
             neighborhood, photo_urls, author_id, author_name, created_at, found_date, \
             found_place_details, microchipped, chip_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(report.id)
        .bind(report.status.as_str())
        .bind(&report.title)
        .bind(&report.description)
        .bind(&report.contact)
        .bind(&report.department)
        .bind(&report.city)
        .bind(&report.neighborhood)
        .bind(&report.photo_urls)
        .bind(report.author_id)
        .bind(&report.author_name)
        .bind(report.created_at)
        .bind(report.found_date)
        .bind(&report.found_place_details)
        .bind(report.microchipped)
        .bind(&report.chip_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        self.changes.publish(StoreChange::Created(report.id));
        Ok(report)
    }

    async fn update_report(&self, id: ReportId, update: ReportUpdate) -> PortResult<Report> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "UPDATE reports SET status = $2, title = $3, description = $4, contact = $5, \
             department = $6, city = $7, neighborhood = $8, photo_urls = $9, found_date = $10, \
             found_place_details = $11, microchipped = $12, chip_id = $13, updated_at = $14 \
             WHERE id = $1 RETURNING {}",
            REPORT_COLUMNS
        ))
        .bind(id)
        .bind(update.status.as_str())
        .bind(&update.title)
        .bind(&update.description)
        .bind(&update.contact)
        .bind(&update.department)
        .bind(&update.city)
        .bind(&update.neighborhood)
        .bind(&update.photo_urls)
        .bind(update.found_date)
        .bind(&update.found_place_details)
        .bind(update.microchipped)
        .bind(&update.chip_id)
        .bind(update.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Report {} not found", id)),
            _ => unexpected(e),
        })?;

        self.changes.publish(StoreChange::Updated(id));
        record
            .to_domain()
            .ok_or_else(|| PortError::Unexpected(format!("Report {} is unreadable", id)))
    }

    async fn delete_report(&self, id: ReportId) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Report {} not found", id)));
        }
        self.changes.publish(StoreChange::Deleted(id));
        Ok(())
    }
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        first_name: &str,
        last_name: &str,
    ) -> PortResult<UserProfile> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, hashed_password, first_name, last_name) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, email, first_name, last_name, photo_url",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Email {} already registered", email))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(UserCredentials {
            user_id: record.id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn get_profile(&self, user_id: UserId) -> PortResult<UserProfile> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, first_name, last_name, photo_url FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> PortResult<UserProfile> {
        let record = sqlx::query_as::<_, UserRecord>(
            "UPDATE users SET first_name = COALESCE($2, first_name), \
             last_name = COALESCE($3, last_name), photo_url = COALESCE($4, photo_url), \
             updated_at = now() WHERE id = $1 \
             RETURNING id, email, first_name, last_name, photo_url",
        )
        .bind(user_id)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.photo_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huella_core::feed::FeedFilters;

    #[test]
    fn status_filter_covers_legacy_spellings() {
        let filters = FeedFilters {
            city: Some("Cali".to_string()),
            status: Some(ReportStatus::Lost),
            ..FeedFilters::default()
        };
        let builder = page_query(&FeedQuery::build(&filters, 10)).unwrap();
        let sql = builder.sql();
        assert!(sql.contains(" AND lower(trim(status)) = ANY($"), "{}", sql);
        assert!(!sql.contains(" AND status = "), "{}", sql);
        assert!(sql.contains(" AND city = $"), "{}", sql);
        assert!(sql.ends_with("ORDER BY created_at DESC, id DESC LIMIT $3"), "{}", sql);
    }
}
