//! services/api/src/adapters/memory.rs
//!
//! A process-local implementation of the `ReportStore` and `AccountStore`
//! ports. Used for local runs without PostgreSQL and by the test suites.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use huella_core::domain::{
    NewReport, ProfileUpdate, Report, ReportId, ReportUpdate, UserCredentials, UserId,
    UserProfile,
};
use huella_core::feed::{newest_first, FeedQuery};
use huella_core::ports::{
    AccountStore, ChangeStream, PortError, PortResult, ReportStore, StoreChange,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::adapters::changes::ChangeFeed;

struct Account {
    profile: UserProfile,
    hashed_password: String,
}

#[derive(Default)]
pub struct InMemoryStore {
    reports: RwLock<HashMap<ReportId, Report>>,
    accounts: RwLock<HashMap<UserId, Account>>,
    sessions: RwLock<HashMap<String, (UserId, DateTime<Utc>)>>,
    changes: ChangeFeed,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live change watchers (i.e. open feed subscriptions).
    pub fn watcher_count(&self) -> usize {
        self.changes.watcher_count()
    }

    /// Inserts a report as-is, keeping its id and timestamps.
    pub async fn insert_report(&self, report: Report) {
        let id = report.id;
        self.reports.write().await.insert(id, report);
        self.changes.publish(StoreChange::Created(id));
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    fn watch(&self) -> ChangeStream {
        self.changes.watch()
    }

    async fn fetch_page(&self, query: &FeedQuery) -> PortResult<Vec<Report>> {
        let reports = self.reports.read().await;
        let mut page: Vec<Report> = reports
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        page.sort_by(newest_first);
        page.truncate(query.limit());
        Ok(page)
    }

    async fn get_report(&self, id: ReportId) -> PortResult<Report> {
        self.reports
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Report {} not found", id)))
    }

    async fn create_report(&self, report: NewReport) -> PortResult<Report> {
        let report = report.into_report(Uuid::new_v4());
        self.insert_report(report.clone()).await;
        Ok(report)
    }

    async fn update_report(&self, id: ReportId, update: ReportUpdate) -> PortResult<Report> {
        let updated = {
            let mut reports = self.reports.write().await;
            let report = reports
                .get_mut(&id)
                .ok_or_else(|| PortError::NotFound(format!("Report {} not found", id)))?;
            update.apply_to(report);
            report.clone()
        };
        self.changes.publish(StoreChange::Updated(id));
        Ok(updated)
    }

    async fn delete_report(&self, id: ReportId) -> PortResult<()> {
        self.reports
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| PortError::NotFound(format!("Report {} not found", id)))?;
        self.changes.publish(StoreChange::Deleted(id));
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        first_name: &str,
        last_name: &str,
    ) -> PortResult<UserProfile> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.profile.email == email) {
            return Err(PortError::Conflict(format!("Email {} already registered", email)));
        }
        let profile = UserProfile {
            id: Uuid::new_v4(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            photo_url: None,
        };
        accounts.insert(
            profile.id,
            Account {
                profile: profile.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(profile)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.accounts
            .read()
            .await
            .values()
            .find(|a| a.profile.email == email)
            .map(|a| UserCredentials {
                user_id: a.profile.id,
                email: a.profile.email.clone(),
                hashed_password: a.hashed_password.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_profile(&self, user_id: UserId) -> PortResult<UserProfile> {
        self.accounts
            .read()
            .await
            .get(&user_id)
            .map(|a| a.profile.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> PortResult<UserProfile> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        if let Some(first_name) = update.first_name {
            account.profile.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            account.profile.last_name = last_name;
        }
        if let Some(photo_url) = update.photo_url {
            account.profile.photo_url = Some(photo_url);
        }
        Ok(account.profile.clone())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId> {
        match self.sessions.read().await.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }
}
