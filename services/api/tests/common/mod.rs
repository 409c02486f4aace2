#![allow(dead_code)]

use api_lib::adapters::InMemoryStore;
use api_lib::config::{Config, StoreBackend};
use api_lib::web::AppState;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use huella_core::domain::{PhotoUpload, Report, ReportStatus};
use huella_core::feed::{FeedEvent, FeedSession};
use huella_core::ports::{MediaHost, PortError, PortResult};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Hands out predictable URLs and remembers upload order.
#[derive(Default)]
pub struct FakeMedia {
    pub uploaded: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl MediaHost for FakeMedia {
    async fn upload(&self, photo: &PhotoUpload) -> PortResult<String> {
        if self.fail {
            return Err(PortError::Unexpected("image host down".to_string()));
        }
        let mut uploaded = self.uploaded.lock().unwrap();
        uploaded.push(photo.file_name.clone());
        Ok(format!("https://img.test/{}/{}", uploaded.len(), photo.file_name))
    }
}

pub fn test_config() -> Config {
    Config {
        store_backend: StoreBackend::Memory,
        feed_page_size: 3,
        search_debounce: std::time::Duration::from_millis(100),
        ..Config::default()
    }
}

pub fn test_state(store: Arc<InMemoryStore>, media: Arc<FakeMedia>) -> Arc<AppState> {
    Arc::new(AppState::new(
        store.clone(),
        store,
        media,
        Arc::new(test_config()),
    ))
}

/// A lost-pet report created `minutes` after a fixed instant.
pub fn report(title: &str, city: &str, minutes: i64) -> Report {
    Report {
        id: Uuid::new_v4(),
        status: ReportStatus::Lost,
        title: title.to_string(),
        description: String::new(),
        contact: "555-1234".to_string(),
        department: String::new(),
        city: city.to_string(),
        neighborhood: None,
        photo_urls: Vec::new(),
        author_id: Uuid::nil(),
        author_name: "Ana".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes),
        updated_at: None,
        found_date: None,
        found_place_details: None,
        microchipped: false,
        chip_id: None,
    }
}

/// Waits for the next snapshot the session accepts, skipping stale ones.
pub async fn next_snapshot(session: &mut FeedSession, events: &mut mpsc::Receiver<FeedEvent>) {
    loop {
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
            .await
            .expect("no snapshot within 5s")
            .expect("event channel closed");
        if session.apply_event(event).expect("snapshot failed") {
            return;
        }
    }
}
