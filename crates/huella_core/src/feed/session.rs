//! crates/huella_core/src/feed/session.rs
//!
//! One consumer's view of a feed: the active filters, a single live
//! subscription, the loaded records, the pagination cursor and the search text.

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::domain::Report;
use crate::feed::{CursorTracker, FeedFilters, FeedQuery, LiveResultCache, SearchQuery};
use crate::ports::{PortError, PortResult, ReportStore};

/// A page-one snapshot pushed by a live subscription.
#[derive(Debug)]
pub struct FeedEvent {
    pub generation: u64,
    pub result: PortResult<Vec<Report>>,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Error cargando publicaciones")]
    Load(#[source] PortError),
    #[error("Error cargando más publicaciones")]
    LoadMore(#[source] PortError),
}

//=========================================================================================
// LiveSubscription
//=========================================================================================

/// A running subscription: re-reads page one of `query` every time the store
/// reports a change and forwards the snapshot to the owning session. A page
/// identical to the last one forwarded is not sent again, so writes outside
/// the query leave the session's loaded pages alone.
///
/// Dropping the handle cancels the task; `close` also waits for it to finish.
pub struct LiveSubscription {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl LiveSubscription {
    pub fn open(
        store: Arc<dyn ReportStore>,
        query: FeedQuery,
        generation: u64,
        events: mpsc::Sender<FeedEvent>,
    ) -> Self {
        // Registered before the task starts so no change between now and the
        // first fetch can be missed.
        let mut changes = store.watch();
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            debug!(generation, "Live subscription started.");
            let mut last = None;
            if !forward_snapshot(&*store, &query, generation, &events, &cancelled, &mut last).await {
                return;
            }
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    change = changes.next() => match change {
                        Some(change) => {
                            debug!(generation, ?change, "Store change received.");
                            if !forward_snapshot(
                                &*store, &query, generation, &events, &cancelled, &mut last,
                            )
                            .await
                            {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            debug!(generation, "Live subscription ended.");
        });

        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Cancels the subscription and waits until its task has released the watcher.
    pub async fn close(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!("Live subscription task failed: {:?}", e);
                }
            }
        }
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Fetches page one and sends it unless it equals `last`.
/// Returns `false` when the subscription should stop.
async fn forward_snapshot(
    store: &dyn ReportStore,
    query: &FeedQuery,
    generation: u64,
    events: &mpsc::Sender<FeedEvent>,
    cancelled: &CancellationToken,
    last: &mut Option<Vec<Report>>,
) -> bool {
    let result = tokio::select! {
        _ = cancelled.cancelled() => return false,
        result = store.fetch_page(query) => result,
    };
    match &result {
        Ok(page) if last.as_ref() == Some(page) => {
            debug!(generation, "Page one unchanged, nothing to forward.");
            return true;
        }
        Ok(page) => *last = Some(page.clone()),
        // Always forward the next successful read after a failure.
        Err(_) => *last = None,
    }
    // The owner may be waiting in `close` instead of draining the channel.
    tokio::select! {
        _ = cancelled.cancelled() => false,
        sent = events.send(FeedEvent { generation, result }) => sent.is_ok(),
    }
}

//=========================================================================================
// FeedSession
//=========================================================================================

pub struct FeedSession {
    store: Arc<dyn ReportStore>,
    filters: FeedFilters,
    cache: LiveResultCache,
    cursor: CursorTracker,
    search: SearchQuery,
    subscription: Option<LiveSubscription>,
    events: mpsc::Sender<FeedEvent>,
}

impl FeedSession {
    /// Creates an idle session. Snapshots arrive on the returned receiver and
    /// must be handed back through [`FeedSession::apply_event`].
    pub fn new(store: Arc<dyn ReportStore>, page_size: usize) -> (Self, mpsc::Receiver<FeedEvent>) {
        let (events, receiver) = mpsc::channel(16);
        let session = Self {
            store,
            filters: FeedFilters::default(),
            cache: LiveResultCache::new(page_size),
            cursor: CursorTracker::new(),
            search: SearchQuery::default(),
            subscription: None,
            events,
        };
        (session, receiver)
    }

    /// Swaps the active filters: the previous subscription is fully closed
    /// before the new one is opened.
    pub async fn set_filters(&mut self, filters: FeedFilters) {
        if let Some(previous) = self.subscription.take() {
            previous.close().await;
        }
        let generation = self.cache.begin_generation();
        self.cursor.reset();
        let query = FeedQuery::build(&filters, self.cache.page_size());
        info!(generation, ?filters, "Opening live feed subscription.");
        self.subscription = Some(LiveSubscription::open(
            self.store.clone(),
            query,
            generation,
            self.events.clone(),
        ));
        self.filters = filters;
    }

    /// Applies a pushed snapshot. Returns `Ok(false)` for a snapshot that
    /// belongs to an earlier set of filters.
    pub fn apply_event(&mut self, event: FeedEvent) -> Result<bool, FeedError> {
        if event.generation != self.cache.generation() {
            debug!(
                stale = event.generation,
                current = self.cache.generation(),
                "Dropping stale snapshot."
            );
            return Ok(false);
        }
        match event.result {
            Ok(snapshot) => {
                self.cursor.record_page(&snapshot);
                Ok(self.cache.apply_snapshot(event.generation, snapshot))
            }
            Err(e) => {
                error!("Live feed snapshot failed: {:?}", e);
                Err(FeedError::Load(e))
            }
        }
    }

    /// Fetches the page after the cursor once and appends it.
    /// Returns the number of records added.
    pub async fn load_more(&mut self) -> Result<usize, FeedError> {
        let Some(cursor) = self.cursor.current() else {
            return Ok(0);
        };
        let query = FeedQuery::build(&self.filters, self.cache.page_size()).after(cursor);
        let page = self.store.fetch_page(&query).await.map_err(|e| {
            error!("Failed to load more reports: {:?}", e);
            FeedError::LoadMore(e)
        })?;
        self.cursor.record_page(&page);
        Ok(self.cache.append_page(page))
    }

    pub fn set_search(&mut self, search: SearchQuery) {
        self.search = search;
    }

    /// The records to render: the cache narrowed by the search text.
    pub fn visible(&self) -> Vec<&Report> {
        self.search.apply(self.cache.records())
    }

    pub fn loaded(&self) -> &[Report] {
        self.cache.records()
    }

    pub fn has_more(&self) -> bool {
        self.cache.has_more()
    }

    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    pub fn filters(&self) -> &FeedFilters {
        &self.filters
    }

    pub fn search(&self) -> &SearchQuery {
        &self.search
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Releases the live subscription, if any.
    pub async fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.close().await;
        }
    }
}
