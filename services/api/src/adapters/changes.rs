//! services/api/src/adapters/changes.rs
//!
//! In-process fan-out of report store writes to live watchers.

use huella_core::ports::{ChangeStream, StoreChange};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<StoreChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, change: StoreChange) {
        // No receivers simply means nobody is watching.
        let _ = self.sender.send(change);
    }

    /// The receiver is registered here, before the stream is first polled.
    pub fn watch(&self) -> ChangeStream {
        let mut receiver = self.sender.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(change) => yield change,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Change watcher lagged behind.");
                        yield StoreChange::Lagged;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Number of live watchers.
    pub fn watcher_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn watchers_receive_changes_published_after_watch() {
        let feed = ChangeFeed::default();
        let mut stream = feed.watch();
        assert_eq!(feed.watcher_count(), 1);

        let id = Uuid::new_v4();
        feed.publish(StoreChange::Created(id));
        assert_eq!(stream.next().await, Some(StoreChange::Created(id)));

        drop(stream);
        assert_eq!(feed.watcher_count(), 0);
    }

    #[tokio::test]
    async fn lagging_watcher_gets_a_lagged_marker() {
        let feed = ChangeFeed::new(1);
        let mut stream = feed.watch();
        feed.publish(StoreChange::Deleted(Uuid::new_v4()));
        feed.publish(StoreChange::Deleted(Uuid::new_v4()));
        assert_eq!(stream.next().await, Some(StoreChange::Lagged));
    }
}
