//! Fixed-interval collection refresh.
//!
//! Approximates the console's live screens: re-fetch the collection every
//! N milliseconds and replace it wholesale. No backoff, no jitter, no
//! pause-on-error: a failed fetch is logged and the next tick proceeds.
//! The fetch is awaited inside the tick loop and missed ticks are
//! skipped, so at most one request is ever in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::client::CollectionSource;
use crate::models::{CollectionPage, Entity};

pub struct PollingCoordinator;

/// Cancellation handle for a running poll task. Dropping it aborts the
/// task; `cancel` stops it and waits for it to finish.
pub struct PollHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub async fn cancel(mut self) {
        let _ = self.stop.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl PollingCoordinator {
    /// Start refreshing `entity` every `interval`, invoking `on_refresh`
    /// with each successfully fetched collection. The first fetch fires
    /// immediately, matching the screens that fetch on mount and then
    /// every five seconds.
    pub fn start<F>(
        source: Arc<dyn CollectionSource>,
        entity: Entity,
        interval: Duration,
        mut on_refresh: F,
    ) -> PollHandle
    where
        F: FnMut(CollectionPage) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match source.fetch(entity, None).await {
                            Ok(page) => {
                                debug!(
                                    "Refreshed {}: {} records",
                                    entity.as_str(),
                                    page.records.len()
                                );
                                on_refresh(page);
                            }
                            Err(e) => {
                                warn!("Refresh of {} failed: {}", entity.as_str(), e);
                            }
                        }
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        PollHandle {
            stop: stop_tx,
            task: Some(task),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PageRequest;
    use crate::errors::ApiError;
    use crate::models::Record;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeSource {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fetch_delay: Duration,
        fail: bool,
    }

    impl FakeSource {
        fn new(fetch_delay: Duration, fail: bool) -> Self {
            FakeSource {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fetch_delay,
                fail,
            }
        }
    }

    #[async_trait]
    impl CollectionSource for FakeSource {
        async fn fetch(
            &self,
            _entity: Entity,
            _page: Option<PageRequest>,
        ) -> Result<CollectionPage, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(self.fetch_delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                Err(ApiError::Api {
                    status: 500,
                    message: "boom".to_string(),
                })
            } else {
                Ok(CollectionPage {
                    records: vec![Record::from_value(json!({ "name": "x" })).unwrap()],
                    total_pages: None,
                    total_count: None,
                })
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_and_stops_on_cancel() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(0), false));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_task = Arc::clone(&seen);

        let handle = PollingCoordinator::start(
            Arc::clone(&source) as Arc<dyn CollectionSource>,
            Entity::Enquiries,
            Duration::from_secs(5),
            move |page| seen_in_task.lock().unwrap().push(page.records.len()),
        );

        // first tick fires immediately, then every five seconds
        tokio::time::sleep(Duration::from_secs(11)).await;
        handle.cancel().await;

        let calls = source.calls.load(Ordering::SeqCst);
        assert_eq!(calls, 3);
        assert_eq!(seen.lock().unwrap().len(), 3);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), calls, "polled after cancel");
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_most_one_fetch_in_flight() {
        // fetch takes longer than the interval; ticks must skip, not stack
        let source = Arc::new(FakeSource::new(Duration::from_secs(7), false));

        let handle = PollingCoordinator::start(
            Arc::clone(&source) as Arc<dyn CollectionSource>,
            Entity::AdmissionLeads,
            Duration::from_secs(5),
            |_| {},
        );

        tokio::time::sleep(Duration::from_secs(40)).await;
        handle.cancel().await;

        assert!(source.calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_does_not_stop_polling() {
        let source = Arc::new(FakeSource::new(Duration::from_millis(0), true));
        let refreshes = Arc::new(AtomicUsize::new(0));
        let refreshes_in_task = Arc::clone(&refreshes);

        let handle = PollingCoordinator::start(
            Arc::clone(&source) as Arc<dyn CollectionSource>,
            Entity::Enquiries,
            Duration::from_secs(5),
            move |_| {
                refreshes_in_task.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_secs(16)).await;
        handle.cancel().await;

        // every tick still fired, and no refresh was delivered
        assert!(source.calls.load(Ordering::SeqCst) >= 3);
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }
}
