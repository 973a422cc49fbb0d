//! Poll coordinator: fetch, classify, cache.
//!
//! A [`Coordinator`] owns one booking's latest [`Snapshot`]. Each
//! [`Coordinator::refresh`] performs one upstream call and either swaps in a
//! new snapshot (notifying every subscriber) or keeps the previous one and
//! records why the poll failed. Readers always see a whole snapshot because
//! the swap is a single `watch` channel send. Every poll, failed or not, also
//! publishes a new [`RefreshStatus`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use tripwatch_core::{Credentials, Snapshot};
use tripwatch_providers::{BookingSource, UpstreamResponse};

use crate::error::RefreshError;

/// Outcome of the most recent polls, readable by adapters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshStatus {
    pub last_success: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<RefreshError>,
    pub consecutive_failures: u32,
}

impl RefreshStatus {
    /// False once the most recent poll failed.
    pub fn last_update_success(&self) -> bool {
        self.last_error.is_none()
    }

    fn record_success(&mut self, at: DateTime<Utc>) {
        self.last_success = Some(at);
        self.last_attempt = Some(at);
        self.last_error = None;
        self.consecutive_failures = 0;
    }

    fn record_failure(&mut self, at: DateTime<Utc>, error: RefreshError) {
        self.last_attempt = Some(at);
        self.last_error = Some(error);
        self.consecutive_failures += 1;
    }
}

/// Receiver side of a coordinator's snapshot channel.
pub type SnapshotReceiver = watch::Receiver<Option<Arc<Snapshot>>>;

/// Fetches and caches the snapshot of one booking.
pub struct Coordinator {
    credentials: Credentials,
    source: Arc<dyn BookingSource>,
    snapshot: watch::Sender<Option<Arc<Snapshot>>>,
    status: watch::Sender<RefreshStatus>,
}

impl Coordinator {
    pub fn new(credentials: Credentials, source: Arc<dyn BookingSource>) -> Self {
        let (snapshot, _) = watch::channel(None);
        let (status, _) = watch::channel(RefreshStatus::default());
        Self {
            credentials,
            source,
            snapshot,
            status,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn reference(&self) -> &str {
        self.credentials.booking_reference()
    }

    /// Polls upstream once.
    ///
    /// On success the cached snapshot is replaced and subscribers are
    /// notified. On failure the cached snapshot is left untouched.
    #[instrument(skip(self), fields(reference = self.reference()))]
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        debug!(reference = self.reference(), source = self.source.name(), "refreshing booking");

        let result = match self.source.fetch(&self.credentials).await {
            Ok(response) => classify(response),
            Err(err) => Err(RefreshError::from(err)),
        };
        let now = Utc::now();

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.snapshot.send_replace(Some(snapshot.clone()));
                self.status.send_modify(|status| status.record_success(now));
                info!(
                    reference = self.reference(),
                    success = snapshot.success(),
                    "booking refreshed"
                );
                Ok(snapshot)
            }
            Err(err) => {
                let mut failures = 0;
                self.status.send_modify(|status| {
                    status.record_failure(now, err.clone());
                    failures = status.consecutive_failures;
                });
                warn!(
                    reference = self.reference(),
                    kind = err.kind(),
                    failures,
                    error = %err,
                    "booking refresh failed"
                );
                Err(err)
            }
        }
    }

    /// The most recently committed snapshot, if any poll has succeeded.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribes to snapshot replacements.
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.snapshot.subscribe()
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.borrow().clone()
    }

    /// Subscribes to the status published after every poll.
    pub fn subscribe_status(&self) -> watch::Receiver<RefreshStatus> {
        self.status.subscribe()
    }

    /// Whether adapters should report themselves available: the cached
    /// snapshot is successful and the latest poll did not fail.
    pub fn is_available(&self) -> bool {
        let snapshot_ok = self
            .snapshot
            .borrow()
            .as_ref()
            .is_some_and(|snapshot| snapshot.success());
        snapshot_ok && self.status.borrow().last_update_success()
    }
}

/// Maps a raw upstream answer to a snapshot or a [`RefreshError`].
pub fn classify(response: UpstreamResponse) -> Result<Snapshot, RefreshError> {
    match response.status {
        401 => Err(RefreshError::Authentication(
            "invalid booking credentials".to_string(),
        )),
        429 => Err(RefreshError::RateLimited(
            "booking API rate limit exceeded".to_string(),
        )),
        _ if response.is_success() => Ok(Snapshot::decode(&response.body)?),
        status => Err(RefreshError::Unknown(format!(
            "unexpected status {status}"
        ))),
    }
}
