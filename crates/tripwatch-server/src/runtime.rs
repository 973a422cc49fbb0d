//! Booking runtime: wires repository, coordinators, schedulers and the
//! dedup guard together.
//!
//! ```text
//!   add_booking ──▶ refresh once ──▶ lifecycle ──▶ repository.insert
//!                                                     │
//!   start(entry) ──▶ refresh once ──▶ project ──▶ DedupGuard::sync ──▶ update_seen
//!        │
//!        ├─▶ Scheduler::run (refresh every interval)
//!        ├─▶ lifecycle watcher (removes the entry once expired)
//!        └─▶ entity publisher (re-renders adapters after every poll)
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tripwatch_core::{
    BookingLifecycle, Credentials, ExpiryReason, Snapshot, project, upcoming,
};
use tripwatch_providers::{BookingSource, CalendarStore, ImageSource};

use crate::coordinator::{Coordinator, RefreshStatus, SnapshotReceiver};
use crate::dedup::{DedupGuard, SyncReport};
use crate::entities::{BookingEntities, CameraFeed};
use crate::error::{RefreshError, ServerError, ServerResult};
use crate::repository::{BookingEntry, BookingRepository};
use crate::scheduler::{Scheduler, SchedulerConfig, SchedulerHandle};

/// Runtime settings.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Zone booking wall-clock times are localized to.
    pub time_zone: Tz,
    pub scheduler: SchedulerConfig,
}

impl RuntimeConfig {
    pub fn new(time_zone: Tz) -> Self {
        Self {
            time_zone,
            scheduler: SchedulerConfig::default(),
        }
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }
}

/// Result of [`BookingRuntime::add_booking`].
#[derive(Debug, Clone)]
pub enum AddOutcome {
    /// A booking with the same reference is already tracked; nothing was fetched.
    AlreadyExists { entry_id: String },
    Added {
        entry: BookingEntry,
        reports: Vec<SyncReport>,
    },
}

/// Result of starting a tracked booking.
#[derive(Debug, Clone)]
pub enum SetupOutcome {
    /// Polling; events were synced into every configured calendar.
    Active { reports: Vec<SyncReport> },
    /// The booking expired and its entry was removed.
    Expired(ExpiryReason),
    /// The eager refresh failed. Polling continues unless it is fatal.
    Failed(RefreshError),
}

struct RunningBooking {
    coordinator: Arc<Coordinator>,
    scheduler: SchedulerHandle,
    calendars: Vec<String>,
    tasks: Vec<JoinHandle<()>>,
}

type RunningMap = Arc<RwLock<HashMap<String, RunningBooking>>>;

/// Tracks every booking and its background tasks.
pub struct BookingRuntime {
    repository: Arc<dyn BookingRepository>,
    source: Arc<dyn BookingSource>,
    guard: DedupGuard,
    config: RuntimeConfig,
    running: RunningMap,
    cameras: Mutex<HashMap<String, Arc<CameraFeed>>>,
}

impl BookingRuntime {
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        source: Arc<dyn BookingSource>,
        calendars: Arc<dyn CalendarStore>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            repository,
            source,
            guard: DedupGuard::new(calendars),
            config,
            running: Arc::new(RwLock::new(HashMap::new())),
            cameras: Mutex::new(HashMap::new()),
        }
    }

    pub fn repository(&self) -> &Arc<dyn BookingRepository> {
        &self.repository
    }

    pub fn time_zone(&self) -> &Tz {
        &self.config.time_zone
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.config.time_zone).date_naive()
    }

    /// Validates and persists a new booking, then syncs its events.
    ///
    /// A reference that is already tracked short-circuits before any
    /// upstream call.
    pub async fn add_booking(
        &self,
        credentials: Credentials,
        calendars: Vec<String>,
    ) -> ServerResult<AddOutcome> {
        let reference = credentials.booking_reference().to_string();
        if let Some(existing) = self.repository.find_by_reference(&reference)? {
            info!(%reference, "booking already tracked");
            return Ok(AddOutcome::AlreadyExists {
                entry_id: existing.entry_id,
            });
        }

        let coordinator = Coordinator::new(credentials.clone(), self.source.clone());
        let snapshot = coordinator.refresh().await?;
        if let BookingLifecycle::Expired(reason) =
            snapshot.lifecycle(Utc::now(), &self.config.time_zone)
        {
            info!(%reference, ?reason, "refusing expired booking");
            return Err(ServerError::Expired(reference));
        }

        let mut entry = BookingEntry::new(credentials, calendars);
        if !self.repository.insert(entry.clone())? {
            return Ok(AddOutcome::AlreadyExists {
                entry_id: entry.entry_id,
            });
        }
        info!(%reference, entry_id = %entry.entry_id, "booking added");

        let reports = self.materialize(&mut entry, &snapshot).await?;
        Ok(AddOutcome::Added { entry, reports })
    }

    /// Stops polling a booking and forgets it.
    pub async fn remove_booking(&self, reference: &str) -> ServerResult<BookingEntry> {
        let entry = self
            .repository
            .find_by_reference(reference)?
            .ok_or_else(|| ServerError::UnknownBooking(reference.to_string()))?;

        let running = self.running.write().await.remove(&entry.entry_id);
        if let Some(running) = running {
            stop(running).await;
        }
        self.cameras
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&entry.entry_id);
        self.repository.remove(&entry.entry_id)?;
        info!(reference = entry.reference(), "booking removed");
        Ok(entry)
    }

    /// Starts every persisted booking.
    pub async fn start_all(&self) -> ServerResult<Vec<(String, SetupOutcome)>> {
        let mut outcomes = Vec::new();
        for entry in self.repository.list()? {
            let reference = entry.reference().to_string();
            let outcome = self.start(entry).await?;
            outcomes.push((reference, outcome));
        }
        Ok(outcomes)
    }

    /// Brings the running set in line with the repository.
    ///
    /// Bookings that were removed, whose calendars changed, or whose
    /// scheduler halted on rejected credentials are stopped and started
    /// again from their stored entry. Bookings left untouched are polled
    /// immediately. Entries not yet running are started.
    pub async fn reload(&self) -> ServerResult<Vec<(String, SetupOutcome)>> {
        let entries = self.repository.list()?;
        let (stale, kept) = {
            let mut running = self.running.write().await;
            let stale_ids: Vec<String> = running
                .iter()
                .filter(|(entry_id, booking)| {
                    booking.scheduler.is_halted()
                        || !entries.iter().any(|entry| {
                            &entry.entry_id == *entry_id && entry.calendars == booking.calendars
                        })
                })
                .map(|(entry_id, _)| entry_id.clone())
                .collect();
            let stale: Vec<RunningBooking> = stale_ids
                .iter()
                .filter_map(|entry_id| running.remove(entry_id))
                .collect();
            let kept: Vec<SchedulerHandle> =
                running.values().map(|booking| booking.scheduler.clone()).collect();
            (stale, kept)
        };

        info!(restarted = stale.len(), refreshed = kept.len(), "reloading bookings");
        for booking in stale {
            stop(booking).await;
        }
        for scheduler in kept {
            if let Err(e) = scheduler.refresh_now().await {
                warn!(error = %e, "scheduler gone before refresh");
            }
        }
        self.start_all().await
    }

    /// Refreshes a booking once, syncs its calendars and starts polling it.
    pub async fn start(&self, mut entry: BookingEntry) -> ServerResult<SetupOutcome> {
        let reference = entry.reference().to_string();
        if self.running.read().await.contains_key(&entry.entry_id) {
            debug!(%reference, "booking already running");
            return Ok(SetupOutcome::Active {
                reports: Vec::new(),
            });
        }

        let coordinator = Arc::new(Coordinator::new(
            entry.credentials.clone(),
            self.source.clone(),
        ));

        let outcome = match coordinator.refresh().await {
            Ok(snapshot) => match snapshot.lifecycle(Utc::now(), &self.config.time_zone) {
                BookingLifecycle::Expired(reason) => {
                    info!(%reference, ?reason, "booking expired, removing");
                    self.repository.remove(&entry.entry_id)?;
                    return Ok(SetupOutcome::Expired(reason));
                }
                BookingLifecycle::Active => SetupOutcome::Active {
                    reports: self.materialize(&mut entry, &snapshot).await?,
                },
            },
            Err(err) if !err.is_retryable() => {
                error!(%reference, error = %err, "booking rejected upstream, not polling");
                return Ok(SetupOutcome::Failed(err));
            }
            Err(err) => SetupOutcome::Failed(err),
        };

        self.spawn(&entry, coordinator).await;
        Ok(outcome)
    }

    async fn spawn(&self, entry: &BookingEntry, coordinator: Arc<Coordinator>) {
        let scheduler = Scheduler::new(self.config.scheduler.clone().with_poll_on_start(false));
        let handle = scheduler.handle();

        // Subscribe before the poller can publish anything.
        let snapshots = coordinator.subscribe();
        let statuses = coordinator.subscribe_status();
        let poller = coordinator.clone();
        let poll_task = tokio::spawn(scheduler.run(move || {
            let coordinator = poller.clone();
            async move { coordinator.refresh().await.map(|_| ()) }
        }));

        let watch_task = tokio::spawn(watch_lifecycle(
            entry.entry_id.clone(),
            coordinator.clone(),
            snapshots,
            handle.clone(),
            self.repository.clone(),
            self.running.clone(),
            self.config.time_zone,
        ));

        let publish_task = tokio::spawn(publish_entities(
            coordinator.clone(),
            statuses,
            self.config.time_zone,
        ));

        self.running.write().await.insert(
            entry.entry_id.clone(),
            RunningBooking {
                coordinator,
                scheduler: handle,
                calendars: entry.calendars.clone(),
                tasks: vec![poll_task, watch_task, publish_task],
            },
        );
        debug!(reference = entry.reference(), "booking polling started");
    }

    /// Projects upcoming events and syncs them into each target calendar.
    async fn materialize(
        &self,
        entry: &mut BookingEntry,
        snapshot: &Snapshot,
    ) -> ServerResult<Vec<SyncReport>> {
        let events = upcoming(&project(snapshot, &self.config.time_zone), self.today());
        let mut reports = Vec::with_capacity(entry.calendars.len());
        for calendar in &entry.calendars {
            let report = self
                .guard
                .sync(calendar, &events, &mut entry.seen_fingerprints)
                .await;
            reports.push(report);
        }
        self.repository
            .update_seen(&entry.entry_id, &entry.seen_fingerprints)?;
        Ok(reports)
    }

    pub async fn coordinator(&self, reference: &str) -> Option<Arc<Coordinator>> {
        self.running
            .read()
            .await
            .values()
            .find(|running| running.coordinator.credentials().matches_reference(reference))
            .map(|running| running.coordinator.clone())
    }

    /// Renders every adapter of a running booking.
    pub async fn entities(&self, reference: &str) -> Option<BookingEntities> {
        let coordinator = self.coordinator(reference).await?;
        Some(render_entities(&coordinator, &self.config.time_zone))
    }

    /// The image rotation of a booking, kept for as long as the runtime lives.
    pub fn camera(&self, entry_id: &str) -> Arc<CameraFeed> {
        self.cameras
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(entry_id.to_string())
            .or_default()
            .clone()
    }

    /// Fetches the booking's next accommodation image, advancing its rotation.
    pub async fn next_image(
        &self,
        entry: &BookingEntry,
        snapshot: &Snapshot,
        images: &dyn ImageSource,
    ) -> ServerResult<Option<Vec<u8>>> {
        let feed = self.camera(&entry.entry_id);
        Ok(feed.next_image(Some(snapshot), images).await?)
    }

    /// References of the bookings currently polling.
    pub async fn running(&self) -> Vec<String> {
        let mut references: Vec<String> = self
            .running
            .read()
            .await
            .values()
            .map(|running| running.coordinator.reference().to_string())
            .collect();
        references.sort();
        references
    }

    /// Stops every scheduler and waits for the tasks to finish.
    pub async fn shutdown(&self) {
        let running: Vec<RunningBooking> = self
            .running
            .write()
            .await
            .drain()
            .map(|(_, booking)| booking)
            .collect();
        info!(count = running.len(), "stopping bookings");
        for booking in running {
            stop(booking).await;
        }
    }
}

fn render_entities(coordinator: &Coordinator, tz: &Tz) -> BookingEntities {
    let snapshot = coordinator.snapshot();
    let today = Utc::now().with_timezone(tz).date_naive();
    BookingEntities::render(
        coordinator.reference(),
        snapshot.as_deref(),
        &coordinator.status(),
        tz,
        today,
    )
}

async fn stop(running: RunningBooking) {
    let reference = running.coordinator.reference().to_string();
    if let Err(e) = running.scheduler.stop().await {
        debug!(%reference, error = %e, "scheduler already stopped");
    }
    for task in running.tasks {
        task.abort();
        match task.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!(%reference, error = %e, "booking task failed"),
        }
    }
}

/// Removes the entry once a snapshot says the booking expired.
async fn watch_lifecycle(
    entry_id: String,
    coordinator: Arc<Coordinator>,
    mut rx: SnapshotReceiver,
    scheduler: SchedulerHandle,
    repository: Arc<dyn BookingRepository>,
    running: RunningMap,
    tz: Tz,
) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        let Some(snapshot) = snapshot else {
            continue;
        };
        let BookingLifecycle::Expired(reason) = snapshot.lifecycle(Utc::now(), &tz) else {
            continue;
        };

        info!(reference = coordinator.reference(), ?reason, "booking expired, removing");
        if let Err(e) = repository.remove(&entry_id) {
            warn!(%entry_id, error = %e, "failed to remove expired booking");
        }
        if let Err(e) = scheduler.stop().await {
            warn!(%entry_id, error = %e, "failed to stop scheduler of expired booking");
        }
        let removed = running.write().await.remove(&entry_id);
        if let Some(booking) = removed {
            for task in booking.tasks {
                task.abort();
            }
        }
        break;
    }
}

/// Re-renders a booking's adapters after every poll and logs what changed.
async fn publish_entities(
    coordinator: Arc<Coordinator>,
    mut statuses: watch::Receiver<RefreshStatus>,
    tz: Tz,
) {
    let mut was_available = None;
    loop {
        let entities = render_entities(&coordinator, &tz);
        let reference = coordinator.reference();
        if was_available != Some(entities.available) {
            info!(
                reference,
                available = entities.available,
                sensors = entities.sensors.len(),
                "booking entities changed availability"
            );
            was_available = Some(entities.available);
        }
        debug!(
            reference,
            next_event = entities.calendar.event.as_ref().map(|e| e.title.as_str()),
            images = entities.camera.image_count,
            "booking entities rendered"
        );
        if statuses.changed().await.is_err() {
            break;
        }
    }
}
