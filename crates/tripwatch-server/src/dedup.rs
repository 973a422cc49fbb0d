//! Calendar dedup guard.
//!
//! Before an event is written to an external calendar the guard checks, in
//! order: the booking's persisted fingerprint set, then the calendar itself
//! (same content overlapping the event's window). Only when both miss is the
//! event created. A fingerprint is recorded once the event is known to be in
//! the calendar, so a create that cannot be confirmed is retried on the next
//! sync and picked up by the calendar lookup if it did land.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use tripwatch_core::{EventFingerprint, EventKind, ProjectedEvent, SeenFingerprints};
use tripwatch_providers::{CalendarStore, NewCalendarEvent, StoredEvent};

/// What happened to one event during a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupOutcome {
    /// Fingerprint was already recorded; the calendar was not touched.
    AlreadySeen,
    /// An identical event was already in the calendar; now recorded.
    FoundExisting,
    /// Created and read back.
    Created,
    /// Created, but not found on read back. Not recorded.
    CreatedUnconfirmed,
    Failed(String),
}

impl DedupOutcome {
    /// True when the event is known to be in the calendar.
    pub fn is_materialized(&self) -> bool {
        matches!(
            self,
            Self::AlreadySeen | Self::FoundExisting | Self::Created
        )
    }
}

/// Per-event outcomes of one sync into one calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub entity_id: String,
    pub outcomes: Vec<(EventKind, DedupOutcome)>,
}

impl SyncReport {
    pub fn created(&self) -> usize {
        self.count(|outcome| matches!(outcome, DedupOutcome::Created))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| {
            matches!(
                outcome,
                DedupOutcome::AlreadySeen | DedupOutcome::FoundExisting
            )
        })
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| {
            matches!(
                outcome,
                DedupOutcome::Failed(_) | DedupOutcome::CreatedUnconfirmed
            )
        })
    }

    fn count(&self, pred: impl Fn(&DedupOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// True when `fingerprint` has not been materialized yet.
pub fn should_create(fingerprint: &EventFingerprint, seen: &SeenFingerprints) -> bool {
    !seen.contains(fingerprint)
}

/// Marks `fingerprint` as materialized. Returns false if it already was.
pub fn record(fingerprint: EventFingerprint, seen: &mut SeenFingerprints) -> bool {
    seen.insert(fingerprint)
}

/// Writes projected events into external calendars at most once each.
#[derive(Clone)]
pub struct DedupGuard {
    store: Arc<dyn CalendarStore>,
}

impl DedupGuard {
    pub fn new(store: Arc<dyn CalendarStore>) -> Self {
        Self { store }
    }

    /// Materializes `events` into the calendar `entity_id`, updating `seen`.
    #[instrument(skip(self, events, seen), fields(store = self.store.name(), events = events.len()))]
    pub async fn sync(
        &self,
        entity_id: &str,
        events: &[ProjectedEvent],
        seen: &mut SeenFingerprints,
    ) -> SyncReport {
        let mut report = SyncReport {
            entity_id: entity_id.to_string(),
            outcomes: Vec::with_capacity(events.len()),
        };
        for event in events {
            let outcome = self.materialize(entity_id, event, seen).await;
            debug!(entity_id, kind = ?event.kind, ?outcome, "dedup outcome");
            report.outcomes.push((event.kind, outcome));
        }
        info!(
            entity_id,
            store = self.store.name(),
            created = report.created(),
            skipped = report.skipped(),
            failed = report.failed(),
            "calendar sync finished"
        );
        report
    }

    async fn materialize(
        &self,
        entity_id: &str,
        event: &ProjectedEvent,
        seen: &mut SeenFingerprints,
    ) -> DedupOutcome {
        let fingerprint = match EventFingerprint::of(entity_id, event) {
            Ok(fingerprint) => fingerprint,
            Err(e) => return DedupOutcome::Failed(format!("fingerprint: {e}")),
        };
        if !should_create(&fingerprint, seen) {
            return DedupOutcome::AlreadySeen;
        }

        let request = NewCalendarEvent::from(event);
        if self.find_existing(entity_id, &request).await.is_some() {
            record(fingerprint, seen);
            return DedupOutcome::FoundExisting;
        }

        if let Err(e) = self.store.create_event(entity_id, &request).await {
            warn!(entity_id, summary = %request.summary, error = %e, "failed to create calendar event");
            return DedupOutcome::Failed(e.to_string());
        }

        match self.find_existing(entity_id, &request).await {
            Some(stored) => {
                debug!(entity_id, uid = %stored.uid, %fingerprint, "calendar event created");
                record(fingerprint, seen);
                DedupOutcome::Created
            }
            None => {
                warn!(entity_id, summary = %request.summary, "created event not found on read back");
                DedupOutcome::CreatedUnconfirmed
            }
        }
    }

    /// An event with the same content overlapping the request's window.
    /// A failed lookup counts as not found.
    async fn find_existing(
        &self,
        entity_id: &str,
        request: &NewCalendarEvent,
    ) -> Option<StoredEvent> {
        match self.store.list_events(entity_id, request.window()).await {
            Ok(events) => events
                .into_iter()
                .find(|stored| request.same_content(stored)),
            Err(e) => {
                warn!(entity_id, error = %e, "calendar lookup failed");
                None
            }
        }
    }
}
