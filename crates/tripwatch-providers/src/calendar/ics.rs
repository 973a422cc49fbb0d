//! ICS file calendar store.
//!
//! Each calendar lives in its own `<dir>/<entity_id>.ics` file. Writes are
//! read-modify-write under a store-wide lock and land through a temporary
//! file plus rename, so readers never see a half-written calendar.

use std::path::{Path, PathBuf};

use chrono::{DateTime, LocalResult, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use tripwatch_core::TimeWindow;

use super::{CalendarStore, NewCalendarEvent, StoredEvent};
use crate::error::{ProviderError, ProviderResult};
use crate::source::BoxFuture;

const PROVIDER: &str = "ics";

/// Calendar store backed by a directory of `.ics` files.
#[derive(Debug)]
pub struct IcsCalendarStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl IcsCalendarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing the calendar `entity_id`.
    pub fn path_for(&self, entity_id: &str) -> PathBuf {
        let stem: String = entity_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{stem}.ics"))
    }

    async fn load(&self, entity_id: &str) -> ProviderResult<Vec<StoredEvent>> {
        let path = self.path_for(entity_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ProviderError::calendar(format!(
                    "failed to read {}: {e}",
                    path.display()
                ))
                .with_provider(PROVIDER)
                .with_source(e));
            }
        };

        let calendar = content.parse::<Calendar>().map_err(|e| {
            ProviderError::calendar(format!("failed to parse {}: {e}", path.display()))
                .with_provider(PROVIDER)
        })?;

        Ok(calendar
            .iter()
            .filter_map(|component| match component {
                CalendarComponent::Event(event) => stored_event(event),
                _ => None,
            })
            .collect())
    }

    async fn save(&self, entity_id: &str, events: &[StoredEvent]) -> ProviderResult<()> {
        let io_err = |e: std::io::Error, what: &str| {
            ProviderError::calendar(format!("failed to {what}: {e}"))
                .with_provider(PROVIDER)
                .with_source(e)
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_err(e, "create calendar directory"))?;

        let mut calendar = Calendar::new();
        calendar.name(entity_id);
        for event in events {
            let mut ics_event = Event::new();
            ics_event
                .uid(&event.uid)
                .summary(&event.summary)
                .starts(event.start)
                .ends(event.end);
            if let Some(description) = &event.description {
                ics_event.description(description);
            }
            if let Some(location) = &event.location {
                ics_event.location(location);
            }
            calendar.push(ics_event.done());
        }

        let path = self.path_for(entity_id);
        let tmp = path.with_extension("ics.tmp");
        tokio::fs::write(&tmp, calendar.done().to_string())
            .await
            .map_err(|e| io_err(e, "write calendar"))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_err(e, "replace calendar"))?;
        Ok(())
    }

    async fn append(&self, entity_id: &str, event: &NewCalendarEvent) -> ProviderResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut events = self.load(entity_id).await?;
        let uid = format!(
            "{}-{}@tripwatch",
            event.start.timestamp(),
            events.len() + 1
        );
        debug!(entity_id, %uid, summary = %event.summary, "adding event to ics calendar");
        events.push(StoredEvent {
            uid,
            start: event.start.to_utc(),
            end: event.end.to_utc(),
            summary: event.summary.clone(),
            description: Some(event.description.clone()),
            location: Some(event.location.clone()),
        });
        self.save(entity_id, &events).await
    }
}

impl CalendarStore for IcsCalendarStore {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn create_event<'a>(
        &'a self,
        entity_id: &'a str,
        event: &'a NewCalendarEvent,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.append(entity_id, event))
    }

    fn list_events<'a>(
        &'a self,
        entity_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<StoredEvent>>> {
        Box::pin(async move {
            let events = self.load(entity_id).await?;
            Ok(events
                .into_iter()
                .filter(|event| window.overlaps(event.start, event.end))
                .collect())
        })
    }
}

fn stored_event(event: &Event) -> Option<StoredEvent> {
    let uid = event.get_uid()?;
    let start = event.get_start().and_then(to_utc)?;
    let end = event.get_end().and_then(to_utc).unwrap_or(start);
    Some(StoredEvent {
        uid: uid.to_string(),
        start,
        end,
        summary: event.get_summary().map(str::to_string).unwrap_or_default(),
        description: event.get_description().map(str::to_string),
        location: event.get_location().map(str::to_string),
    })
}

fn to_utc(value: DatePerhapsTime) -> Option<DateTime<Utc>> {
    match value {
        DatePerhapsTime::Date(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => Some(naive.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match tzid.parse::<Tz>() {
                Ok(tz) => match tz.from_local_datetime(&date_time) {
                    LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                        Some(dt.with_timezone(&Utc))
                    }
                    LocalResult::None => Some(date_time.and_utc()),
                },
                Err(_) => {
                    warn!(%tzid, "unknown TZID in calendar, assuming UTC");
                    Some(date_time.and_utc())
                }
            }
        }
    }
}
