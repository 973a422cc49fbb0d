//! In-memory calendar store.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tripwatch_core::TimeWindow;

use super::{CalendarStore, NewCalendarEvent, StoredEvent};
use crate::error::ProviderResult;
use crate::source::BoxFuture;

/// Keeps calendars in memory; used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryCalendarStore {
    calendars: RwLock<HashMap<String, Vec<StoredEvent>>>,
}

impl MemoryCalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event of a calendar, in creation order.
    pub async fn events(&self, entity_id: &str) -> Vec<StoredEvent> {
        self.calendars
            .read()
            .await
            .get(entity_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn insert(&self, entity_id: &str, event: &NewCalendarEvent) {
        let mut calendars = self.calendars.write().await;
        let events = calendars.entry(entity_id.to_string()).or_default();
        let uid = format!("{entity_id}-{}", events.len() + 1);
        events.push(StoredEvent {
            uid,
            start: event.start.to_utc(),
            end: event.end.to_utc(),
            summary: event.summary.clone(),
            description: Some(event.description.clone()),
            location: Some(event.location.clone()),
        });
    }

    async fn query(&self, entity_id: &str, window: TimeWindow) -> Vec<StoredEvent> {
        self.calendars
            .read()
            .await
            .get(entity_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|event| window.overlaps(event.start, event.end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl CalendarStore for MemoryCalendarStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn create_event<'a>(
        &'a self,
        entity_id: &'a str,
        event: &'a NewCalendarEvent,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.insert(entity_id, event).await;
            Ok(())
        })
    }

    fn list_events<'a>(
        &'a self,
        entity_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<StoredEvent>>> {
        Box::pin(async move { Ok(self.query(entity_id, window).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn event(hour: u32) -> NewCalendarEvent {
        let start = Utc
            .with_ymd_and_hms(2025, 6, 1, hour, 0, 0)
            .unwrap()
            .fixed_offset();
        NewCalendarEvent {
            start,
            end: start + Duration::seconds(1),
            summary: format!("event {hour}"),
            description: "Jet2|ABC123".into(),
            location: "here".into(),
        }
    }

    #[tokio::test]
    async fn create_then_list() {
        let store = MemoryCalendarStore::new();
        store.create_event("calendar.a", &event(9)).await.unwrap();
        store.create_event("calendar.a", &event(12)).await.unwrap();
        store.create_event("calendar.b", &event(9)).await.unwrap();

        let morning = event(9).window();
        let found = store.list_events("calendar.a", morning).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].summary, "event 9");
        assert_eq!(found[0].uid, "calendar.a-1");

        assert_eq!(store.events("calendar.a").await.len(), 2);
        assert_eq!(store.events("calendar.b").await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_calendar_is_empty() {
        let store = MemoryCalendarStore::new();
        let found = store
            .list_events("calendar.none", event(9).window())
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
