//! External calendar stores.
//!
//! A store holds many calendars, each addressed by an entity id such as
//! `calendar.family`. The rest of the system only ever creates events and
//! lists them back by time window.

#[cfg(feature = "ics")]
pub mod ics;
pub mod memory;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tripwatch_core::{ProjectedEvent, TimeWindow};

use crate::error::ProviderResult;
use crate::source::BoxFuture;

#[cfg(feature = "ics")]
pub use ics::IcsCalendarStore;
pub use memory::MemoryCalendarStore;

/// An event about to be written to a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCalendarEvent {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub summary: String,
    pub description: String,
    pub location: String,
}

impl NewCalendarEvent {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::spanning(&self.start, &self.end)
    }

    /// True when `stored` carries the same summary, description and location.
    pub fn same_content(&self, stored: &StoredEvent) -> bool {
        stored.summary == self.summary
            && stored.description.as_deref().unwrap_or_default() == self.description
            && stored.location.as_deref().unwrap_or_default() == self.location
    }
}

impl From<&ProjectedEvent> for NewCalendarEvent {
    fn from(event: &ProjectedEvent) -> Self {
        Self {
            start: event.start.fixed_offset(),
            end: event.end.fixed_offset(),
            summary: event.title.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
        }
    }
}

/// An event as read back from a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub uid: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// A writable set of calendars.
pub trait CalendarStore: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Adds an event to the calendar `entity_id`, creating the calendar if needed.
    fn create_event<'a>(
        &'a self,
        entity_id: &'a str,
        event: &'a NewCalendarEvent,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Events of `entity_id` overlapping `window`. An unknown calendar is empty.
    fn list_events<'a>(
        &'a self,
        entity_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<StoredEvent>>>;
}
