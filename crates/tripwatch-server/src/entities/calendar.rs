//! Per-booking calendar feed.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use tripwatch_core::{ProjectedEvent, Snapshot, events_between, next_event, project};

use super::DOMAIN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarView {
    pub unique_id: String,
    /// `Jet2 - {REFERENCE}`.
    pub name: String,
    pub available: bool,
    /// The earliest upcoming event.
    pub event: Option<ProjectedEvent>,
    events: Vec<ProjectedEvent>,
}

impl CalendarView {
    pub fn render(
        reference: &str,
        snapshot: Option<&Snapshot>,
        available: bool,
        tz: &Tz,
        today: NaiveDate,
    ) -> Self {
        let events = snapshot.map(|s| project(s, tz)).unwrap_or_default();
        Self {
            unique_id: format!("{DOMAIN}-{reference}-calendar").to_lowercase(),
            name: format!("Jet2 - {}", reference.to_uppercase()),
            available,
            event: next_event(&events, today),
            events,
        }
    }

    /// Events starting between `from` and `until`, inclusive by local date.
    pub fn events_between(&self, from: NaiveDate, until: NaiveDate) -> Vec<ProjectedEvent> {
        events_between(&self.events, from, until)
    }

    /// Every projected event, in projection order.
    pub fn all_events(&self) -> &[ProjectedEvent] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::booking_body;
    use chrono_tz::Europe::London;
    use tripwatch_core::EventKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn view(today: NaiveDate) -> CalendarView {
        let snapshot = Snapshot::from_value(booking_body()).unwrap();
        CalendarView::render("abc123", Some(&snapshot), true, &London, today)
    }

    #[test]
    fn identity() {
        let view = view(date(2030, 1, 1));
        assert_eq!(view.unique_id, "jet2-abc123-calendar");
        assert_eq!(view.name, "Jet2 - ABC123");
        assert!(view.available);
        assert_eq!(view.all_events().len(), 5);
    }

    #[test]
    fn next_event_moves_with_today() {
        let event = view(date(2030, 1, 1)).event.unwrap();
        assert_eq!(event.kind, EventKind::PaymentDue);

        let event = view(date(2030, 5, 26)).event.unwrap();
        assert_eq!(event.kind, EventKind::Outbound);

        assert!(view(date(2030, 7, 1)).event.is_none());
    }

    #[test]
    fn window_query() {
        let view = view(date(2030, 1, 1));
        let june = view.events_between(date(2030, 6, 1), date(2030, 6, 30));
        let kinds: Vec<_> = june.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [EventKind::Outbound, EventKind::Inbound, EventKind::Holiday]
        );
    }

    #[test]
    fn empty_without_snapshot() {
        let view = CalendarView::render("abc123", None, false, &London, date(2030, 1, 1));
        assert!(!view.available);
        assert!(view.event.is_none());
        assert!(view.all_events().is_empty());
    }
}
