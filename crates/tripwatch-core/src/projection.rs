//! Projection of a booking snapshot onto calendar events.
//!
//! [`project`] is a pure function: the same snapshot and zone always yield
//! the same events in the same order. Filtering by date is left to
//! [`upcoming`] and [`events_between`].

use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;

use crate::snapshot::{BookingDetails, Snapshot};
use crate::time::WallClock;

/// Title used for the holiday window when no accommodation name is known.
pub const HOLIDAY_FALLBACK_TITLE: &str = "Holiday";

/// Prefix of every projected event description.
pub const DESCRIPTION_PREFIX: &str = "Jet2";

/// The semantic booking fields that become calendar events, in projection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    PaymentDue,
    Outbound,
    Inbound,
    CheckIn,
    Holiday,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::PaymentDue,
        EventKind::Outbound,
        EventKind::Inbound,
        EventKind::CheckIn,
        EventKind::Holiday,
    ];

    /// Display name, also used as title and location for most kinds.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::PaymentDue => "Payment Due",
            EventKind::Outbound => "Outbound",
            EventKind::Inbound => "Inbound",
            EventKind::CheckIn => "Check-In Date",
            EventKind::Holiday => "Holiday",
        }
    }

    /// Raw start and optional end for this kind.
    fn bounds(self, details: &BookingDetails) -> Option<(WallClock, Option<WallClock>)> {
        let flights = details.flight_summary.as_ref();
        match self {
            EventKind::PaymentDue => details
                .price_breakdown
                .as_ref()?
                .payment_date_due
                .map(|start| (start, None)),
            EventKind::Outbound => {
                let leg = flights?.outbound.as_ref()?;
                Some((leg.local_departure_date_time?, leg.local_arrival_date_time))
            }
            EventKind::Inbound => {
                let leg = flights?.inbound.as_ref()?;
                Some((leg.local_departure_date_time?, leg.local_arrival_date_time))
            }
            EventKind::CheckIn => details
                .check_in_status
                .as_ref()?
                .check_in_date
                .map(|start| (start, None)),
            EventKind::Holiday => {
                let flights = flights?;
                let start = flights.outbound.as_ref()?.local_departure_date_time?;
                let end = flights
                    .inbound
                    .as_ref()
                    .and_then(|leg| leg.local_arrival_date_time);
                Some((start, end))
            }
        }
    }
}

/// A calendar event derived from a snapshot. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedEvent {
    pub kind: EventKind,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub title: String,
    pub description: String,
    pub location: String,
}

/// Derives every calendar event a snapshot supports, in [`EventKind::ALL`] order.
///
/// Timestamps are localized to `tz`. A missing end falls back to the start,
/// and every end is pushed one second later so no event has zero length.
/// Fields absent from the snapshot are skipped. An unsuccessful snapshot
/// projects nothing.
pub fn project(snapshot: &Snapshot, tz: &Tz) -> Vec<ProjectedEvent> {
    if !snapshot.success() {
        return Vec::new();
    }

    let data = snapshot.data();
    let details = data.details();
    let description = format!(
        "{DESCRIPTION_PREFIX}|{}",
        details.booking_reference.as_deref().unwrap_or_default()
    );

    EventKind::ALL
        .iter()
        .filter_map(|&kind| {
            let (start_raw, end_raw) = kind.bounds(details)?;
            let start = start_raw.localize(tz);
            let end = end_raw.unwrap_or(start_raw).localize(tz) + Duration::seconds(1);

            let (title, location) = match kind {
                EventKind::Holiday => {
                    let title = data
                        .accommodation_name()
                        .unwrap_or(HOLIDAY_FALLBACK_TITLE)
                        .to_string();
                    let location = data.full_location().unwrap_or_else(|| title.clone());
                    (title, location)
                }
                _ => (kind.name().to_string(), kind.name().to_string()),
            };

            Some(ProjectedEvent {
                kind,
                start,
                end,
                title,
                description: description.clone(),
                location,
            })
        })
        .collect()
}

/// Events whose local start date is on or after `today`.
pub fn upcoming(events: &[ProjectedEvent], today: NaiveDate) -> Vec<ProjectedEvent> {
    events
        .iter()
        .filter(|event| event.start.date_naive() >= today)
        .cloned()
        .collect()
}

/// Upcoming events starting no later than `until` (by local date).
pub fn events_between(
    events: &[ProjectedEvent],
    from: NaiveDate,
    until: NaiveDate,
) -> Vec<ProjectedEvent> {
    events
        .iter()
        .filter(|event| {
            let day = event.start.date_naive();
            day >= from && day <= until
        })
        .cloned()
        .collect()
}

/// The earliest upcoming event.
pub fn next_event(events: &[ProjectedEvent], today: NaiveDate) -> Option<ProjectedEvent> {
    events
        .iter()
        .filter(|event| event.start.date_naive() >= today)
        .min_by_key(|event| event.start)
        .cloned()
}
