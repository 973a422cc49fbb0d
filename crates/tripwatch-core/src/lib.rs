//! Core types: booking snapshots, time, event projection, fingerprints

pub mod booking;
pub mod fingerprint;
pub mod projection;
pub mod snapshot;
pub mod time;
pub mod tracing;

pub use booking::{Credentials, CredentialsError, DATE_OF_BIRTH_FORMAT};
pub use fingerprint::{EventFingerprint, SeenFingerprints, canonical_json};
pub use projection::{EventKind, ProjectedEvent, events_between, next_event, project, upcoming};
pub use snapshot::{
    ACCOMMODATION_NAME_RULES, BookingData, BookingDetails, BookingLifecycle, CheckInStatus,
    CheckedInFlight, DecodeError, ExpiryReason, FlightLeg, FlightSummary, Hotel, NameRule,
    PriceBreakdown, Snapshot, first_match,
};
pub use time::{ParseWallClockError, TimeWindow, UnknownTimeZone, WallClock, parse_time_zone};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
