//! Upstream clients and calendar stores.
//!
//! - [`BookingSource`] / [`Jet2Client`]: posts credentials to the booking API
//! - [`ImageSource`] / [`ImageClient`]: fetches accommodation images
//! - [`CalendarStore`]: external calendars events are written into, with
//!   in-memory and ICS file implementations
//! - [`ProviderError`]: error type shared by all of the above
//!
//! ```text
//!   Jet2Client ──POST──▶ booking API        ImageClient ──GET──▶ image site
//!        │                                       │
//!        ▼ UpstreamResponse                      ▼ bytes
//!   (coordinator)                           (camera adapter)
//!
//!   CalendarStore ◀── create_event / list_events ── (dedup guard)
//! ```

pub mod calendar;
pub mod error;
pub mod image;
pub mod jet2;
pub mod source;

pub use calendar::{CalendarStore, MemoryCalendarStore, NewCalendarEvent, StoredEvent};
#[cfg(feature = "ics")]
pub use calendar::IcsCalendarStore;
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use image::{ImageClient, ImageClientConfig};
pub use jet2::{Jet2Client, Jet2Config};
pub use source::{BookingSource, BoxFuture, ImageSource, UpstreamResponse};
