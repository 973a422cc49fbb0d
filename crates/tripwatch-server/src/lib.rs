//! Booking runtime: poll coordination, scheduling, calendar dedup, entity
//! adapters and the booking repository.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tripwatch_core::Credentials;
//! use tripwatch_providers::{Jet2Client, Jet2Config, MemoryCalendarStore};
//! use tripwatch_server::{BookingRuntime, FileBookingRepository, RuntimeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = BookingRuntime::new(
//!         Arc::new(FileBookingRepository::open("bookings.json")?),
//!         Arc::new(Jet2Client::new(Jet2Config::new(Jet2Config::DEFAULT_URL)?)?),
//!         Arc::new(MemoryCalendarStore::new()),
//!         RuntimeConfig::new(chrono_tz::Europe::London),
//!     );
//!
//!     let credentials = Credentials::new("ABC123", "01/02/1980", "Smith")?;
//!     runtime.add_booking(credentials, vec!["calendar.family".into()]).await?;
//!     runtime.start_all().await?;
//!     Ok(())
//! }
//! ```

mod coordinator;
mod dedup;
pub mod entities;
mod error;
mod repository;
mod runtime;
mod scheduler;
#[cfg(test)]
mod testing;

pub use coordinator::{Coordinator, RefreshStatus, SnapshotReceiver, classify};
pub use dedup::{DedupGuard, DedupOutcome, SyncReport, record, should_create};
pub use entities::BookingEntities;
pub use error::{RefreshError, ServerError, ServerResult};
pub use repository::{BookingEntry, BookingRepository, FileBookingRepository};
pub use runtime::{AddOutcome, BookingRuntime, RuntimeConfig, SetupOutcome};
pub use scheduler::{
    DEFAULT_POLL_INTERVAL, Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle,
};
