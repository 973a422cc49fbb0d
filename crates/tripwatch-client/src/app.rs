//! Wires configuration into the runtime and upstream clients.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::debug;
use tripwatch_core::Snapshot;
use tripwatch_providers::{BookingSource, CalendarStore, ImageClient, ImageSource, Jet2Client};
use tripwatch_server::{
    BookingEntities, BookingEntry, BookingRepository, BookingRuntime, Coordinator,
    FileBookingRepository,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Everything a command needs.
pub struct App {
    config: ClientConfig,
    runtime: BookingRuntime,
    source: Arc<dyn BookingSource>,
    images: Arc<dyn ImageSource>,
}

impl App {
    /// Builds the production stack from `config`.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let repository = Arc::new(FileBookingRepository::open(config.bookings_path())?);
        let source = Arc::new(Jet2Client::new(config.jet2_config()?)?);
        let images = Arc::new(ImageClient::new(config.image_config()?)?);
        let calendars = calendar_store(&config);
        Self::with_parts(config, repository, source, calendars, images)
    }

    pub fn with_parts(
        config: ClientConfig,
        repository: Arc<dyn BookingRepository>,
        source: Arc<dyn BookingSource>,
        calendars: Arc<dyn CalendarStore>,
        images: Arc<dyn ImageSource>,
    ) -> ClientResult<Self> {
        let runtime = BookingRuntime::new(
            repository,
            source.clone(),
            calendars,
            config.runtime_config()?,
        );
        Ok(Self {
            config,
            runtime,
            source,
            images,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn runtime(&self) -> &BookingRuntime {
        &self.runtime
    }

    pub fn images(&self) -> &dyn ImageSource {
        self.images.as_ref()
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now()
            .with_timezone(self.runtime.time_zone())
            .date_naive()
    }

    /// The tracked entry for `reference`.
    pub fn entry(&self, reference: &str) -> ClientResult<BookingEntry> {
        self.runtime
            .repository()
            .find_by_reference(reference)?
            .ok_or_else(|| ClientError::UnknownBooking(reference.to_string()))
    }

    /// Refreshes a tracked booking once without syncing calendars.
    pub async fn fetch(&self, reference: &str) -> ClientResult<(BookingEntry, Arc<Snapshot>)> {
        let (entry, _, snapshot) = self.refresh_once(reference).await?;
        Ok((entry, snapshot))
    }

    /// Fetches a booking and renders every adapter.
    pub async fn entities(&self, reference: &str) -> ClientResult<BookingEntities> {
        let (entry, coordinator, snapshot) = self.refresh_once(reference).await?;
        Ok(BookingEntities::render(
            entry.reference(),
            Some(&snapshot),
            &coordinator.status(),
            self.runtime.time_zone(),
            self.today(),
        ))
    }

    async fn refresh_once(
        &self,
        reference: &str,
    ) -> ClientResult<(BookingEntry, Coordinator, Arc<Snapshot>)> {
        let entry = self.entry(reference)?;
        debug!(reference = entry.reference(), "fetching booking");
        let coordinator = Coordinator::new(entry.credentials.clone(), self.source.clone());
        let snapshot = coordinator.refresh().await?;
        Ok((entry, coordinator, snapshot))
    }
}

#[cfg(feature = "ics")]
fn calendar_store(config: &ClientConfig) -> Arc<dyn CalendarStore> {
    Arc::new(tripwatch_providers::IcsCalendarStore::new(config.ics_dir()))
}

#[cfg(not(feature = "ics"))]
fn calendar_store(_config: &ClientConfig) -> Arc<dyn CalendarStore> {
    tracing::warn!("built without ics support, events are kept in memory only");
    Arc::new(tripwatch_providers::MemoryCalendarStore::new())
}
