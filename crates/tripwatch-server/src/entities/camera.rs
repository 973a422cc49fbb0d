//! Rotating accommodation image feed.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tracing::debug;
use tripwatch_core::{ACCOMMODATION_NAME_RULES, Snapshot, first_match};
use tripwatch_providers::{ImageSource, ProviderResult};

use super::{entity_id, unique_id};

const KEY: &str = "accommodationImages";

/// Name shown when the booking has no accommodation name.
pub const DEFAULT_CAMERA_NAME: &str = "Accommodation Images";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraState {
    pub unique_id: String,
    pub entity_id: String,
    pub name: String,
    pub available: bool,
    pub image_count: usize,
}

impl CameraState {
    pub fn render(reference: &str, snapshot: Option<&Snapshot>, available: bool) -> Self {
        let details = snapshot.map(|s| s.data().details());
        let image_count = details.map_or(0, |d| d.accommodation_images.len());
        Self {
            unique_id: unique_id(reference, KEY, "-camera"),
            entity_id: entity_id("camera", reference, KEY),
            name: details
                .and_then(|d| first_match(&ACCOMMODATION_NAME_RULES, d))
                .unwrap_or(DEFAULT_CAMERA_NAME)
                .to_string(),
            available: available && image_count > 0,
            image_count,
        }
    }
}

/// Serves the booking's images one after another, wrapping around.
#[derive(Debug, Default)]
pub struct CameraFeed {
    next: AtomicUsize,
}

impl CameraFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the image the next call to [`CameraFeed::next_image`] serves.
    pub fn position(&self, image_count: usize) -> usize {
        if image_count == 0 {
            0
        } else {
            self.next.load(Ordering::Relaxed) % image_count
        }
    }

    /// Fetches the current image and advances the rotation.
    ///
    /// Returns `None` when the snapshot is unsuccessful or has no images.
    pub async fn next_image(
        &self,
        snapshot: Option<&Snapshot>,
        source: &dyn ImageSource,
    ) -> ProviderResult<Option<Vec<u8>>> {
        let Some(snapshot) = snapshot.filter(|s| s.success()) else {
            return Ok(None);
        };
        let images = &snapshot.data().details().accommodation_images;
        if images.is_empty() {
            return Ok(None);
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % images.len();
        let path = &images[index];
        debug!(index, %path, "fetching accommodation image");
        source.fetch_image(path).await.map(Some)
    }
}
