//! Persisted booking entries.
//!
//! An entry is the credentials of one booking plus the calendars its events
//! go to and the fingerprints already written there. Entries are kept in a
//! single JSON file that is rewritten through a temporary file on every
//! change.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tripwatch_core::{Credentials, SeenFingerprints};

use crate::error::{ServerError, ServerResult};

/// One tracked booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEntry {
    pub entry_id: String,
    pub credentials: Credentials,
    /// External calendars events are written into.
    #[serde(default)]
    pub calendars: Vec<String>,
    #[serde(default)]
    pub seen_fingerprints: SeenFingerprints,
    pub created_at: DateTime<Utc>,
}

impl BookingEntry {
    pub fn new(credentials: Credentials, calendars: Vec<String>) -> Self {
        Self {
            entry_id: credentials.entry_id(),
            credentials,
            calendars,
            seen_fingerprints: SeenFingerprints::new(),
            created_at: Utc::now(),
        }
    }

    pub fn reference(&self) -> &str {
        self.credentials.booking_reference()
    }
}

/// Storage for booking entries.
pub trait BookingRepository: Send + Sync {
    fn list(&self) -> ServerResult<Vec<BookingEntry>>;

    fn get(&self, entry_id: &str) -> ServerResult<Option<BookingEntry>>;

    /// The entry for a booking reference, ignoring case.
    fn find_by_reference(&self, reference: &str) -> ServerResult<Option<BookingEntry>>;

    /// Adds an entry. Returns false if an entry with the same id exists.
    fn insert(&self, entry: BookingEntry) -> ServerResult<bool>;

    /// Removes an entry. Returns false if it did not exist.
    fn remove(&self, entry_id: &str) -> ServerResult<bool>;

    /// Merges `seen` into the entry's fingerprint set.
    fn update_seen(&self, entry_id: &str, seen: &SeenFingerprints) -> ServerResult<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BookingFile {
    #[serde(default)]
    bookings: Vec<BookingEntry>,
}

/// JSON file repository. Without a path it only lives in memory.
#[derive(Debug)]
pub struct FileBookingRepository {
    path: Option<PathBuf>,
    entries: RwLock<Vec<BookingEntry>>,
}

impl FileBookingRepository {
    /// Opens the repository at `path`; a missing file is an empty repository.
    pub fn open(path: impl Into<PathBuf>) -> ServerResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| ServerError::io(&path, e))?;
            let file: BookingFile =
                serde_json::from_str(&content).map_err(|e| ServerError::corrupt(&path, e))?;
            info!(path = %path.display(), count = file.bookings.len(), "loaded bookings");
            file.bookings
        } else {
            debug!(path = %path.display(), "no booking file yet");
            Vec::new()
        };
        Ok(Self {
            path: Some(path),
            entries: RwLock::new(entries),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn save(&self, entries: &[BookingEntry]) -> ServerResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ServerError::io(parent, e))?;
        }

        let file = BookingFile {
            bookings: entries.to_vec(),
        };
        let content =
            serde_json::to_string_pretty(&file).map_err(|e| ServerError::corrupt(path, e))?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| ServerError::io(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| ServerError::io(path, e))?;

        // Credentials include a date of birth.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
                warn!(path = %path.display(), error = %e, "failed to restrict booking file permissions");
            }
        }

        debug!(path = %path.display(), count = entries.len(), "saved bookings");
        Ok(())
    }

    fn modify<T>(&self, f: impl FnOnce(&mut Vec<BookingEntry>) -> (T, bool)) -> ServerResult<T> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let (result, changed) = f(&mut entries);
        if changed {
            self.save(&entries)?;
        }
        Ok(result)
    }

    fn read<T>(&self, f: impl FnOnce(&[BookingEntry]) -> T) -> T {
        f(&self.entries.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl BookingRepository for FileBookingRepository {
    fn list(&self) -> ServerResult<Vec<BookingEntry>> {
        Ok(self.read(|entries| entries.to_vec()))
    }

    fn get(&self, entry_id: &str) -> ServerResult<Option<BookingEntry>> {
        Ok(self.read(|entries| entries.iter().find(|e| e.entry_id == entry_id).cloned()))
    }

    fn find_by_reference(&self, reference: &str) -> ServerResult<Option<BookingEntry>> {
        Ok(self.read(|entries| {
            entries
                .iter()
                .find(|e| e.credentials.matches_reference(reference))
                .cloned()
        }))
    }

    fn insert(&self, entry: BookingEntry) -> ServerResult<bool> {
        self.modify(|entries| {
            if entries.iter().any(|e| e.entry_id == entry.entry_id) {
                return (false, false);
            }
            entries.push(entry);
            (true, true)
        })
    }

    fn remove(&self, entry_id: &str) -> ServerResult<bool> {
        self.modify(|entries| {
            let before = entries.len();
            entries.retain(|e| e.entry_id != entry_id);
            let removed = entries.len() != before;
            (removed, removed)
        })
    }

    fn update_seen(&self, entry_id: &str, seen: &SeenFingerprints) -> ServerResult<()> {
        self.modify(|entries| match entries.iter_mut().find(|e| e.entry_id == entry_id) {
            Some(entry) => {
                let before = entry.seen_fingerprints.len();
                entry.seen_fingerprints.extend_from(seen);
                (Ok(()), entry.seen_fingerprints.len() != before)
            }
            None => (Err(ServerError::UnknownBooking(entry_id.to_string())), false),
        })?
    }
}
