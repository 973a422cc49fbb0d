//! Content fingerprints for calendar events.
//!
//! A fingerprint is the SHA-1 digest of a canonical JSON rendering of the
//! event as written to a calendar, truncated to 16 bytes and shown as a UUID.
//! The canonical form sorts keys, separates items with `", "` and keys from
//! values with `": "`, escapes every non-ASCII character as `\uXXXX` and
//! renders datetimes as RFC 3339 with their offset. Identical field values
//! always give the same fingerprint, across processes and restarts.

use std::collections::BTreeMap;
use std::fmt;
use std::io;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::ser::Formatter;
use sha1::{Digest, Sha1};
use uuid::Uuid;

use crate::projection::ProjectedEvent;

/// Stable identifier of an event as materialized in one calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventFingerprint(Uuid);

impl EventFingerprint {
    /// Fingerprints a projected event destined for `entity_id`.
    pub fn of(entity_id: &str, event: &ProjectedEvent) -> serde_json::Result<Self> {
        Self::from_parts(
            entity_id,
            &event.start,
            &event.end,
            &event.title,
            &event.description,
            &event.location,
        )
    }

    /// Fingerprints the individual fields of a calendar event.
    pub fn from_parts<Tz: TimeZone>(
        entity_id: &str,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
        summary: &str,
        description: &str,
        location: &str,
    ) -> serde_json::Result<Self>
    where
        Tz::Offset: fmt::Display,
    {
        let mut fields = BTreeMap::new();
        fields.insert("entity_id", entity_id.to_string());
        fields.insert("start_date_time", start.to_rfc3339());
        fields.insert("end_date_time", end.to_rfc3339());
        fields.insert("summary", summary.to_string());
        fields.insert("description", description.to_string());
        fields.insert("location", location.to_string());

        let json = canonical_json(&fields)?;
        let digest = Sha1::digest(json.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Ok(Self(Uuid::from_bytes(bytes)))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for EventFingerprint {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for EventFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Serializes `value` in the canonical fingerprint form.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, CanonicalFormatter);
    value.serialize(&mut ser)?;
    // Every non-ASCII character was escaped, so the buffer is ASCII.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Spaced separators and ASCII-only string output.
struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() && c != '\u{7f}' {
                let mut byte = [0u8; 1];
                writer.write_all(c.encode_utf8(&mut byte).as_bytes())?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Fingerprints already materialized for one booking.
///
/// Append-only and ordered by first sighting; never pruned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenFingerprints(Vec<EventFingerprint>);

impl SeenFingerprints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, fingerprint: &EventFingerprint) -> bool {
        self.0.contains(fingerprint)
    }

    /// Appends `fingerprint` unless it is already present. Returns true if
    /// it was added.
    pub fn insert(&mut self, fingerprint: EventFingerprint) -> bool {
        if self.contains(&fingerprint) {
            return false;
        }
        self.0.push(fingerprint);
        true
    }

    /// Appends every fingerprint from `other` not yet present.
    pub fn extend_from(&mut self, other: &SeenFingerprints) {
        for fingerprint in other.iter() {
            self.insert(*fingerprint);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventFingerprint> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<EventFingerprint> for SeenFingerprints {
    fn from_iter<I: IntoIterator<Item = EventFingerprint>>(iter: I) -> Self {
        let mut seen = Self::new();
        for fingerprint in iter {
            seen.insert(fingerprint);
        }
        seen
    }
}
