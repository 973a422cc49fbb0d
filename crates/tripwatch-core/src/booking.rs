//! Booking credentials.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format the booking API expects for the lead passenger's date of birth.
pub const DATE_OF_BIRTH_FORMAT: &str = "%d/%m/%Y";

/// Reasons credentials are rejected before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialsError {
    /// The booking reference is empty.
    #[error("booking reference must not be empty")]
    EmptyReference,
    /// The surname is empty.
    #[error("surname must not be empty")]
    EmptySurname,
    /// The date of birth is not `dd/mm/yyyy`.
    #[error("invalid date of birth {0:?}: expected dd/mm/yyyy")]
    InvalidDateOfBirth(String),
}

/// The three values identifying a booking upstream.
///
/// Serialized with the upstream field names, so the same value is used as
/// the request body and in the persisted booking file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "bookingReference")]
    booking_reference: String,
    #[serde(rename = "dateOfbirth")]
    date_of_birth: String,
    surname: String,
}

impl Credentials {
    /// Builds credentials after validating each field.
    pub fn new(
        booking_reference: impl Into<String>,
        date_of_birth: impl Into<String>,
        surname: impl Into<String>,
    ) -> Result<Self, CredentialsError> {
        let booking_reference = booking_reference.into().trim().to_string();
        let date_of_birth = date_of_birth.into().trim().to_string();
        let surname = surname.into().trim().to_string();

        if booking_reference.is_empty() {
            return Err(CredentialsError::EmptyReference);
        }
        if surname.is_empty() {
            return Err(CredentialsError::EmptySurname);
        }
        if NaiveDate::parse_from_str(&date_of_birth, DATE_OF_BIRTH_FORMAT).is_err() {
            return Err(CredentialsError::InvalidDateOfBirth(date_of_birth));
        }

        Ok(Self {
            booking_reference,
            date_of_birth,
            surname,
        })
    }

    pub fn booking_reference(&self) -> &str {
        &self.booking_reference
    }

    pub fn date_of_birth(&self) -> &str {
        &self.date_of_birth
    }

    pub fn surname(&self) -> &str {
        &self.surname
    }

    /// Identifier of the booking entry built from these credentials.
    pub fn entry_id(&self) -> String {
        format!(
            "{}_{}_{}",
            self.booking_reference, self.date_of_birth, self.surname
        )
    }

    /// True when `reference` names the same booking, ignoring case.
    pub fn matches_reference(&self, reference: &str) -> bool {
        self.booking_reference.eq_ignore_ascii_case(reference.trim())
    }
}
