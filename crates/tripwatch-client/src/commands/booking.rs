//! Booking management commands.

use std::fmt::Write as _;

use tripwatch_core::Credentials;
use tripwatch_server::{AddOutcome, BookingEntry, SyncReport};

use crate::app::App;
use crate::error::ClientResult;

/// Validates the booking upstream, stores it and writes its events.
///
/// Falls back to `calendar.default_calendars` when no calendar is given.
pub async fn add(
    app: &App,
    reference: &str,
    date_of_birth: &str,
    surname: &str,
    calendars: Vec<String>,
) -> ClientResult<AddOutcome> {
    let credentials = Credentials::new(reference, date_of_birth, surname)?;
    let calendars = if calendars.is_empty() {
        app.config().calendar.default_calendars.clone()
    } else {
        calendars
    };
    let outcome = app.runtime().add_booking(credentials, calendars).await?;
    print!("{}", render_add(reference, &outcome));
    Ok(outcome)
}

pub async fn remove(app: &App, reference: &str) -> ClientResult<()> {
    let entry = app.runtime().remove_booking(reference).await?;
    println!("Stopped tracking {}.", entry.reference());
    Ok(())
}

pub fn list(app: &App) -> ClientResult<()> {
    let entries = app.runtime().repository().list()?;
    if entries.is_empty() {
        println!("No bookings tracked.");
    } else {
        print!("{}", render_list(&entries));
    }
    Ok(())
}

pub fn render_add(reference: &str, outcome: &AddOutcome) -> String {
    let mut out = String::new();
    match outcome {
        AddOutcome::AlreadyExists { .. } => {
            let _ = writeln!(out, "Booking {reference} is already tracked.");
        }
        AddOutcome::Added { entry, reports } => {
            let _ = writeln!(out, "Tracking {}.", entry.reference());
            for report in reports {
                let _ = writeln!(out, "  {}", render_report(report));
            }
        }
    }
    out
}

fn render_report(report: &SyncReport) -> String {
    let mut line = format!(
        "{}: {} created, {} skipped",
        report.entity_id,
        report.created(),
        report.skipped()
    );
    if report.failed() > 0 {
        let _ = write!(line, ", {} failed", report.failed());
    }
    line
}

pub fn render_list(entries: &[BookingEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let calendars = if entry.calendars.is_empty() {
            "-".to_string()
        } else {
            entry.calendars.join(", ")
        };
        let _ = writeln!(
            out,
            "{:<10} {:<16} added {}  calendars: {}  events: {}",
            entry.reference(),
            entry.credentials.surname(),
            entry.created_at.format("%Y-%m-%d"),
            calendars,
            entry.seen_fingerprints.len(),
        );
    }
    out
}
