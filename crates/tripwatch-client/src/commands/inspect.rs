//! Read-only views of a single booking: sensors, events and images.

use std::fmt::Write as _;
use std::path::Path;

use tripwatch_core::{ProjectedEvent, upcoming};
use tripwatch_server::BookingEntities;

use crate::app::App;
use crate::error::{ClientError, ClientResult};

pub async fn status(app: &App, reference: &str, json: bool) -> ClientResult<()> {
    let entities = app.entities(reference).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entities)?);
    } else {
        print!("{}", render_status(&entities));
    }
    Ok(())
}

pub async fn events(app: &App, reference: &str, all: bool) -> ClientResult<()> {
    let entities = app.entities(reference).await?;
    let events = if all {
        entities.calendar.all_events().to_vec()
    } else {
        upcoming(entities.calendar.all_events(), app.today())
    };
    if events.is_empty() {
        println!("No events.");
    } else {
        print!("{}", render_events(&events));
    }
    Ok(())
}

/// Writes the booking's next accommodation image to `output`.
///
/// Repeated calls on the same [`App`] walk through the booking's images.
pub async fn image(app: &App, reference: &str, output: &Path) -> ClientResult<usize> {
    let (entry, snapshot) = app.fetch(reference).await?;
    let bytes = app
        .runtime()
        .next_image(&entry, &snapshot, app.images())
        .await?
        .ok_or_else(|| ClientError::NothingToShow(format!("booking {reference} has no images")))?;
    std::fs::write(output, &bytes)?;
    println!("Wrote {} bytes to {}.", bytes.len(), output.display());
    Ok(bytes.len())
}

pub fn render_status(entities: &BookingEntities) -> String {
    let mut out = String::new();
    let model = entities.device.model.as_deref().unwrap_or("unknown holiday type");
    let state = if entities.available { "available" } else { "unavailable" };
    let _ = writeln!(out, "{} ({model}) {state}", entities.device.name);

    for sensor in &entities.sensors {
        let value = sensor
            .value
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        let _ = writeln!(out, "  {:<28} {value}", sensor.name);
    }
    for sensor in &entities.binary_sensors {
        let value = if sensor.is_on { "on" } else { "off" };
        let _ = writeln!(out, "  {:<28} {value}", sensor.name);
    }
    let _ = writeln!(
        out,
        "  {:<28} {} image(s)",
        entities.camera.name, entities.camera.image_count
    );
    if let Some(event) = &entities.calendar.event {
        let _ = writeln!(out, "  {:<28} {}", "Next event", render_event(event));
    }
    out
}

pub fn render_events(events: &[ProjectedEvent]) -> String {
    events.iter().fold(String::new(), |mut out, event| {
        let _ = writeln!(out, "{}", render_event(event));
        out
    })
}

fn render_event(event: &ProjectedEvent) -> String {
    format!(
        "{} -> {}  {}",
        event.start.format("%Y-%m-%d %H:%M"),
        event.end.format("%Y-%m-%d %H:%M"),
        event.title
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, booking_body};
    use serde_json::json;
    use tripwatch_core::EventKind;
    use tripwatch_server::RefreshError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    async fn tracked(harness: &Harness) {
        harness.respond(200, booking_body()).await;
        crate::commands::booking::add(&harness.app, "ABC123", "01/02/1980", "Smith", Vec::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn status_renders_every_adapter() {
        let harness = Harness::start().await;
        tracked(&harness).await;

        let entities = harness.app.entities("abc123").await.unwrap();
        let text = render_status(&entities);
        let first = text.lines().next().unwrap();
        assert_eq!(first, "ABC123 (Package) available");
        assert!(text.contains("Hotel Sol"));
        assert!(text.contains("1 image(s)"));
        assert!(text.lines().any(|l| l.contains("Check-In Allowed") && l.ends_with("on")));
        assert!(text.lines().any(|l| l.starts_with("  Next event")));

        let json = serde_json::to_value(&entities).unwrap();
        assert_eq!(json["calendar"]["name"], "Jet2 - ABC123");
    }

    #[tokio::test]
    async fn status_surfaces_refresh_errors() {
        let harness = Harness::start().await;
        tracked(&harness).await;
        harness.respond(429, json!({})).await;

        let err = harness.app.entities("ABC123").await.unwrap_err();
        assert!(matches!(err, ClientError::Refresh(RefreshError::RateLimited(_))));
    }

    #[tokio::test]
    async fn unknown_reference() {
        let harness = Harness::start().await;
        let err = harness.app.entities("NOPE").await.unwrap_err();
        assert!(matches!(err, ClientError::UnknownBooking(r) if r == "NOPE"));
        assert_eq!(harness.lookups().await, 0);
    }

    #[tokio::test]
    async fn events_in_projection_order() {
        let harness = Harness::start().await;
        tracked(&harness).await;

        let entities = harness.app.entities("ABC123").await.unwrap();
        let kinds: Vec<_> = entities.calendar.all_events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, EventKind::ALL);

        let text = render_events(entities.calendar.all_events());
        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().nth(1).unwrap().starts_with("2030-06-01 06:00 -> 2030-06-01 09:30"));
    }

    #[tokio::test]
    async fn image_written_to_file() {
        let harness = Harness::start().await;
        tracked(&harness).await;
        Mock::given(method("GET"))
            .and(path("/img/sol/1.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xd8, 0xff]))
            .mount(&harness.server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("sol.jpg");
        assert_eq!(image(&harness.app, "ABC123", &output).await.unwrap(), 3);
        assert_eq!(std::fs::read(&output).unwrap(), [0xff, 0xd8, 0xff]);
    }

    #[tokio::test]
    async fn image_rotates_between_calls() {
        let harness = Harness::start().await;
        tracked(&harness).await;
        let mut body = booking_body();
        body["data"]["accommodationImages"] = json!(["/img/sol/1.jpg", "/img/sol/2.jpg"]);
        harness.respond(200, body).await;
        for (image_path, byte) in [("/img/sol/1.jpg", 1u8), ("/img/sol/2.jpg", 2u8)] {
            Mock::given(method("GET"))
                .and(path(image_path))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![byte]))
                .mount(&harness.server)
                .await;
        }

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("sol.jpg");
        let mut written = Vec::new();
        for _ in 0..3 {
            image(&harness.app, "ABC123", &output).await.unwrap();
            written.extend(std::fs::read(&output).unwrap());
        }
        assert_eq!(written, [1, 2, 1]);
    }

    #[tokio::test]
    async fn image_missing() {
        let harness = Harness::start().await;
        tracked(&harness).await;
        harness
            .respond(200, json!({ "success": true, "data": { "expiryDate": "2030-07-01T00:00:00" } }))
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = image(&harness.app, "ABC123", &dir.path().join("x.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NothingToShow(_)));
    }
}
