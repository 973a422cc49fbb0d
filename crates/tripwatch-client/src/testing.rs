//! Test harness: an [`App`] wired to a mock upstream.

use std::sync::Arc;

use serde_json::{Value, json};
use tripwatch_providers::{
    ImageClient, ImageClientConfig, Jet2Client, Jet2Config, MemoryCalendarStore,
};
use tripwatch_server::FileBookingRepository;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::app::App;
use crate::config::ClientConfig;

pub const BOOKING_PATH: &str = "/holidays/booking";

pub struct Harness {
    pub server: MockServer,
    pub calendars: Arc<MemoryCalendarStore>,
    pub app: App,
}

impl Harness {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let calendars = Arc::new(MemoryCalendarStore::new());
        let app = App::with_parts(
            ClientConfig::default(),
            Arc::new(FileBookingRepository::in_memory()),
            Arc::new(
                Jet2Client::new(Jet2Config::new(format!("{}{BOOKING_PATH}", server.uri())).unwrap())
                    .unwrap(),
            ),
            calendars.clone(),
            Arc::new(ImageClient::new(ImageClientConfig::new(server.uri()).unwrap()).unwrap()),
        )
        .unwrap();
        Self {
            server,
            calendars,
            app,
        }
    }

    /// Answers every booking lookup with `status` and `body`.
    pub async fn respond(&self, status: u16, body: Value) {
        self.server.reset().await;
        Mock::given(method("POST"))
            .and(path(BOOKING_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn lookups(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == BOOKING_PATH)
            .count()
    }
}

pub fn booking_body() -> Value {
    json!({
        "success": true,
        "data": {
            "bookingReference": "ABC123",
            "holidayType": "Package",
            "expiryDate": "2030-07-01T00:00:00",
            "isTradeBooking": false,
            "hasResortFlightCheckIn": true,
            "priceBreakdown": { "paymentDateDue": "2030-05-01T00:00:00" },
            "flightSummary": {
                "outbound": {
                    "number": "LS123",
                    "localDepartureDateTime": "2030-06-01T06:00:00",
                    "localArrivalDateTime": "2030-06-01T09:30:00"
                },
                "inbound": {
                    "number": "LS124",
                    "localDepartureDateTime": "2030-06-08T10:15:00",
                    "localArrivalDateTime": "2030-06-08T11:45:00"
                }
            },
            "checkInStatus": {
                "checkInDate": "2030-05-25T10:00:00",
                "checkInAllowed": true
            },
            "hotel": { "name": "Hotel Sol" },
            "resort": "Alcudia",
            "accommodationImages": ["/img/sol/1.jpg"]
        }
    })
}
