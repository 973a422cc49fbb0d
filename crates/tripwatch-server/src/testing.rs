//! Test doubles shared by the server's unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use tripwatch_core::{Credentials, TimeWindow};
use tripwatch_providers::{
    BookingSource, BoxFuture, CalendarStore, ImageSource, MemoryCalendarStore, NewCalendarEvent,
    ProviderError, ProviderResult, StoredEvent, UpstreamResponse,
};

/// Replays scripted responses; repeats the last one when the script runs out.
pub struct ScriptedSource {
    script: Mutex<VecDeque<ProviderResult<UpstreamResponse>>>,
    last: Mutex<Option<ProviderResult<UpstreamResponse>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = ProviderResult<UpstreamResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers 200 with `body`.
    pub fn always(body: Value) -> Self {
        Self::new([Ok(UpstreamResponse::new(200, body.to_string()))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> ProviderResult<UpstreamResponse> {
        let mut last = self.last.lock().unwrap();
        match self.script.lock().unwrap().pop_front() {
            Some(next) => {
                *last = Some(clone_result(&next));
                next
            }
            None => last
                .as_ref()
                .map(clone_result)
                .unwrap_or_else(|| Err(ProviderError::internal("script exhausted"))),
        }
    }
}

fn clone_result(result: &ProviderResult<UpstreamResponse>) -> ProviderResult<UpstreamResponse> {
    match result {
        Ok(response) => Ok(response.clone()),
        Err(err) => Err(ProviderError::new(err.code(), err.message())),
    }
}

impl BookingSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch<'a>(
        &'a self,
        _credentials: &'a Credentials,
    ) -> BoxFuture<'a, ProviderResult<UpstreamResponse>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.next();
        Box::pin(async move { next })
    }
}

/// Memory store whose reads and writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryCalendarStore,
    pub fail_list: bool,
    pub fail_create: bool,
    /// Accept creates without storing them.
    pub swallow_create: bool,
    pub creates: AtomicUsize,
}

impl CalendarStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    fn create_event<'a>(
        &'a self,
        entity_id: &'a str,
        event: &'a NewCalendarEvent,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if self.fail_create {
                return Err(ProviderError::calendar("calendar is read-only"));
            }
            if self.swallow_create {
                return Ok(());
            }
            self.inner.create_event(entity_id, event).await
        })
    }

    fn list_events<'a>(
        &'a self,
        entity_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<StoredEvent>>> {
        Box::pin(async move {
            if self.fail_list {
                return Err(ProviderError::calendar("calendar unreachable"));
            }
            self.inner.list_events(entity_id, window).await
        })
    }
}

/// Serves each image path back as its bytes and remembers what was asked.
#[derive(Default)]
pub struct RecordingImages {
    pub paths: Mutex<Vec<String>>,
}

impl ImageSource for RecordingImages {
    fn fetch_image<'a>(&'a self, path: &'a str) -> BoxFuture<'a, ProviderResult<Vec<u8>>> {
        self.paths.lock().unwrap().push(path.to_string());
        Box::pin(async move { Ok(path.as_bytes().to_vec()) })
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("ABC123", "01/02/1980", "Smith").unwrap()
}

/// A successful booking in 2030 with every projected field present.
pub fn booking_body() -> Value {
    json!({
        "success": true,
        "data": {
            "bookingReference": "ABC123",
            "holidayType": "Package",
            "expiryDate": "2030-07-01T00:00:00",
            "isTradeBooking": false,
            "hasResortFlightCheckIn": true,
            "numberOfPassengers": { "adults": 2, "children": 1, "infants": 0 },
            "priceBreakdown": {
                "paymentDateDue": "2030-05-01T00:00:00",
                "totalPrice": 2450.5
            },
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
                "checkInAllowed": true,
                "outboundFlight": { "checkedInCode": "" },
                "inboundFlight": { "checkedInCode": "" }
            },
            "hotel": { "name": "Hotel Sol" },
            "resort": "Alcudia",
            "area": "North",
            "region": "Majorca",
            "accommodationImages": ["/img/sol/1.jpg", "/img/sol/2.jpg"]
        }
    })
}
