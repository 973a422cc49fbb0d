//! Source traits for booking data and accommodation images.
//!
//! Both traits return boxed futures so they stay object safe and can be
//! shared as `Arc<dyn BookingSource>` between the runtime and its pollers.

use std::future::Future;
use std::pin::Pin;

use tripwatch_core::Credentials;

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Raw upstream answer: status code and undecoded body.
///
/// Status classification and body decoding are left to the caller so that
/// every failure is mapped in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Something that can look up a booking.
pub trait BookingSource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Posts the credentials upstream and returns whatever came back.
    ///
    /// Only transport failures are errors; any HTTP status is a response.
    fn fetch<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, ProviderResult<UpstreamResponse>>;
}

/// Something that can fetch accommodation images by relative path.
pub trait ImageSource: Send + Sync {
    /// Returns the raw image bytes for `path` (e.g. `/img/hotel/1.jpg`).
    fn fetch_image<'a>(&'a self, path: &'a str) -> BoxFuture<'a, ProviderResult<Vec<u8>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert!(UpstreamResponse::new(200, "{}").is_success());
        assert!(UpstreamResponse::new(204, Vec::new()).is_success());
        assert!(!UpstreamResponse::new(401, "nope").is_success());
        assert!(!UpstreamResponse::new(301, "").is_success());
    }

    #[test]
    fn text_is_lossy() {
        let response = UpstreamResponse::new(500, vec![b'o', b'k', 0xff]);
        assert_eq!(response.text(), "ok\u{fffd}");
    }
}
