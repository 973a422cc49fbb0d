//! Accommodation image client.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::source::{BoxFuture, ImageSource};

const PROVIDER: &str = "images";

/// Configuration for [`ImageClient`].
#[derive(Debug, Clone)]
pub struct ImageClientConfig {
    /// Site that relative image paths are resolved against.
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ImageClientConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.jet2holidays.com";

    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url.as_ref())?,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("tripwatch/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Absolute URL of a relative image path.
    ///
    /// Paths are appended to the base as-is, so a base with a path prefix
    /// keeps it.
    pub fn resolve(&self, path: &str) -> ProviderResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&joined).map_err(|e| {
            ProviderError::configuration(format!("invalid image path {path:?}: {e}"))
                .with_provider(PROVIDER)
        })
    }
}

/// Fetches images with a plain GET and no authentication.
pub struct ImageClient {
    client: Client,
    config: ImageClientConfig,
}

impl ImageClient {
    pub fn new(config: ImageClientConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {e}"))
                    .with_provider(PROVIDER)
            })?;
        Ok(Self { client, config })
    }

    async fn get(&self, path: &str) -> ProviderResult<Vec<u8>> {
        let url = self.config.resolve(path)?;
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            ProviderError::network(format!("image request failed: {e}"))
                .with_provider(PROVIDER)
                .with_source(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &body).with_provider(PROVIDER));
        }

        let bytes = response.bytes().await.map_err(|e| {
            ProviderError::network(format!("failed to read image: {e}"))
                .with_provider(PROVIDER)
                .with_source(e)
        })?;
        debug!(%url, bytes = bytes.len(), "fetched image");
        Ok(bytes.to_vec())
    }
}

impl ImageSource for ImageClient {
    fn fetch_image<'a>(&'a self, path: &'a str) -> BoxFuture<'a, ProviderResult<Vec<u8>>> {
        Box::pin(self.get(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn default_timeout() {
        let config = ImageClientConfig::new(ImageClientConfig::DEFAULT_BASE_URL).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn resolves_relative_paths() {
        let config = ImageClientConfig::new("https://www.jet2holidays.com/").unwrap();
        assert_eq!(
            config.resolve("/img/hotel/1.jpg").unwrap().as_str(),
            "https://www.jet2holidays.com/img/hotel/1.jpg"
        );
        assert_eq!(
            config.resolve("img/hotel/2.jpg").unwrap().as_str(),
            "https://www.jet2holidays.com/img/hotel/2.jpg"
        );
    }

    #[tokio::test]
    async fn fetches_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/hotel/1.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xd8, 0xff]))
            .expect(1)
            .mount(&server)
            .await;

        let client = ImageClient::new(ImageClientConfig::new(server.uri()).unwrap()).unwrap();
        let bytes = client.fetch_image("/img/hotel/1.jpg").await.unwrap();
        assert_eq!(bytes, vec![0xff, 0xd8, 0xff]);
    }

    #[tokio::test]
    async fn missing_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ImageClient::new(ImageClientConfig::new(server.uri()).unwrap()).unwrap();
        let err = client.fetch_image("/img/gone.jpg").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
    }

    #[tokio::test]
    async fn slow_image_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let config = ImageClientConfig::new(server.uri())
            .unwrap()
            .with_timeout(Duration::from_millis(50));
        let client = ImageClient::new(config).unwrap();
        let err = client.fetch_image("/img/slow.jpg").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
    }
}
