//! Jet2 holidays booking API client.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, trace};
use tripwatch_core::Credentials;
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::source::{BookingSource, BoxFuture, UpstreamResponse};

const PROVIDER: &str = "jet2";

/// Configuration for [`Jet2Client`].
#[derive(Debug, Clone)]
pub struct Jet2Config {
    /// Booking lookup endpoint.
    pub url: Url,
    /// Overall request timeout. `None` waits as long as the server does.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Jet2Config {
    /// Production booking endpoint.
    pub const DEFAULT_URL: &'static str = "https://mobile-api.jet2.com/holidays/booking";

    /// Creates a configuration for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: Url::parse(url.as_ref())?,
            timeout: None,
            user_agent: format!("tripwatch/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Posts credentials to the booking endpoint.
pub struct Jet2Client {
    client: Client,
    config: Jet2Config,
}

impl Jet2Client {
    pub fn new(config: Jet2Config) -> ProviderResult<Self> {
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            ProviderError::configuration(format!("failed to create HTTP client: {e}"))
                .with_provider(PROVIDER)
        })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &Jet2Config {
        &self.config
    }

    async fn post(&self, credentials: &Credentials) -> ProviderResult<UpstreamResponse> {
        trace!(
            url = %self.config.url,
            reference = credentials.booking_reference(),
            "posting booking lookup"
        );

        let response = self
            .client
            .post(self.config.url.clone())
            .json(credentials)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("request failed: {e}"))
                    .with_provider(PROVIDER)
                    .with_source(e)
            })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {e}"))
                .with_provider(PROVIDER)
                .with_source(e)
        })?;

        debug!(status, bytes = body.len(), "booking lookup answered");
        Ok(UpstreamResponse::new(status, body.to_vec()))
    }
}

impl BookingSource for Jet2Client {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn fetch<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, ProviderResult<UpstreamResponse>> {
        Box::pin(self.post(credentials))
    }
}
