//! Blocking Overpass client over `reqwest`.
//!
//! Queries can run for many minutes, so the HTTP timeout is the server-side
//! query timeout plus a fixed grace period for transfer.

use std::time::Duration;

use log::{debug, info};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use super::{OverpassEndpoint, OverpassError, build_query};

/// Default user agent for Overpass requests.
pub const DEFAULT_USER_AGENT: &str = concat!("chargemap/", env!("CARGO_PKG_VERSION"));

/// Default server-side query timeout in seconds.
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 900;

/// Extra time granted to the HTTP transfer beyond the query timeout.
const TRANSFER_GRACE: Duration = Duration::from_secs(30);

/// Configuration for [`OverpassClient`].
#[derive(Debug, Clone)]
pub struct OverpassClientConfig {
    /// Interpreter to query.
    pub endpoint: OverpassEndpoint,
    /// Server-side query timeout, sent as `[timeout:N]`.
    pub query_timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl OverpassClientConfig {
    /// Create a configuration for `endpoint` with default timeouts.
    #[must_use]
    pub fn new(endpoint: OverpassEndpoint) -> Self {
        Self {
            endpoint,
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Set the server-side query timeout.
    #[must_use]
    pub const fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Timeout applied to the whole HTTP exchange.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        self.query_timeout.saturating_add(TRANSFER_GRACE)
    }
}

/// Synchronous Overpass client.
///
/// Owns a current-thread Tokio runtime reused across calls. Inside a
/// multi-threaded runtime the caller's handle is used through
/// [`tokio::task::block_in_place`]; inside a `current_thread` runtime the
/// client falls back to its own runtime.
pub struct OverpassClient {
    client: Client,
    config: OverpassClientConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for OverpassClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverpassClient")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl OverpassClient {
    /// Create a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(endpoint: OverpassEndpoint) -> Result<Self, OverpassError> {
        Self::with_config(OverpassClientConfig::new(endpoint))
    }

    /// Create a client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: OverpassClientConfig) -> Result<Self, OverpassError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.http_timeout())
            .build()
            .map_err(OverpassError::Client)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(OverpassError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// Client configuration.
    #[must_use]
    pub const fn config(&self) -> &OverpassClientConfig {
        &self.config
    }

    /// The query this client sends.
    #[must_use]
    pub fn query(&self) -> String {
        build_query(self.config.query_timeout.as_secs())
    }

    /// Run the query and return the raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError::Timeout`], [`OverpassError::Http`] or
    /// [`OverpassError::Network`] when the exchange fails.
    pub fn download(&self) -> Result<Vec<u8>, OverpassError> {
        info!(
            "querying {} (server timeout {}s)",
            self.config.endpoint,
            self.config.query_timeout.as_secs()
        );
        let future = self.download_async();
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }

    async fn download_async(&self) -> Result<Vec<u8>, OverpassError> {
        let url = self.config.endpoint.url();
        debug!("POST {url}");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/plain")
            .body(self.query())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;
        debug!("received {} bytes from {url}", body.len());
        Ok(body.to_vec())
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error) -> OverpassError {
        let url = self.config.endpoint.url().to_owned();
        if error.is_timeout() {
            return OverpassError::Timeout {
                url,
                timeout_secs: self.config.http_timeout().as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return OverpassError::Http {
                url,
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        OverpassError::Network {
            url,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn http_timeout_adds_transfer_grace() {
        let config = OverpassClientConfig::new(OverpassEndpoint::World)
            .with_query_timeout(Duration::from_secs(60));
        assert_eq!(config.http_timeout(), Duration::from_secs(90));
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = OverpassClientConfig::new(OverpassEndpoint::Switzerland)
            .with_query_timeout(Duration::from_secs(120))
            .with_user_agent("test-agent/1.0");

        assert_eq!(config.endpoint.url(), "https://overpass.osm.ch/api/interpreter");
        assert_eq!(config.query_timeout, Duration::from_secs(120));
        assert_eq!(config.user_agent, "test-agent/1.0");
    }

    #[rstest]
    fn query_uses_configured_timeout() {
        let config = OverpassClientConfig::new(OverpassEndpoint::World)
            .with_query_timeout(Duration::from_secs(42));
        let client = OverpassClient::with_config(config).expect("client should build");
        assert!(client.query().starts_with("[out:json][timeout:42];"));
    }
}
