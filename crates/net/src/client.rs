//! HTTP client shared by the direct and overlay transports

use fetchr_config::Config;
use fetchr_errors::{Error, NetworkError};
use reqwest::{Client, Proxy, Response};
use std::time::Duration;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
    /// Route every request through this proxy (overlay transports only)
    pub proxy: Option<String>,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300), // 5 minutes for large downloads
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: format!("fetchr/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
        }
    }
}

impl NetConfig {
    /// Settings for direct HTTP/HTTPS transfers
    #[must_use]
    pub fn direct(config: &Config) -> Self {
        Self {
            timeout: config.network.timeout(),
            connect_timeout: config.network.connect_timeout(),
            user_agent: config.network.user_agent.clone(),
            ..Self::default()
        }
    }

    /// Settings for transfers routed through the local overlay proxy
    #[must_use]
    pub fn overlay(config: &Config) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.overlay.connect_timeout),
            proxy: Some(config.overlay.proxy_url.clone()),
            ..Self::direct(config)
        }
    }
}

/// HTTP client wrapper
///
/// No retries happen here: a failed request is reported once and the caller
/// decides whether to start the transfer again.
#[derive(Clone)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is invalid or the underlying reqwest
    /// client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent);

        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy.as_str())
                .map_err(|e| NetworkError::InvalidUrl(format!("overlay proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        } else {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| NetworkError::ConnectionRefused(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Execute a GET request with extra headers
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or no response arrives.
    /// Connection failures through a proxy are reported as an unavailable
    /// transport since the proxy, not the origin, could not be reached.
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Response, Error> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        request.send().await.map_err(|e| self.map_send_error(url, &e))
    }

    /// Proxy every request is routed through, if any
    #[must_use]
    pub fn proxy(&self) -> Option<&str> {
        self.config.proxy.as_deref()
    }

    fn map_send_error(&self, url: &str, error: &reqwest::Error) -> Error {
        if error.is_timeout() {
            return NetworkError::Timeout {
                url: url.to_string(),
            }
            .into();
        }
        if error.is_connect() {
            if let Some(proxy) = &self.config.proxy {
                return NetworkError::unavailable(
                    "overlay",
                    format!("proxy {proxy} unreachable: {error}"),
                )
                .into();
            }
            return NetworkError::ConnectionRefused(error.to_string()).into();
        }
        NetworkError::DownloadFailed(error.to_string()).into()
    }

}

impl std::fmt::Debug for NetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetClient")
            .field("proxy", &self.config.proxy)
            .finish_non_exhaustive()
    }
}
