//! Gate configuration.
//!
//! [`GateConfig`] carries the knobs shared by the backend client and the
//! handshake: the backend base URL, the popup closure sampling interval,
//! and the HTTP timeout.

use std::time::Duration;

use url::Url;

/// Default interval at which the popup's closed flag is sampled.
///
/// Closure is detected by polling rather than a push notification because
/// the popup contents are cross-origin and not observable directly. 200 ms
/// keeps the worst-case detection latency to one interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Default timeout for backend HTTP calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the integration gate.
///
/// # Example
///
/// ```rust,ignore
/// use integration_gate::GateConfig;
/// use std::time::Duration;
///
/// let config = GateConfig::new("http://localhost:8000".parse()?)
///     .with_poll_interval(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Base URL of the backend collaborator.
    pub base_url: Url,
    /// Interval at which an open popup's closed flag is sampled.
    pub poll_interval: Duration,
    /// Timeout applied to backend HTTP calls.
    pub http_timeout: Duration,
}

impl GateConfig {
    /// Create a configuration with default intervals for the given backend.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Sets the popup closure sampling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the HTTP timeout for backend calls.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        "http://localhost:8000".parse().unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = GateConfig::new(base());
        assert_eq!(config.poll_interval, Duration::from_millis(200));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builders() {
        let config = GateConfig::new(base())
            .with_poll_interval(Duration::from_millis(50))
            .with_http_timeout(Duration::from_secs(5));

        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/");
    }
}
