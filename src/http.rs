// src/http.rs
// Shared HTTP client for upstream calls

use std::time::Duration;

/// Default connect timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Create the shared HTTP client with the given request timeout.
///
/// Built once at startup and shared by every upstream client. Uses
/// connection pooling internally.
pub fn create_shared_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .pool_max_idle_per_host(10)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_shared_client() {
        let client = create_shared_client(Duration::from_secs(60));
        drop(client);
    }

    #[test]
    fn test_short_timeout_client() {
        let client = create_shared_client(Duration::from_millis(250));
        drop(client);
    }

    #[test]
    fn test_connect_timeout() {
        assert_eq!(CONNECT_TIMEOUT, Duration::from_secs(10));
    }
}
