//! Runtime configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Maximum pooled database connections.
    pub pool_size: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Allowed CORS origin; `*` allows any.
    pub cors_origin: String,
    /// Prometheus exporter address. `None` disables the exporter.
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pool_size: 10,
            request_timeout: Duration::from_secs(30),
            cors_origin: "*".to_string(),
            metrics_addr: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let pool_size = std::env::var("ALLOC_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(10);
        let request_timeout_secs = std::env::var("ALLOC_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let cors_origin = std::env::var("ALLOC_CORS_ORIGIN").unwrap_or_else(|_| "*".to_string());
        let metrics_addr = match std::env::var("ALLOC_METRICS_ADDR") {
            Ok(s) if s.is_empty() => None,
            Ok(s) => match s.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!(
                        "ALLOC_METRICS_ADDR '{s}' is not a socket address ({e}) -- metrics disabled"
                    );
                    None
                }
            },
            Err(_) => Some(SocketAddr::from(([0, 0, 0, 0], 9000))),
        };

        Self {
            pool_size,
            request_timeout: Duration::from_secs(request_timeout_secs),
            cors_origin,
            metrics_addr,
        }
    }
}
