//! Client configuration.
//!
//! Loading is left to the host application; `ClientConfig` only needs to be
//! deserializable from whatever format it uses.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Full URL of the XML-RPC endpoint, e.g. `http://host/RPC2`.
    pub endpoint: String,
    /// Whole-request timeout, connect through body read.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Largest response body accepted, in bytes. Unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_bytes: Option<u64>,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

impl ClientConfig {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            timeout_ms: default_timeout_ms(),
            max_response_bytes: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_defaults_to_ten_seconds() {
        let config: ClientConfig = serde_json::from_str(r#"{"endpoint":"http://localhost/RPC2"}"#).unwrap();
        assert_eq!(config, ClientConfig::new("http://localhost/RPC2"));
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn explicit_timeout() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"endpoint":"http://localhost/RPC2","timeout_ms":250}"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn response_size_is_unlimited_by_default() {
        let config: ClientConfig = serde_json::from_str(r#"{"endpoint":"http://localhost/RPC2"}"#).unwrap();
        assert_eq!(config.max_response_bytes, None);

        let config: ClientConfig =
            serde_json::from_str(r#"{"endpoint":"http://localhost/RPC2","max_response_bytes":1048576}"#)
                .unwrap();
        assert_eq!(config.max_response_bytes, Some(1_048_576));
    }

    #[test]
    fn endpoint_is_required() {
        let result: Result<ClientConfig, _> = serde_json::from_str(r#"{"timeout_ms":250}"#);
        assert!(result.is_err());
    }
}
