//! HTTP plain-data types and the transport capability.
//!
//! # Design
//! `Client` builds an `HttpRequest` and parses an `HttpResponse`; moving the
//! bytes in between is the job of a `Transport`. The split keeps the codec
//! deterministic and lets tests swap in an in-memory transport.
//!
//! A transport must read the response body to the end for every status,
//! including errors, so the underlying connection can be reused. Returning a
//! fully buffered `body` is how that contract is expressed here.

use std::time::Duration;

use crate::error::{Error, Result};

pub const CONTENT_TYPE: &str = "text/xml";

/// An XML-RPC POST described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A fully drained HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can POST a request and hand back the drained response.
///
/// Implementations shared between threads must be safe for concurrent use;
/// `Client` itself adds no locking.
pub trait Transport {
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).post(request)
    }
}

/// Blocking transport over a pooled `ureq::Agent`.
///
/// HTTP error statuses are returned as data, not `Err`, so `Client` decides
/// how to interpret them. Response bodies are read without a size limit
/// unless one is set with `with_max_response_bytes`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    max_response_bytes: u64,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("max_response_bytes", &self.max_response_bytes)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            max_response_bytes: u64::MAX,
        }
    }

    /// Fail with `Error::Transport` once a response body exceeds `limit`
    /// bytes. The oversized body is not drained, so that connection is
    /// closed instead of pooled.
    pub fn with_max_response_bytes(mut self, limit: u64) -> Self {
        self.max_response_bytes = limit;
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TIMEOUT)
    }
}

impl Transport for UreqTransport {
    fn post(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.agent.post(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder
            .send(&request.body[..])
            .map_err(|e| Error::Transport(Box::new(e)))?;

        let status = response.status().as_u16();
        // read to the end on every status so the connection goes back to the pool
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_response_bytes)
            .read_to_vec()
            .map_err(|e| Error::Transport(Box::new(e)))?;
        Ok(HttpResponse { status, body })
    }
}
