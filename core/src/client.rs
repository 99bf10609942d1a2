//! XML-RPC client: request building, response parsing and the blocking call.
//!
//! # Design
//! `Client` holds only the endpoint and a transport and carries no mutable
//! state between calls, so one instance can be shared across threads when
//! its transport allows it. Each call is split into `build_call`, which
//! produces an `HttpRequest`, and `parse_response`, which consumes an
//! `HttpResponse`. `call` runs both around a single `Transport::post`;
//! hosts that do their own I/O can use the halves directly.

use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::encode::Encodable;
use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport, CONTENT_TYPE};
use crate::message;
use crate::value::Value;

/// Synchronous XML-RPC client bound to one endpoint.
#[derive(Debug, Clone)]
pub struct Client<T = UreqTransport> {
    endpoint: String,
    transport: T,
}

impl Client<UreqTransport> {
    /// Client with a default `UreqTransport` (10 second timeout).
    pub fn new(endpoint: &str) -> Self {
        Self::with_transport(endpoint, UreqTransport::default())
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let mut transport = UreqTransport::new(config.timeout());
        if let Some(limit) = config.max_response_bytes {
            transport = transport.with_max_response_bytes(limit);
        }
        Self::with_transport(&config.endpoint, transport)
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(endpoint: &str, transport: T) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            transport,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn build_call(&self, method: &str, args: &[&dyn Encodable]) -> Result<HttpRequest> {
        Ok(HttpRequest {
            url: self.endpoint.clone(),
            headers: vec![("content-type".to_string(), CONTENT_TYPE.to_string())],
            body: message::build_call(method, args)?,
        })
    }

    /// Interpret a drained response: non-2xx is `HttpError`, a fault is
    /// `RemoteFault`, anything else is decoded.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value> {
        if !response.is_success() {
            warn!(status = response.status, endpoint = %self.endpoint, "XML-RPC endpoint returned an error status");
            return Err(Error::HttpError {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }
        message::parse_response(&response.body)
    }

    /// Call `method` with `args` and wait for its result.
    pub fn call(&self, method: &str, args: &[&dyn Encodable]) -> Result<Value> {
        let request = self.build_call(method, args)?;
        debug!(method, endpoint = %self.endpoint, bytes = request.body.len(), "sending XML-RPC call");
        let response = self.transport.post(&request)?;
        let result = self.parse_response(response);
        match &result {
            Ok(value) => debug!(method, kind = value.kind(), "XML-RPC call succeeded"),
            Err(Error::RemoteFault(fault)) => {
                warn!(method, code = fault.code, message = %fault.message, "XML-RPC call returned a fault")
            }
            Err(e) => debug!(method, error = %e, "XML-RPC call failed"),
        }
        result
    }
}

fn shared_transport() -> &'static UreqTransport {
    static TRANSPORT: OnceLock<UreqTransport> = OnceLock::new();
    TRANSPORT.get_or_init(UreqTransport::default)
}

/// One-off call to `url` over a process-wide transport, so repeated calls
/// reuse pooled connections.
pub fn call(url: &str, method: &str, args: &[&dyn Encodable]) -> Result<Value> {
    Client::with_transport(url, shared_transport()).call(method, args)
}
