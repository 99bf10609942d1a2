//! Error types for the XML-RPC client.
//!
//! # Design
//! Decode failures get one variant per scalar kind so callers and tests can
//! tell a bad boolean from a bad date without string matching. A server-side
//! `<fault>` is surfaced as `RemoteFault` and never as a `Value`, which keeps
//! fault responses from being mistaken for a struct-shaped result. Non-2xx
//! responses land in `HttpError` with the raw status and body for debugging;
//! network failures are passed through untouched in `Transport`.

use thiserror::Error;

use crate::value::Fault;

/// Errors returned by the codec, the framer and `Client`.
#[derive(Debug, Error)]
pub enum Error {
    /// Unexpected tag, missing wrapper element or truncated document.
    #[error("malformed XML-RPC document: {0}")]
    MalformedStructure(String),

    /// A struct `member` was not `name` followed by `value`.
    #[error("malformed struct: {0}")]
    MalformedStruct(String),

    /// The `methodResponse` envelope was missing a wrapper or had extra params.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid boolean value: {0:?}")]
    InvalidBoolean(String),

    #[error("invalid integer value: {0:?}")]
    InvalidInteger(String),

    #[error("invalid double value: {0:?}")]
    InvalidFloat(String),

    #[error("invalid dateTime.iso8601 value: {0:?}")]
    InvalidDateTime(String),

    #[error("invalid base64 value: {0}")]
    InvalidBase64(String),

    /// Encode side: the value has no XML-RPC form. Decode side: unknown tag.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// The server answered with a `<fault>`.
    #[error("remote fault {}: {}", .0.code, .0.message)]
    RemoteFault(Fault),

    /// The server returned a non-2xx status. The body is not decoded.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// The remote fault carried by this error, if any.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Error::RemoteFault(fault) => Some(fault),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
