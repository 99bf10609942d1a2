//! Synchronous XML-RPC client core.
//!
//! # Overview
//! Encodes procedure calls into XML-RPC markup, POSTs them through a
//! pluggable `Transport`, and decodes arbitrarily nested responses into the
//! dynamic `Value` model. A `<fault>` response always comes back as
//! `Error::RemoteFault`, never as a value.
//!
//! ```no_run
//! use xmlrpc_core::Client;
//!
//! let client = Client::new("http://localhost:3000/RPC2");
//! let sum = client.call("AddInt", &[&1, &2])?;
//! assert_eq!(sum.as_i64(), Some(3));
//! # Ok::<(), xmlrpc_core::Error>(())
//! ```
//!
//! # Design
//! - `tokenizer` turns `quick-xml` events into the two primitives the
//!   grammar needs: "next start tag" and "next end tag".
//! - `decode` is a recursive-descent decoder; every call leaves the stream
//!   just past the closing tag of what it decoded.
//! - `encode` is trait-based (`Encodable`) rather than reflective, so record
//!   types opt in explicitly.
//! - `message` frames calls and responses; `client` adds HTTP on top.

pub mod client;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod http;
pub mod message;
pub mod tokenizer;
pub mod value;

pub use client::{call, Client};
pub use config::ClientConfig;
pub use encode::{Encodable, StructEncoder};
pub use error::{Error, Result};
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
pub use message::MethodCall;
pub use value::{Fault, Struct, Value};
