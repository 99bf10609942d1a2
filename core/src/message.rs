//! `methodCall` / `methodResponse` envelopes.
//!
//! # Design
//! Builders write the whole document into one `String` and hand back bytes.
//! `parse_response` is strict about the envelope (exactly one `param`) and
//! returns a `<fault>` response as `Error::RemoteFault`, never as a value.
//!
//! `build_response`, `build_fault` and `parse_call` exist for test doubles
//! that play the server side; this crate does no request dispatch itself.

use crate::decode::{decode_fault, decode_value};
use crate::encode::{write_untyped, Encodable};
use crate::error::{Error, Result};
use crate::tokenizer::XmlTokenizer;
use crate::value::{Fault, Value};

pub const XML_PROLOG: &str = r#"<?xml version="1.0"?>"#;

/// A decoded `methodCall`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method_name: String,
    pub params: Vec<Value>,
}

fn write_params(out: &mut String, params: &[&dyn Encodable]) -> Result<()> {
    out.push_str("<params>");
    for param in params {
        out.push_str("<param><value>");
        param.encode(out)?;
        out.push_str("</value></param>");
    }
    out.push_str("</params>");
    Ok(())
}

/// Serialize a call to `method` with `args`, each typed.
pub fn build_call(method: &str, args: &[&dyn Encodable]) -> Result<Vec<u8>> {
    let mut out = String::from(XML_PROLOG);
    out.push_str("<methodCall><methodName>");
    write_untyped(&mut out, method);
    out.push_str("</methodName>");
    write_params(&mut out, args)?;
    out.push_str("</methodCall>");
    Ok(out.into_bytes())
}

/// Serialize a successful response carrying `value`.
pub fn build_response(value: &dyn Encodable) -> Result<Vec<u8>> {
    let mut out = String::from(XML_PROLOG);
    out.push_str("<methodResponse>");
    write_params(&mut out, &[value])?;
    out.push_str("</methodResponse>");
    Ok(out.into_bytes())
}

/// Serialize a fault response.
pub fn build_fault(fault: &Fault) -> Result<Vec<u8>> {
    let mut out = String::from(XML_PROLOG);
    out.push_str("<methodResponse><fault><value>");
    fault.encode(&mut out)?;
    out.push_str("</value></fault></methodResponse>");
    Ok(out.into_bytes())
}

/// Decode a `methodResponse` body into its single result value.
pub fn parse_response(body: &[u8]) -> Result<Value> {
    let mut tokens = XmlTokenizer::from_bytes(body);
    expect_response_tag(&mut tokens, "methodResponse")?;
    match tokens.next_start()? {
        Some(tag) if tag == "fault" => return Err(Error::RemoteFault(decode_fault(&mut tokens)?)),
        Some(tag) if tag == "params" => {}
        Some(tag) => {
            return Err(Error::MalformedResponse(format!("expected <params>, found <{tag}>")))
        }
        None => return Err(Error::MalformedResponse("missing <params>".to_string())),
    }
    expect_response_tag(&mut tokens, "param")?;
    expect_response_tag(&mut tokens, "value")?;
    let value = decode_value(&mut tokens)?;
    tokens.expect_end()?;
    if let Some(tag) = tokens.next_start()? {
        return Err(Error::MalformedResponse(format!(
            "expected a single <param>, found <{tag}>"
        )));
    }
    tokens.expect_end()?;
    Ok(value)
}

fn expect_response_tag(tokens: &mut XmlTokenizer<&[u8]>, name: &str) -> Result<()> {
    match tokens.next_start()? {
        Some(tag) if tag == name => Ok(()),
        Some(tag) => Err(Error::MalformedResponse(format!("expected <{name}>, found <{tag}>"))),
        None => Err(Error::MalformedResponse(format!("missing <{name}>"))),
    }
}

/// Decode a `methodCall` body. A call without `<params>` has no arguments.
pub fn parse_call(body: &[u8]) -> Result<MethodCall> {
    let mut tokens = XmlTokenizer::from_bytes(body);
    tokens.expect_start("methodCall")?;
    tokens.expect_start("methodName")?;
    let method_name = tokens.read_text()?.trim().to_string();

    let mut params = Vec::new();
    match tokens.next_start()? {
        None => return Ok(MethodCall { method_name, params }),
        Some(tag) if tag == "params" => {}
        Some(tag) => {
            return Err(Error::MalformedStructure(format!("expected <params>, found <{tag}>")))
        }
    }
    while let Some(tag) = tokens.next_start()? {
        if tag != "param" {
            return Err(Error::MalformedStructure(format!("expected <param>, found <{tag}>")));
        }
        tokens.expect_start("value")?;
        params.push(decode_value(&mut tokens)?);
        tokens.expect_end()?;
    }
    tokens.expect_end()?;
    Ok(MethodCall { method_name, params })
}
