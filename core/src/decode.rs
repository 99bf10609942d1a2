//! Decoder from XML-RPC markup to `Value`.
//!
//! # Design
//! Every decode function returns with the tokenizer positioned just after
//! the closing tag of the element it decoded. Parents never close a child's
//! element, so the convention holds at every nesting level:
//!
//! - `decode_value` is entered after `<value>` and consumes `</value>`.
//! - `decode_typed` is entered after `<tag>` and consumes `</tag>`.
//!
//! Aggregates are not decoded by recursion. Each open `<value>`, `<array>`,
//! `<struct>` or `<fault>` is a `Frame` on an explicit stack, so nesting
//! depth is bounded by memory rather than by the thread's stack.
//!
//! Scalar text is trimmed before parsing; `<string>` and untyped `<value>`
//! text are kept verbatim.

use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use std::io::BufRead;

use crate::error::{Error, Result};
use crate::tokenizer::{Content, XmlTokenizer};
use crate::value::{Fault, Struct, Value};

/// An element whose closing tag has not been reached yet.
enum Frame {
    /// A `<value>` whose typed child is being decoded.
    Value,
    Array(Vec<Value>),
    /// Members so far, and the name of the member being decoded.
    Struct(Struct, String),
    Fault,
}

enum Step {
    /// A `<value>` start tag was consumed; its body comes next.
    Enter,
    /// The innermost open element closed with this value.
    Done(Value),
}

/// Decode the body of a `<value>` element whose start tag was consumed.
///
/// A `<value>` with no type element is a string, per the XML-RPC grammar.
pub fn decode_value<R: BufRead>(tokens: &mut XmlTokenizer<R>) -> Result<Value> {
    let mut open = Vec::new();
    let step = open_value(tokens, &mut open)?;
    run(tokens, open, step)
}

/// Decode the element `<tag>` whose start tag was consumed.
pub fn decode_typed<R: BufRead>(tokens: &mut XmlTokenizer<R>, tag: &str) -> Result<Value> {
    let mut open = Vec::new();
    let step = open_typed(tokens, &mut open, tag)?;
    run(tokens, open, step)
}

/// Decode the body of a `<fault>` element whose start tag was consumed.
pub fn decode_fault<R: BufRead>(tokens: &mut XmlTokenizer<R>) -> Result<Fault> {
    tokens.expect_start("value")?;
    let value = decode_value(tokens)?;
    tokens.expect_end()?;
    fault_from_value(value)
}

fn run<R: BufRead>(
    tokens: &mut XmlTokenizer<R>,
    mut open: Vec<Frame>,
    mut step: Step,
) -> Result<Value> {
    loop {
        step = match step {
            Step::Enter => open_value(tokens, &mut open)?,
            Step::Done(value) => match open.pop() {
                None => return Ok(value),
                Some(frame) => close_child(tokens, &mut open, frame, value)?,
            },
        };
    }
}

fn open_value<R: BufRead>(tokens: &mut XmlTokenizer<R>, open: &mut Vec<Frame>) -> Result<Step> {
    match tokens.next_content()? {
        Content::Element(tag) => {
            open.push(Frame::Value);
            open_typed(tokens, open, &tag)
        }
        Content::Text(text) => Ok(Step::Done(Value::String(text))),
    }
}

fn open_typed<R: BufRead>(
    tokens: &mut XmlTokenizer<R>,
    open: &mut Vec<Frame>,
    tag: &str,
) -> Result<Step> {
    match tag {
        "array" => {
            tokens.expect_start("data")?;
            next_item(tokens, open, Vec::new())
        }
        "struct" => next_member(tokens, open, Struct::new()),
        "fault" => {
            tokens.expect_start("value")?;
            open.push(Frame::Fault);
            Ok(Step::Enter)
        }
        scalar => decode_scalar(tokens, scalar).map(Step::Done),
    }
}

/// Hand a finished child to the frame that was waiting for it.
fn close_child<R: BufRead>(
    tokens: &mut XmlTokenizer<R>,
    open: &mut Vec<Frame>,
    frame: Frame,
    value: Value,
) -> Result<Step> {
    match frame {
        Frame::Value => {
            tokens.expect_end()?;
            Ok(Step::Done(value))
        }
        Frame::Array(mut items) => {
            items.push(value);
            next_item(tokens, open, items)
        }
        Frame::Struct(mut members, name) => {
            tokens.expect_end()?;
            // duplicate names: last write wins
            members.insert(name, value);
            next_member(tokens, open, members)
        }
        Frame::Fault => {
            tokens.expect_end()?;
            Err(Error::RemoteFault(fault_from_value(value)?))
        }
    }
}

fn next_item<R: BufRead>(
    tokens: &mut XmlTokenizer<R>,
    open: &mut Vec<Frame>,
    items: Vec<Value>,
) -> Result<Step> {
    match tokens.next_start()? {
        Some(tag) if tag == "value" => {
            open.push(Frame::Array(items));
            Ok(Step::Enter)
        }
        Some(tag) => Err(Error::MalformedStructure(format!(
            "expected <value> in array data, found <{tag}>"
        ))),
        None => {
            tokens.expect_end()?;
            Ok(Step::Done(Value::Array(items)))
        }
    }
}

fn next_member<R: BufRead>(
    tokens: &mut XmlTokenizer<R>,
    open: &mut Vec<Frame>,
    members: Struct,
) -> Result<Step> {
    match tokens.next_start()? {
        Some(tag) if tag == "member" => {}
        Some(tag) => return Err(Error::MalformedStruct(format!("expected <member>, found <{tag}>"))),
        None => return Ok(Step::Done(Value::Struct(members))),
    }
    match tokens.next_start()? {
        Some(tag) if tag == "name" => {}
        _ => return Err(Error::MalformedStruct("member without <name>".to_string())),
    }
    let name = tokens.read_text()?;
    match tokens.next_start()? {
        Some(tag) if tag == "value" => {}
        _ => {
            return Err(Error::MalformedStruct(format!(
                "member {name:?} without <value>"
            )))
        }
    }
    open.push(Frame::Struct(members, name));
    Ok(Step::Enter)
}

fn fault_from_value(value: Value) -> Result<Fault> {
    match value {
        Value::Struct(members) => Ok(Fault::from_struct(&members)),
        other => Err(Error::MalformedStructure(format!(
            "fault must carry a struct, found {}",
            other.kind()
        ))),
    }
}

/// Decode a text-bearing element and consume its end tag.
fn decode_scalar<R: BufRead>(tokens: &mut XmlTokenizer<R>, tag: &str) -> Result<Value> {
    match tag {
        "string" => Ok(Value::String(tokens.read_text()?)),
        "boolean" => {
            let text = tokens.read_text()?;
            let parsed = match text.trim() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            };
            parsed.map(Value::Bool).ok_or(Error::InvalidBoolean(text))
        }
        "int" | "i1" | "i2" | "i4" | "i8" => {
            let text = tokens.read_text()?;
            text.trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| Error::InvalidInteger(text))
        }
        "double" => {
            let text = tokens.read_text()?;
            // XML-RPC has no spelling for NaN or infinities
            match text.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Double(f)),
                _ => Err(Error::InvalidFloat(text)),
            }
        }
        "dateTime.iso8601" => {
            let text = tokens.read_text()?;
            parse_datetime(text.trim())
                .map(Value::DateTime)
                .ok_or(Error::InvalidDateTime(text))
        }
        "base64" => {
            let text = tokens.read_text()?;
            let compact: String = text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact.trim())
                .map(Value::Bytes)
                .map_err(|e| Error::InvalidBase64(e.to_string()))
        }
        "nil" => {
            let text = tokens.read_text()?;
            if text.trim().is_empty() {
                Ok(Value::Nil)
            } else {
                Err(Error::MalformedStructure(format!("<nil> must be empty, found {text:?}")))
            }
        }
        other => Err(Error::UnsupportedType(format!("<{other}>"))),
    }
}

/// Accepted layouts, tried in order: compact ISO basic, extended ISO with a
/// UTC offset, extended ISO without one. Offset-less times are taken as UTC.
fn parse_datetime(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y%m%dT%H:%M:%S") {
        return Some(naive.and_utc().fixed_offset());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%:z") {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Decode a standalone typed element such as `<int>1</int>`, the form the
/// encoder produces.
pub fn from_slice(xml: &[u8]) -> Result<Value> {
    let mut tokens = XmlTokenizer::from_bytes(xml);
    match tokens.next_start()? {
        Some(tag) if tag == "value" => decode_value(&mut tokens),
        Some(tag) => decode_typed(&mut tokens, &tag),
        None => Err(Error::MalformedStructure("expected a value element".to_string())),
    }
}

pub fn from_str(xml: &str) -> Result<Value> {
    from_slice(xml.as_bytes())
}
