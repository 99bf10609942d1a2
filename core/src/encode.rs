//! XML-RPC encoder for `Value` and native Rust types.
//!
//! # Design
//! Anything that can appear as an argument implements `Encodable`, which
//! appends the typed markup (`<int>1</int>`, `<struct>…</struct>`) to a
//! `String` sink. The `<value>` wrapper is written by the enclosing
//! aggregate or by the message framer, never by the value itself.
//!
//! Record types implement `Encodable` by hand with `StructEncoder`:
//!
//! ```
//! use xmlrpc_core::encode::{Encodable, StructEncoder};
//!
//! struct Point { x: i32, y: i32 }
//!
//! impl Encodable for Point {
//!     fn encode(&self, out: &mut String) -> xmlrpc_core::Result<()> {
//!         StructEncoder::new(out).member("x", &self.x)?.member("y", &self.y)?.finish();
//!         Ok(())
//!     }
//! }
//! ```

use base64::Engine;
use chrono::{DateTime, FixedOffset, Offset, TimeZone};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::value::{Fault, Value};

/// A value with an XML-RPC representation.
pub trait Encodable {
    /// Append the typed markup for `self` to `out`.
    fn encode(&self, out: &mut String) -> Result<()>;
}

/// Encode a single value to its typed markup.
pub fn to_string(value: &dyn Encodable) -> Result<String> {
    let mut out = String::new();
    value.encode(&mut out)?;
    Ok(out)
}

/// Append `s` with the five XML special characters entity-escaped.
pub fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// Bare escaped text, used where the type tag is structurally redundant
/// (member names, method names).
pub fn write_untyped(out: &mut String, s: &str) {
    escape_into(out, s);
}

pub fn write_string(out: &mut String, s: &str, typed: bool) {
    if typed {
        out.push_str("<string>");
        escape_into(out, s);
        out.push_str("</string>");
    } else {
        write_untyped(out, s);
    }
}

fn write_int(out: &mut String, i: i64) {
    out.push_str("<int>");
    out.push_str(&i.to_string());
    out.push_str("</int>");
}

fn write_double(out: &mut String, f: f64) -> Result<()> {
    if !f.is_finite() {
        return Err(Error::UnsupportedType(format!("non-finite double {f}")));
    }
    out.push_str("<double>");
    // Display for f64 is the shortest text that parses back to the same value
    out.push_str(&f.to_string());
    out.push_str("</double>");
    Ok(())
}

fn write_datetime(out: &mut String, dt: &DateTime<FixedOffset>) {
    out.push_str("<dateTime.iso8601>");
    if dt.offset().local_minus_utc() == 0 {
        out.push_str(&dt.format("%Y%m%dT%H:%M:%S").to_string());
    } else {
        out.push_str(&dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string());
    }
    out.push_str("</dateTime.iso8601>");
}

fn write_bytes(out: &mut String, bytes: &[u8]) {
    out.push_str("<base64>");
    out.push_str(&base64::engine::general_purpose::STANDARD.encode(bytes));
    out.push_str("</base64>");
}

/// Write `<array><data>` with each item wrapped in `<value>`.
pub fn write_array<'a, T, I>(out: &mut String, items: I) -> Result<()>
where
    T: Encodable + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    out.push_str("<array><data>");
    for item in items {
        out.push_str("<value>");
        item.encode(out)?;
        out.push_str("</value>");
    }
    out.push_str("</data></array>");
    Ok(())
}

/// Write a `<struct>` from name/value pairs, in iteration order.
pub fn write_struct<'a, K, V, I>(out: &mut String, members: I) -> Result<()>
where
    K: AsRef<str> + ?Sized + 'a,
    V: Encodable + ?Sized + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut encoder = StructEncoder::new(out);
    for (name, value) in members {
        encoder.member(name.as_ref(), value)?;
    }
    encoder.finish();
    Ok(())
}

/// Incremental `<struct>` writer for record-like types.
///
/// Every member is written in typed form.
pub struct StructEncoder<'a> {
    out: &'a mut String,
}

impl<'a> StructEncoder<'a> {
    pub fn new(out: &'a mut String) -> Self {
        out.push_str("<struct>");
        Self { out }
    }

    pub fn member<V: Encodable + ?Sized>(&mut self, name: &str, value: &V) -> Result<&mut Self> {
        self.out.push_str("<member><name>");
        write_untyped(self.out, name);
        self.out.push_str("</name><value>");
        value.encode(self.out)?;
        self.out.push_str("</value></member>");
        Ok(self)
    }

    pub fn finish(&mut self) {
        self.out.push_str("</struct>");
    }
}

impl Encodable for Value {
    fn encode(&self, out: &mut String) -> Result<()> {
        match self {
            Value::Nil => out.push_str("<nil/>"),
            Value::Bool(b) => b.encode(out)?,
            Value::Int(i) => write_int(out, *i),
            Value::Double(f) => write_double(out, *f)?,
            Value::String(s) => write_string(out, s, true),
            Value::DateTime(dt) => write_datetime(out, dt),
            Value::Bytes(bytes) => write_bytes(out, bytes),
            Value::Array(items) => write_array(out, items)?,
            Value::Struct(members) => write_struct(out, members)?,
        }
        Ok(())
    }
}

impl Encodable for Fault {
    fn encode(&self, out: &mut String) -> Result<()> {
        write_struct(out, &self.to_struct())
    }
}

impl Encodable for bool {
    fn encode(&self, out: &mut String) -> Result<()> {
        out.push_str(if *self { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" });
        Ok(())
    }
}

macro_rules! encode_lossless_int {
    ($($t:ty),*) => {$(
        impl Encodable for $t {
            fn encode(&self, out: &mut String) -> Result<()> {
                write_int(out, i64::from(*self));
                Ok(())
            }
        }
    )*};
}

encode_lossless_int!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! encode_wide_int {
    ($($t:ty),*) => {$(
        impl Encodable for $t {
            fn encode(&self, out: &mut String) -> Result<()> {
                let i = i64::try_from(*self).map_err(|_| {
                    Error::UnsupportedType(format!("integer {} does not fit in a 64-bit XML-RPC int", self))
                })?;
                write_int(out, i);
                Ok(())
            }
        }
    )*};
}

encode_wide_int!(u64, usize, isize, i128, u128);

impl Encodable for f64 {
    fn encode(&self, out: &mut String) -> Result<()> {
        write_double(out, *self)
    }
}

impl Encodable for f32 {
    fn encode(&self, out: &mut String) -> Result<()> {
        write_double(out, f64::from(*self))
    }
}

impl Encodable for str {
    fn encode(&self, out: &mut String) -> Result<()> {
        write_string(out, self, true);
        Ok(())
    }
}

impl Encodable for String {
    fn encode(&self, out: &mut String) -> Result<()> {
        self.as_str().encode(out)
    }
}

impl<Tz: TimeZone> Encodable for DateTime<Tz> {
    fn encode(&self, out: &mut String) -> Result<()> {
        let offset = self.offset().fix();
        write_datetime(out, &self.with_timezone(&offset));
        Ok(())
    }
}

impl<T: Encodable> Encodable for Option<T> {
    fn encode(&self, out: &mut String) -> Result<()> {
        match self {
            Some(value) => value.encode(out),
            None => {
                out.push_str("<nil/>");
                Ok(())
            }
        }
    }
}

/// Sequences encode as arrays. Use `Value::Bytes` for `<base64>`; a
/// `Vec<u8>` is an array of ints.
impl<T: Encodable> Encodable for [T] {
    fn encode(&self, out: &mut String) -> Result<()> {
        write_array(out, self)
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, out: &mut String) -> Result<()> {
        write_array(out, self)
    }
}

impl<K: AsRef<str>, V: Encodable> Encodable for BTreeMap<K, V> {
    fn encode(&self, out: &mut String) -> Result<()> {
        write_struct(out, self)
    }
}

impl<K: AsRef<str>, V: Encodable, S> Encodable for IndexMap<K, V, S> {
    fn encode(&self, out: &mut String) -> Result<()> {
        write_struct(out, self)
    }
}

/// Members are written in name order so output is stable.
impl<K: AsRef<str>, V: Encodable, S> Encodable for HashMap<K, V, S> {
    fn encode(&self, out: &mut String) -> Result<()> {
        let mut members: Vec<(&K, &V)> = self.iter().collect();
        members.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));
        write_struct(out, members)
    }
}

impl<T: Encodable + ?Sized> Encodable for &T {
    fn encode(&self, out: &mut String) -> Result<()> {
        (**self).encode(out)
    }
}
