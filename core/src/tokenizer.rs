//! Start/end/text view over a streaming XML parser.
//!
//! # Design
//! The XML-RPC grammar is driven by two fail-able primitives: "advance to
//! the next start tag" and "consume the next end tag". Everything else the
//! parser reports (declarations, comments, processing instructions,
//! whitespace between elements) is skipped here so the decoder never sees it.
//!
//! Empty elements are expanded into a start/end pair, so `<nil/>` and
//! `<value/>` look exactly like `<nil></nil>` and `<value></value>`.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};

enum Token {
    Start(String),
    End,
    Text(String),
    Eof,
}

/// What a `<value>` element contains once its start tag is consumed.
pub enum Content {
    /// A typed child element; its start tag has been consumed.
    Element(String),
    /// No child element. The enclosing end tag has been consumed.
    Text(String),
}

pub struct XmlTokenizer<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl<'a> XmlTokenizer<&'a [u8]> {
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

impl<R: BufRead> XmlTokenizer<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().expand_empty_elements = true;
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        loop {
            self.buf.clear();
            let token = match self.reader.read_event_into(&mut self.buf).map_err(xml_error)? {
                Event::Start(start) => {
                    let name = start.name();
                    let local = std::str::from_utf8(name.local_name().as_ref())
                        .map_err(xml_error)?
                        .to_string();
                    Token::Start(local)
                }
                Event::End(_) => Token::End,
                Event::Text(text) => Token::Text(text.unescape().map_err(xml_error)?.into_owned()),
                Event::CData(data) => {
                    Token::Text(String::from_utf8(data.into_inner().into_owned()).map_err(xml_error)?)
                }
                Event::Eof => Token::Eof,
                // declarations, comments, PIs, doctype
                _ => continue,
            };
            return Ok(token);
        }
    }

    /// Advance to the next start tag.
    ///
    /// Returns `None` when an end tag comes first; that end tag is consumed.
    /// This is how struct and array loops detect their own end.
    pub fn next_start(&mut self) -> Result<Option<String>> {
        loop {
            match self.next_token()? {
                Token::Start(name) => return Ok(Some(name)),
                Token::End => return Ok(None),
                Token::Text(chunk) => blank(&chunk)?,
                Token::Eof => return Err(truncated()),
            }
        }
    }

    /// Advance to the next start tag and require it to be `<name>`.
    pub fn expect_start(&mut self, name: &str) -> Result<()> {
        match self.next_start()? {
            Some(found) if found == name => Ok(()),
            Some(found) => Err(Error::MalformedStructure(format!(
                "expected <{name}>, found <{found}>"
            ))),
            None => Err(Error::MalformedStructure(format!(
                "expected <{name}>, found an end tag"
            ))),
        }
    }

    /// Consume the next end tag. A start tag or non-blank text in the way is
    /// an error.
    pub fn expect_end(&mut self) -> Result<()> {
        loop {
            match self.next_token()? {
                Token::End => return Ok(()),
                Token::Text(chunk) => blank(&chunk)?,
                Token::Start(found) => {
                    return Err(Error::MalformedStructure(format!(
                        "expected an end tag, found <{found}>"
                    )))
                }
                Token::Eof => return Err(truncated()),
            }
        }
    }

    /// Collect character data up to and including the next end tag.
    pub fn read_text(&mut self) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.next_token()? {
                Token::Text(chunk) => text.push_str(&chunk),
                Token::End => return Ok(text),
                Token::Start(found) => {
                    return Err(Error::MalformedStructure(format!(
                        "unexpected <{found}> inside character data"
                    )))
                }
                Token::Eof => return Err(truncated()),
            }
        }
    }

    /// Read the body of an element that holds either one child element or
    /// bare text, such as `<value>`. Text beside a child element must be
    /// whitespace.
    pub fn next_content(&mut self) -> Result<Content> {
        let mut text = String::new();
        loop {
            match self.next_token()? {
                Token::Start(name) => {
                    blank(&text)?;
                    return Ok(Content::Element(name));
                }
                Token::Text(chunk) => text.push_str(&chunk),
                Token::End => return Ok(Content::Text(text)),
                Token::Eof => return Err(truncated()),
            }
        }
    }
}

/// Only whitespace may sit between elements.
fn blank(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        Ok(())
    } else {
        Err(Error::MalformedStructure(format!(
            "unexpected text {:?} between elements",
            text.trim()
        )))
    }
}

fn truncated() -> Error {
    Error::MalformedStructure("unexpected end of document".to_string())
}

fn xml_error(e: impl std::fmt::Display) -> Error {
    Error::MalformedStructure(e.to_string())
}
