//! The top-level SIP message types: [`Request`], [`Response`], and the
//! [`Message`] enum that wraps either.

use std::fmt;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::types::header::{HeaderName, TypedHeader};
use crate::types::headers::{CSeq, CallId, ContentLength, MaxForwards};
use crate::types::method::Method;
use crate::types::status::StatusCode;
use crate::types::to_from::{From as FromHeader, To};
use crate::types::uri::Uri;
use crate::types::via::Via;

/// An ordered header block: insertion order is preserved, as the wire
/// format and RFC 3261's Via-ordering semantics both depend on it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Headers(pub Vec<TypedHeader>);

impl Headers {
    pub fn new() -> Self {
        Headers(Vec::new())
    }

    pub fn push(&mut self, header: TypedHeader) {
        self.0.push(header);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypedHeader> {
        self.0.iter()
    }

    /// First header matching `name`, following RFC 3261's rule that
    /// singleton headers are identified by their first occurrence.
    pub fn first(&self, name: &HeaderName) -> Option<&TypedHeader> {
        self.0.iter().find(|h| &h.name() == name)
    }

    pub fn all(&self, name: &HeaderName) -> impl Iterator<Item = &TypedHeader> {
        self.0.iter().filter(move |h| &h.name() == name)
    }

    pub fn via(&self) -> Option<&Via> {
        self.first(&HeaderName::Via).and_then(|h| match h {
            TypedHeader::Via(v) => Some(v),
            _ => None,
        })
    }

    pub fn to(&self) -> Option<&To> {
        self.first(&HeaderName::To).and_then(|h| match h {
            TypedHeader::To(v) => Some(v),
            _ => None,
        })
    }

    pub fn from(&self) -> Option<&FromHeader> {
        self.first(&HeaderName::From).and_then(|h| match h {
            TypedHeader::From(v) => Some(v),
            _ => None,
        })
    }

    pub fn call_id(&self) -> Option<&CallId> {
        self.first(&HeaderName::CallId).and_then(|h| match h {
            TypedHeader::CallId(v) => Some(v),
            _ => None,
        })
    }

    pub fn cseq(&self) -> Option<&CSeq> {
        self.first(&HeaderName::CSeq).and_then(|h| match h {
            TypedHeader::CSeq(v) => Some(v),
            _ => None,
        })
    }

    pub fn content_length(&self) -> Option<ContentLength> {
        self.first(&HeaderName::ContentLength).and_then(|h| match h {
            TypedHeader::ContentLength(v) => Some(*v),
            _ => None,
        })
    }

    pub fn max_forwards(&self) -> Option<MaxForwards> {
        self.first(&HeaderName::MaxForwards).and_then(|h| match h {
            TypedHeader::MaxForwards(v) => Some(*v),
            _ => None,
        })
    }
}

/// A SIP request: method, Request-URI, headers, and an opaque body.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: Headers,
    pub body: Bytes,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Request { method, uri, headers: Headers::new(), body: Bytes::new() }
    }

    /// The branch of the topmost Via entry, which together with the
    /// method identifies this request's transaction (spec §3).
    pub fn branch(&self) -> Option<&str> {
        self.headers.via().and_then(|v| v.branch())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} SIP/2.0\r\n", self.method, self.uri)?;
        for header in self.headers.iter() {
            write!(f, "{}\r\n", header)?;
        }
        write!(f, "\r\n")?;
        if !self.body.is_empty() {
            write!(f, "{}", String::from_utf8_lossy(&self.body))?;
        }
        Ok(())
    }
}

/// A SIP response: status, reason phrase, headers, and an opaque body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub reason: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        let reason = status.default_reason().unwrap_or("Unknown").to_string();
        Response { status, reason, headers: Headers::new(), body: Bytes::new() }
    }

    pub fn branch(&self) -> Option<&str> {
        self.headers.via().and_then(|v| v.branch())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIP/2.0 {} {}\r\n", self.status, self.reason)?;
        for header in self.headers.iter() {
            write!(f, "{}\r\n", header)?;
        }
        write!(f, "\r\n")?;
        if !self.body.is_empty() {
            write!(f, "{}", String::from_utf8_lossy(&self.body))?;
        }
        Ok(())
    }
}

/// Either side of a SIP exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn headers(&self) -> &Headers {
        match self {
            Message::Request(r) => &r.headers,
            Message::Response(r) => &r.headers,
        }
    }

    pub fn branch(&self) -> Option<&str> {
        match self {
            Message::Request(r) => r.branch(),
            Message::Response(r) => r.branch(),
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    /// The method this message pertains to: a request's own method, or
    /// a response's CSeq method (the two may legitimately differ only
    /// in the CANCEL case, which callers resolve via the transaction
    /// key rather than through this accessor).
    pub fn cseq_method(&self) -> Option<Method> {
        match self {
            Message::Request(r) => Some(r.method),
            Message::Response(r) => r.headers.cseq().map(|c| c.method),
        }
    }

    pub fn parse(input: &[u8]) -> Result<Message> {
        crate::parser::message::parse_message(input, crate::parser::ParseMode::default())
    }

    /// Canonical wire serialization. Not guaranteed byte-identical to
    /// whatever text this message was parsed from (header order and
    /// form are canonicalized), but re-parsing the result yields an
    /// equal `Message`.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_string().into_bytes())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Request(r) => r.fmt(f),
            Message::Response(r) => r.fmt(f),
        }
    }
}

impl TryFrom<&[u8]> for Message {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        Message::parse(value)
    }
}
