//! Typed representations for the headers the transaction and transport
//! layers inspect directly. Everything else stays an extension header
//! (see [`crate::types::header::TypedHeader::Extension`]).

pub mod token_list;

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::method::Method;
use crate::types::param::Param;
use crate::types::uri::Uri;

/// Call-ID (RFC 3261 §20.8): the globally unique identifier for a call leg.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallId(pub String);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// CSeq (RFC 3261 §20.16): a sequence number paired with the method it
/// was issued for, so retransmissions of the same request reuse it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CSeq {
    pub sequence: u32,
    pub method: Method,
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.sequence, self.method)
    }
}

impl FromStr for CSeq {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().splitn(2, char::is_whitespace);
        let sequence = parts
            .next()
            .ok_or_else(|| Error::invalid_header("CSeq", "missing sequence"))?
            .parse::<u32>()
            .map_err(|_| Error::invalid_header("CSeq", "non-numeric sequence"))?;
        let method = parts
            .next()
            .ok_or_else(|| Error::invalid_header("CSeq", "missing method"))?
            .trim()
            .parse::<Method>()?;
        Ok(CSeq { sequence, method })
    }
}

/// Content-Length (RFC 3261 §20.14), in octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLength(pub usize);

/// Content-Type (RFC 3261 §20.15), carried as its raw media-type token
/// since the transaction layer treats the body as an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType(pub String);

/// Max-Forwards (RFC 3261 §20.22). Modeled as `Option<u8>` at the
/// message level rather than a sentinel value (spec Open Question §8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxForwards(pub u8);

impl MaxForwards {
    /// The conventional default a UAC sets on an initial request.
    pub const DEFAULT: MaxForwards = MaxForwards(70);

    /// Decrement by one, if not already zero; proxies discard a
    /// request whose Max-Forwards reaches zero (not a concern this
    /// stack's transaction layer enforces, but a primitive it exposes).
    pub fn decremented(&self) -> Option<MaxForwards> {
        self.0.checked_sub(1).map(MaxForwards)
    }
}

/// Require (RFC 3261 §20.32): option tags the UAS must understand.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Require(pub Vec<String>);

impl fmt::Display for Require {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

impl Require {
    /// Whether the RFC 3262 reliable-provisional-responses tag is present.
    pub fn requires_100rel(&self) -> bool {
        self.0.iter().any(|t| t.eq_ignore_ascii_case("100rel"))
    }
}

/// Supported (RFC 3261 §20.37): option tags the UA supports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Supported(pub Vec<String>);

impl fmt::Display for Supported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

impl Supported {
    pub fn supports_100rel(&self) -> bool {
        self.0.iter().any(|t| t.eq_ignore_ascii_case("100rel"))
    }
}

/// Unsupported (RFC 3261 §20.40): option tags the UAS rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Unsupported(pub Vec<String>);

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

/// RSeq (RFC 3262 §7.1): sequence number on a reliable provisional response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RSeq(pub u32);

/// RAck (RFC 3262 §7.2): acknowledges an RSeq, echoing the CSeq it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RAck {
    pub rseq: u32,
    pub cseq: u32,
    pub method: Method,
}

impl FromStr for RAck {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split_whitespace();
        let rseq = parts
            .next()
            .ok_or_else(|| Error::invalid_header("RAck", "missing rseq"))?
            .parse::<u32>()
            .map_err(|_| Error::invalid_header("RAck", "non-numeric rseq"))?;
        let cseq = parts
            .next()
            .ok_or_else(|| Error::invalid_header("RAck", "missing cseq"))?
            .parse::<u32>()
            .map_err(|_| Error::invalid_header("RAck", "non-numeric cseq"))?;
        let method = parts
            .next()
            .ok_or_else(|| Error::invalid_header("RAck", "missing method"))?
            .parse::<Method>()?;
        Ok(RAck { rseq, cseq, method })
    }
}

/// Contact (RFC 3261 §20.10): a URI the UA can be reached at directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub uri: Uri,
    pub display_name: Option<String>,
    pub params: Vec<Param>,
}

impl Contact {
    pub fn new(uri: Uri) -> Self {
        Contact { uri, display_name: None, params: Vec::new() }
    }

    pub fn expires(&self) -> Option<u32> {
        self.params.iter().find_map(|p| match p {
            Param::Expires(e) => Some(*e),
            _ => None,
        })
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            write!(f, "\"{}\" ", name)?;
        }
        write!(f, "<{}>", self.uri)?;
        for param in &self.params {
            write!(f, ";{}", param)?;
        }
        Ok(())
    }
}

impl FromStr for Contact {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        crate::parser::headers::parse_contact(s)
    }
}
