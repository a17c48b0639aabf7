//! Generic header representation: a [`HeaderName`] and its raw text value.
//!
//! Parsing promotes the handful of headers the transaction/transport
//! layers actually inspect (Via, To, From, CSeq, Call-ID, Contact,
//! Route/Record-Route, Content-Length, Content-Type, Max-Forwards,
//! Require/Supported/Unsupported, RSeq/RAck) into [`TypedHeader`]
//! variants; everything else stays an extension header with its literal
//! value preserved verbatim, per spec §4.1.

use std::fmt;
use std::str::FromStr;

use crate::types::headers::{CallId, Contact, ContentLength, ContentType, CSeq, MaxForwards, RAck, Require, RSeq, Supported, Unsupported};
use crate::types::to_from::{From as FromHeader, To};
use crate::types::route::RouteSet;
use crate::types::via::Via;

/// A SIP header name, case-insensitively matched against compact forms
/// during parsing but displayed in its canonical long form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderName {
    Via,
    To,
    From,
    CallId,
    CSeq,
    Contact,
    Route,
    RecordRoute,
    ContentLength,
    ContentType,
    MaxForwards,
    Require,
    Supported,
    Unsupported,
    RSeq,
    RAck,
    /// Any header not recognized above, preserving its original casing.
    Other(String),
}

impl HeaderName {
    /// The canonical long-form name, e.g. `"Call-ID"`.
    pub fn as_str(&self) -> &str {
        match self {
            HeaderName::Via => "Via",
            HeaderName::To => "To",
            HeaderName::From => "From",
            HeaderName::CallId => "Call-ID",
            HeaderName::CSeq => "CSeq",
            HeaderName::Contact => "Contact",
            HeaderName::Route => "Route",
            HeaderName::RecordRoute => "Record-Route",
            HeaderName::ContentLength => "Content-Length",
            HeaderName::ContentType => "Content-Type",
            HeaderName::MaxForwards => "Max-Forwards",
            HeaderName::Require => "Require",
            HeaderName::Supported => "Supported",
            HeaderName::Unsupported => "Unsupported",
            HeaderName::RSeq => "RSeq",
            HeaderName::RAck => "RAck",
            HeaderName::Other(name) => name,
        }
    }

    /// Parse a header name token, recognizing both long and compact
    /// forms case-insensitively (`l` for Content-Length, `v`/`t`/`f`/`i`/
    /// `m`/`k` for Via/To/From/Call-ID/Contact/Supported, and `e`/`s` for
    /// Content-Encoding/Subject, which stay extension headers under their
    /// canonical long name rather than being promoted to typed variants).
    pub fn parse(token: &str) -> HeaderName {
        match token.to_ascii_lowercase().as_str() {
            "via" | "v" => HeaderName::Via,
            "to" | "t" => HeaderName::To,
            "from" | "f" => HeaderName::From,
            "call-id" | "i" => HeaderName::CallId,
            "cseq" => HeaderName::CSeq,
            "contact" | "m" => HeaderName::Contact,
            "route" => HeaderName::Route,
            "record-route" => HeaderName::RecordRoute,
            "content-length" | "l" => HeaderName::ContentLength,
            "content-type" | "c" => HeaderName::ContentType,
            "max-forwards" => HeaderName::MaxForwards,
            "require" => HeaderName::Require,
            "supported" | "k" => HeaderName::Supported,
            "unsupported" => HeaderName::Unsupported,
            "rseq" => HeaderName::RSeq,
            "rack" => HeaderName::RAck,
            "content-encoding" | "e" => HeaderName::Other("Content-Encoding".to_string()),
            "subject" | "s" => HeaderName::Other("Subject".to_string()),
            _ => HeaderName::Other(token.to_string()),
        }
    }

    /// True for the headers whose values are comma-separated lists of
    /// logical entries (spec §4.1: Via, Route, Record-Route, Contact).
    pub fn is_comma_separated(&self) -> bool {
        matches!(
            self,
            HeaderName::Via | HeaderName::Route | HeaderName::RecordRoute | HeaderName::Contact
        )
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A header as carried in a message: either one of the well-known typed
/// values, or an opaque extension header with its literal text.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedHeader {
    Via(Via),
    To(To),
    From(FromHeader),
    CallId(CallId),
    CSeq(CSeq),
    Contact(Vec<Contact>),
    Route(RouteSet),
    RecordRoute(RouteSet),
    ContentLength(ContentLength),
    ContentType(ContentType),
    MaxForwards(MaxForwards),
    Require(Require),
    Supported(Supported),
    Unsupported(Unsupported),
    RSeq(RSeq),
    RAck(RAck),
    /// An extension header: original name as seen on the wire, raw value.
    Extension(String, String),
}

impl TypedHeader {
    /// The [`HeaderName`] this header value corresponds to.
    pub fn name(&self) -> HeaderName {
        match self {
            TypedHeader::Via(_) => HeaderName::Via,
            TypedHeader::To(_) => HeaderName::To,
            TypedHeader::From(_) => HeaderName::From,
            TypedHeader::CallId(_) => HeaderName::CallId,
            TypedHeader::CSeq(_) => HeaderName::CSeq,
            TypedHeader::Contact(_) => HeaderName::Contact,
            TypedHeader::Route(_) => HeaderName::Route,
            TypedHeader::RecordRoute(_) => HeaderName::RecordRoute,
            TypedHeader::ContentLength(_) => HeaderName::ContentLength,
            TypedHeader::ContentType(_) => HeaderName::ContentType,
            TypedHeader::MaxForwards(_) => HeaderName::MaxForwards,
            TypedHeader::Require(_) => HeaderName::Require,
            TypedHeader::Supported(_) => HeaderName::Supported,
            TypedHeader::Unsupported(_) => HeaderName::Unsupported,
            TypedHeader::RSeq(_) => HeaderName::RSeq,
            TypedHeader::RAck(_) => HeaderName::RAck,
            TypedHeader::Extension(name, _) => HeaderName::Other(name.clone()),
        }
    }
}

impl fmt::Display for TypedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedHeader::Via(v) => write!(f, "{}: {}", HeaderName::Via, v),
            TypedHeader::To(v) => write!(f, "{}: {}", HeaderName::To, v),
            TypedHeader::From(v) => write!(f, "{}: {}", HeaderName::From, v),
            TypedHeader::CallId(v) => write!(f, "{}: {}", HeaderName::CallId, v),
            TypedHeader::CSeq(v) => write!(f, "{}: {}", HeaderName::CSeq, v),
            TypedHeader::Contact(v) => {
                let joined: Vec<String> = v.iter().map(|c| c.to_string()).collect();
                write!(f, "{}: {}", HeaderName::Contact, joined.join(", "))
            }
            TypedHeader::Route(v) => write!(f, "{}: {}", HeaderName::Route, v),
            TypedHeader::RecordRoute(v) => write!(f, "{}: {}", HeaderName::RecordRoute, v),
            TypedHeader::ContentLength(v) => write!(f, "{}: {}", HeaderName::ContentLength, v.0),
            TypedHeader::ContentType(v) => write!(f, "{}: {}", HeaderName::ContentType, v.0),
            TypedHeader::MaxForwards(v) => write!(f, "{}: {}", HeaderName::MaxForwards, v.0),
            TypedHeader::Require(v) => write!(f, "{}: {}", HeaderName::Require, v),
            TypedHeader::Supported(v) => write!(f, "{}: {}", HeaderName::Supported, v),
            TypedHeader::Unsupported(v) => write!(f, "{}: {}", HeaderName::Unsupported, v),
            TypedHeader::RSeq(v) => write!(f, "{}: {}", HeaderName::RSeq, v.0),
            TypedHeader::RAck(v) => write!(f, "{}: {} {} {}", HeaderName::RAck, v.rseq, v.cseq, v.method),
            TypedHeader::Extension(name, value) => write!(f, "{}: {}", name, value),
        }
    }
}

/// Parses a single logical entry for the given header name (post comma
/// split for the headers where that applies). Used by [`crate::parser`].
pub fn parse_typed_header(name: &HeaderName, value: &str) -> TypedHeader {
    use crate::types::headers::token_list::parse_token_list;
    match name {
        HeaderName::ContentLength => value
            .trim()
            .parse::<usize>()
            .map(ContentLength)
            .map(TypedHeader::ContentLength)
            .unwrap_or_else(|_| TypedHeader::Extension(name.as_str().to_string(), value.to_string())),
        HeaderName::ContentType => TypedHeader::ContentType(ContentType(value.trim().to_string())),
        HeaderName::MaxForwards => value
            .trim()
            .parse::<u8>()
            .map(MaxForwards)
            .map(TypedHeader::MaxForwards)
            .unwrap_or_else(|_| TypedHeader::Extension(name.as_str().to_string(), value.to_string())),
        HeaderName::Require => TypedHeader::Require(Require(parse_token_list(value))),
        HeaderName::Supported => TypedHeader::Supported(Supported(parse_token_list(value))),
        HeaderName::Unsupported => TypedHeader::Unsupported(Unsupported(parse_token_list(value))),
        HeaderName::RSeq => value
            .trim()
            .parse::<u32>()
            .map(RSeq)
            .map(TypedHeader::RSeq)
            .unwrap_or_else(|_| TypedHeader::Extension(name.as_str().to_string(), value.to_string())),
        HeaderName::RAck => RAck::from_str(value)
            .map(TypedHeader::RAck)
            .unwrap_or_else(|_| TypedHeader::Extension(name.as_str().to_string(), value.to_string())),
        HeaderName::CallId => TypedHeader::CallId(CallId(value.trim().to_string())),
        HeaderName::CSeq => CSeq::from_str(value)
            .map(TypedHeader::CSeq)
            .unwrap_or_else(|_| TypedHeader::Extension(name.as_str().to_string(), value.to_string())),
        HeaderName::Via => Via::from_str(value)
            .map(TypedHeader::Via)
            .unwrap_or_else(|_| TypedHeader::Extension(name.as_str().to_string(), value.to_string())),
        HeaderName::To => To::from_str(value)
            .map(TypedHeader::To)
            .unwrap_or_else(|_| TypedHeader::Extension(name.as_str().to_string(), value.to_string())),
        HeaderName::From => FromHeader::from_str(value)
            .map(TypedHeader::From)
            .unwrap_or_else(|_| TypedHeader::Extension(name.as_str().to_string(), value.to_string())),
        HeaderName::Contact => Contact::from_str(value)
            .map(|c| TypedHeader::Contact(vec![c]))
            .unwrap_or_else(|_| TypedHeader::Extension(name.as_str().to_string(), value.to_string())),
        HeaderName::Route => RouteSet::from_str(value)
            .map(TypedHeader::Route)
            .unwrap_or_else(|_| TypedHeader::Extension(name.as_str().to_string(), value.to_string())),
        HeaderName::RecordRoute => RouteSet::from_str(value)
            .map(TypedHeader::RecordRoute)
            .unwrap_or_else(|_| TypedHeader::Extension(name.as_str().to_string(), value.to_string())),
        HeaderName::Other(n) => TypedHeader::Extension(n.clone(), value.to_string()),
    }
}
