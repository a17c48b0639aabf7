//! To and From headers (RFC 3261 §20.39, §20.20): a display name, a URI,
//! and a `tag` parameter that together identify a dialog participant.

use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::types::param::Param;
use crate::types::uri::Uri;

/// Shared shape of To and From: they differ only in role, not structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAddr {
    pub display_name: Option<String>,
    pub uri: Uri,
    pub params: Vec<Param>,
}

impl NameAddr {
    pub fn new(uri: Uri) -> Self {
        NameAddr { display_name: None, uri, params: Vec::new() }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.params.push(Param::tag(tag));
        self
    }

    pub fn tag(&self) -> Option<&str> {
        self.params.iter().find_map(|p| match p {
            Param::Tag(v) => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.params.retain(|p| !matches!(p, Param::Tag(_)));
        self.params.push(Param::tag(tag));
    }
}

impl fmt::Display for NameAddr {
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

/// The To header: the logical recipient of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct To(pub NameAddr);

impl fmt::Display for To {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for To {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        crate::parser::headers::parse_name_addr(s).map(To)
    }
}

/// The From header: the initiator of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct From(pub NameAddr);

impl fmt::Display for From {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for From {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        crate::parser::headers::parse_name_addr(s).map(From)
    }
}
