//! Route and Record-Route headers (RFC 3261 §20.30, §20.34): an ordered
//! list of URIs a request must, or did, traverse.

use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::types::uri::Uri;

/// One entry in a Route or Record-Route header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub display_name: Option<String>,
    pub uri: Uri,
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            write!(f, "\"{}\" ", name)?;
        }
        write!(f, "<{}>", self.uri)
    }
}

/// An ordered set of Route/Record-Route entries. Order matters: the
/// first entry is the next hop a request must be sent to when a Route
/// set is present (spec §4.4's outbound routing rule).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteSet(pub Vec<RouteEntry>);

impl RouteSet {
    pub fn first(&self) -> Option<&RouteEntry> {
        self.0.first()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RouteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl FromStr for RouteSet {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        crate::parser::headers::parse_route_set(s)
    }
}
