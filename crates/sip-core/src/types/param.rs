//! SIP parameters attached to URIs and header values (RFC 3261 §25.1).
//!
//! Parameters appear as `;name=value` or `;name` (a flag) after a URI or
//! a header's primary value. A handful of names are well-known enough to
//! warrant their own variant (`branch`, `tag`, `received`, ...); everything
//! else is carried in [`Param::Other`] without losing information.

use std::fmt;
use std::net::IpAddr;

/// A single SIP parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Param {
    /// `branch` — transaction identifier, conventionally prefixed `z9hG4bK`.
    Branch(String),
    /// `tag` — dialog-identifying tag on From/To.
    Tag(String),
    /// `received` — source IP a server observed a request arrive from.
    Received(IpAddr),
    /// `rport` — symmetric response routing port; `None` when used as a bare flag.
    Rport(Option<u16>),
    /// `maddr` — multicast address.
    Maddr(String),
    /// `ttl` — multicast time-to-live.
    Ttl(u8),
    /// `transport` — the transport a URI should be contacted over.
    Transport(String),
    /// `lr` — loose routing flag on Route/Record-Route URIs.
    Lr,
    /// `user` — user part type hint, e.g. `user=phone`.
    User(String),
    /// `expires` — registration/subscription lifetime in seconds.
    Expires(u32),
    /// Any other parameter, preserved verbatim.
    Other(String, Option<String>),
}

impl Param {
    /// Convenience constructor for a `branch` parameter.
    pub fn branch(value: impl Into<String>) -> Self {
        Param::Branch(value.into())
    }

    /// Convenience constructor for a `tag` parameter.
    pub fn tag(value: impl Into<String>) -> Self {
        Param::Tag(value.into())
    }

    /// Convenience constructor for a `transport` parameter.
    pub fn transport(value: impl Into<String>) -> Self {
        Param::Transport(value.into())
    }

    /// The parameter's name, lower-cased, regardless of variant.
    pub fn name(&self) -> &str {
        match self {
            Param::Branch(_) => "branch",
            Param::Tag(_) => "tag",
            Param::Received(_) => "received",
            Param::Rport(_) => "rport",
            Param::Maddr(_) => "maddr",
            Param::Ttl(_) => "ttl",
            Param::Transport(_) => "transport",
            Param::Lr => "lr",
            Param::User(_) => "user",
            Param::Expires(_) => "expires",
            Param::Other(name, _) => name,
        }
    }

    /// The parameter's value as a string, if it has one.
    pub fn value(&self) -> Option<String> {
        match self {
            Param::Branch(v) | Param::Tag(v) | Param::Maddr(v) | Param::Transport(v) | Param::User(v) => {
                Some(v.clone())
            }
            Param::Received(ip) => Some(ip.to_string()),
            Param::Rport(Some(p)) => Some(p.to_string()),
            Param::Rport(None) => None,
            Param::Ttl(t) => Some(t.to_string()),
            Param::Lr => None,
            Param::Expires(e) => Some(e.to_string()),
            Param::Other(_, v) => v.clone(),
        }
    }

    /// Build a typed parameter from a lower-cased name and optional value,
    /// falling back to [`Param::Other`] for anything not recognized.
    pub fn from_name_value(name: &str, value: Option<&str>) -> Param {
        match (name, value) {
            ("branch", Some(v)) => Param::Branch(v.to_string()),
            ("tag", Some(v)) => Param::Tag(v.to_string()),
            ("received", Some(v)) => match v.parse() {
                Ok(ip) => Param::Received(ip),
                Err(_) => Param::Other(name.to_string(), value.map(str::to_string)),
            },
            ("rport", Some(v)) => Param::Rport(v.parse().ok()),
            ("rport", None) => Param::Rport(None),
            ("maddr", Some(v)) => Param::Maddr(v.to_string()),
            ("ttl", Some(v)) => match v.parse() {
                Ok(t) => Param::Ttl(t),
                Err(_) => Param::Other(name.to_string(), value.map(str::to_string)),
            },
            ("transport", Some(v)) => Param::Transport(v.to_string()),
            ("lr", _) => Param::Lr,
            ("user", Some(v)) => Param::User(v.to_string()),
            ("expires", Some(v)) => match v.parse() {
                Ok(e) => Param::Expires(e),
                Err(_) => Param::Other(name.to_string(), value.map(str::to_string)),
            },
            _ => Param::Other(name.to_string(), value.map(str::to_string)),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Lr => write!(f, "lr"),
            Param::Rport(None) => write!(f, "rport"),
            Param::Other(name, None) => write!(f, "{}", name),
            _ => write!(f, "{}={}", self.name(), self.value().unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_params_have_no_value() {
        assert_eq!(Param::Lr.to_string(), "lr");
        assert_eq!(Param::Rport(None).to_string(), "rport");
    }

    #[test]
    fn from_name_value_recognizes_known_names() {
        assert_eq!(Param::from_name_value("branch", Some("z9hG4bK1")), Param::Branch("z9hG4bK1".into()));
        assert_eq!(Param::from_name_value("lr", None), Param::Lr);
        assert!(matches!(Param::from_name_value("x-custom", Some("v")), Param::Other(_, _)));
    }
}
