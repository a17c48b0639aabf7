//! SIP URIs (RFC 3261 §19.1): `scheme:user@host:port;params?headers`.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::param::Param;

/// A URI scheme this stack understands on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Sip,
    Sips,
    Ws,
    Wss,
}

impl Scheme {
    /// The scheme's wire token, e.g. `"sips"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Sip => "sip",
            Scheme::Sips => "sips",
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }

    /// Whether this scheme implies a secure transport (TLS/WSS).
    pub fn is_secure(&self) -> bool {
        matches!(self, Scheme::Sips | Scheme::Wss)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sip" => Ok(Scheme::Sip),
            "sips" => Ok(Scheme::Sips),
            "ws" => Ok(Scheme::Ws),
            "wss" => Ok(Scheme::Wss),
            other => Err(Error::UnsupportedScheme(other.to_string())),
        }
    }
}

/// The host part of a URI: a domain name or a literal IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Host {
    Domain(String),
    Address(IpAddr),
}

impl Host {
    pub fn domain(domain: impl Into<String>) -> Self {
        Host::Domain(domain.into())
    }

    pub fn address(addr: IpAddr) -> Self {
        Host::Address(addr)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Domain(d) => write!(f, "{}", d),
            Host::Address(IpAddr::V4(v4)) => write!(f, "{}", v4),
            Host::Address(IpAddr::V6(v6)) => write!(f, "[{}]", v6),
        }
    }
}

impl FromStr for Host {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(addr) = s.parse::<IpAddr>() {
            return Ok(Host::Address(addr));
        }
        if let Some(inner) = s.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            return inner
                .parse::<Ipv6Addr>()
                .map(|a| Host::Address(IpAddr::V6(a)))
                .map_err(|_| Error::InvalidUri(format!("malformed IPv6 host: {}", s)));
        }
        if s.is_empty() {
            return Err(Error::InvalidUri("empty host".to_string()));
        }
        Ok(Host::Domain(s.to_string()))
    }
}

impl From<Ipv4Addr> for Host {
    fn from(addr: Ipv4Addr) -> Self {
        Host::Address(IpAddr::V4(addr))
    }
}

/// A parsed SIP/SIPS/WS/WSS URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    pub scheme: Scheme,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Host,
    pub port: Option<u16>,
    pub parameters: Vec<Param>,
    pub headers: BTreeMap<String, String>,
}

impl Uri {
    /// Construct a minimal URI with just a scheme and host.
    pub fn new(scheme: Scheme, host: Host) -> Self {
        Uri {
            scheme,
            user: None,
            password: None,
            host,
            port: None,
            parameters: Vec::new(),
            headers: BTreeMap::new(),
        }
    }

    pub fn sip(host: impl Into<String>) -> Self {
        Self::new(Scheme::Sip, Host::domain(host))
    }

    pub fn sips(host: impl Into<String>) -> Self {
        Self::new(Scheme::Sips, Host::domain(host))
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_parameter(mut self, param: Param) -> Self {
        self.parameters.push(param);
        self
    }

    /// The `transport` URI parameter, if present (used to select a channel
    /// per spec §4.4's outbound routing rule).
    pub fn transport(&self) -> Option<&str> {
        self.parameters.iter().find_map(|p| match p {
            Param::Transport(t) => Some(t.as_str()),
            _ => None,
        })
    }

    /// True if the `lr` (loose routing) flag parameter is present.
    pub fn is_loose_routing(&self) -> bool {
        self.parameters.iter().any(|p| matches!(p, Param::Lr))
    }

    /// Host and, if present and nonzero, port, formatted as `host[:port]`.
    pub fn host_port(&self) -> String {
        match self.port {
            Some(port) if port > 0 => format!("{}:{}", self.host, port),
            _ => self.host.to_string(),
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}", user)?;
            if let Some(pw) = &self.password {
                write!(f, ":{}", pw)?;
            }
            write!(f, "@")?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        for param in &self.parameters {
            write!(f, ";{}", param)?;
        }
        if !self.headers.is_empty() {
            write!(f, "?")?;
            for (i, (k, v)) in self.headers.iter().enumerate() {
                if i > 0 {
                    write!(f, "&")?;
                }
                write!(f, "{}={}", k, v)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        crate::parser::uri::parse_uri_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_ipv6_with_brackets() {
        let uri = Uri::new(Scheme::Sip, Host::Address("::1".parse().unwrap())).with_port(5060);
        assert_eq!(uri.to_string(), "sip:[::1]:5060");
    }

    #[test]
    fn transport_param_is_discoverable() {
        let uri = Uri::sip("example.com").with_parameter(Param::transport("tcp"));
        assert_eq!(uri.transport(), Some("tcp"));
    }
}
