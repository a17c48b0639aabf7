//! The Via header (RFC 3261 §20.42): records the path a request has taken
//! and carries the transaction `branch`.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::Result;
use crate::types::param::Param;
use crate::types::uri::Host;

/// Protocol triple in a Via entry, e.g. `SIP/2.0/UDP`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentProtocol {
    pub name: String,
    pub version: String,
    pub transport: String,
}

impl fmt::Display for SentProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.name, self.version, self.transport)
    }
}

/// One Via header entry (a single hop in the request's path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViaHeader {
    pub sent_protocol: SentProtocol,
    pub sent_by_host: Host,
    pub sent_by_port: Option<u16>,
    pub params: Vec<Param>,
}

impl ViaHeader {
    /// Construct a Via entry; a `z9hG4bK`-prefixed branch is not generated
    /// here — callers that need RFC 3261 compliance call
    /// [`ViaHeader::with_generated_branch`].
    pub fn new(transport: impl Into<String>, host: Host, port: Option<u16>) -> Self {
        ViaHeader {
            sent_protocol: SentProtocol {
                name: "SIP".to_string(),
                version: "2.0".to_string(),
                transport: transport.into(),
            },
            sent_by_host: host,
            sent_by_port: port,
            params: Vec::new(),
        }
    }

    /// Append a freshly generated `z9hG4bK`-prefixed branch parameter.
    pub fn with_generated_branch(mut self) -> Self {
        let branch = format!("z9hG4bK{}", uuid::Uuid::new_v4().simple());
        self.params.push(Param::branch(branch));
        self
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn transport(&self) -> &str {
        &self.sent_protocol.transport
    }

    pub fn branch(&self) -> Option<&str> {
        self.params.iter().find_map(|p| match p {
            Param::Branch(v) => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn received(&self) -> Option<IpAddr> {
        self.params.iter().find_map(|p| match p {
            Param::Received(ip) => Some(*ip),
            _ => None,
        })
    }

    pub fn rport(&self) -> Option<Option<u16>> {
        self.params.iter().find_map(|p| match p {
            Param::Rport(v) => Some(*v),
            _ => None,
        })
    }

    pub fn set_received(&mut self, addr: IpAddr) {
        self.remove_param("received");
        self.params.push(Param::Received(addr));
    }

    pub fn set_rport(&mut self, port: u16) {
        self.remove_param("rport");
        self.params.push(Param::Rport(Some(port)));
    }

    fn remove_param(&mut self, name: &str) {
        self.params.retain(|p| p.name() != name);
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ViaHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.sent_protocol, self.sent_by_host)?;
        if let Some(port) = self.sent_by_port {
            write!(f, ":{}", port)?;
        }
        for param in &self.params {
            write!(f, ";{}", param)?;
        }
        Ok(())
    }
}

/// A Via header, which may carry multiple comma-separated entries.
/// The first entry (index 0) is always the topmost/most recent hop and
/// is what identifies the transaction (spec §3, §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Via(pub Vec<ViaHeader>);

impl Via {
    pub fn single(header: ViaHeader) -> Self {
        Via(vec![header])
    }

    /// The topmost Via entry, which identifies the transaction.
    pub fn top(&self) -> Option<&ViaHeader> {
        self.0.first()
    }

    pub fn top_mut(&mut self) -> Option<&mut ViaHeader> {
        self.0.first_mut()
    }

    /// Shortcut to the topmost entry's branch, the value the transaction
    /// key is built from.
    pub fn branch(&self) -> Option<&str> {
        self.top().and_then(|v| v.branch())
    }

    pub fn entries(&self) -> &[ViaHeader] {
        &self.0
    }
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl FromStr for Via {
    type Err = crate::error::Error;

    /// Parses a Via header value, which may contain several
    /// comma-separated entries in a single line.
    fn from_str(s: &str) -> Result<Self> {
        crate::parser::headers::parse_via(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_must_start_with_magic_cookie_by_convention() {
        let via = ViaHeader::new("UDP", Host::domain("pc33.example.com"), Some(5060))
            .with_generated_branch();
        assert!(via.branch().unwrap().starts_with("z9hG4bK"));
    }

    #[test]
    fn top_entry_identifies_the_transaction() {
        let a = ViaHeader::new("UDP", Host::domain("a.example.com"), None)
            .with_param(Param::branch("z9hG4bK-a"));
        let b = ViaHeader::new("UDP", Host::domain("b.example.com"), None)
            .with_param(Param::branch("z9hG4bK-b"));
        let via = Via(vec![a, b]);
        assert_eq!(via.branch(), Some("z9hG4bK-a"));
    }
}
