//! A transport endpoint: a protocol plus the address a channel is
//! bound to or connected toward.

use std::fmt;
use std::net::SocketAddr;

use uuid::Uuid;

/// The concrete transport protocols this crate multiplexes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Udp,
    Tcp,
    Tls,
    Ws,
    Wss,
}

impl ChannelKind {
    /// RFC 3263 §4.1's default port per transport, used when a URI
    /// supplies no explicit port.
    pub fn default_port(&self) -> u16 {
        match self {
            ChannelKind::Udp | ChannelKind::Tcp => 5060,
            ChannelKind::Tls | ChannelKind::Wss => 5061,
            ChannelKind::Ws => 80,
        }
    }

    pub fn is_reliable(&self) -> bool {
        !matches!(self, ChannelKind::Udp)
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, ChannelKind::Tls | ChannelKind::Wss)
    }

    /// Select a channel kind from a URI scheme and optional explicit
    /// `transport` parameter (spec §4.4). A pure function so the outbound
    /// routing decision is unit-testable without standing up sockets.
    pub fn select(scheme: &str, transport_param: Option<&str>) -> Option<ChannelKind> {
        match scheme.to_ascii_lowercase().as_str() {
            "sips" => Some(ChannelKind::Tls),
            "wss" => Some(ChannelKind::Wss),
            "ws" => Some(ChannelKind::Ws),
            "sip" => match transport_param.map(str::to_ascii_lowercase).as_deref() {
                Some("tcp") => Some(ChannelKind::Tcp),
                Some("tls") => Some(ChannelKind::Tls),
                Some("udp") | None => Some(ChannelKind::Udp),
                Some(_) => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelKind::Udp => "UDP",
            ChannelKind::Tcp => "TCP",
            ChannelKind::Tls => "TLS",
            ChannelKind::Ws => "WS",
            ChannelKind::Wss => "WSS",
        };
        f.write_str(s)
    }
}

/// Identifies a single channel instance (one UDP socket, one TCP/TLS
/// connection, one WebSocket connection) within the [`TransportManager`]'s
/// registry.
///
/// [`TransportManager`]: crate::transport::TransportManager
pub type ChannelId = Uuid;

/// A remote address a message was received from or should be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub kind: ChannelKind,
    pub addr: SocketAddr,
}

impl Endpoint {
    pub fn new(kind: ChannelKind, addr: SocketAddr) -> Self {
        Endpoint { kind, addr }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_defaults_sip_to_udp() {
        assert_eq!(ChannelKind::select("sip", None), Some(ChannelKind::Udp));
    }

    #[test]
    fn select_honors_transport_param() {
        assert_eq!(ChannelKind::select("sip", Some("tcp")), Some(ChannelKind::Tcp));
    }

    #[test]
    fn select_forces_tls_for_sips_regardless_of_param() {
        assert_eq!(ChannelKind::select("sips", Some("udp")), Some(ChannelKind::Tls));
    }

    #[test]
    fn select_rejects_unknown_transport_param() {
        assert_eq!(ChannelKind::select("sip", Some("sctp")), None);
    }
}
