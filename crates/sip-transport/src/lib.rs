//! Transport-agnostic SIP channel multiplexing.
//!
//! This crate owns everything between a parsed [`sip_core::Message`]
//! and the network: the [`Channel`] trait implemented per transport,
//! the [`TransportManager`] that routes outbound sends and fans
//! inbound traffic out as [`TransportEvent`]s, the UDP retransmission
//! queue, and the RFC 3263 DNS [`Resolver`]. It has no knowledge of
//! transaction state machines; those live in `sip-transaction`.

pub mod channel;
pub mod dns;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod transport;

pub use channel::{Channel, ChannelEvent};
pub use dns::{Resolver, ResolverConfig};
pub use endpoint::{ChannelId, ChannelKind, Endpoint};
pub use error::{Error, Result};
pub use events::TransportEvent;
pub use transport::{TransportConfig, TransportManager};
