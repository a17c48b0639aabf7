//! The [`Channel`] abstraction: one async trait implemented by UDP,
//! TCP, TLS, and WebSocket transports alike, so the transport manager
//! and transaction layer never branch on transport kind directly.

pub mod tcp;
pub mod udp;

#[cfg(feature = "tls")]
pub mod tls;
#[cfg(feature = "ws")]
pub mod ws;

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::endpoint::{ChannelId, ChannelKind};
use crate::error::Result;

/// An event a channel reports asynchronously: an inbound message, a
/// transport-level error, or the channel closing.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    MessageReceived {
        message: Bytes,
        source: SocketAddr,
        destination: SocketAddr,
        connection_id: Option<ChannelId>,
    },
    Error {
        error: String,
    },
    Closed,
}

/// A transport-agnostic send/receive endpoint. Implementors own their
/// I/O resource (a UDP socket, a TCP/TLS stream, a WebSocket) and
/// report inbound traffic through the [`mpsc::Receiver<ChannelEvent>`]
/// returned from construction rather than through this trait, so the
/// trait itself stays purely about sending and lifecycle.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable identity used as the [`TransportManager`]'s registry key.
    ///
    /// [`TransportManager`]: crate::transport::TransportManager
    fn id(&self) -> ChannelId;

    fn kind(&self) -> ChannelKind;

    /// Send a fully serialized message to `destination`. Connection-
    /// oriented channels ignore `destination` beyond a sanity check
    /// that it matches their peer; UDP channels use it per-datagram.
    async fn send(&self, data: Bytes, destination: SocketAddr) -> Result<()>;

    async fn close(&self) -> Result<()>;

    /// The local address this channel is bound to or connected from.
    fn local_endpoint(&self) -> SocketAddr;
}

pub(crate) fn event_channel() -> (mpsc::Sender<ChannelEvent>, mpsc::Receiver<ChannelEvent>) {
    mpsc::channel(256)
}
