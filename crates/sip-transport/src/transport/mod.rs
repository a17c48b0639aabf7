//! The [`TransportManager`]: owns the live channel registry, routes
//! outbound messages to the right channel (opening one on demand for
//! connection-oriented transports), dispatches inbound channel events
//! upward as [`TransportEvent`]s, and runs the UDP retransmission
//! queue transaction timers feed into.

mod retransmit;

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use sip_core::Message;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::channel::udp::UdpChannel;
use crate::channel::{Channel, ChannelEvent};
use crate::endpoint::{ChannelId, ChannelKind, Endpoint};
use crate::error::{Error, Result};
use crate::events::TransportEvent;

pub use retransmit::RetransmitQueue;

/// Static configuration for a [`TransportManager`] instance.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub udp_bind_addr: SocketAddr,
    pub tcp_bind_addr: Option<SocketAddr>,
    /// RFC 3261 T1: the retransmission queue's scan resolution and the
    /// first UDP retransmit interval.
    pub t1: std::time::Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            udp_bind_addr: "0.0.0.0:5060".parse().unwrap(),
            tcp_bind_addr: None,
            t1: std::time::Duration::from_millis(500),
        }
    }
}

/// Multiplexes outbound sends and inbound receives across every open
/// channel, regardless of transport.
pub struct TransportManager {
    channels: Arc<DashMap<ChannelId, Arc<dyn Channel>>>,
    channels_by_endpoint: Arc<DashMap<SocketAddr, ChannelId>>,
    retransmit: Arc<RetransmitQueue>,
    events_tx: mpsc::Sender<TransportEvent>,
}

impl TransportManager {
    /// Bind the configured UDP socket, start its receive-dispatch task
    /// and the retransmission queue's scan loop, and return the
    /// manager alongside the [`TransportEvent`] stream callers consume.
    pub async fn start(config: TransportConfig) -> Result<(Arc<Self>, mpsc::Receiver<TransportEvent>)> {
        let channels: Arc<DashMap<ChannelId, Arc<dyn Channel>>> = Arc::new(DashMap::new());
        let channels_by_endpoint = Arc::new(DashMap::new());
        let (events_tx, events_rx) = mpsc::channel(256);

        let (udp_channel, udp_events) = UdpChannel::bind(config.udp_bind_addr).await?;
        let udp_id = udp_channel.id();
        channels.insert(udp_id, udp_channel.clone());

        let manager = Arc::new(TransportManager {
            channels,
            channels_by_endpoint,
            retransmit: Arc::new(RetransmitQueue::new(config.t1)),
            events_tx,
        });

        manager.spawn_channel_dispatch(udp_events, ChannelKind::Udp, udp_id);
        manager.retransmit.clone().spawn_scan_loop(manager.clone());

        if let Some(bind_addr) = config.tcp_bind_addr {
            manager.clone().spawn_tcp_listener(bind_addr).await?;
        }

        Ok((manager, events_rx))
    }

    /// Accept inbound TCP connections on `bind_addr` for the lifetime of
    /// the manager, registering each the same way an outbound dial would
    /// so a response sent back on it routes through the same channel.
    async fn spawn_tcp_listener(self: Arc<Self>, bind_addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(bind_addr).await?;
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => match crate::channel::tcp::TcpChannel::from_stream(stream).await {
                        Ok((channel, events)) => self.register_channel(channel, peer, events),
                        Err(e) => warn!(error = %e, %peer, "failed to initialize accepted TCP connection"),
                    },
                    Err(e) => warn!(error = %e, "TCP accept failed"),
                }
            }
        });
        Ok(())
    }

    /// Drain one channel's event stream, tagging every inbound message
    /// with `kind` (the dispatch loop is shared across transports, but
    /// `ChannelEvent` itself carries no transport tag). `id` is dropped
    /// from the registry once the channel reports an error or closes, so
    /// a dead connection-oriented channel doesn't linger and get handed
    /// back out of `channel_for`.
    fn spawn_channel_dispatch(&self, mut rx: mpsc::Receiver<ChannelEvent>, kind: ChannelKind, id: ChannelId) {
        let channels = self.channels.clone();
        let channels_by_endpoint = self.channels_by_endpoint.clone();
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    ChannelEvent::MessageReceived { message, source, destination: _, connection_id } => {
                        if let Some(id) = connection_id {
                            channels_by_endpoint.insert(source, id);
                        }
                        dispatch_inbound(&events_tx, &message, source, kind).await;
                    }
                    ChannelEvent::Error { error } => {
                        warn!(%error, "channel reported an error");
                        break;
                    }
                    ChannelEvent::Closed => {
                        debug!("channel closed");
                        break;
                    }
                }
            }
            channels.remove(&id);
            channels_by_endpoint.retain(|_, mapped| *mapped != id);
        });
    }

    /// Send `message` to `destination`, selecting or opening whatever
    /// channel that destination's scheme and transport parameter call
    /// for (spec §4.4).
    pub async fn send(&self, message: &Message, destination: Endpoint) -> Result<()> {
        let channel = self.channel_for(destination).await?;
        let data = message.to_bytes();
        if destination.kind == ChannelKind::Udp {
            self.retransmit.track(destination, data.clone(), channel.clone());
        }
        channel.send(data, destination.addr).await
    }

    async fn channel_for(&self, destination: Endpoint) -> Result<Arc<dyn Channel>> {
        if let Some(id) = self.channels_by_endpoint.get(&destination.addr) {
            if let Some(channel) = self.channels.get(&id) {
                return Ok(channel.clone());
            }
        }

        // UDP has exactly one shared socket, usable for any peer;
        // connection-oriented transports must match the specific peer
        // above, or get a fresh connection dialed below — picking an
        // arbitrary existing channel of the right kind would send to
        // whatever peer that channel happened to be connected to.
        if destination.kind == ChannelKind::Udp {
            return self
                .channels
                .iter()
                .find(|entry| entry.value().kind() == ChannelKind::Udp)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| Error::NoChannel(destination.to_string()));
        }

        self.dial(destination).await
    }

    /// Open a fresh connection-oriented channel toward `destination` and
    /// register it so subsequent sends (and its inbound replies) reuse
    /// it. TCP needs only the peer address; TLS and WebSocket need a
    /// certificate/session configuration this manager doesn't own (spec
    /// §7 excludes certificate store integration), so those channels
    /// must be established and handed in via [`Self::register_channel`]
    /// instead.
    async fn dial(&self, destination: Endpoint) -> Result<Arc<dyn Channel>> {
        match destination.kind {
            ChannelKind::Tcp => {
                let (channel, events) = crate::channel::tcp::TcpChannel::connect(destination.addr).await?;
                let channel: Arc<dyn Channel> = channel;
                self.channels.insert(channel.id(), channel.clone());
                self.channels_by_endpoint.insert(destination.addr, channel.id());
                self.spawn_channel_dispatch(events, ChannelKind::Tcp, channel.id());
                Ok(channel)
            }
            other => Err(Error::NoChannel(format!(
                "{destination} requires a pre-established {other:?} channel registered via register_channel"
            ))),
        }
    }

    /// Register a channel this manager did not dial itself — a TLS or
    /// WebSocket connection a caller established with its own
    /// certificate/session configuration, or a connection accepted from
    /// an inbound listener. `peer` is the remote endpoint subsequent
    /// sends to that address should reuse this channel for.
    pub fn register_channel(&self, channel: Arc<dyn Channel>, peer: SocketAddr, events: mpsc::Receiver<ChannelEvent>) {
        let kind = channel.kind();
        let id = channel.id();
        self.channels.insert(id, channel.clone());
        self.channels_by_endpoint.insert(peer, id);
        self.spawn_channel_dispatch(events, kind, id);
    }

    /// Stop retransmitting to `destination`, called by the transaction
    /// layer once a matching response silences timer A.
    pub async fn cancel_retransmit(&self, destination: &Endpoint) {
        self.retransmit.cancel(destination).await;
    }
}

/// Parse a channel's raw inbound bytes and forward the result upward,
/// tagging the source with the transport it actually arrived over.
async fn dispatch_inbound(events_tx: &mpsc::Sender<TransportEvent>, bytes: &[u8], source: SocketAddr, kind: ChannelKind) {
    let message = match Message::parse(bytes) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, %source, "dropping unparseable inbound message");
            return;
        }
    };
    let endpoint = Endpoint::new(kind, source);
    let event = match message {
        Message::Request(request) => TransportEvent::RequestReceived { request, source: endpoint },
        Message::Response(response) => TransportEvent::ResponseReceived { response, source: endpoint },
    };
    if events_tx.send(event).await.is_err() {
        error!("transport event receiver dropped; inbound message discarded");
    }
}
