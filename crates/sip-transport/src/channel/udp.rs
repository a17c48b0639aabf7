//! UDP channel: one bound socket shared by all peers it talks to.
//! Datagram boundaries are message boundaries, so no framing logic is
//! needed beyond capping datagram size.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::channel::{event_channel, Channel, ChannelEvent};
use crate::endpoint::{ChannelId, ChannelKind};
use crate::error::{Error, Result};

/// RFC 3261 §18.1.1 recommends datagrams stay within this size absent
/// path MTU discovery.
pub const MAX_UDP_DATAGRAM: usize = 65_507;

pub struct UdpChannel {
    id: ChannelId,
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
}

impl UdpChannel {
    /// Bind a UDP socket at `local_addr` and spawn its receive loop,
    /// which publishes [`ChannelEvent::MessageReceived`] for every
    /// datagram until the socket is dropped.
    pub async fn bind(local_addr: SocketAddr) -> Result<(Arc<Self>, mpsc::Receiver<ChannelEvent>)> {
        let socket = Arc::new(UdpSocket::bind(local_addr).await?);
        let local_addr = socket.local_addr()?;
        let id = Uuid::new_v4();
        let (tx, rx) = event_channel();

        let recv_socket = socket.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_UDP_DATAGRAM];
            loop {
                match recv_socket.recv_from(&mut buf).await {
                    Ok((n, source)) => {
                        trace!(bytes = n, %source, "udp datagram received");
                        let message = Bytes::copy_from_slice(&buf[..n]);
                        let destination = recv_socket
                            .local_addr()
                            .unwrap_or_else(|_| SocketAddr::new([0, 0, 0, 0].into(), 0));
                        let event = ChannelEvent::MessageReceived {
                            message,
                            source,
                            destination,
                            connection_id: None,
                        };
                        if tx.send(event).await.is_err() {
                            debug!("udp channel event receiver dropped, stopping receive loop");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "udp recv_from failed");
                        let _ = tx.send(ChannelEvent::Error { error: e.to_string() }).await;
                        break;
                    }
                }
            }
        });

        Ok((Arc::new(UdpChannel { id, socket, local_addr }), rx))
    }
}

#[async_trait]
impl Channel for UdpChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Udp
    }

    async fn send(&self, data: Bytes, destination: SocketAddr) -> Result<()> {
        if data.len() > MAX_UDP_DATAGRAM {
            return Err(Error::MessageTooLarge { limit: MAX_UDP_DATAGRAM });
        }
        self.socket.send_to(&data, destination).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn local_endpoint(&self) -> SocketAddr {
        self.local_addr
    }
}
