//! TCP channel and the generic stream-framing loop it shares with TLS
//! (spec §3): both read from an `AsyncRead + AsyncWrite` stream into a
//! growable buffer and hand complete messages to
//! [`sip_core::parser::framing::try_extract_message`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use sip_core::parser::framing::{try_extract_message, FrameResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::channel::{event_channel, Channel, ChannelEvent};
use crate::endpoint::{ChannelId, ChannelKind};
use crate::error::{Error, Result};

/// Default receive buffer size: twice the largest message this stack
/// will frame, so one read rarely needs more than a single grow.
pub const DEFAULT_RECEIVE_BUFFER: usize = 2 * 64 * 1024;

/// Maximum message size accepted over a stream transport before the
/// connection is abandoned as abusive or corrupt.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Drives the read half of a stream connection: accumulates bytes,
/// extracts framed messages, and publishes them as
/// [`ChannelEvent::MessageReceived`].
pub(crate) async fn run_receive_loop<R>(
    mut reader: R,
    peer: SocketAddr,
    local: SocketAddr,
    connection_id: ChannelId,
    tx: mpsc::Sender<ChannelEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(DEFAULT_RECEIVE_BUFFER);
    let mut chunk = vec![0u8; 8192];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => {
                debug!(%peer, "stream connection closed by peer");
                let _ = tx.send(ChannelEvent::Closed).await;
                break;
            }
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > MAX_MESSAGE_SIZE {
                    warn!(%peer, size = buf.len(), "stream buffer exceeded maximum message size");
                    let _ = tx
                        .send(ChannelEvent::Error { error: "message too large".to_string() })
                        .await;
                    break;
                }
                loop {
                    match try_extract_message(&buf) {
                        FrameResult::Complete { range, skipped } => {
                            trace!(%peer, bytes = range.len(), skipped, "framed one message");
                            let message = Bytes::copy_from_slice(&buf[range.clone()]);
                            let total_consumed = range.end;
                            let _ = buf.split_to(total_consumed);
                            let event = ChannelEvent::MessageReceived {
                                message,
                                source: peer,
                                destination: local,
                                connection_id: Some(connection_id),
                            };
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                        FrameResult::Incomplete => break,
                        FrameResult::Malformed { offset } => {
                            warn!(%peer, offset, "malformed message on stream, dropping connection");
                            let _ = tx
                                .send(ChannelEvent::Error { error: "malformed message".to_string() })
                                .await;
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(%peer, error = %e, "stream read failed");
                let _ = tx.send(ChannelEvent::Error { error: e.to_string() }).await;
                break;
            }
        }
    }
}

pub struct TcpChannel {
    id: ChannelId,
    peer: SocketAddr,
    local: SocketAddr,
    writer: Mutex<tokio::net::tcp::OwnedWriteHalf>,
    last_tx: Mutex<Instant>,
}

impl TcpChannel {
    /// Wrap an already-connected [`TcpStream`], spawning its receive loop.
    pub async fn from_stream(stream: TcpStream) -> Result<(Arc<Self>, mpsc::Receiver<ChannelEvent>)> {
        let peer = stream.peer_addr()?;
        let local = stream.local_addr()?;
        let id = Uuid::new_v4();
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = event_channel();

        tokio::spawn(run_receive_loop(read_half, peer, local, id, tx));

        Ok((
            Arc::new(TcpChannel {
                id,
                peer,
                local,
                writer: Mutex::new(write_half),
                last_tx: Mutex::new(Instant::now()),
            }),
            rx,
        ))
    }

    pub async fn connect(peer: SocketAddr) -> Result<(Arc<Self>, mpsc::Receiver<ChannelEvent>)> {
        let stream = TcpStream::connect(peer).await?;
        Self::from_stream(stream).await
    }

    /// Accept one inbound connection on a listener already bound by
    /// the caller (the transport manager owns listener lifetime).
    pub async fn accept(listener: &TcpListener) -> Result<(Arc<Self>, mpsc::Receiver<ChannelEvent>)> {
        let (stream, _peer) = listener.accept().await?;
        Self::from_stream(stream).await
    }
}

#[async_trait]
impl Channel for TcpChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Tcp
    }

    async fn send(&self, data: Bytes, destination: SocketAddr) -> Result<()> {
        if destination != self.peer {
            return Err(Error::NoChannel(destination.to_string()));
        }
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(Error::MessageTooLarge { limit: MAX_MESSAGE_SIZE });
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(&data).await?;
        *self.last_tx.lock().await = Instant::now();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;
        Ok(())
    }

    fn local_endpoint(&self) -> SocketAddr {
        self.local
    }
}
