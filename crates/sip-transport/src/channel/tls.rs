//! TLS channel: the same stream-framing loop as [`super::tcp`], wrapped
//! around a `rustls` session instead of a bare `TcpStream`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncWriteExt, split, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_rustls::{TlsAcceptor, TlsConnector, TlsStream};
use uuid::Uuid;

use crate::channel::tcp::{run_receive_loop, MAX_MESSAGE_SIZE};
use crate::channel::{event_channel, Channel, ChannelEvent};
use crate::endpoint::{ChannelId, ChannelKind};
use crate::error::{Error, Result};

pub struct TlsChannel {
    id: ChannelId,
    peer: SocketAddr,
    local: SocketAddr,
    writer: Mutex<WriteHalf<TlsStream<TcpStream>>>,
    last_tx: Mutex<Instant>,
}

impl TlsChannel {
    async fn from_stream(stream: TlsStream<TcpStream>, peer: SocketAddr, local: SocketAddr) -> Result<(Arc<Self>, mpsc::Receiver<ChannelEvent>)> {
        let id = Uuid::new_v4();
        let (read_half, write_half) = split(stream);
        let (tx, rx) = event_channel();

        tokio::spawn(run_receive_loop(read_half, peer, local, id, tx));

        Ok((
            Arc::new(TlsChannel {
                id,
                peer,
                local,
                writer: Mutex::new(write_half),
                last_tx: Mutex::new(Instant::now()),
            }),
            rx,
        ))
    }

    /// Connect to `peer` and perform a TLS handshake as the client,
    /// verifying the presented certificate against `connector`'s config.
    pub async fn connect(peer: SocketAddr, server_name: rustls::pki_types::ServerName<'static>, connector: TlsConnector) -> Result<(Arc<Self>, mpsc::Receiver<ChannelEvent>)> {
        let tcp = TcpStream::connect(peer).await?;
        let local = tcp.local_addr()?;
        let stream = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| Error::Tls(e.to_string()))?;
        Self::from_stream(TlsStream::Client(stream), peer, local).await
    }

    /// Accept an already-connected TCP stream and perform the server
    /// side of the TLS handshake.
    pub async fn accept(tcp: TcpStream, acceptor: TlsAcceptor) -> Result<(Arc<Self>, mpsc::Receiver<ChannelEvent>)> {
        let peer = tcp.peer_addr()?;
        let local = tcp.local_addr()?;
        let stream = acceptor.accept(tcp).await.map_err(|e| Error::Tls(e.to_string()))?;
        Self::from_stream(TlsStream::Server(stream), peer, local).await
    }
}

#[async_trait]
impl Channel for TlsChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Tls
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
