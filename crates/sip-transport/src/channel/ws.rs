//! WebSocket channel (RFC 7118): SIP messages travel one-per-WebSocket-
//! message, so unlike TCP/TLS there is no stream framing to do — each
//! text/binary frame the tungstenite layer delivers is already a
//! complete SIP message.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::channel::{event_channel, Channel, ChannelEvent};
use crate::endpoint::{ChannelId, ChannelKind};
use crate::error::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsChannel {
    id: ChannelId,
    peer: SocketAddr,
    local: SocketAddr,
    kind: ChannelKind,
    sink: Mutex<futures::stream::SplitSink<WsStream, WsMessage>>,
}

impl WsChannel {
    pub(crate) fn spawn(stream: WsStream, peer: SocketAddr, local: SocketAddr, kind: ChannelKind) -> (Arc<Self>, mpsc::Receiver<ChannelEvent>) {
        let id = Uuid::new_v4();
        let (sink, mut stream_rx) = stream.split();
        let (tx, rx) = event_channel();

        tokio::spawn(async move {
            while let Some(frame) = stream_rx.next().await {
                match frame {
                    Ok(WsMessage::Binary(data)) => {
                        let event = ChannelEvent::MessageReceived {
                            message: Bytes::from(data),
                            source: peer,
                            destination: local,
                            connection_id: Some(id),
                        };
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Text(text)) => {
                        let event = ChannelEvent::MessageReceived {
                            message: Bytes::from(text.into_bytes()),
                            source: peer,
                            destination: local,
                            connection_id: Some(id),
                        };
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        debug!(%peer, "websocket closed by peer");
                        let _ = tx.send(ChannelEvent::Closed).await;
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(%peer, error = %e, "websocket read failed");
                        let _ = tx.send(ChannelEvent::Error { error: e.to_string() }).await;
                        break;
                    }
                }
            }
        });

        (Arc::new(WsChannel { id, peer, local, kind, sink: Mutex::new(sink) }), rx)
    }
}

#[async_trait]
impl Channel for WsChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, data: Bytes, destination: SocketAddr) -> Result<()> {
        if destination != self.peer {
            return Err(Error::NoChannel(destination.to_string()));
        }
        let mut sink = self.sink.lock().await;
        sink.send(WsMessage::Binary(data.to_vec()))
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))
    }

    async fn close(&self) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.close().await.map_err(|e| Error::WebSocket(e.to_string()))
    }

    fn local_endpoint(&self) -> SocketAddr {
        self.local
    }
}
