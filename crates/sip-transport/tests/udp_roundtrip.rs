//! End-to-end UDP send/receive through [`UdpChannel`] and the stream
//! framer's trickle-delivery behavior over a real TCP loopback pair.

use std::time::Duration;

use sip_transport::channel::tcp::TcpChannel;
use sip_transport::channel::udp::UdpChannel;
use sip_transport::{Channel, ChannelEvent};
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn udp_options_request_round_trips_between_two_channels() {
    let (server, mut server_rx) = UdpChannel::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let (client, _client_rx) = UdpChannel::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();

    let request = b"OPTIONS sip:bob@biloxi.example.com SIP/2.0\r\nContent-Length: 0\r\n\r\n".to_vec();
    client.send(request.clone().into(), server.local_endpoint()).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), server_rx.recv())
        .await
        .expect("timed out waiting for datagram")
        .expect("channel closed unexpectedly");

    match event {
        ChannelEvent::MessageReceived { message, .. } => assert_eq!(message.as_ref(), request.as_slice()),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn tcp_stream_delivers_a_message_trickled_across_many_small_writes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let accept_task = tokio::spawn(async move { TcpChannel::accept(&listener).await.unwrap() });

    let mut client_stream = TcpStream::connect(addr).await.unwrap();
    let (_server_channel, mut server_rx) = accept_task.await.unwrap();

    let message = b"OPTIONS sip:bob@biloxi.example.com SIP/2.0\r\nContent-Length: 5\r\n\r\nhello".to_vec();
    use tokio::io::AsyncWriteExt;
    for byte in &message {
        client_stream.write_all(&[*byte]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let event = tokio::time::timeout(Duration::from_secs(2), server_rx.recv())
        .await
        .expect("timed out waiting for framed message")
        .expect("channel closed unexpectedly");

    match event {
        ChannelEvent::MessageReceived { message: framed, .. } => assert_eq!(framed.as_ref(), message.as_slice()),
        other => panic!("unexpected event: {:?}", other),
    }
}
