//! End-to-end coverage of [`TransactionManager`] over real loopback UDP
//! sockets: a client transaction's request reaches a server transaction,
//! a response comes back through the matching client transaction, and a
//! CANCEL produces a transaction distinct from the INVITE it cancels.

use std::time::Duration;

use sip_core::{CallId, CSeq, MaxForwards, Method, Request, Response, StatusCode, TypedHeader, Uri};
use sip_core::{Host, Param};
use sip_transport::{ChannelKind, Endpoint, TransportConfig, TransportManager};
use sip_transaction::{TimerSettings, TransactionEvent, TransactionManager};

fn base_request(method: Method, branch: &str, call_id: &str, cseq: u32) -> Request {
    let mut request = Request::new(method, Uri::sip("bob.example.com").with_user("bob"));

    let via = sip_core::ViaHeader::new("UDP", Host::domain("alice.example.com"), Some(5060))
        .with_param(Param::branch(branch));
    request.headers.push(TypedHeader::Via(sip_core::Via::single(via)));

    let from = sip_core::NameAddr::new(Uri::sip("alice.example.com").with_user("alice")).with_tag("alice-tag");
    request.headers.push(TypedHeader::From(sip_core::From(from)));

    let to = sip_core::NameAddr::new(Uri::sip("bob.example.com").with_user("bob"));
    request.headers.push(TypedHeader::To(sip_core::To(to)));

    request.headers.push(TypedHeader::CallId(CallId(call_id.to_string())));
    request.headers.push(TypedHeader::CSeq(CSeq { sequence: cseq, method }));
    request.headers.push(TypedHeader::MaxForwards(MaxForwards::DEFAULT));

    request
}

async fn start_stack(bind_addr: &str) -> (std::sync::Arc<TransactionManager>, tokio::sync::mpsc::Receiver<TransactionEvent>) {
    let config = TransportConfig { udp_bind_addr: bind_addr.parse().unwrap(), ..Default::default() };
    let (transport, transport_events) = TransportManager::start(config).await.unwrap();
    TransactionManager::start(transport, TimerSettings::scaled(20), transport_events)
}

#[tokio::test]
async fn options_request_gets_a_response_through_the_full_stack() {
    let (client_mgr, mut client_events) = start_stack("127.0.0.1:0").await;
    let (server_mgr, mut server_events) = start_stack("127.0.0.1:59601").await;

    let server_addr: std::net::SocketAddr = "127.0.0.1:59601".parse().unwrap();
    let request = base_request(Method::Options, "z9hG4bK-options-1", "call-1@alice.example.com", 1);
    let destination = Endpoint::new(ChannelKind::Udp, server_addr);

    let client_key = client_mgr.send_request(request, destination).await.unwrap();

    let new_tx_event = tokio::time::timeout(Duration::from_secs(2), server_events.recv())
        .await
        .expect("server never observed the inbound request")
        .expect("server event channel closed");

    let (server_key, source) = match new_tx_event {
        TransactionEvent::NewServerTransaction { key, source, .. } => (key, source),
        other => panic!("unexpected first server event: {:?}", other),
    };

    let mut response = Response::new(StatusCode::OK);
    response.headers.push(TypedHeader::CallId(CallId("call-1@alice.example.com".to_string())));
    response
        .headers
        .push(TypedHeader::CSeq(CSeq { sequence: 1, method: Method::Options }));
    let via = sip_core::ViaHeader::new("UDP", Host::domain("alice.example.com"), Some(5060))
        .with_param(Param::branch("z9hG4bK-options-1"));
    response.headers.push(TypedHeader::Via(sip_core::Via::single(via)));

    server_mgr.send_response(&server_key, response).await.unwrap();
    let _ = source;

    let final_event = tokio::time::timeout(Duration::from_secs(2), client_events.recv())
        .await
        .expect("client never saw the final response");

    let mut saw_final = false;
    let mut event = final_event;
    loop {
        match event {
            Some(TransactionEvent::FinalResponse { key, response }) => {
                assert_eq!(key, client_key);
                assert_eq!(response.status, StatusCode::OK);
                saw_final = true;
                break;
            }
            Some(_) => {
                event = tokio::time::timeout(Duration::from_secs(2), client_events.recv()).await.unwrap();
            }
            None => break,
        }
    }
    assert!(saw_final, "expected a FinalResponse event for the OPTIONS client transaction");
}

#[tokio::test]
async fn cancel_transitions_the_invite_server_transaction_into_cancelled() {
    let (client_mgr, _client_events) = start_stack("127.0.0.1:0").await;
    let (server_mgr, mut server_events) = start_stack("127.0.0.1:59602").await;

    let server_addr: std::net::SocketAddr = "127.0.0.1:59602".parse().unwrap();
    let destination = Endpoint::new(ChannelKind::Udp, server_addr);

    let invite = base_request(Method::Invite, "z9hG4bK-invite-1", "call-2@alice.example.com", 1);
    let _invite_key = client_mgr.send_request(invite, destination).await.unwrap();

    let invite_tx_event = tokio::time::timeout(Duration::from_secs(2), server_events.recv())
        .await
        .expect("server never observed the INVITE")
        .expect("server event channel closed");
    let invite_server_key = match invite_tx_event {
        TransactionEvent::NewServerTransaction { key, .. } => key,
        other => panic!("unexpected event: {:?}", other),
    };

    let cancel = base_request(Method::Cancel, "z9hG4bK-invite-1", "call-2@alice.example.com", 1);
    let cancel_key = client_mgr.send_request(cancel, destination).await.unwrap();

    assert_ne!(invite_server_key, cancel_key, "CANCEL must not share a transaction with the INVITE it cancels");

    let mut saw_cancelled = false;
    for _ in 0..8 {
        match tokio::time::timeout(Duration::from_secs(2), server_events.recv()).await {
            Ok(Some(TransactionEvent::StateChanged { key, to, .. })) if key == invite_server_key => {
                use sip_transaction::{InviteServerState, TransactionState};
                if matches!(to, TransactionState::InviteServer(InviteServerState::Cancelled)) {
                    saw_cancelled = true;
                    break;
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(_) => break,
        }
    }
    assert!(saw_cancelled, "expected the INVITE server transaction to transition to Cancelled");
}
