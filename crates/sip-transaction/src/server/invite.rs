//! INVITE server transaction (RFC 3261 §17.2.1, extended with a
//! `Cancelled` state), plus RFC 3262 reliable provisional responses:
//! at most one reliable provisional may be outstanding at a time — a
//! second one while the first is unacknowledged is rejected rather
//! than silently overwriting the one awaiting its PRACK (spec §8 open
//! question).

use std::sync::Arc;

use rand::Rng;
use sip_core::{HeaderName, Message, Request, Response, StatusCode, TypedHeader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::events::TransactionEvent;
use crate::server::data::{ServerCommand, ServerTransactionData};
use crate::state::{InviteServerState, TransactionState};
use crate::timer::{TimerFired, TimerKind};

/// RFC 3262 §7.1: a server transaction's first RSeq is drawn from this
/// range, then incremented by one per subsequent reliable provisional.
const RSEQ_MAX_INITIAL: u32 = 1 << 30;

struct OutstandingReliable {
    rseq: u32,
    response: Response,
}

pub fn spawn(
    data: Arc<ServerTransactionData>,
    mut commands: mpsc::Receiver<ServerCommand>,
    sink: mpsc::Sender<TransactionEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let (timer_tx, mut timer_rx) = mpsc::channel(16);
        let reliable_transport = data.source.kind.is_reliable();
        let prack_supported = prack_supported(&data.request);

        let mut response_retransmit: Option<tokio::task::JoinHandle<()>> = None;
        let mut ack_timeout: Option<tokio::task::JoinHandle<()>> = None;
        let mut confirmed_wait: Option<tokio::task::JoinHandle<()>> = None;
        let mut prack_retransmit: Option<tokio::task::JoinHandle<()>> = None;
        let mut auto_trying = Some(data.timers.schedule_auto_trying(timer_tx.clone()));
        let mut outstanding_reliable: Option<OutstandingReliable> = None;
        let mut next_rseq: Option<u32> = None;
        let mut provisional_sent = false;

        loop {
            tokio::select! {
                Some(command) = commands.recv() => {
                    let state = data.current_state().await;
                    let TransactionState::InviteServer(current) = state else { continue };

                    match command {
                        ServerCommand::RequestRetransmitted => {
                            if let Some(response) = data.last_response.lock().await.clone() {
                                let _ = data.transport.send(&Message::Response(response), data.source).await;
                            }
                        }
                        ServerCommand::SendResponse(mut response) => {
                            if response.status.is_provisional() {
                                provisional_sent = true;
                                if let Some(h) = auto_trying.take() { h.abort(); }

                                if prack_supported && response.status != StatusCode::TRYING {
                                    if outstanding_reliable.is_some() {
                                        warn!(key = %data.key, "rejecting second reliable provisional while one is unacknowledged");
                                        continue;
                                    }
                                    let rseq = *next_rseq.get_or_insert_with(|| {
                                        rand::thread_rng().gen_range(1..=RSEQ_MAX_INITIAL)
                                    });
                                    next_rseq = Some(rseq + 1);
                                    response.headers.push(TypedHeader::RSeq(sip_core::RSeq(rseq)));
                                    response.headers.push(TypedHeader::Require(sip_core::Require(vec!["100rel".to_string()])));

                                    let _ = data.transport.send(&Message::Response(response.clone()), data.source).await;
                                    *data.last_response.lock().await = Some(response.clone());
                                    prack_retransmit = Some(data.timers.schedule_prack_retransmit(timer_tx.clone()));
                                    outstanding_reliable = Some(OutstandingReliable { rseq, response: response.clone() });
                                    let _ = sink.send(TransactionEvent::ProvisionalResponse { key: data.key.clone(), response }).await;
                                    continue;
                                }

                                let _ = data.transport.send(&Message::Response(response.clone()), data.source).await;
                                *data.last_response.lock().await = Some(response.clone());
                                let _ = sink.send(TransactionEvent::ProvisionalResponse { key: data.key.clone(), response }).await;
                                continue;
                            }

                            if let Some(h) = auto_trying.take() { h.abort(); }
                            if let Some(h) = prack_retransmit.take() { h.abort(); }
                            outstanding_reliable = None;

                            *data.last_response.lock().await = Some(response.clone());
                            let _ = data.transport.send(&Message::Response(response.clone()), data.source).await;

                            if response.status.is_success() {
                                transition(&data, &sink, InviteServerState::Terminated).await;
                                let _ = sink.send(TransactionEvent::FinalResponse { key: data.key.clone(), response }).await;
                                break;
                            }

                            transition(&data, &sink, InviteServerState::Completed).await;
                            let _ = sink.send(TransactionEvent::FinalResponse { key: data.key.clone(), response }).await;
                            if !reliable_transport {
                                response_retransmit = Some(data.timers.schedule_response_retransmit(timer_tx.clone()));
                            }
                            ack_timeout = Some(data.timers.schedule_ack_timeout(timer_tx.clone()));
                        }
                        ServerCommand::CancelReceived => {
                            if matches!(current, InviteServerState::Proceeding) {
                                transition(&data, &sink, InviteServerState::Cancelled).await;
                            }
                        }
                        ServerCommand::AckReceived => {
                            if matches!(current, InviteServerState::Completed) {
                                if let Some(h) = response_retransmit.take() { h.abort(); }
                                if let Some(h) = ack_timeout.take() { h.abort(); }
                                transition(&data, &sink, InviteServerState::Confirmed).await;
                                if reliable_transport {
                                    // RFC 3261 §17.2.1: timer I is 0 over reliable transports.
                                    transition(&data, &sink, InviteServerState::Terminated).await;
                                    break;
                                }
                                confirmed_wait = Some(data.timers.schedule_confirmed_wait(timer_tx.clone()));
                            }
                        }
                        ServerCommand::PrackReceived(prack) => {
                            match &outstanding_reliable {
                                Some(outstanding) if prack_acknowledges(&prack, outstanding.rseq) => {
                                    debug!(key = %data.key, "reliable provisional acknowledged by PRACK");
                                    if let Some(h) = prack_retransmit.take() { h.abort(); }
                                    outstanding_reliable = None;
                                }
                                _ => {
                                    warn!(key = %data.key, "PRACK with mismatched RAck");
                                    let mismatch = response_for(&prack, StatusCode::CALL_TRANSACTION_DOES_NOT_EXIST);
                                    let _ = data.transport.send(&Message::Response(mismatch), data.source).await;
                                }
                            }
                        }
                    }
                }
                Some(TimerFired(kind)) = timer_rx.recv() => {
                    match kind {
                        TimerKind::Trying => {
                            if !provisional_sent {
                                let trying = response_for(&data.request, StatusCode::TRYING);
                                provisional_sent = true;
                                let _ = data.transport.send(&Message::Response(trying.clone()), data.source).await;
                                *data.last_response.lock().await = Some(trying.clone());
                                let _ = sink.send(TransactionEvent::ProvisionalResponse { key: data.key.clone(), response: trying }).await;
                            }
                        }
                        TimerKind::Prack => {
                            if let Some(outstanding) = &outstanding_reliable {
                                let _ = data.transport.send(&Message::Response(outstanding.response.clone()), data.source).await;
                            }
                        }
                        TimerKind::G => {
                            if let Some(response) = data.last_response.lock().await.clone() {
                                let _ = data.transport.send(&Message::Response(response), data.source).await;
                            }
                        }
                        TimerKind::H => {
                            if let Some(h) = response_retransmit.take() { h.abort(); }
                            transition(&data, &sink, InviteServerState::Terminated).await;
                            let _ = sink.send(TransactionEvent::TimedOut { key: data.key.clone() }).await;
                            break;
                        }
                        TimerKind::I => {
                            transition(&data, &sink, InviteServerState::Terminated).await;
                            break;
                        }
                        _ => {}
                    }
                }
                else => break,
            }
        }

        let _ = sink.send(TransactionEvent::TransactionTerminated { key: data.key.clone() }).await;
        for handle in [response_retransmit, ack_timeout, confirmed_wait, prack_retransmit, auto_trying].into_iter().flatten() {
            handle.abort();
        }
    })
}

/// Whether the INVITE that created this transaction advertises 100rel
/// support, in either Require or Supported (spec §4.3).
fn prack_supported(request: &Request) -> bool {
    let require = request.headers.first(&HeaderName::Require).map(|h| match h {
        TypedHeader::Require(r) => r.requires_100rel(),
        _ => false,
    }).unwrap_or(false);
    let supported = request.headers.first(&HeaderName::Supported).map(|h| match h {
        TypedHeader::Supported(s) => s.supports_100rel(),
        _ => false,
    }).unwrap_or(false);
    require || supported
}

fn prack_acknowledges(prack: &Request, outstanding_rseq: u32) -> bool {
    prack
        .headers
        .first(&HeaderName::RAck)
        .map(|h| matches!(h, TypedHeader::RAck(r) if r.rseq == outstanding_rseq))
        .unwrap_or(false)
}

/// Build a response to `request`, copying the headers RFC 3261 ties a
/// response to its request by: Via (so it retraces the request's
/// route), From, To, Call-ID, CSeq.
fn response_for(request: &Request, status: StatusCode) -> Response {
    let mut response = Response::new(status);
    if let Some(via) = request.headers.via() {
        response.headers.push(TypedHeader::Via(via.clone()));
    }
    if let Some(from) = request.headers.from() {
        response.headers.push(TypedHeader::From(from.clone()));
    }
    if let Some(to) = request.headers.to() {
        response.headers.push(TypedHeader::To(to.clone()));
    }
    if let Some(call_id) = request.headers.call_id() {
        response.headers.push(TypedHeader::CallId(call_id.clone()));
    }
    if let Some(cseq) = request.headers.cseq() {
        response.headers.push(TypedHeader::CSeq(cseq.clone()));
    }
    response
}

async fn transition(data: &Arc<ServerTransactionData>, sink: &mpsc::Sender<TransactionEvent>, to: InviteServerState) {
    let mut guard = data.state.lock().await;
    let from = *guard;
    let to_state = TransactionState::InviteServer(to);
    *guard = to_state;
    drop(guard);
    if to_state.is_terminated() {
        data.mark_terminated_now().await;
    }
    let _ = sink
        .send(TransactionEvent::StateChanged { key: data.key.clone(), from, to: to_state })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sip_core::{CallId, CSeq, Host, Method, NameAddr, To, Uri, Via, ViaHeader};
    use std::str::FromStr;

    fn sample_invite() -> Request {
        let uri = Uri::from_str("sip:bob@biloxi.example.com").unwrap();
        let mut request = Request::new(Method::Invite, uri.clone());
        request.headers.push(TypedHeader::Via(Via::single(ViaHeader::new(
            "UDP",
            Host::domain("pc33.atlanta.example.com"),
            None,
        ))));
        request.headers.push(TypedHeader::From(sip_core::From(NameAddr::new(uri.clone()).with_tag("1928301774"))));
        request.headers.push(TypedHeader::To(To(NameAddr::new(uri))));
        request.headers.push(TypedHeader::CallId(CallId("a84b4c76e66710@pc33.example.com".to_string())));
        request.headers.push(TypedHeader::CSeq(CSeq { sequence: 1, method: Method::Invite }));
        request
    }

    #[test]
    fn detects_100rel_in_require_or_supported() {
        let mut plain = sample_invite();
        assert!(!prack_supported(&plain));

        plain.headers.push(TypedHeader::Require(sip_core::Require(vec!["100rel".to_string()])));
        assert!(prack_supported(&plain));

        let mut via_supported = sample_invite();
        via_supported.headers.push(TypedHeader::Supported(sip_core::Supported(vec!["100rel".to_string()])));
        assert!(prack_supported(&via_supported));
    }

    #[test]
    fn response_for_copies_dialog_identifying_headers() {
        let request = sample_invite();
        let response = response_for(&request, StatusCode::TRYING);
        assert_eq!(response.headers.call_id(), request.headers.call_id());
        assert_eq!(response.headers.cseq(), request.headers.cseq());
        assert!(response.headers.via().is_some());
    }

    #[test]
    fn prack_acknowledges_matches_only_exact_rseq() {
        let mut prack = Request::new(Method::Prack, Uri::from_str("sip:bob@biloxi.example.com").unwrap());
        prack.headers.push(TypedHeader::RAck(sip_core::RAck { rseq: 42, cseq: 1, method: Method::Invite }));
        assert!(prack_acknowledges(&prack, 42));
        assert!(!prack_acknowledges(&prack, 43));
    }
}
