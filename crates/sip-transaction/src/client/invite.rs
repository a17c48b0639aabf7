//! INVITE client transaction (RFC 3261 §17.1.1): Calling → Proceeding
//! → Completed → Terminated, driving timers A (retransmit, unreliable
//! transports only), B (absolute timeout), and D (absorb late
//! retransmitted final responses before terminating).

use std::sync::Arc;

use sip_core::{CSeq, Message, Method, Request, Response, TypedHeader, Via};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::client::data::{ClientCommand, ClientTransactionData};
use crate::events::TransactionEvent;
use crate::state::{InviteClientState, TransactionState};
use crate::timer::{TimerFired, TimerKind};

/// Spawn the INVITE client transaction's event loop. The first request
/// send happens before this is called, by [`crate::manager::TransactionManager`];
/// this loop only reacts to what comes back.
pub fn spawn(
    data: Arc<ClientTransactionData>,
    mut commands: mpsc::Receiver<ClientCommand>,
    sink: mpsc::Sender<TransactionEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let (timer_tx, mut timer_rx) = mpsc::channel(16);
        let reliable = data.destination.kind.is_reliable();

        let mut retransmit_handle = if reliable {
            None
        } else {
            Some(data.timers.schedule_invite_retransmit(timer_tx.clone()))
        };
        let timeout_handle = data.timers.schedule_timeout(TimerKind::B, timer_tx.clone());
        let mut completed_handle: Option<tokio::task::JoinHandle<()>> = None;

        loop {
            tokio::select! {
                Some(command) = commands.recv() => {
                    match command {
                        ClientCommand::ResponseReceived(response) => {
                            let state = data.current_state().await;
                            if let TransactionState::InviteClient(current) = state {
                                match (current, response.status.is_provisional(), response.status.is_final()) {
                                    (InviteClientState::Calling, true, _) | (InviteClientState::Proceeding, true, _) => {
                                        transition(&data, &sink, InviteClientState::Proceeding).await;
                                        let _ = sink.send(TransactionEvent::ProvisionalResponse { key: data.key.clone(), response }).await;
                                    }
                                    (InviteClientState::Calling, _, true) | (InviteClientState::Proceeding, _, true) => {
                                        if let Some(h) = retransmit_handle.take() { h.abort(); }
                                        timeout_handle.abort();
                                        data.transport.cancel_retransmit(&data.destination).await;

                                        if response.status.is_success() {
                                            // 2xx responses are handled by the UAC core (ACK with
                                            // its own transaction), not retransmitted by this one;
                                            // the transaction's job ends here (RFC 3261 §17.1.1.2).
                                            transition(&data, &sink, InviteClientState::Terminated).await;
                                            let _ = sink.send(TransactionEvent::FinalResponse { key: data.key.clone(), response }).await;
                                            break;
                                        }

                                        let ack = build_ack(&data.request, &response);
                                        let _ = data.transport.send(&Message::Request(ack.clone()), data.destination).await;
                                        data.store_ack(ack).await;

                                        transition(&data, &sink, InviteClientState::Completed).await;
                                        let _ = sink.send(TransactionEvent::FinalResponse { key: data.key.clone(), response }).await;
                                        completed_handle = Some(data.timers.schedule_completed_wait(TimerKind::D, timer_tx.clone()));
                                    }
                                    (InviteClientState::Completed, _, _) if response.status.is_final_non_success() => {
                                        if let Some(ack) = data.stored_ack().await {
                                            let _ = data.transport.send(&Message::Request(ack), data.destination).await;
                                        }
                                    }
                                    _ => trace!(key = %data.key, ?current, "ignoring response in non-matching state"),
                                }
                            }
                        }
                        ClientCommand::Cancel => {
                            debug!(key = %data.key, "CANCEL requested for INVITE client transaction");
                        }
                    }
                }
                Some(TimerFired(kind)) = timer_rx.recv() => {
                    match kind {
                        TimerKind::A => {
                            let _ = data.transport.send(&Message::Request(data.request.clone()), data.destination).await;
                        }
                        TimerKind::B => {
                            if let Some(h) = retransmit_handle.take() { h.abort(); }
                            transition(&data, &sink, InviteClientState::Terminated).await;
                            let _ = sink.send(TransactionEvent::TimedOut { key: data.key.clone() }).await;
                            break;
                        }
                        TimerKind::D => {
                            transition(&data, &sink, InviteClientState::Terminated).await;
                            break;
                        }
                        _ => {}
                    }
                }
                else => break,
            }
        }

        let _ = sink.send(TransactionEvent::TransactionTerminated { key: data.key.clone() }).await;
        if let Some(h) = completed_handle.take() { h.abort(); }
    })
}

/// Build the ACK for a non-2xx final response to `request` (RFC 3261
/// §17.1.1.3): same Request-URI, Call-ID, From, CSeq sequence (method
/// ACK), and top Via (same branch, since this ACK belongs to the same
/// transaction) as the original INVITE; To comes from the response, to
/// carry the tag the UAS added. An ACK to a 2xx is a different
/// transaction built by the UAC core, not this one.
fn build_ack(request: &Request, response: &Response) -> Request {
    let mut ack = Request::new(Method::Ack, request.uri.clone());

    if let Some(via) = request.headers.via().and_then(|v| v.top()) {
        ack.headers.push(TypedHeader::Via(Via::single(via.clone())));
    }
    for header in request.headers.iter() {
        if let TypedHeader::Route(route) = header {
            ack.headers.push(TypedHeader::Route(route.clone()));
        }
    }
    if let Some(from) = request.headers.from() {
        ack.headers.push(TypedHeader::From(from.clone()));
    }
    if let Some(to) = response.headers.to() {
        ack.headers.push(TypedHeader::To(to.clone()));
    }
    if let Some(call_id) = request.headers.call_id() {
        ack.headers.push(TypedHeader::CallId(call_id.clone()));
    }
    if let Some(cseq) = request.headers.cseq() {
        ack.headers.push(TypedHeader::CSeq(CSeq { sequence: cseq.sequence, method: Method::Ack }));
    }

    ack
}

async fn transition(data: &Arc<ClientTransactionData>, sink: &mpsc::Sender<TransactionEvent>, to: InviteClientState) {
    let mut guard = data.state.lock().await;
    let from = *guard;
    let to_state = TransactionState::InviteClient(to);
    *guard = to_state;
    drop(guard);
    if to_state.is_terminated() {
        data.mark_terminated_now().await;
    }
    let _ = sink
        .send(TransactionEvent::StateChanged { key: data.key.clone(), from, to: to_state })
        .await;
}
