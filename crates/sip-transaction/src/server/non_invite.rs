//! Non-INVITE server transaction (RFC 3261 §17.2.2): Trying →
//! Proceeding → Completed → Terminated, driving timer J (absorb late
//! request retransmits before terminating; zero-duration over reliable
//! transports).

use std::sync::Arc;

use sip_core::Message;
use tokio::sync::mpsc;
use tracing::trace;

use crate::events::TransactionEvent;
use crate::server::data::{ServerCommand, ServerTransactionData};
use crate::state::{NonInviteServerState, TransactionState};
use crate::timer::{TimerFired, TimerKind};

pub fn spawn(
    data: Arc<ServerTransactionData>,
    mut commands: mpsc::Receiver<ServerCommand>,
    sink: mpsc::Sender<TransactionEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let (timer_tx, mut timer_rx) = mpsc::channel(16);
        let reliable_transport = data.source.kind.is_reliable();
        let mut completed_wait: Option<tokio::task::JoinHandle<()>> = None;

        loop {
            tokio::select! {
                Some(command) = commands.recv() => {
                    let state = data.current_state().await;
                    let TransactionState::NonInviteServer(current) = state else { continue };

                    match command {
                        ServerCommand::RequestRetransmitted => {
                            if let Some(response) = data.last_response.lock().await.clone() {
                                let _ = data.transport.send(&Message::Response(response), data.source).await;
                            }
                        }
                        ServerCommand::SendResponse(response) => {
                            *data.last_response.lock().await = Some(response.clone());
                            let _ = data.transport.send(&Message::Response(response.clone()), data.source).await;

                            if response.status.is_provisional() {
                                transition(&data, &sink, NonInviteServerState::Proceeding).await;
                                let _ = sink.send(TransactionEvent::ProvisionalResponse { key: data.key.clone(), response }).await;
                                continue;
                            }

                            transition(&data, &sink, NonInviteServerState::Completed).await;
                            let _ = sink.send(TransactionEvent::FinalResponse { key: data.key.clone(), response }).await;
                            if reliable_transport {
                                transition(&data, &sink, NonInviteServerState::Terminated).await;
                                break;
                            }
                            completed_wait = Some(data.timers.schedule_non_invite_completed_wait(timer_tx.clone()));
                        }
                        ServerCommand::CancelReceived | ServerCommand::AckReceived | ServerCommand::PrackReceived(_) => {
                            trace!(key = %data.key, ?current, "ignoring INVITE-only command on non-INVITE server transaction");
                        }
                    }
                }
                Some(TimerFired(kind)) = timer_rx.recv() => {
                    if matches!(kind, TimerKind::J) {
                        transition(&data, &sink, NonInviteServerState::Terminated).await;
                        break;
                    }
                }
                else => break,
            }
        }

        let _ = sink.send(TransactionEvent::TransactionTerminated { key: data.key.clone() }).await;
        if let Some(h) = completed_wait.take() { h.abort(); }
    })
}

async fn transition(data: &Arc<ServerTransactionData>, sink: &mpsc::Sender<TransactionEvent>, to: NonInviteServerState) {
    let mut guard = data.state.lock().await;
    let from = *guard;
    let to_state = TransactionState::NonInviteServer(to);
    *guard = to_state;
    drop(guard);
    if to_state.is_terminated() {
        data.mark_terminated_now().await;
    }
    let _ = sink
        .send(TransactionEvent::StateChanged { key: data.key.clone(), from, to: to_state })
        .await;
}
