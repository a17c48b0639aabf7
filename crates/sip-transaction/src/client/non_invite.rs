//! Non-INVITE client transaction (RFC 3261 §17.1.2): Trying →
//! Proceeding → Completed → Terminated, driving timers E (retransmit),
//! F (absolute timeout), and K (absorb late retransmits before
//! terminating; zero-duration over reliable transports).

use std::sync::Arc;

use sip_core::Message;
use tokio::sync::mpsc;
use tracing::trace;

use crate::client::data::{ClientCommand, ClientTransactionData};
use crate::events::TransactionEvent;
use crate::state::{NonInviteClientState, TransactionState};
use crate::timer::{TimerFired, TimerKind};

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
            Some(data.timers.schedule_retransmit(TimerKind::E, timer_tx.clone()))
        };
        let timeout_handle = data.timers.schedule_timeout(TimerKind::F, timer_tx.clone());
        let mut completed_handle: Option<tokio::task::JoinHandle<()>> = None;

        loop {
            tokio::select! {
                Some(command) = commands.recv() => {
                    if let ClientCommand::ResponseReceived(response) = command {
                        let state = data.current_state().await;
                        if let TransactionState::NonInviteClient(current) = state {
                            match (current, response.status.is_provisional(), response.status.is_final()) {
                                (NonInviteClientState::Trying, true, _) | (NonInviteClientState::Proceeding, true, _) => {
                                    transition(&data, &sink, NonInviteClientState::Proceeding).await;
                                    let _ = sink.send(TransactionEvent::ProvisionalResponse { key: data.key.clone(), response }).await;
                                }
                                (NonInviteClientState::Trying, _, true) | (NonInviteClientState::Proceeding, _, true) => {
                                    if let Some(h) = retransmit_handle.take() { h.abort(); }
                                    timeout_handle.abort();
                                    data.transport.cancel_retransmit(&data.destination).await;
                                    transition(&data, &sink, NonInviteClientState::Completed).await;
                                    let _ = sink.send(TransactionEvent::FinalResponse { key: data.key.clone(), response }).await;
                                    completed_handle = Some(data.timers.schedule_completed_wait(TimerKind::K, timer_tx.clone()));
                                }
                                _ => trace!(key = %data.key, ?current, "ignoring response in non-matching state"),
                            }
                        }
                    }
                }
                Some(TimerFired(kind)) = timer_rx.recv() => {
                    match kind {
                        TimerKind::E => {
                            let _ = data.transport.send(&Message::Request(data.request.clone()), data.destination).await;
                        }
                        TimerKind::F => {
                            if let Some(h) = retransmit_handle.take() { h.abort(); }
                            transition(&data, &sink, NonInviteClientState::Terminated).await;
                            let _ = sink.send(TransactionEvent::TimedOut { key: data.key.clone() }).await;
                            break;
                        }
                        TimerKind::K => {
                            transition(&data, &sink, NonInviteClientState::Terminated).await;
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

async fn transition(data: &Arc<ClientTransactionData>, sink: &mpsc::Sender<TransactionEvent>, to: NonInviteClientState) {
    let mut guard = data.state.lock().await;
    let from = *guard;
    let to_state = TransactionState::NonInviteClient(to);
    *guard = to_state;
    drop(guard);
    if to_state.is_terminated() {
        data.mark_terminated_now().await;
    }
    let _ = sink
        .send(TransactionEvent::StateChanged { key: data.key.clone(), from, to: to_state })
        .await;
}
