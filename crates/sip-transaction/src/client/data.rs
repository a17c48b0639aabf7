//! Shared state for both client transaction flavors (INVITE and
//! non-INVITE): the request being sent, its destination, the channel
//! back to the transport layer, and the event-loop task driving the
//! state machine. Dropping the handle aborts that task — a
//! transaction's lifetime is exactly as long as something holds it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sip_core::{Method, Request, Response};
use sip_transport::{Endpoint, TransportManager};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::key::TransactionKey;
use crate::state::TransactionState;
use crate::timer::{TimerFactory, TimerSettings};

/// A command sent into a transaction's event loop: either a response
/// the manager matched to this transaction, or a direct instruction
/// (send CANCEL, tear down).
#[derive(Debug)]
pub enum ClientCommand {
    ResponseReceived(Response),
    Cancel,
}

pub struct ClientTransactionData {
    pub key: TransactionKey,
    pub request: Request,
    pub destination: Endpoint,
    pub transport: Arc<TransportManager>,
    pub timers: TimerFactory,
    pub state: Mutex<TransactionState>,
    pub command_tx: mpsc::Sender<ClientCommand>,
    /// The ACK generated for a 3xx–6xx final response to an INVITE,
    /// resent verbatim on a duplicate of that final (spec §3, §4.3).
    stored_ack: Mutex<Option<Request>>,
    terminated_at: Mutex<Option<Instant>>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl ClientTransactionData {
    pub fn new(
        key: TransactionKey,
        request: Request,
        destination: Endpoint,
        transport: Arc<TransportManager>,
        settings: TimerSettings,
        initial_state: TransactionState,
        command_tx: mpsc::Sender<ClientCommand>,
    ) -> Self {
        ClientTransactionData {
            key,
            request,
            destination,
            transport,
            timers: TimerFactory::new(settings),
            state: Mutex::new(initial_state),
            command_tx,
            stored_ack: Mutex::new(None),
            terminated_at: Mutex::new(None),
            event_loop: Mutex::new(None),
        }
    }

    /// Record the ACK generated for a non-2xx final response, so a
    /// duplicate of that final can resend it without rebuilding it.
    pub async fn store_ack(&self, ack: Request) {
        *self.stored_ack.lock().await = Some(ack);
    }

    /// The stored ACK, if a non-2xx final has already been ACKed.
    pub async fn stored_ack(&self) -> Option<Request> {
        self.stored_ack.lock().await.clone()
    }

    /// Record the handle of the task running this transaction's event
    /// loop, so [`Drop`] can abort it.
    pub async fn attach_event_loop(&self, handle: JoinHandle<()>) {
        *self.event_loop.lock().await = Some(handle);
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    pub async fn current_state(&self) -> TransactionState {
        *self.state.lock().await
    }

    /// Stamp the moment this transaction reached a terminal state, the
    /// first time it does so.
    pub async fn mark_terminated_now(&self) {
        let mut guard = self.terminated_at.lock().await;
        if guard.is_none() {
            *guard = Some(Instant::now());
        }
    }

    /// How long ago this transaction reached a terminal state, if it
    /// has; used by the housekeeping sweep to hold entries for T6
    /// before dropping them.
    pub fn terminated_elapsed(&self) -> Option<Duration> {
        self.terminated_at.try_lock().ok()?.map(|at| at.elapsed())
    }
}

impl Drop for ClientTransactionData {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.event_loop.try_lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}
