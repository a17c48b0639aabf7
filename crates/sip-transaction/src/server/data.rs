//! Shared state for both server transaction flavors: the request that
//! created the transaction, where responses get sent, and the most
//! recent response (retransmitted verbatim when the request itself is
//! retransmitted, per RFC 3261 §17.2.1/§17.2.2).

use std::sync::Arc;
use std::time::{Duration, Instant};

use sip_core::{Request, Response};
use sip_transport::{Endpoint, TransportManager};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::key::TransactionKey;
use crate::state::TransactionState;
use crate::timer::{TimerFactory, TimerSettings};

#[derive(Debug)]
pub enum ServerCommand {
    /// The same request arrived again (matched by the manager to this
    /// transaction) — retransmit the last response, if any.
    RequestRetransmitted,
    /// A CANCEL arrived for this transaction's branch.
    CancelReceived,
    /// The UAS core wants to send a response.
    SendResponse(Response),
    /// An ACK arrived acknowledging this INVITE's final response.
    AckReceived,
    /// A PRACK arrived acknowledging an outstanding reliable
    /// provisional response (RFC 3262).
    PrackReceived(Request),
}

pub struct ServerTransactionData {
    pub key: TransactionKey,
    pub request: Request,
    pub source: Endpoint,
    pub transport: Arc<TransportManager>,
    pub timers: TimerFactory,
    pub state: Mutex<TransactionState>,
    pub last_response: Mutex<Option<Response>>,
    pub command_tx: mpsc::Sender<ServerCommand>,
    terminated_at: Mutex<Option<Instant>>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl ServerTransactionData {
    pub fn new(
        key: TransactionKey,
        request: Request,
        source: Endpoint,
        transport: Arc<TransportManager>,
        settings: TimerSettings,
        initial_state: TransactionState,
        command_tx: mpsc::Sender<ServerCommand>,
    ) -> Self {
        ServerTransactionData {
            key,
            request,
            source,
            transport,
            timers: TimerFactory::new(settings),
            state: Mutex::new(initial_state),
            last_response: Mutex::new(None),
            command_tx,
            terminated_at: Mutex::new(None),
            event_loop: Mutex::new(None),
        }
    }

    pub async fn attach_event_loop(&self, handle: JoinHandle<()>) {
        *self.event_loop.lock().await = Some(handle);
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

impl Drop for ServerTransactionData {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.event_loop.try_lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}
