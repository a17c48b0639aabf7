//! [`TransactionManager`]: the transaction table. Matches inbound
//! requests and responses to the transaction they belong to (spec §3),
//! creating new server transactions for requests nothing already owns,
//! and sweeps out terminated entries so the table doesn't grow
//! unbounded over a long-lived process.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use sip_core::{Method, Request, Response};
use sip_transport::{Endpoint, TransportEvent, TransportManager};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::client::data::{ClientCommand, ClientTransactionData};
use crate::client;
use crate::error::{Error, Result};
use crate::events::TransactionEvent;
use crate::key::TransactionKey;
use crate::server;
use crate::server::data::{ServerCommand, ServerTransactionData};
use crate::timer::TimerSettings;

/// Owns every live client and server transaction, keyed per spec §3.
pub struct TransactionManager {
    transport: Arc<TransportManager>,
    settings: TimerSettings,
    events_tx: mpsc::Sender<TransactionEvent>,
    client_transactions: DashMap<TransactionKey, Arc<ClientTransactionData>>,
    server_transactions: DashMap<TransactionKey, Arc<ServerTransactionData>>,
}

impl TransactionManager {
    /// Start the manager: consumes `transport_events` (the
    /// [`TransportManager`]'s inbound stream) and runs a housekeeping
    /// sweep every T1 that drops terminated entries from the table.
    pub fn start(
        transport: Arc<TransportManager>,
        settings: TimerSettings,
        mut transport_events: mpsc::Receiver<TransportEvent>,
    ) -> (Arc<Self>, mpsc::Receiver<TransactionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(256);

        let manager = Arc::new(TransactionManager {
            transport,
            settings,
            events_tx,
            client_transactions: DashMap::new(),
            server_transactions: DashMap::new(),
        });

        let dispatch_manager = manager.clone();
        tokio::spawn(async move {
            while let Some(event) = transport_events.recv().await {
                dispatch_manager.dispatch_inbound(event).await;
            }
        });

        let sweep_manager = manager.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_manager.settings.t1.max(Duration::from_millis(100)));
            loop {
                ticker.tick().await;
                sweep_manager.sweep_terminated();
            }
        });

        (manager, events_rx)
    }

    /// Create a client transaction for `request` and send it once.
    pub async fn send_request(&self, request: Request, destination: Endpoint) -> Result<TransactionKey> {
        let branch = request
            .branch()
            .ok_or_else(|| Error::Core(sip_core::Error::invalid_header("Via", "missing branch parameter")))?
            .to_string();
        let key = TransactionKey::new(&branch, request.method, false);
        if self.client_transactions.contains_key(&key) {
            return Err(Error::DuplicateTransaction(key.to_string()));
        }

        let (data, _command_tx) = client::start(
            key.clone(),
            request,
            destination,
            self.transport.clone(),
            self.settings,
            self.events_tx.clone(),
        )
        .await?;

        self.client_transactions.insert(key.clone(), data);
        Ok(key)
    }

    /// Send a CANCEL for an in-progress INVITE client transaction. The
    /// CANCEL itself is a fresh request and transaction (spec §3); this
    /// only notifies the INVITE transaction that cancellation was
    /// requested, matching RFC 3261 §9.1's "MUST NOT be sent until a
    /// provisional response arrives" guidance is the UAC core's job.
    pub async fn cancel_client_transaction(&self, key: &TransactionKey) -> Result<()> {
        let data = self
            .client_transactions
            .get(key)
            .map(|entry| entry.clone())
            .ok_or_else(|| Error::NoMatchingTransaction(key.to_string()))?;
        data.command_tx
            .send(ClientCommand::Cancel)
            .await
            .map_err(|_| Error::NoMatchingTransaction(key.to_string()))
    }

    /// Deliver a response the UAS core built for an existing server
    /// transaction.
    pub async fn send_response(&self, key: &TransactionKey, response: Response) -> Result<()> {
        let data = self
            .server_transactions
            .get(key)
            .map(|entry| entry.clone())
            .ok_or_else(|| Error::NoMatchingTransaction(key.to_string()))?;
        data.command_tx
            .send(ServerCommand::SendResponse(response))
            .await
            .map_err(|_| Error::NoMatchingTransaction(key.to_string()))
    }

    async fn dispatch_inbound(&self, event: TransportEvent) {
        match event {
            TransportEvent::RequestReceived { request, source } => self.dispatch_request(request, source).await,
            TransportEvent::ResponseReceived { response, source } => self.dispatch_response(response, source).await,
        }
    }

    async fn dispatch_request(&self, request: Request, source: Endpoint) {
        let Some(branch) = request.branch().map(str::to_string) else {
            warn!("dropping request with no Via branch parameter");
            return;
        };

        match request.method {
            Method::Ack => {
                let invite_key = TransactionKey::new(&branch, Method::Invite, true);
                if let Some(entry) = self.server_transactions.get(&invite_key) {
                    let _ = entry.command_tx.send(ServerCommand::AckReceived).await;
                } else {
                    // ACK to a 2xx final response belongs to its own dialog-level
                    // handling above this layer, not a transaction match here
                    // (RFC 3261 §17.1.1.3 / §13.2.2.4).
                    trace!(%branch, "ACK with no matching non-2xx INVITE server transaction");
                }
            }
            Method::Cancel => {
                let invite_key = TransactionKey::new(&branch, Method::Invite, true);
                if let Some(entry) = self.server_transactions.get(&invite_key) {
                    let _ = entry.command_tx.send(ServerCommand::CancelReceived).await;
                }
                self.create_or_retransmit_server_transaction(request, source, branch, Method::Cancel).await;
            }
            Method::Prack => {
                // RFC 3262 §7.2: PRACK matches the INVITE server transaction
                // whose RSeq it acknowledges, not its own branch+method alone,
                // but the branch is still the INVITE's — route to it directly.
                let invite_key = TransactionKey::new(&branch, Method::Invite, true);
                if let Some(entry) = self.server_transactions.get(&invite_key) {
                    let _ = entry.command_tx.send(ServerCommand::PrackReceived(request)).await;
                } else {
                    warn!(%branch, "PRACK with no matching INVITE server transaction");
                }
            }
            method => {
                self.create_or_retransmit_server_transaction(request, source, branch, method).await;
            }
        }
    }

    async fn create_or_retransmit_server_transaction(
        &self,
        request: Request,
        source: Endpoint,
        branch: String,
        method: Method,
    ) {
        let key = TransactionKey::new(&branch, method, true);
        if let Some(entry) = self.server_transactions.get(&key) {
            let _ = entry.command_tx.send(ServerCommand::RequestRetransmitted).await;
            return;
        }

        let (data, _command_tx) = server::start(
            key.clone(),
            request.clone(),
            source,
            self.transport.clone(),
            self.settings,
            self.events_tx.clone(),
        )
        .await;

        self.server_transactions.insert(key.clone(), data);
        let _ = self
            .events_tx
            .send(TransactionEvent::NewServerTransaction { key, request, source })
            .await;
    }

    async fn dispatch_response(&self, response: Response, source: Endpoint) {
        let Some(branch) = response.branch().map(str::to_string) else {
            warn!("dropping response with no Via branch parameter");
            return;
        };
        let Some(cseq) = response.headers.cseq() else {
            warn!("dropping response with no CSeq header");
            return;
        };
        let key = TransactionKey::new(&branch, cseq.method, false);

        match self.client_transactions.get(&key) {
            Some(entry) => {
                let _ = entry.command_tx.send(ClientCommand::ResponseReceived(response)).await;
            }
            None => debug!(%branch, %source, "dropping response with no matching client transaction"),
        }
    }

    /// Drop a transaction once its event loop has exited (its command
    /// sender closed) or it has sat Terminated for at least T6 — the
    /// grace period that lets a transaction absorb a late-arriving
    /// duplicate of the request/response it already handled before the
    /// table forgets it.
    fn sweep_terminated(&self) {
        let t6 = self.settings.t6;

        let mut client_keys_to_drop = Vec::new();
        for entry in self.client_transactions.iter() {
            if entry.command_tx.is_closed() {
                client_keys_to_drop.push(entry.key().clone());
                continue;
            }
            if entry.terminated_elapsed().is_some_and(|elapsed| elapsed >= t6) {
                client_keys_to_drop.push(entry.key().clone());
            }
        }
        for key in client_keys_to_drop {
            self.client_transactions.remove(&key);
        }

        let mut server_keys_to_drop = Vec::new();
        for entry in self.server_transactions.iter() {
            if entry.command_tx.is_closed() {
                server_keys_to_drop.push(entry.key().clone());
                continue;
            }
            if entry.terminated_elapsed().is_some_and(|elapsed| elapsed >= t6) {
                server_keys_to_drop.push(entry.key().clone());
            }
        }
        for key in server_keys_to_drop {
            self.server_transactions.remove(&key);
        }
    }
}
