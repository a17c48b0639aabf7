//! Server transaction construction: the two RFC 3261 §17.2 state
//! machines (INVITE and non-INVITE) sharing [`ServerTransactionData`].

pub mod data;
pub mod invite;
pub mod non_invite;

use std::sync::Arc;

use sip_core::Request;
use sip_transport::{Endpoint, TransportManager};
use tokio::sync::mpsc;

use crate::events::TransactionEvent;
use crate::key::TransactionKey;
use crate::state::{NonInviteServerState, InviteServerState, TransactionState};
use crate::timer::TimerSettings;
use data::{ServerCommand, ServerTransactionData};

/// Construct and start a server transaction for an inbound `request`.
/// Unlike the client side, nothing is sent until the UAS core issues a
/// [`ServerCommand::SendResponse`]; the transaction only starts
/// absorbing retransmits and dispatching commands to the FSM.
pub async fn start(
    key: TransactionKey,
    request: Request,
    source: Endpoint,
    transport: Arc<TransportManager>,
    settings: TimerSettings,
    sink: mpsc::Sender<TransactionEvent>,
) -> (Arc<ServerTransactionData>, mpsc::Sender<ServerCommand>) {
    let is_invite = request.method.is_invite();
    let initial_state = if is_invite {
        TransactionState::InviteServer(InviteServerState::Proceeding)
    } else {
        TransactionState::NonInviteServer(NonInviteServerState::Trying)
    };

    let (command_tx, command_rx) = mpsc::channel(32);
    let data = Arc::new(ServerTransactionData::new(
        key,
        request,
        source,
        transport,
        settings,
        initial_state,
        command_tx.clone(),
    ));

    let handle = if is_invite {
        invite::spawn(data.clone(), command_rx, sink)
    } else {
        non_invite::spawn(data.clone(), command_rx, sink)
    };
    data.attach_event_loop(handle).await;

    (data, command_tx)
}
