//! Client transaction construction: the two RFC 3261 §17.1 state
//! machines (INVITE and non-INVITE) sharing [`ClientTransactionData`].

pub mod data;
pub mod invite;
pub mod non_invite;

use std::sync::Arc;

use sip_core::{Message, Request};
use sip_transport::{Endpoint, TransportManager};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::events::TransactionEvent;
use crate::key::TransactionKey;
use crate::state::{InviteClientState, NonInviteClientState, TransactionState};
use crate::timer::TimerSettings;
use data::{ClientCommand, ClientTransactionData};

/// Construct and start a client transaction for `request`: sends the
/// request once immediately, then hands control to the appropriate
/// state machine's event loop.
pub async fn start(
    key: TransactionKey,
    request: Request,
    destination: Endpoint,
    transport: Arc<TransportManager>,
    settings: TimerSettings,
    sink: mpsc::Sender<TransactionEvent>,
) -> Result<(Arc<ClientTransactionData>, mpsc::Sender<ClientCommand>)> {
    let is_invite = request.method.is_invite();
    let initial_state = if is_invite {
        TransactionState::InviteClient(InviteClientState::Calling)
    } else {
        TransactionState::NonInviteClient(NonInviteClientState::Trying)
    };

    let (command_tx, command_rx) = mpsc::channel(32);
    let data = Arc::new(ClientTransactionData::new(
        key,
        request,
        destination,
        transport,
        settings,
        initial_state,
        command_tx.clone(),
    ));

    transport_send(&data).await?;

    let handle = if is_invite {
        invite::spawn(data.clone(), command_rx, sink)
    } else {
        non_invite::spawn(data.clone(), command_rx, sink)
    };
    data.attach_event_loop(handle).await;

    Ok((data, command_tx))
}

async fn transport_send(data: &Arc<ClientTransactionData>) -> Result<()> {
    data.transport
        .send(&Message::Request(data.request.clone()), data.destination)
        .await?;
    Ok(())
}
