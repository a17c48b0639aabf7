//! The four RFC 3261 §17 transaction state machines, plus the practical
//! "Cancelled" state this stack adds to the INVITE server machine so a
//! CANCEL arriving during Proceeding is observable by event subscribers
//! rather than silently folded into Completed.

use std::fmt;

/// INVITE client transaction states (RFC 3261 §17.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InviteClientState {
    Calling,
    Proceeding,
    Completed,
    Terminated,
}

/// Non-INVITE client transaction states (RFC 3261 §17.1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonInviteClientState {
    Trying,
    Proceeding,
    Completed,
    Terminated,
}

/// INVITE server transaction states (RFC 3261 §17.2.1), extended with
/// `Cancelled` (see module docs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InviteServerState {
    Proceeding,
    Cancelled,
    Completed,
    Confirmed,
    Terminated,
}

/// Non-INVITE server transaction states (RFC 3261 §17.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonInviteServerState {
    Trying,
    Proceeding,
    Completed,
    Terminated,
}

/// The state machine a transaction is currently running, tagged by
/// client/server and INVITE/non-INVITE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    InviteClient(InviteClientState),
    NonInviteClient(NonInviteClientState),
    InviteServer(InviteServerState),
    NonInviteServer(NonInviteServerState),
}

impl TransactionState {
    pub fn is_terminated(&self) -> bool {
        matches!(
            self,
            TransactionState::InviteClient(InviteClientState::Terminated)
                | TransactionState::NonInviteClient(NonInviteClientState::Terminated)
                | TransactionState::InviteServer(InviteServerState::Terminated)
                | TransactionState::NonInviteServer(NonInviteServerState::Terminated)
        )
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::InviteClient(s) => write!(f, "InviteClient::{:?}", s),
            TransactionState::NonInviteClient(s) => write!(f, "NonInviteClient::{:?}", s),
            TransactionState::InviteServer(s) => write!(f, "InviteServer::{:?}", s),
            TransactionState::NonInviteServer(s) => write!(f, "NonInviteServer::{:?}", s),
        }
    }
}
