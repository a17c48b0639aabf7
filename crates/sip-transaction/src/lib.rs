//! The RFC 3261 §17 transaction layer: client and server state machines
//! for both INVITE and non-INVITE requests, keyed and matched per spec
//! §3, sitting on top of [`sip_transport`] and built from [`sip_core`]
//! message types.

pub mod client;
pub mod error;
pub mod events;
pub mod key;
pub mod manager;
pub mod server;
pub mod state;
pub mod timer;

pub use client::data::{ClientCommand, ClientTransactionData};
pub use error::{Error, Result};
pub use events::TransactionEvent;
pub use key::TransactionKey;
pub use manager::TransactionManager;
pub use server::data::{ServerCommand, ServerTransactionData};
pub use state::{
    InviteClientState, InviteServerState, NonInviteClientState, NonInviteServerState, TransactionState,
};
pub use timer::{TimerFactory, TimerFired, TimerKind, TimerSettings};
