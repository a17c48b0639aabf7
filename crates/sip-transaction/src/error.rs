use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("sip-core error: {0}")]
    Core(#[from] sip_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] sip_transport::Error),

    #[error("no transaction matches key {0}")]
    NoMatchingTransaction(String),

    #[error("transaction {0} already exists")]
    DuplicateTransaction(String),

    #[error("invalid state transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },

    #[error("a reliable provisional response is already outstanding for this transaction")]
    ReliableProvisionalAlreadyOutstanding,

    #[error("transaction timed out waiting for a response")]
    TimedOut,
}
