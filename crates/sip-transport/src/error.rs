use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by channel I/O, transport routing, and DNS resolution.
#[derive(Error, Debug)]
pub enum Error {
    #[error("sip-core error: {0}")]
    Core(#[from] sip_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no channel available for destination {0}")]
    NoChannel(String),

    #[error("unsupported transport scheme: {0}")]
    UnsupportedTransport(String),

    #[error("channel {0} is closed")]
    ChannelClosed(uuid::Uuid),

    #[error("DNS resolution failed for {name}: {message}")]
    Resolution { name: String, message: String },

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("message exceeds maximum size of {limit} bytes")]
    MessageTooLarge { limit: usize },
}
