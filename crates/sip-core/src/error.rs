use thiserror::Error;

/// A type alias for handling `Result`s with [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or parsing SIP messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid or unrecognized SIP method token
    #[error("invalid SIP method: {0}")]
    InvalidMethod(String),

    /// A header value did not match the grammar for its header type
    #[error("invalid header {name}: {message}")]
    InvalidHeader {
        /// Name of the offending header
        name: String,
        /// Human readable description of the failure
        message: String,
    },

    /// A URI failed to parse
    #[error("invalid SIP URI: {0}")]
    InvalidUri(String),

    /// The start line did not contain "SIP/2.0"
    #[error("invalid SIP version")]
    InvalidVersion,

    /// A status code was outside the 100-699 range
    #[error("invalid status code: {0}")]
    InvalidStatusCode(u16),

    /// The start line itself was malformed
    #[error("invalid start line: {0}")]
    InvalidStartLine(String),

    /// Generic parser failure with a byte offset into the input
    #[error("malformed message at offset {offset}: {message}")]
    Malformed {
        /// Byte offset into the buffer being parsed
        offset: usize,
        /// Human readable description
        message: String,
    },

    /// The buffer does not yet contain a complete message; not fatal
    #[error("incomplete message")]
    Incomplete,

    /// Content-Length was present but not a valid decimal integer
    #[error("malformed Content-Length header")]
    MalformedContentLength,

    /// A header required to construct a typed value was absent
    #[error("missing required header: {0}")]
    MissingHeader(String),

    /// The message used a transport scheme this crate does not model
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// A URI or header component contained invalid percent-encoding
    #[error("malformed component {component}: {message}")]
    MalformedComponent {
        /// The component that failed to decode (e.g. "user info")
        component: String,
        /// Human readable description
        message: String,
    },
}

impl Error {
    /// Convenience constructor for [`Error::InvalidHeader`].
    pub fn invalid_header(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error::InvalidHeader { name: name.into(), message: message.into() }
    }
}
