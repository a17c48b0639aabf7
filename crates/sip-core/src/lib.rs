//! SIP (RFC 3261) message model and tokenizing parser.
//!
//! This crate owns the data model a SIP implementation is built on —
//! methods, status codes, URIs, headers, and the request/response
//! types assembled from them — plus the parser that turns wire bytes
//! into that model and the framer that finds message boundaries in a
//! byte stream. It has no knowledge of sockets, timers, or transaction
//! state; those live in `sip-transport` and `sip-transaction`.

pub mod error;
pub mod parser;
pub mod types;

pub use error::{Error, Result};
pub use parser::{ParseMode, framing::FrameResult};
pub use types::header::{HeaderName, TypedHeader};
pub use types::headers::{CSeq, CallId, Contact, ContentLength, ContentType, MaxForwards, RAck, RSeq, Require, Supported, Unsupported};
pub use types::message::{Headers, Message, Request, Response};
pub use types::method::Method;
pub use types::param::Param;
pub use types::route::{RouteEntry, RouteSet};
pub use types::status::StatusCode;
pub use types::to_from::{From, NameAddr, To};
pub use types::uri::{Host, Scheme, Uri};
pub use types::via::{SentProtocol, Via, ViaHeader};
