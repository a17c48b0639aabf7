//! Events the [`TransportManager`] delivers upward to the transaction
//! layer, distinct from the per-channel [`crate::channel::ChannelEvent`]s
//! it consumes.
//!
//! [`TransportManager`]: crate::transport::TransportManager

use sip_core::{Request, Response};

use crate::endpoint::Endpoint;

#[derive(Debug, Clone)]
pub enum TransportEvent {
    RequestReceived { request: Request, source: Endpoint },
    ResponseReceived { response: Response, source: Endpoint },
}
