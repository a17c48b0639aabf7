//! Events a transaction reports to whatever holds its
//! [`mpsc::Sender<TransactionEvent>`] — normally a dialog/call-control
//! layer above this crate, out of scope here.

use sip_core::{Request, Response};
use sip_transport::Endpoint;

use crate::key::TransactionKey;
use crate::state::TransactionState;

#[derive(Debug, Clone)]
pub enum TransactionEvent {
    /// A new request arrived with no matching transaction; the manager
    /// created one and the UAS core should drive it via
    /// [`crate::manager::TransactionManager::send_response`].
    NewServerTransaction { key: TransactionKey, request: Request, source: Endpoint },
    ProvisionalResponse { key: TransactionKey, response: Response },
    FinalResponse { key: TransactionKey, response: Response },
    TimedOut { key: TransactionKey },
    StateChanged { key: TransactionKey, from: TransactionState, to: TransactionState },
    TransactionTerminated { key: TransactionKey },
}
