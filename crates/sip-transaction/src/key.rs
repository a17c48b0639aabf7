//! Transaction identity (spec §3): `SHA1(branch ‖ method)`, plus an
//! explicit client/server discriminant. The discriminant exists
//! because a UAC and UAS sharing the same branch and method — a
//! loopback call, or a proxy briefly talking to itself — would
//! otherwise collide on the same key despite being two distinct
//! transactions.

use std::fmt;

use sha1::{Digest, Sha1};
use sip_core::Method;

/// Uniquely identifies one transaction within a [`TransactionManager`]'s
/// table.
///
/// [`TransactionManager`]: crate::manager::TransactionManager
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    digest: [u8; 20],
    is_server: bool,
}

impl TransactionKey {
    /// Build the key a request or response maps to. `method` is the
    /// method the *transaction* is keyed on — for a CANCEL, that is
    /// CANCEL itself, not the INVITE it targets; the two stay distinct
    /// transactions sharing only a coincidental relationship by branch.
    pub fn new(branch: &str, method: Method, is_server: bool) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(branch.as_bytes());
        hasher.update(method.as_str().as_bytes());
        let digest: [u8; 20] = hasher.finalize().into();
        TransactionKey { digest, is_server }
    }

    pub fn is_server(&self) -> bool {
        self.is_server
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.digest {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "-{}", if self.is_server { "s" } else { "c" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_branch_and_method_produce_the_same_key() {
        let a = TransactionKey::new("z9hG4bK776asdhds", Method::Invite, false);
        let b = TransactionKey::new("z9hG4bK776asdhds", Method::Invite, false);
        assert_eq!(a, b);
    }

    #[test]
    fn client_and_server_roles_never_collide_even_with_identical_branch_and_method() {
        let client = TransactionKey::new("z9hG4bK776asdhds", Method::Invite, false);
        let server = TransactionKey::new("z9hG4bK776asdhds", Method::Invite, true);
        assert_ne!(client, server);
    }

    #[test]
    fn cancel_and_invite_are_distinct_transactions_despite_sharing_a_branch() {
        let invite = TransactionKey::new("z9hG4bK776asdhds", Method::Invite, true);
        let cancel = TransactionKey::new("z9hG4bK776asdhds", Method::Cancel, true);
        assert_ne!(invite, cancel);
    }
}
