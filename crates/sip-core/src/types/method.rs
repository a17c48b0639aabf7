//! SIP request methods (RFC 3261 §6, plus the common extension methods
//! this stack needs to route: SUBSCRIBE/NOTIFY/REFER/PRACK/MESSAGE/UPDATE/PUBLISH).

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A SIP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Invite,
    Ack,
    Bye,
    Cancel,
    Register,
    Options,
    Subscribe,
    Notify,
    Refer,
    Prack,
    Info,
    Message,
    Update,
    Publish,
}

impl Method {
    /// Returns the wire token for this method (e.g. `"INVITE"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Register => "REGISTER",
            Method::Options => "OPTIONS",
            Method::Subscribe => "SUBSCRIBE",
            Method::Notify => "NOTIFY",
            Method::Refer => "REFER",
            Method::Prack => "PRACK",
            Method::Info => "INFO",
            Method::Message => "MESSAGE",
            Method::Update => "UPDATE",
            Method::Publish => "PUBLISH",
        }
    }

    /// True for INVITE, the only method with its own dedicated
    /// client/server transaction state machines (RFC 3261 §17).
    pub fn is_invite(&self) -> bool {
        matches!(self, Method::Invite)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INVITE" => Ok(Method::Invite),
            "ACK" => Ok(Method::Ack),
            "BYE" => Ok(Method::Bye),
            "CANCEL" => Ok(Method::Cancel),
            "REGISTER" => Ok(Method::Register),
            "OPTIONS" => Ok(Method::Options),
            "SUBSCRIBE" => Ok(Method::Subscribe),
            "NOTIFY" => Ok(Method::Notify),
            "REFER" => Ok(Method::Refer),
            "PRACK" => Ok(Method::Prack),
            "INFO" => Ok(Method::Info),
            "MESSAGE" => Ok(Method::Message),
            "UPDATE" => Ok(Method::Update),
            "PUBLISH" => Ok(Method::Publish),
            other => Err(Error::InvalidMethod(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_methods() {
        for m in [
            Method::Invite, Method::Ack, Method::Bye, Method::Cancel,
            Method::Register, Method::Options, Method::Subscribe, Method::Notify,
            Method::Refer, Method::Prack, Method::Info, Method::Message,
            Method::Update, Method::Publish,
        ] {
            assert_eq!(Method::from_str(m.as_str()).unwrap(), m);
        }
    }

    #[test]
    fn rejects_unknown_method() {
        assert!(Method::from_str("FROB").is_err());
    }
}
