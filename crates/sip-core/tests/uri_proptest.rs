//! Property coverage for the URI grammar (RFC 3261 §25.1): any URI this
//! crate can build from its typed constructors must parse back out to
//! an equal value after being formatted to text.

use proptest::prelude::*;
use sip_core::{Host, Scheme, Uri};

fn scheme_strategy() -> impl Strategy<Value = Scheme> {
    prop_oneof![
        Just(Scheme::Sip),
        Just(Scheme::Sips),
        Just(Scheme::Ws),
        Just(Scheme::Wss),
    ]
}

fn token_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9]{0,15}"
}

proptest! {
    #[test]
    fn uri_with_user_and_port_round_trips(
        scheme in scheme_strategy(),
        user in token_strategy(),
        host in token_strategy(),
        port in proptest::option::of(1u16..=65535),
    ) {
        let mut uri = Uri::new(scheme, Host::domain(format!("{host}.example.com"))).with_user(user);
        if let Some(port) = port {
            uri = uri.with_port(port);
        }

        let text = uri.to_string();
        let parsed: Uri = text.parse().expect("formatted URI must re-parse");
        prop_assert_eq!(parsed, uri);
    }

    #[test]
    fn uri_without_user_round_trips(scheme in scheme_strategy(), host in token_strategy()) {
        let uri = Uri::new(scheme, Host::domain(format!("{host}.example.com")));
        let text = uri.to_string();
        let parsed: Uri = text.parse().expect("formatted URI must re-parse");
        prop_assert_eq!(parsed, uri);
    }

    #[test]
    fn parser_never_panics_on_arbitrary_text(input in ".{0,64}") {
        let _ = input.parse::<Uri>();
    }
}
