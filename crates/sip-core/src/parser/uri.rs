//! Parser for the SIP/SIPS/WS/WSS URI grammar (RFC 3261 §25.1).

use std::collections::BTreeMap;
use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::char;
use nom::combinator::opt;
use nom::sequence::preceded;
use nom::IResult;

use crate::error::{Error, Result};
use crate::types::param::Param;
use crate::types::uri::{Host, Scheme, Uri};

fn is_user_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-_.!~*'()&=+$,;?/%".contains(c)
}

fn is_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-'
}

fn is_param_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-_.!~*'()%".contains(c)
}

fn scheme(input: &str) -> IResult<&str, Scheme> {
    let (input, token) = alt((tag("sips"), tag("sip"), tag("wss"), tag("ws")))(input)?;
    let (input, _) = char(':')(input)?;
    let scheme = Scheme::from_str(token).map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))
    })?;
    Ok((input, scheme))
}

fn userinfo(input: &str) -> IResult<&str, (String, Option<String>)> {
    let (input, user) = take_while1(is_user_char)(input)?;
    let (input, password) = opt(preceded(char(':'), take_while(is_user_char)))(input)?;
    let (input, _) = char('@')(input)?;
    Ok((input, (user.to_string(), password.map(str::to_string))))
}

fn host(input: &str) -> IResult<&str, Host> {
    if let Some(rest) = input.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            let (literal, remainder) = rest.split_at(end);
            let remainder = &remainder[1..];
            let addr = literal
                .parse()
                .map(std::net::IpAddr::V6)
                .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)))?;
            return Ok((remainder, Host::Address(addr)));
        }
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }
    let (input, token) = take_while1(is_host_char)(input)?;
    let host = Host::from_str(token)
        .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)))?;
    Ok((input, host))
}

fn port(input: &str) -> IResult<&str, u16> {
    let (input, digits) = preceded(char(':'), take_while1(|c: char| c.is_ascii_digit()))(input)?;
    let port = digits
        .parse()
        .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit)))?;
    Ok((input, port))
}

fn param(input: &str) -> IResult<&str, Param> {
    let (input, _) = char(';')(input)?;
    let (input, name) = take_while1(is_param_char)(input)?;
    let (input, value) = opt(preceded(char('='), take_while1(is_param_char)))(input)?;
    Ok((input, Param::from_name_value(&name.to_ascii_lowercase(), value)))
}

/// Parse a SIP/SIPS/WS/WSS URI from its textual form, e.g.
/// `sip:alice@atlanta.example.com;transport=tcp`.
pub fn parse_uri_str(s: &str) -> Result<Uri> {
    let s = s.trim();
    let (rest, scheme) = scheme(s).map_err(|_| Error::InvalidUri(s.to_string()))?;
    let (rest, userinfo) = opt(userinfo)(rest).map_err(|_: nom::Err<nom::error::Error<&str>>| Error::InvalidUri(s.to_string()))?;
    let (rest, host) = host(rest).map_err(|_| Error::InvalidUri(s.to_string()))?;
    let (mut rest, port) = opt(port)(rest).map_err(|_: nom::Err<nom::error::Error<&str>>| Error::InvalidUri(s.to_string()))?;

    let mut parameters = Vec::new();
    while let Ok((next, p)) = param(rest) {
        parameters.push(p);
        rest = next;
    }

    let mut headers = BTreeMap::new();
    if let Some(stripped) = rest.strip_prefix('?') {
        for pair in stripped.split('&') {
            if let Some((k, v)) = pair.split_once('=') {
                headers.insert(k.to_string(), v.to_string());
            }
        }
    }

    let (user, password) = match userinfo {
        Some((u, p)) => (Some(u), p),
        None => (None, None),
    };

    Ok(Uri { scheme, user, password, host, port, parameters, headers })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_uri() {
        let uri = parse_uri_str("sip:atlanta.example.com").unwrap();
        assert_eq!(uri.scheme, Scheme::Sip);
        assert!(uri.user.is_none());
    }

    #[test]
    fn parses_uri_with_user_port_and_params() {
        let uri = parse_uri_str("sips:alice@atlanta.example.com:5061;transport=tcp;lr").unwrap();
        assert_eq!(uri.scheme, Scheme::Sips);
        assert_eq!(uri.user.as_deref(), Some("alice"));
        assert_eq!(uri.port, Some(5061));
        assert_eq!(uri.transport(), Some("tcp"));
        assert!(uri.is_loose_routing());
    }

    #[test]
    fn parses_ipv6_host() {
        let uri = parse_uri_str("sip:[2001:db8::1]:5060").unwrap();
        assert_eq!(uri.port, Some(5060));
        assert!(matches!(uri.host, Host::Address(std::net::IpAddr::V6(_))));
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(parse_uri_str("tel:+14155551212").is_err());
    }
}
