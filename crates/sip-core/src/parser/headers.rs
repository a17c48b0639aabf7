//! Grammars for header values that carry structure beyond a single
//! token: Via, To/From (name-addr), Contact, and Route/Record-Route.

use crate::error::{Error, Result};
use crate::types::headers::Contact;
use crate::types::param::Param;
use crate::types::route::{RouteEntry, RouteSet};
use crate::types::to_from::NameAddr;
use crate::types::uri::{Host, Uri};
use crate::types::via::{SentProtocol, Via, ViaHeader};

/// Split a header value into its comma-separated top-level entries,
/// respecting quoted strings and angle brackets so commas inside a
/// display name or URI parameter list aren't mistaken for separators.
fn split_entries(value: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut depth_angle = 0i32;
    let mut in_quotes = false;
    let mut start = 0usize;
    let bytes = value.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' => in_quotes = !in_quotes,
            b'<' if !in_quotes => depth_angle += 1,
            b'>' if !in_quotes => depth_angle -= 1,
            b',' if !in_quotes && depth_angle == 0 => {
                entries.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(value[start..].trim());
    entries
}

fn parse_params(rest: &str) -> Vec<Param> {
    rest.split(';')
        .skip(1)
        .filter(|s| !s.is_empty())
        .map(|p| match p.split_once('=') {
            Some((name, value)) => Param::from_name_value(&name.to_ascii_lowercase(), Some(value)),
            None => Param::from_name_value(&p.to_ascii_lowercase(), None),
        })
        .collect()
}

/// Splits `"<uri-or-bare>;params..."` style text into a URI (with any
/// `<...>` wrapper stripped), an optional display name, and params.
fn split_display_uri_params(entry: &str) -> Result<(Option<String>, &str, &str)> {
    if let Some(open) = entry.find('<') {
        let display = entry[..open].trim().trim_matches('"');
        let display = if display.is_empty() { None } else { Some(display.to_string()) };
        let close = entry[open..]
            .find('>')
            .ok_or_else(|| Error::invalid_header("name-addr", "missing closing '>'"))?
            + open;
        let uri = &entry[open + 1..close];
        let params_part = &entry[close + 1..];
        Ok((display, uri, params_part))
    } else {
        // Bare URI form: params (if any) belong to the URI itself, not the header.
        let semi = entry.find(';').unwrap_or(entry.len());
        Ok((None, &entry[..semi], &entry[semi..]))
    }
}

pub fn parse_name_addr(value: &str) -> Result<NameAddr> {
    let (display_name, uri_str, params_str) = split_display_uri_params(value.trim())?;
    let uri: Uri = uri_str.parse()?;
    let params = parse_params(params_str);
    Ok(NameAddr { display_name, uri, params })
}

pub fn parse_contact(value: &str) -> Result<Contact> {
    let (display_name, uri_str, params_str) = split_display_uri_params(value.trim())?;
    let uri: Uri = uri_str.parse()?;
    let params = parse_params(params_str);
    Ok(Contact { uri, display_name, params })
}

pub fn parse_route_set(value: &str) -> Result<RouteSet> {
    let mut entries = Vec::new();
    for entry in split_entries(value) {
        if entry.is_empty() {
            continue;
        }
        let (display_name, uri_str, _params) = split_display_uri_params(entry)?;
        let uri: Uri = uri_str.parse()?;
        entries.push(RouteEntry { display_name, uri });
    }
    Ok(RouteSet(entries))
}

fn parse_via_entry(entry: &str) -> Result<ViaHeader> {
    let (proto_and_host, params_str) = match entry.find(';') {
        Some(i) => (&entry[..i], &entry[i..]),
        None => (entry, ""),
    };
    let mut parts = proto_and_host.split_whitespace();
    let protocol_token = parts
        .next()
        .ok_or_else(|| Error::invalid_header("Via", "missing sent-protocol"))?;
    let sent_by = parts
        .next()
        .ok_or_else(|| Error::invalid_header("Via", "missing sent-by"))?;

    let mut proto_parts = protocol_token.splitn(3, '/');
    let name = proto_parts.next().unwrap_or("SIP").to_string();
    let version = proto_parts.next().unwrap_or("2.0").to_string();
    let transport = proto_parts
        .next()
        .ok_or_else(|| Error::invalid_header("Via", "missing transport"))?
        .to_string();

    let (host_str, port) = match sent_by.rsplit_once(':') {
        Some((h, p)) if !h.ends_with(']') || h.starts_with('[') => {
            match p.parse::<u16>() {
                Ok(port) => (h, Some(port)),
                Err(_) => (sent_by, None),
            }
        }
        _ => (sent_by, None),
    };
    let host: Host = host_str.parse()?;
    let params = parse_params(params_str);

    Ok(ViaHeader {
        sent_protocol: SentProtocol { name, version, transport },
        sent_by_host: host,
        sent_by_port: port,
        params,
    })
}

pub fn parse_via(value: &str) -> Result<Via> {
    let entries: Result<Vec<ViaHeader>> = split_entries(value).into_iter().map(parse_via_entry).collect();
    Ok(Via(entries?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_via_with_branch() {
        let via = parse_via("SIP/2.0/UDP pc33.atlanta.example.com:5060;branch=z9hG4bK776asdhds").unwrap();
        assert_eq!(via.branch(), Some("z9hG4bK776asdhds"));
        assert_eq!(via.top().unwrap().transport(), "UDP");
    }

    #[test]
    fn parses_multiple_via_entries() {
        let via = parse_via("SIP/2.0/UDP a.example.com;branch=z9hG4bK-a, SIP/2.0/UDP b.example.com;branch=z9hG4bK-b").unwrap();
        assert_eq!(via.entries().len(), 2);
        assert_eq!(via.branch(), Some("z9hG4bK-a"));
    }

    #[test]
    fn parses_name_addr_with_display_name_and_tag() {
        let addr = parse_name_addr("\"Alice\" <sip:alice@atlanta.example.com>;tag=1928301774").unwrap();
        assert_eq!(addr.display_name.as_deref(), Some("Alice"));
        assert_eq!(addr.tag(), Some("1928301774"));
    }

    #[test]
    fn parses_bare_uri_without_angle_brackets() {
        let addr = parse_name_addr("sip:bob@biloxi.example.com").unwrap();
        assert!(addr.display_name.is_none());
    }
}
