//! Assembling a complete [`Message`] from a header block and body,
//! given a buffer that framing has already shown holds one full message.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::parser::ParseMode;
use crate::types::header::{parse_typed_header, HeaderName, TypedHeader};
use crate::types::message::{Headers, Message, Request, Response};
use crate::types::method::Method;
use crate::types::status::StatusCode;
use crate::types::uri::Uri;

/// Parse one complete message out of `input` using the default
/// ([`ParseMode::Strict`]) grammar. Callers that front a stream should
/// first locate the message boundary with
/// [`crate::parser::framing::try_extract_message`].
pub fn parse_message(input: &[u8], mode: ParseMode) -> Result<Message> {
    let text = std::str::from_utf8(input)
        .map_err(|_| Error::Malformed { offset: 0, message: "message is not valid UTF-8".to_string() })?;

    let header_end = text
        .find("\r\n\r\n")
        .ok_or(Error::Incomplete)?;
    let (head, _) = text.split_at(header_end);
    let body_start = header_end + 4;
    let body = Bytes::copy_from_slice(&input[body_start..]);

    let mut lines = head.split("\r\n");
    let start_line = lines.next().ok_or_else(|| Error::InvalidStartLine(String::new()))?;

    let headers = parse_header_lines(lines, mode)?;

    if let Some(stripped) = start_line.strip_prefix("SIP/2.0 ") {
        parse_status_line(stripped, headers, body)
    } else {
        parse_request_line(start_line, headers, body, mode)
    }
}

fn parse_request_line(line: &str, headers: Headers, body: Bytes, mode: ParseMode) -> Result<Message> {
    let mut parts = line.splitn(3, ' ');
    let method_token = parts.next().ok_or_else(|| Error::InvalidStartLine(line.to_string()))?;
    let uri_token = parts.next().ok_or_else(|| Error::InvalidStartLine(line.to_string()))?;
    let version = parts.next().ok_or_else(|| Error::InvalidStartLine(line.to_string()))?;
    if version != "SIP/2.0" {
        return Err(Error::InvalidVersion);
    }

    let method = match Method::from_str_mode(method_token, mode) {
        Some(m) => m,
        None => return Err(Error::InvalidMethod(method_token.to_string())),
    };
    let uri: Uri = uri_token.parse()?;

    Ok(Message::Request(Request { method, uri, headers, body }))
}

fn parse_status_line(rest: &str, headers: Headers, body: Bytes) -> Result<Message> {
    let mut parts = rest.splitn(2, ' ');
    let code_token = parts.next().ok_or_else(|| Error::InvalidStartLine(rest.to_string()))?;
    let reason = parts.next().unwrap_or("").to_string();
    let code: u16 = code_token
        .parse()
        .map_err(|_| Error::InvalidStartLine(rest.to_string()))?;
    let status = StatusCode::new(code)?;
    Ok(Message::Response(Response { status, reason, headers, body }))
}

fn parse_header_lines<'a>(lines: impl Iterator<Item = &'a str>, mode: ParseMode) -> Result<Headers> {
    let mut headers = Headers::new();
    let mut unfolded: Vec<String> = Vec::new();

    for line in lines {
        if (line.starts_with(' ') || line.starts_with('\t')) && !unfolded.is_empty() {
            // Line folding (RFC 2822 §2.2.3, inherited by SIP's header grammar).
            let last = unfolded.last_mut().unwrap();
            last.push(' ');
            last.push_str(line.trim_start());
        } else {
            unfolded.push(line.to_string());
        }
    }

    for line in unfolded {
        if line.trim().is_empty() {
            continue;
        }
        let (name_token, value) = line
            .split_once(':')
            .ok_or_else(|| Error::invalid_header("unknown", "missing ':' separator"))?;
        let name_token = name_token.trim();
        if mode == ParseMode::Strict && name_token.contains(char::is_whitespace) {
            return Err(Error::invalid_header(name_token, "whitespace in header name"));
        }
        let name = HeaderName::parse(name_token);
        let value = value.trim();

        if name.is_comma_separated() && !matches!(name, HeaderName::Via) {
            for entry in split_top_level_commas(value) {
                headers.push(parse_typed_header(&name, entry));
            }
        } else {
            headers.push(parse_typed_header(&name, value));
        }
    }

    Ok(headers)
}

/// Split on commas that are not inside a quoted string or `<...>` URI,
/// used for Contact/Route/Record-Route lists (Via handles its own
/// entry splitting since branch ordering must stay intact per entry).
fn split_top_level_commas(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut start = 0usize;
    for (i, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '<' if !quoted => depth += 1,
            '>' if !quoted => depth -= 1,
            ',' if !quoted && depth == 0 => {
                out.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(value[start..].trim());
    out
}

impl Method {
    /// Lenient mode additionally accepts lowercase method tokens, which
    /// some older UAs still emit despite RFC 3261 §7.1 requiring uppercase.
    fn from_str_mode(token: &str, mode: ParseMode) -> Option<Method> {
        use std::str::FromStr;
        if let Ok(m) = Method::from_str(token) {
            return Some(m);
        }
        if mode == ParseMode::Lenient {
            return Method::from_str(&token.to_ascii_uppercase()).ok();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> Vec<u8> {
        b"INVITE sip:bob@biloxi.example.com SIP/2.0\r\n\
Via: SIP/2.0/UDP pc33.atlanta.example.com;branch=z9hG4bK776asdhds\r\n\
Max-Forwards: 70\r\n\
To: Bob <sip:bob@biloxi.example.com>\r\n\
From: Alice <sip:alice@atlanta.example.com>;tag=1928301774\r\n\
Call-ID: a84b4c76e66710@pc33.atlanta.example.com\r\n\
CSeq: 314159 INVITE\r\n\
Contact: <sip:alice@pc33.atlanta.example.com>\r\n\
Content-Length: 0\r\n\r\n"
            .to_vec()
    }

    #[test]
    fn parses_invite_request_with_all_core_headers() {
        let msg = parse_message(&sample_request(), ParseMode::Strict).unwrap();
        let Message::Request(req) = msg else { panic!("expected request") };
        assert_eq!(req.method, Method::Invite);
        assert_eq!(req.branch(), Some("z9hG4bK776asdhds"));
        assert_eq!(req.headers.call_id().unwrap().0, "a84b4c76e66710@pc33.atlanta.example.com");
        assert_eq!(req.headers.cseq().unwrap().sequence, 314159);
    }

    #[test]
    fn parses_response_status_line() {
        let buf = b"SIP/2.0 180 Ringing\r\nVia: SIP/2.0/UDP pc33.atlanta.example.com;branch=z9hG4bK776asdhds\r\nContent-Length: 0\r\n\r\n";
        let msg = parse_message(buf, ParseMode::Strict).unwrap();
        let Message::Response(resp) = msg else { panic!("expected response") };
        assert_eq!(resp.status, StatusCode::RINGING);
        assert_eq!(resp.reason, "Ringing");
    }

    #[test]
    fn unfolds_continuation_lines() {
        let buf = b"OPTIONS sip:bob@biloxi.example.com SIP/2.0\r\nTo: Bob\r\n <sip:bob@biloxi.example.com>\r\nContent-Length: 0\r\n\r\n";
        let msg = parse_message(buf, ParseMode::Strict).unwrap();
        assert!(msg.headers().to().is_some());
    }

    #[test]
    fn rejects_non_2_0_version() {
        let buf = b"INVITE sip:bob@biloxi.example.com SIP/1.0\r\nContent-Length: 0\r\n\r\n";
        assert!(matches!(parse_message(buf, ParseMode::Strict), Err(Error::InvalidVersion)));
    }
}
