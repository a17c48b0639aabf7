//! Stream message framing: finding a complete SIP message's boundary in
//! a byte buffer that may hold a partial message, a full message plus
//! leftover bytes, or NAT keep-alive whitespace (spec §4.1).

use std::ops::Range;

use crate::error::Error;

/// Outcome of attempting to find one complete message at the front of
/// a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameResult {
    /// A full message occupies `range` within the buffer. `skipped`
    /// counts leading bytes (CRLF keep-alives) consumed before it.
    Complete { range: Range<usize>, skipped: usize },
    /// Not enough bytes yet to determine the message's end.
    Incomplete,
    /// The buffer's prefix cannot be a SIP message; `offset` is where
    /// the parser gave up.
    Malformed { offset: usize },
}

const CRLF: &[u8] = b"\r\n";
const DOUBLE_CRLF: &[u8] = b"\r\n\r\n";

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Case-insensitively find a header's value within the already-located
/// header block, returning the raw trimmed value text.
fn find_header_value<'a>(header_block: &'a str, names: &[&str]) -> Option<&'a str> {
    for line in header_block.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else { continue };
        let name = name.trim();
        if names.iter().any(|n| name.eq_ignore_ascii_case(n)) {
            return Some(value.trim());
        }
    }
    None
}

/// Attempt to extract one complete message from the front of `buf`.
///
/// Leading whitespace (space, tab, CR, LF — NAT keep-alives, RFC 5626
/// §3.5.1) is skipped byte-by-byte and counted in `skipped` rather than
/// treated as part of the message or a malformed message.
pub fn try_extract_message(buf: &[u8]) -> FrameResult {
    let mut skipped = 0usize;
    while skipped < buf.len() && matches!(buf[skipped], b' ' | b'\t' | b'\r' | b'\n') {
        skipped += 1;
    }
    if skipped >= buf.len() {
        return FrameResult::Incomplete;
    }

    let remaining = &buf[skipped..];
    let Some(header_end) = find_subslice(remaining, DOUBLE_CRLF) else {
        return FrameResult::Incomplete;
    };
    let body_start = header_end + DOUBLE_CRLF.len();

    let header_block = match std::str::from_utf8(&remaining[..header_end]) {
        Ok(s) => s,
        Err(_) => return FrameResult::Malformed { offset: skipped },
    };

    let content_length = match find_header_value(header_block, &["Content-Length", "l"]) {
        Some(v) => match v.parse::<usize>() {
            Ok(n) => n,
            Err(_) => return FrameResult::Malformed { offset: skipped },
        },
        None => 0,
    };

    let total_len = body_start + content_length;
    if remaining.len() < total_len {
        return FrameResult::Incomplete;
    }

    FrameResult::Complete {
        range: skipped..skipped + total_len,
        skipped,
    }
}

impl From<FrameResult> for Result<Range<usize>, Error> {
    fn from(result: FrameResult) -> Self {
        match result {
            FrameResult::Complete { range, .. } => Ok(range),
            FrameResult::Incomplete => Err(Error::Incomplete),
            FrameResult::Malformed { offset } => {
                Err(Error::Malformed { offset, message: "could not locate message boundary".to_string() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_request(content_length: usize) -> Vec<u8> {
        format!(
            "OPTIONS sip:bob@biloxi.example.com SIP/2.0\r\nContent-Length: {}\r\n\r\n",
            content_length
        )
        .into_bytes()
    }

    #[test]
    fn incomplete_when_headers_not_terminated() {
        let buf = b"OPTIONS sip:bob@biloxi.example.com SIP/2.0\r\nContent-Length: 0\r\n";
        assert_eq!(try_extract_message(buf), FrameResult::Incomplete);
    }

    #[test]
    fn incomplete_when_body_not_fully_buffered() {
        let mut buf = ok_request(10);
        buf.extend_from_slice(b"12345");
        assert_eq!(try_extract_message(&buf), FrameResult::Incomplete);
    }

    #[test]
    fn complete_with_zero_length_body() {
        let buf = ok_request(0);
        let result = try_extract_message(&buf);
        assert_eq!(result, FrameResult::Complete { range: 0..buf.len(), skipped: 0 });
    }

    #[test]
    fn complete_with_compact_content_length_and_arbitrary_spacing() {
        let buf = b"OPTIONS sip:bob@biloxi.example.com SIP/2.0\r\nl:   5\r\n\r\nhello".to_vec();
        let result = try_extract_message(&buf);
        assert_eq!(result, FrameResult::Complete { range: 0..buf.len(), skipped: 0 });
    }

    #[test]
    fn skips_leading_nat_keepalive_whitespace() {
        let mut buf = b"\r\n\r\n".to_vec();
        let msg = ok_request(0);
        buf.extend_from_slice(&msg);
        let result = try_extract_message(&buf);
        assert_eq!(result, FrameResult::Complete { range: 4..buf.len(), skipped: 4 });
    }

    #[test]
    fn skips_leading_spaces_not_just_crlf_pairs() {
        let mut buf = b"    ".to_vec();
        let msg = ok_request(0);
        buf.extend_from_slice(&msg);
        let result = try_extract_message(&buf);
        assert_eq!(result, FrameResult::Complete { range: 4..buf.len(), skipped: 4 });
    }

    #[test]
    fn leaves_trailing_bytes_for_the_next_message() {
        let mut buf = ok_request(0);
        let trailer_start = buf.len();
        buf.extend_from_slice(&ok_request(0));
        let result = try_extract_message(&buf);
        assert_eq!(result, FrameResult::Complete { range: 0..trailer_start, skipped: 0 });
    }

    #[test]
    fn malformed_content_length_is_reported() {
        let buf = b"OPTIONS sip:bob@biloxi.example.com SIP/2.0\r\nContent-Length: not-a-number\r\n\r\n".to_vec();
        assert_eq!(try_extract_message(&buf), FrameResult::Malformed { offset: 0 });
    }
}
