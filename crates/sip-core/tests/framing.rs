//! End-to-end coverage of spec scenarios that live entirely in the
//! parser/framing layer: compact Content-Length with odd spacing, NAT
//! keep-alive prefixes, and multiple messages back-to-back in one buffer.

use sip_core::parser::framing::{try_extract_message, FrameResult};
use sip_core::Message;

#[test]
fn compact_content_length_with_unusual_spacing_frames_correctly() {
    let buf = b"OPTIONS sip:bob@biloxi.example.com SIP/2.0\r\nl:    11\r\n\r\nhello world".to_vec();
    match try_extract_message(&buf) {
        FrameResult::Complete { range, skipped } => {
            assert_eq!(skipped, 0);
            assert_eq!(&buf[range], &buf[..]);
        }
        other => panic!("expected Complete, got {:?}", other),
    }
}

#[test]
fn nat_keepalive_crlf_prefix_is_skipped_not_rejected() {
    let mut buf = b"\r\n\r\n\r\n".to_vec();
    let start = buf.len();
    buf.extend_from_slice(b"OPTIONS sip:bob@biloxi.example.com SIP/2.0\r\nContent-Length: 0\r\n\r\n");
    match try_extract_message(&buf) {
        FrameResult::Complete { range, skipped } => {
            assert_eq!(skipped, start);
            assert_eq!(range.start, start);
        }
        other => panic!("expected Complete, got {:?}", other),
    }
}

#[test]
fn two_messages_in_one_buffer_yields_only_the_first() {
    let first = b"OPTIONS sip:bob@biloxi.example.com SIP/2.0\r\nContent-Length: 0\r\n\r\n".to_vec();
    let mut buf = first.clone();
    buf.extend_from_slice(b"OPTIONS sip:carol@chicago.example.com SIP/2.0\r\nContent-Length: 0\r\n\r\n");
    match try_extract_message(&buf) {
        FrameResult::Complete { range, .. } => {
            assert_eq!(range.end, first.len());
            let msg = Message::parse(&buf[range]).unwrap();
            assert!(msg.is_request());
        }
        other => panic!("expected Complete, got {:?}", other),
    }
}

#[test]
fn round_trip_preserves_structure_not_bytes() {
    let buf = b"INVITE sip:bob@biloxi.example.com SIP/2.0\r\n\
Via: SIP/2.0/UDP pc33.atlanta.example.com;branch=z9hG4bK776asdhds\r\n\
Max-Forwards: 70\r\n\
To: Bob <sip:bob@biloxi.example.com>\r\n\
From: Alice <sip:alice@atlanta.example.com>;tag=1928301774\r\n\
Call-ID: a84b4c76e66710@pc33.atlanta.example.com\r\n\
CSeq: 314159 INVITE\r\n\
Content-Length: 0\r\n\r\n"
        .to_vec();
    let msg = Message::parse(&buf).unwrap();
    let rendered = msg.to_string();
    let reparsed = Message::parse(rendered.as_bytes()).unwrap();
    assert_eq!(msg, reparsed);
}
