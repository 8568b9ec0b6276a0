//! Wire-format encoders for building test traffic.
//!
//! These are the write-side inverses of the decoders, kept small and
//! allocation-happy because their audience is tests: unit suites, the
//! integration suites, and property tests all build byte-accurate frames
//! through them rather than hand-transcribing hex.

#![expect(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    reason = "Builders encode small, test-controlled sizes."
)]

use crate::{
    byte_order::{write_network_i16, write_network_i32, write_network_i64, write_network_u16, write_network_u32},
    cursor::zigzag_encode,
};

/// Append an unsigned varint in base-128 little-endian groups.
pub fn put_unsigned_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let group = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(group);
            return;
        }
        buf.push(group | 0x80);
    }
}

/// Append a zigzag-encoded signed varint.
pub fn put_varint(buf: &mut Vec<u8>, value: i64) {
    put_unsigned_varint(buf, zigzag_encode(value));
}

pub fn put_i16(buf: &mut Vec<u8>, value: i16) {
    buf.extend_from_slice(&write_network_i16(value));
}

pub fn put_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&write_network_i32(value));
}

pub fn put_i64(buf: &mut Vec<u8>, value: i64) {
    buf.extend_from_slice(&write_network_i64(value));
}

pub fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&write_network_u16(value));
}

pub fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&write_network_u32(value));
}

/// Non-flexible nullable string: i16 length, `-1` for null.
pub fn put_nullable_string(buf: &mut Vec<u8>, value: Option<&str>) {
    match value {
        None => put_i16(buf, -1),
        Some(s) => {
            put_i16(buf, s.len() as i16);
            buf.extend_from_slice(s.as_bytes());
        }
    }
}

/// Compact nullable string: varint `length + 1`, `0` for null.
pub fn put_compact_nullable_string(buf: &mut Vec<u8>, value: Option<&str>) {
    match value {
        None => put_unsigned_varint(buf, 0),
        Some(s) => {
            put_unsigned_varint(buf, s.len() as u64 + 1);
            buf.extend_from_slice(s.as_bytes());
        }
    }
}

/// String in whichever encoding the flexible flag selects.
pub fn put_string(buf: &mut Vec<u8>, flexible: bool, value: &str) {
    if flexible {
        put_compact_nullable_string(buf, Some(value));
    } else {
        put_nullable_string(buf, Some(value));
    }
}

/// Zigzag-length byte string: `-1` for absent.
pub fn put_bytes_zigzag(buf: &mut Vec<u8>, value: Option<&[u8]>) {
    match value {
        None => put_varint(buf, -1),
        Some(bytes) => {
            put_varint(buf, bytes.len() as i64);
            buf.extend_from_slice(bytes);
        }
    }
}

/// Array count prefix in whichever encoding the flexible flag selects.
pub fn put_array_count(buf: &mut Vec<u8>, flexible: bool, count: usize) {
    if flexible {
        put_unsigned_varint(buf, count as u64 + 1);
    } else {
        put_i32(buf, count as i32);
    }
}

/// Empty tagged-field section.
pub fn put_tagged_fields(buf: &mut Vec<u8>, flexible: bool) {
    if flexible {
        put_unsigned_varint(buf, 0);
    }
}

/// One v2 record: length-prefixed deltas plus key/value, no headers.
pub fn encode_record(timestamp_delta: i64, offset_delta: i32, key: Option<&[u8]>, value: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    body.push(0); // attributes
    put_varint(&mut body, timestamp_delta);
    put_varint(&mut body, i64::from(offset_delta));
    put_bytes_zigzag(&mut body, key);
    put_bytes_zigzag(&mut body, value);
    put_varint(&mut body, 0); // header count
    let mut out = Vec::new();
    put_varint(&mut out, body.len() as i64);
    out.extend_from_slice(&body);
    out
}

/// A v2 record batch around pre-encoded records.
pub fn encode_record_batch(base_offset: i64, records: &[Vec<u8>]) -> Vec<u8> {
    let mut body = Vec::new();
    put_i32(&mut body, 0); // partition leader epoch
    body.push(2); // magic
    put_i32(&mut body, 0); // crc, not validated on decode
    put_i16(&mut body, 0); // attributes
    put_i32(&mut body, records.len() as i32 - 1); // last offset delta
    put_i64(&mut body, 1_600_000_000_000); // first timestamp
    put_i64(&mut body, 1_600_000_000_500); // max timestamp
    put_i64(&mut body, -1); // producer id
    put_i16(&mut body, -1); // producer epoch
    put_i32(&mut body, -1); // base sequence
    put_i32(&mut body, records.len() as i32);
    for record in records {
        body.extend_from_slice(record);
    }
    let mut out = Vec::new();
    put_i64(&mut out, base_offset);
    put_i32(&mut out, body.len() as i32);
    out.extend_from_slice(&body);
    out
}

/// A produce request body for one topic and one partition.
pub fn encode_produce_req_body(
    version: i16,
    flexible: bool,
    topic: &str,
    partition: i32,
    batch: &[u8],
) -> Vec<u8> {
    let mut body = Vec::new();
    if version >= 3 {
        if flexible {
            put_compact_nullable_string(&mut body, None);
        } else {
            put_nullable_string(&mut body, None);
        }
    }
    put_i16(&mut body, -1); // acks
    put_i32(&mut body, 30_000); // timeout
    put_array_count(&mut body, flexible, 1);
    put_string(&mut body, flexible, topic);
    put_array_count(&mut body, flexible, 1);
    put_i32(&mut body, partition);
    if flexible {
        put_unsigned_varint(&mut body, batch.len() as u64 + 1);
    } else {
        put_i32(&mut body, batch.len() as i32);
    }
    body.extend_from_slice(batch);
    put_tagged_fields(&mut body, flexible); // partition
    put_tagged_fields(&mut body, flexible); // topic
    put_tagged_fields(&mut body, flexible); // request
    body
}

/// A produce response body for one topic and one partition, honouring the
/// version-gated fields.
pub fn encode_produce_resp_body(
    version: i16,
    flexible: bool,
    topic: &str,
    partition: i32,
    error_code: i16,
    base_offset: i64,
) -> Vec<u8> {
    let mut body = Vec::new();
    put_array_count(&mut body, flexible, 1);
    put_string(&mut body, flexible, topic);
    put_array_count(&mut body, flexible, 1);
    put_i32(&mut body, partition);
    put_i16(&mut body, error_code);
    put_i64(&mut body, base_offset);
    if version >= 2 {
        put_i64(&mut body, -1); // log append time
    }
    if version >= 5 {
        put_i64(&mut body, 0); // log start offset
    }
    if version >= 8 {
        put_array_count(&mut body, flexible, 0); // record errors
        if flexible {
            put_compact_nullable_string(&mut body, None);
        } else {
            put_nullable_string(&mut body, None);
        }
    }
    put_tagged_fields(&mut body, flexible); // partition
    put_tagged_fields(&mut body, flexible); // topic
    if version >= 1 {
        put_i32(&mut body, 0); // throttle time
    }
    put_tagged_fields(&mut body, flexible); // response
    body
}

/// A framed request: length prefix, header, body.
pub fn encode_req_frame(
    api_key: i16,
    api_version: i16,
    correlation_id: i32,
    client_id: Option<&str>,
    flexible: bool,
    body: &[u8],
) -> Vec<u8> {
    let mut payload = Vec::new();
    put_i16(&mut payload, api_key);
    put_i16(&mut payload, api_version);
    put_i32(&mut payload, correlation_id);
    put_nullable_string(&mut payload, client_id);
    put_tagged_fields(&mut payload, flexible);
    payload.extend_from_slice(body);
    frame(payload)
}

/// A framed response: length prefix, correlation header, body.
pub fn encode_resp_frame(correlation_id: i32, flexible: bool, body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();
    put_i32(&mut payload, correlation_id);
    put_tagged_fields(&mut payload, flexible);
    payload.extend_from_slice(body);
    frame(payload)
}

fn frame(payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::new();
    put_i32(&mut out, payload.len() as i32);
    out.extend_from_slice(&payload);
    out
}

/// A DNS name in uncompressed label encoding.
pub fn put_dns_name(buf: &mut Vec<u8>, name: &str) {
    for label in name.split('.').filter(|l| !l.is_empty()) {
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
}

/// A single-question DNS query datagram.
pub fn encode_dns_query(txid: u16, name: &str, qtype: u16) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, txid);
    put_u16(&mut out, 0x0100); // flags: standard query, recursion desired
    put_u16(&mut out, 1); // questions
    put_u16(&mut out, 0); // answers
    put_u16(&mut out, 0); // authority
    put_u16(&mut out, 0); // additional
    put_dns_name(&mut out, name);
    put_u16(&mut out, qtype);
    put_u16(&mut out, 1); // class IN
    out
}

/// A DNS response answering `name` with one A record, echoing the question.
pub fn encode_dns_a_response(txid: u16, name: &str, addr: [u8; 4]) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, txid);
    put_u16(&mut out, 0x8180); // flags: response, recursion available
    put_u16(&mut out, 1); // questions
    put_u16(&mut out, 1); // answers
    put_u16(&mut out, 0);
    put_u16(&mut out, 0);
    put_dns_name(&mut out, name);
    put_u16(&mut out, 1); // type A
    put_u16(&mut out, 1); // class IN
    // Answer: compression pointer back to the question name at offset 12.
    out.extend_from_slice(&[0xc0, 0x0c]);
    put_u16(&mut out, 1);
    put_u16(&mut out, 1);
    put_u32(&mut out, 300); // ttl
    put_u16(&mut out, 4); // rdlength
    out.extend_from_slice(&addr);
    out
}
