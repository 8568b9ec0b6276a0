//! DNS message parsing and stitching.
//!
//! DNS messages are datagram-shaped: one captured buffer is one message,
//! and every field is decodable immediately, so frames are fully typed at
//! parse time. The only subtlety is name compression, where a label chain
//! may end in a pointer back into the message; hops are bounded to keep
//! crafted pointer loops from spinning the parser.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::warn;

use crate::{
    cursor::BinaryCursor,
    decode::{DecodeError, DecodeResult},
    dns::types::{DnsAnswer, DnsFrame, DnsHeader, DnsQuestion, DnsRecord, DnsRecordData},
    framing::{Direction, Framing, ParseState},
    metrics,
    stitcher::{StitchConfig, StitchResult, stitch_frames},
};

const HEADER_LEN: usize = 12;
/// Pointer-hop ceiling; legitimate messages chain a handful at most.
const MAX_POINTER_HOPS: usize = 8;
/// Wire limit on a full domain name.
const MAX_NAME_LEN: usize = 255;

const TYPE_A: u16 = 1;
const TYPE_CNAME: u16 = 5;
const TYPE_AAAA: u16 = 28;

/// Read a label-encoded name starting at `*pos`, following compression
/// pointers anywhere in `message`. `*pos` advances past the name's bytes at
/// its original location only.
fn read_name(message: &[u8], pos: &mut usize) -> DecodeResult<String> {
    let mut labels: Vec<String> = Vec::new();
    let mut cursor = *pos;
    let mut name_len = 0usize;
    let mut hops = 0usize;
    let mut jumped = false;
    loop {
        let &len_byte = message.get(cursor).ok_or(DecodeError::InsufficientData {
            have: message.len().saturating_sub(cursor),
            need: 1,
        })?;
        match len_byte {
            0 => {
                if !jumped {
                    *pos = cursor + 1;
                }
                return Ok(labels.join("."));
            }
            b if b & 0xc0 == 0xc0 => {
                let &low = message.get(cursor + 1).ok_or(DecodeError::InsufficientData {
                    have: message.len() - cursor,
                    need: 2,
                })?;
                if !jumped {
                    *pos = cursor + 2;
                    jumped = true;
                }
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(DecodeError::Malformed {
                        reason: "compression pointer loop",
                    });
                }
                cursor = usize::from(b & 0x3f) << 8 | usize::from(low);
            }
            b if b & 0xc0 != 0 => {
                return Err(DecodeError::Malformed {
                    reason: "reserved label type bits",
                });
            }
            len => {
                let len = usize::from(len);
                let start = cursor + 1;
                let end = start + len;
                let label = message.get(start..end).ok_or(DecodeError::InsufficientData {
                    have: message.len().saturating_sub(start),
                    need: len,
                })?;
                name_len += len + 1;
                if name_len > MAX_NAME_LEN {
                    return Err(DecodeError::Malformed {
                        reason: "name exceeds the 255-byte wire limit",
                    });
                }
                labels.push(String::from_utf8_lossy(label).into_owned());
                cursor = end;
            }
        }
    }
}

fn read_header(cursor: &mut BinaryCursor<'_>) -> DecodeResult<DnsHeader> {
    Ok(DnsHeader {
        txid: cursor.extract_u16()?,
        flags: cursor.extract_u16()?,
        num_queries: cursor.extract_u16()?,
        num_answers: cursor.extract_u16()?,
        num_auth: cursor.extract_u16()?,
        num_addl: cursor.extract_u16()?,
    })
}

fn read_question(message: &[u8], pos: &mut usize) -> DecodeResult<DnsQuestion> {
    let name = read_name(message, pos)?;
    let mut cursor = BinaryCursor::new(message.get(*pos..).unwrap_or(&[]));
    let qtype = cursor.extract_u16()?;
    let qclass = cursor.extract_u16()?;
    *pos += cursor.position();
    Ok(DnsQuestion { name, qtype, qclass })
}

fn read_answer(message: &[u8], pos: &mut usize) -> DecodeResult<DnsAnswer> {
    let name = read_name(message, pos)?;
    let mut cursor = BinaryCursor::new(message.get(*pos..).unwrap_or(&[]));
    let rtype = cursor.extract_u16()?;
    let rclass = cursor.extract_u16()?;
    let ttl = cursor.extract_u32()?;
    let rdlength = usize::from(cursor.extract_u16()?);
    let rdata_start = *pos + cursor.position();
    let rdata = message
        .get(rdata_start..rdata_start + rdlength)
        .ok_or(DecodeError::InsufficientData {
            have: message.len().saturating_sub(rdata_start),
            need: rdlength,
        })?;
    *pos = rdata_start + rdlength;
    let data = match (rtype, rdlength) {
        (TYPE_A, 4) => DnsRecordData::A(Ipv4Addr::new(rdata[0], rdata[1], rdata[2], rdata[3])),
        (TYPE_AAAA, 16) => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(rdata);
            DnsRecordData::Aaaa(Ipv6Addr::from(octets))
        }
        (TYPE_CNAME, _) => {
            // The target may point back into the message, so resolve it
            // against the whole buffer, not the rdata slice.
            let mut cname_pos = rdata_start;
            DnsRecordData::Cname(read_name(message, &mut cname_pos)?)
        }
        _ => DnsRecordData::Other,
    };
    Ok(DnsAnswer {
        name,
        rtype,
        rclass,
        ttl,
        data,
    })
}

/// Parse one complete DNS message.
///
/// # Errors
/// Truncated buffers are [`DecodeError::InsufficientData`]; structural
/// violations (pointer loops, reserved label bits, oversized names) are
/// [`DecodeError::Malformed`].
pub fn parse_message(message: &[u8], timestamp_ns: u64) -> DecodeResult<DnsFrame> {
    let mut cursor = BinaryCursor::new(message);
    let header = read_header(&mut cursor)?;
    let mut pos = cursor.position();
    let mut questions = Vec::with_capacity(usize::from(header.num_queries));
    for _ in 0..header.num_queries {
        questions.push(read_question(message, &mut pos)?);
    }
    let mut answers = Vec::with_capacity(usize::from(header.num_answers));
    for _ in 0..header.num_answers {
        answers.push(read_answer(message, &mut pos)?);
    }
    // Authority and additional sections are not modelled.
    Ok(DnsFrame {
        timestamp_ns,
        header,
        questions,
        answers,
    })
}

/// [`Framing`] for DNS datagrams: one captured buffer, one frame.
#[derive(Debug, Default)]
pub struct DnsFraming;

impl Framing for DnsFraming {
    type Frame = DnsFrame;

    fn find_frame_boundary(&self, direction: Direction, buf: &[u8], start: usize) -> Option<usize> {
        // Datagram capture delivers whole messages; the only plausibility
        // check is a header whose QR bit matches the direction.
        let slice = buf.get(start..)?;
        if slice.len() < HEADER_LEN {
            return None;
        }
        let flags = u16::from(slice[2]) << 8 | u16::from(slice[3]);
        let is_response = flags & 0x8000 != 0;
        (is_response == (direction == Direction::Response)).then_some(start)
    }

    fn parse_frame(
        &mut self,
        direction: Direction,
        buf: &[u8],
        pos: &mut usize,
        timestamp_ns: u64,
    ) -> ParseState<DnsFrame> {
        let slice = &buf[*pos..];
        if slice.len() < HEADER_LEN {
            return ParseState::NeedsMoreData;
        }
        let frame = match parse_message(slice, timestamp_ns) {
            Ok(frame) => frame,
            Err(error) if error.is_retryable() => return ParseState::NeedsMoreData,
            Err(error) => return ParseState::Invalid(error),
        };
        if frame.header.is_response() != (direction == Direction::Response) {
            return ParseState::Invalid(DecodeError::Malformed {
                reason: "qr bit contradicts the capture direction",
            });
        }
        *pos = buf.len();
        ParseState::Success(frame)
    }
}

/// Stitch queued DNS frames by position, verifying transaction ids match.
pub fn stitch(
    config: &StitchConfig,
    requests: &mut VecDeque<DnsFrame>,
    responses: &mut VecDeque<DnsFrame>,
) -> StitchResult<DnsRecord> {
    let result = stitch_frames(config, requests, responses, |query, response| {
        if query.header.txid != response.header.txid {
            warn!(
                query_txid = query.header.txid,
                response_txid = response.header.txid,
                "dns transaction ids disagree"
            );
            return None;
        }
        Some(DnsRecord {
            latency_ns: response.timestamp_ns.saturating_sub(query.timestamp_ns),
            query: query.clone(),
            response: response.clone(),
        })
    });
    metrics::stitch_errors("dns", result.error_count);
    result
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
