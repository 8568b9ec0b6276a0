//! Kafka stream framing: length-prefix parsing and boundary recovery.

use bytes::Bytes;
use tracing::debug;

use crate::{
    byte_order::{read_network_i16, read_network_i32},
    decode::DecodeError,
    framing::{Direction, Framing, ParseState},
    kafka::types::{ApiKey, Packet},
};

/// Smallest request payload: api key, api version, correlation id, and a
/// client-id length.
const MIN_REQ_PAYLOAD_LEN: usize = 10;
/// Smallest response payload: the correlation id alone.
const MIN_RESP_PAYLOAD_LEN: usize = 4;
/// Length-prefix ceiling; matches the broker's default cap with headroom.
const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// [`Framing`] for the Kafka wire format.
///
/// Kafka frames carry no protocol magic, so plausibility stands in for it:
/// a sane length prefix and, on the request side, a recognised api key with
/// an in-range version and non-negative correlation id. Parsed frames stay
/// raw [`Packet`]s; body decoding waits for stitch time when the paired
/// request's version is known.
#[derive(Debug, Default)]
pub struct KafkaFraming;

impl KafkaFraming {
    fn min_payload_len(direction: Direction) -> usize {
        match direction {
            Direction::Request => MIN_REQ_PAYLOAD_LEN,
            Direction::Response => MIN_RESP_PAYLOAD_LEN,
        }
    }

    /// Check whether `buf` starts with a plausible frame header for the
    /// direction. Returns the total framed length when it does.
    fn plausible_frame(direction: Direction, buf: &[u8]) -> Option<usize> {
        if buf.len() < 4 + Self::min_payload_len(direction) {
            return None;
        }
        let declared = read_network_i32([buf[0], buf[1], buf[2], buf[3]]);
        let declared = usize::try_from(declared).ok()?;
        if !(Self::min_payload_len(direction)..=MAX_PAYLOAD_LEN).contains(&declared) {
            return None;
        }
        let payload = &buf[4..];
        match direction {
            Direction::Request => {
                let api_key = ApiKey::from_wire(read_network_i16([payload[0], payload[1]]))?;
                let api_version = read_network_i16([payload[2], payload[3]]);
                if !api_key.version_in_range(api_version) {
                    return None;
                }
                let correlation_id =
                    read_network_i32([payload[4], payload[5], payload[6], payload[7]]);
                (correlation_id >= 0).then_some(4 + declared)
            }
            Direction::Response => {
                let correlation_id =
                    read_network_i32([payload[0], payload[1], payload[2], payload[3]]);
                (correlation_id >= 0).then_some(4 + declared)
            }
        }
    }

    fn correlation_id(direction: Direction, payload: &[u8]) -> i32 {
        let at = match direction {
            Direction::Request => 4,
            Direction::Response => 0,
        };
        read_network_i32([payload[at], payload[at + 1], payload[at + 2], payload[at + 3]])
    }
}

impl Framing for KafkaFraming {
    type Frame = Packet;

    fn find_frame_boundary(&self, direction: Direction, buf: &[u8], start: usize) -> Option<usize> {
        (start..buf.len()).find(|&offset| Self::plausible_frame(direction, &buf[offset..]).is_some())
    }

    fn parse_frame(
        &mut self,
        direction: Direction,
        buf: &[u8],
        pos: &mut usize,
        timestamp_ns: u64,
    ) -> ParseState<Packet> {
        let slice = &buf[*pos..];
        if slice.len() < 4 + Self::min_payload_len(direction) {
            return ParseState::NeedsMoreData;
        }
        // Header plausibility is checked before waiting on the declared
        // length; a garbage prefix read as a huge length must not stall
        // the stream in a needs-more-data loop.
        let Some(total) = Self::plausible_frame(direction, slice) else {
            return ParseState::Invalid(DecodeError::Malformed {
                reason: "implausible frame header",
            });
        };
        if slice.len() < total {
            return ParseState::NeedsMoreData;
        }
        let payload = &slice[4..total];
        let packet = Packet {
            timestamp_ns,
            correlation_id: Self::correlation_id(direction, payload),
            payload: Bytes::copy_from_slice(payload),
        };
        debug!(
            direction = direction.label(),
            correlation_id = packet.correlation_id,
            len = packet.payload.len(),
            "framed kafka packet"
        );
        *pos += total;
        ParseState::Success(packet)
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
