//! Pairing raw Kafka packets into request/response records.
//!
//! Packets queue undecoded; this module supplies the pair hook that decodes
//! the request first (fixing the api key and version for the connection's
//! session) and then interprets the response bytes with that same api info.

use std::collections::VecDeque;

use tracing::warn;

use crate::{
    decode::DecodeResult,
    kafka::{
        decoder::PacketDecoder,
        types::{ApiKey, Packet, Record, Request, RequestBody, Response, ResponseBody},
    },
    metrics,
    stitcher::{StitchConfig, StitchResult, stitch_frames},
};

/// Fully decode a queued request packet.
fn decode_request(packet: &Packet) -> DecodeResult<Request> {
    let mut decoder = PacketDecoder::new(&packet.payload);
    let header = decoder.extract_req_header()?;
    let body = match header.api_key {
        ApiKey::Produce => RequestBody::Produce(decoder.extract_produce_req()?),
        _ => RequestBody::Undecoded,
    };
    Ok(Request {
        timestamp_ns: packet.timestamp_ns,
        header,
        body,
    })
}

/// Decode a queued response packet with the paired request's api info.
fn decode_response(packet: &Packet, api_key: ApiKey, api_version: i16) -> DecodeResult<Response> {
    let mut decoder = PacketDecoder::new(&packet.payload);
    decoder.set_api_info(api_key, api_version);
    let correlation_id = decoder.extract_resp_header()?;
    let body = match api_key {
        ApiKey::Produce => ResponseBody::Produce(decoder.extract_produce_resp()?),
        _ => ResponseBody::Undecoded,
    };
    Ok(Response {
        timestamp_ns: packet.timestamp_ns,
        correlation_id,
        body,
    })
}

fn decode_pair(req_packet: &Packet, resp_packet: &Packet) -> DecodeResult<Record> {
    let request = decode_request(req_packet)?;
    let response = decode_response(
        resp_packet,
        request.header.api_key,
        request.header.api_version,
    )?;
    Ok(Record {
        latency_ns: resp_packet.timestamp_ns.saturating_sub(req_packet.timestamp_ns),
        request,
        response,
    })
}

/// Stitch the connection's queued Kafka packets into records.
pub fn stitch(
    config: &StitchConfig,
    requests: &mut VecDeque<Packet>,
    responses: &mut VecDeque<Packet>,
) -> StitchResult<Record> {
    let result = stitch_frames(config, requests, responses, |req, resp| {
        match decode_pair(req, resp) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(
                    correlation_id = req.correlation_id,
                    %error,
                    "dropping undecodable kafka pair"
                );
                None
            }
        }
    });
    metrics::stitch_errors("kafka", result.error_count);
    result
}

#[cfg(test)]
#[path = "stitch_tests.rs"]
mod tests;
