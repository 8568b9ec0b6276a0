//! Per-connection decode driver.
//!
//! One [`ConnectionDecoder`] owns everything a traffic-capture connection
//! needs downstream of protocol classification: the framing state, the
//! per-direction frame queues, and the stitch configuration. Callers feed
//! it captured byte buffers and drain flattened [`RecordEntry`] rows. Each
//! decoder has a single logical owner; nothing here is shared across
//! connections.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::{
    dns::{self, DnsFraming, types::DnsFrame},
    framing::{Direction, Framing, ParseState, ProtocolKind},
    kafka::{
        self,
        types::{Packet, ResponseBody},
        wire::KafkaFraming,
    },
    metrics,
    stitcher::{self, StitchConfig, StitchResult},
};

/// One flattened telemetry row, ready for a columnar sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordEntry {
    /// Response capture timestamp.
    pub timestamp_ns: u64,
    pub endpoint: String,
    pub protocol: ProtocolKind,
    /// Protocol command label ("produce", the queried name, ...).
    pub command: String,
    /// `0` for success, otherwise the protocol's error code.
    pub status: i32,
    pub request_body: String,
    pub response_body: String,
    pub latency_ns: u64,
}

/// What one `consume` call did with the buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsumeSummary {
    /// Bytes the caller may discard; the tail must be re-presented once
    /// more data arrives.
    pub bytes_consumed: usize,
    pub frames_parsed: usize,
    /// Invalid frame starts skipped during boundary recovery.
    pub invalid_starts: usize,
}

enum ProtocolDriver {
    Kafka {
        framing: KafkaFraming,
        requests: VecDeque<Packet>,
        responses: VecDeque<Packet>,
    },
    Dns {
        framing: DnsFraming,
        requests: VecDeque<DnsFrame>,
        responses: VecDeque<DnsFrame>,
    },
}

pub struct ConnectionDecoder {
    driver: ProtocolDriver,
    endpoint: String,
    config: StitchConfig,
}

impl ConnectionDecoder {
    /// Build a decoder for a connection classified as `protocol`.
    /// `endpoint` identifies the remote peer in emitted records.
    #[must_use]
    pub fn new(protocol: ProtocolKind, endpoint: impl Into<String>) -> Self {
        Self::with_config(protocol, endpoint, StitchConfig::default())
    }

    #[must_use]
    pub fn with_config(
        protocol: ProtocolKind,
        endpoint: impl Into<String>,
        config: StitchConfig,
    ) -> Self {
        let driver = match protocol {
            ProtocolKind::Kafka => ProtocolDriver::Kafka {
                framing: KafkaFraming,
                requests: VecDeque::new(),
                responses: VecDeque::new(),
            },
            ProtocolKind::Dns => ProtocolDriver::Dns {
                framing: DnsFraming,
                requests: VecDeque::new(),
                responses: VecDeque::new(),
            },
        };
        Self {
            driver,
            endpoint: endpoint.into(),
            config,
        }
    }

    #[must_use]
    pub const fn protocol(&self) -> ProtocolKind {
        match self.driver {
            ProtocolDriver::Kafka { .. } => ProtocolKind::Kafka,
            ProtocolDriver::Dns { .. } => ProtocolKind::Dns,
        }
    }

    /// Frames currently queued awaiting a counterpart.
    #[must_use]
    pub fn queued(&self, direction: Direction) -> usize {
        match (&self.driver, direction) {
            (ProtocolDriver::Kafka { requests, .. }, Direction::Request) => requests.len(),
            (ProtocolDriver::Kafka { responses, .. }, Direction::Response) => responses.len(),
            (ProtocolDriver::Dns { requests, .. }, Direction::Request) => requests.len(),
            (ProtocolDriver::Dns { responses, .. }, Direction::Response) => responses.len(),
        }
    }

    /// Run the framing loop over a captured buffer, queueing every parsed
    /// frame. Invalid starts trigger a boundary scan; bytes skipped that
    /// way are consumed and counted.
    pub fn consume(&mut self, direction: Direction, buf: &[u8], timestamp_ns: u64) -> ConsumeSummary {
        let protocol = self.protocol();
        match &mut self.driver {
            ProtocolDriver::Kafka {
                framing,
                requests,
                responses,
            } => run_framing_loop(
                framing, protocol, direction, buf, timestamp_ns,
                match direction {
                    Direction::Request => requests,
                    Direction::Response => responses,
                },
            ),
            ProtocolDriver::Dns {
                framing,
                requests,
                responses,
            } => run_framing_loop(
                framing, protocol, direction, buf, timestamp_ns,
                match direction {
                    Direction::Request => requests,
                    Direction::Response => responses,
                },
            ),
        }
    }

    /// Pair queued frames into flattened telemetry rows.
    pub fn stitch(&mut self) -> StitchResult<RecordEntry> {
        match &mut self.driver {
            ProtocolDriver::Kafka {
                requests, responses, ..
            } => {
                let result = kafka::stitch::stitch(&self.config, requests, responses);
                StitchResult {
                    records: result
                        .records
                        .into_iter()
                        .map(|record| kafka_entry(&self.endpoint, record))
                        .collect(),
                    error_count: result.error_count,
                }
            }
            ProtocolDriver::Dns {
                requests, responses, ..
            } => {
                let result = dns::parse::stitch(&self.config, requests, responses);
                StitchResult {
                    records: result
                        .records
                        .into_iter()
                        .map(|record| dns_entry(&self.endpoint, record))
                        .collect(),
                    error_count: result.error_count,
                }
            }
        }
    }

    /// Tear the connection down, counting residual unmatched frames.
    pub fn close(&mut self) -> u64 {
        let flushed = match &mut self.driver {
            ProtocolDriver::Kafka {
                requests, responses, ..
            } => stitcher::flush_closed(requests, responses),
            ProtocolDriver::Dns {
                requests, responses, ..
            } => stitcher::flush_closed(requests, responses),
        };
        if flushed > 0 {
            debug!(endpoint = %self.endpoint, flushed, "connection closed with unmatched frames");
        }
        metrics::stitch_errors(self.protocol().label(), flushed);
        flushed
    }
}

fn run_framing_loop<F: Framing>(
    framing: &mut F,
    protocol: ProtocolKind,
    direction: Direction,
    buf: &[u8],
    timestamp_ns: u64,
    queue: &mut VecDeque<F::Frame>,
) -> ConsumeSummary {
    let mut summary = ConsumeSummary::default();
    let mut pos = 0;
    while pos < buf.len() {
        match framing.parse_frame(direction, buf, &mut pos, timestamp_ns) {
            ParseState::Success(frame) => {
                queue.push_back(frame);
                summary.frames_parsed += 1;
                metrics::frames_parsed(protocol.label(), direction.label());
            }
            ParseState::NeedsMoreData => break,
            ParseState::Invalid(error) => {
                summary.invalid_starts += 1;
                metrics::parse_errors(protocol.label(), direction.label());
                match framing.find_frame_boundary(direction, buf, pos + 1) {
                    Some(boundary) => {
                        warn!(
                            protocol = protocol.label(),
                            direction = direction.label(),
                            %error,
                            skipped = boundary - pos,
                            "resynchronised after invalid frame start"
                        );
                        pos = boundary;
                    }
                    None => {
                        // Nothing plausible remains; drop the tail.
                        warn!(
                            protocol = protocol.label(),
                            direction = direction.label(),
                            %error,
                            dropped = buf.len() - pos,
                            "no further frame boundary in buffer"
                        );
                        pos = buf.len();
                    }
                }
            }
        }
    }
    summary.bytes_consumed = pos;
    summary
}

fn kafka_entry(endpoint: &str, record: kafka::types::Record) -> RecordEntry {
    let status = match &record.response.body {
        ResponseBody::Produce(resp) => i32::from(resp.first_error_code().unwrap_or(0)),
        ResponseBody::Undecoded => 0,
    };
    RecordEntry {
        timestamp_ns: record.response.timestamp_ns,
        endpoint: endpoint.to_owned(),
        protocol: ProtocolKind::Kafka,
        command: record.request.header.api_key.label().to_owned(),
        status,
        request_body: record.request.render_body(),
        response_body: record.response.render_body(),
        latency_ns: record.latency_ns,
    }
}

fn dns_entry(endpoint: &str, record: dns::types::DnsRecord) -> RecordEntry {
    RecordEntry {
        timestamp_ns: record.response.timestamp_ns,
        endpoint: endpoint.to_owned(),
        protocol: ProtocolKind::Dns,
        command: record.query.query_name().unwrap_or_default().to_owned(),
        status: i32::from(record.response.header.rcode()),
        request_body: record
            .query
            .questions
            .iter()
            .map(|q| q.name.clone())
            .collect::<Vec<_>>()
            .join(", "),
        response_body: record.response.render_answers(),
        latency_ns: record.latency_ns,
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
