//! Typed representation of decoded DNS traffic.

use core::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::stitcher::StitchFrame;

/// The fixed 12-byte DNS header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DnsHeader {
    pub txid: u16,
    pub flags: u16,
    pub num_queries: u16,
    pub num_answers: u16,
    pub num_auth: u16,
    pub num_addl: u16,
}

impl DnsHeader {
    /// QR bit: set on responses.
    #[must_use]
    pub const fn is_response(&self) -> bool { self.flags & 0x8000 != 0 }

    /// RCODE nibble, `0` for a successful response.
    #[must_use]
    pub const fn rcode(&self) -> u8 { (self.flags & 0x000f) as u8 }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

/// Resource-record payloads this engine interprets; everything else is
/// skipped by its declared length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DnsRecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(String),
    Other,
}

impl fmt::Display for DnsRecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(addr) => write!(f, "{addr}"),
            Self::Aaaa(addr) => write!(f, "{addr}"),
            Self::Cname(name) => write!(f, "{name}"),
            Self::Other => write!(f, "-"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsAnswer {
    pub name: String,
    pub rtype: u16,
    pub rclass: u16,
    pub ttl: u32,
    pub data: DnsRecordData,
}

/// One fully decoded DNS message, query or response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsFrame {
    pub timestamp_ns: u64,
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsAnswer>,
}

impl DnsFrame {
    /// The queried name, from the first question section entry.
    #[must_use]
    pub fn query_name(&self) -> Option<&str> {
        self.questions.first().map(|q| q.name.as_str())
    }

    /// Render the answer section for telemetry records.
    #[must_use]
    pub fn render_answers(&self) -> String {
        let rendered: Vec<String> = self
            .answers
            .iter()
            .map(|a| format!("{}: {}", a.name, a.data))
            .collect();
        rendered.join(", ")
    }
}

impl StitchFrame for DnsFrame {
    fn timestamp_ns(&self) -> u64 { self.timestamp_ns }

    // Transaction ids are random per query, not monotonic, so positional
    // pairing applies and the pair hook verifies txid equality instead.
    fn correlation_id(&self) -> Option<i64> { None }
}

/// A stitched DNS query/response pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsRecord {
    pub query: DnsFrame,
    pub response: DnsFrame,
    pub latency_ns: u64,
}
