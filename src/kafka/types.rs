//! Typed representation of decoded Kafka traffic.

use core::fmt;

use bytes::Bytes;

use crate::stitcher::StitchFrame;

/// Recognised Kafka api keys.
///
/// The set is closed: an unlisted key fails request-header decoding as
/// unsupported rather than producing a frame with an opaque number, and the
/// same table anchors the boundary-scan plausibility check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiKey {
    Produce,
    Fetch,
    ListOffsets,
    Metadata,
    OffsetCommit,
    OffsetFetch,
    FindCoordinator,
    JoinGroup,
    Heartbeat,
    LeaveGroup,
    SyncGroup,
    DescribeGroups,
    ListGroups,
    SaslHandshake,
    ApiVersions,
    CreateTopics,
    DeleteTopics,
    InitProducerId,
    SaslAuthenticate,
}

impl ApiKey {
    /// Map a wire api-key number onto the closed enum.
    #[must_use]
    pub fn from_wire(raw: i16) -> Option<Self> {
        match raw {
            0 => Some(Self::Produce),
            1 => Some(Self::Fetch),
            2 => Some(Self::ListOffsets),
            3 => Some(Self::Metadata),
            8 => Some(Self::OffsetCommit),
            9 => Some(Self::OffsetFetch),
            10 => Some(Self::FindCoordinator),
            11 => Some(Self::JoinGroup),
            12 => Some(Self::Heartbeat),
            13 => Some(Self::LeaveGroup),
            14 => Some(Self::SyncGroup),
            15 => Some(Self::DescribeGroups),
            16 => Some(Self::ListGroups),
            17 => Some(Self::SaslHandshake),
            18 => Some(Self::ApiVersions),
            19 => Some(Self::CreateTopics),
            20 => Some(Self::DeleteTopics),
            22 => Some(Self::InitProducerId),
            36 => Some(Self::SaslAuthenticate),
            _ => None,
        }
    }

    /// First api version whose request and response use the flexible
    /// (compact, tagged-field) wire format, if the key has one.
    #[must_use]
    pub const fn first_flexible_version(self) -> Option<i16> {
        match self {
            Self::Produce | Self::Metadata => Some(9),
            Self::Fetch => Some(12),
            Self::ListOffsets | Self::OffsetFetch | Self::JoinGroup => Some(6),
            Self::OffsetCommit => Some(8),
            Self::FindCoordinator | Self::ListGroups | Self::ApiVersions => Some(3),
            Self::Heartbeat | Self::LeaveGroup | Self::SyncGroup | Self::DeleteTopics => Some(4),
            Self::DescribeGroups | Self::CreateTopics => Some(5),
            Self::InitProducerId | Self::SaslAuthenticate => Some(2),
            Self::SaslHandshake => None,
        }
    }

    /// Whether `version` uses the flexible wire format for this key.
    #[must_use]
    pub fn is_flexible(self, version: i16) -> bool {
        self.first_flexible_version()
            .is_some_and(|first| version >= first)
    }

    /// Highest api version this engine treats as plausible for the key.
    /// Keys with decoded bodies carry their real ceiling; the rest get a
    /// generous bound that still rejects scan noise.
    #[must_use]
    pub const fn max_plausible_version(self) -> i16 {
        match self {
            Self::Produce => 9,
            Self::Fetch => 13,
            Self::Metadata => 12,
            Self::ApiVersions | Self::SaslHandshake => 3,
            _ => 15,
        }
    }

    /// Whether `version` lies in the plausible range for this key.
    #[must_use]
    pub fn version_in_range(self, version: i16) -> bool {
        (0..=self.max_plausible_version()).contains(&version)
    }

    /// Lowercase command label used in telemetry records.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Produce => "produce",
            Self::Fetch => "fetch",
            Self::ListOffsets => "list_offsets",
            Self::Metadata => "metadata",
            Self::OffsetCommit => "offset_commit",
            Self::OffsetFetch => "offset_fetch",
            Self::FindCoordinator => "find_coordinator",
            Self::JoinGroup => "join_group",
            Self::Heartbeat => "heartbeat",
            Self::LeaveGroup => "leave_group",
            Self::SyncGroup => "sync_group",
            Self::DescribeGroups => "describe_groups",
            Self::ListGroups => "list_groups",
            Self::SaslHandshake => "sasl_handshake",
            Self::ApiVersions => "api_versions",
            Self::CreateTopics => "create_topics",
            Self::DeleteTopics => "delete_topics",
            Self::InitProducerId => "init_producer_id",
            Self::SaslAuthenticate => "sasl_authenticate",
        }
    }
}

/// One framed Kafka message, captured raw.
///
/// Beyond the correlation id needed for stitching, the payload stays
/// undecoded until a request/response pair is formed, at which point the
/// request's negotiated version drives the response decode. The payload is
/// copied out of the capture buffer; frames never borrow from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub timestamp_ns: u64,
    pub correlation_id: i32,
    pub payload: Bytes,
}

impl StitchFrame for Packet {
    fn timestamp_ns(&self) -> u64 { self.timestamp_ns }

    fn correlation_id(&self) -> Option<i64> { Some(i64::from(self.correlation_id)) }
}

/// Request header fields shared by every api key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestHeader {
    pub api_key: ApiKey,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<String>,
}

/// A decoded request: header plus the body for keys this engine decodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub timestamp_ns: u64,
    pub header: RequestHeader,
    pub body: RequestBody,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
    Produce(ProduceRequest),
    /// Recognised api key whose body this engine does not model.
    Undecoded,
}

/// A decoded response, interpreted with the paired request's api info.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub timestamp_ns: u64,
    pub correlation_id: i32,
    pub body: ResponseBody,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseBody {
    Produce(ProduceResponse),
    Undecoded,
}

/// One record inside a record batch. Trailing record headers are skipped
/// at decode time and not represented.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordMessage {
    pub timestamp_delta: i64,
    pub offset_delta: i32,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
}

/// A v2 record batch. The magic byte is validated during decoding and not
/// stored; pre-v2 message sets are rejected as unsupported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordBatch {
    pub base_offset: i64,
    pub attributes: i16,
    pub last_offset_delta: i32,
    pub first_timestamp: i64,
    pub max_timestamp: i64,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub base_sequence: i32,
    pub records: Vec<RecordMessage>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProduceRequest {
    pub transactional_id: Option<String>,
    pub acks: i16,
    pub timeout_ms: i32,
    pub topics: Vec<ProduceReqTopic>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProduceReqTopic {
    pub name: String,
    pub partitions: Vec<ProduceReqPartition>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProduceReqPartition {
    pub index: i32,
    pub batches: Vec<RecordBatch>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProduceResponse {
    pub topics: Vec<ProduceRespTopic>,
    pub throttle_time_ms: i32,
}

impl ProduceResponse {
    /// First non-zero partition error code, if any partition failed.
    #[must_use]
    pub fn first_error_code(&self) -> Option<i16> {
        self.topics
            .iter()
            .flat_map(|topic| topic.partitions.iter())
            .map(|partition| partition.error_code)
            .find(|&code| code != 0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProduceRespTopic {
    pub name: String,
    pub partitions: Vec<ProduceRespPartition>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProduceRespPartition {
    pub index: i32,
    pub error_code: i16,
    pub base_offset: i64,
    pub log_append_time_ms: i64,
    pub log_start_offset: i64,
    pub record_errors: Vec<RecordError>,
    pub error_message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordError {
    pub batch_index: i32,
    pub error_message: Option<String>,
}

/// A stitched request/response pair with its measured latency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub request: Request,
    pub response: Response,
    pub latency_ns: u64,
}

impl fmt::Display for RecordMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self.key.as_deref().map(String::from_utf8_lossy);
        let value = self.value.as_deref().map(String::from_utf8_lossy);
        write!(
            f,
            "{{key: {}, value: {}}}",
            key.as_deref().unwrap_or("null"),
            value.as_deref().unwrap_or("null"),
        )
    }
}

impl fmt::Display for ProduceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{acks: {}, timeout_ms: {}, topics: [", self.acks, self.timeout_ms)?;
        for (i, topic) in self.topics.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{{name: {}, partitions: [", topic.name)?;
            for (j, partition) in topic.partitions.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                let records: usize = partition.batches.iter().map(|b| b.records.len()).sum();
                write!(f, "{{index: {}, records: {records}}}", partition.index)?;
            }
            write!(f, "]}}")?;
        }
        write!(f, "]}}")
    }
}

impl fmt::Display for ProduceResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{topics: [")?;
        for (i, topic) in self.topics.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{{name: {}, partitions: [", topic.name)?;
            for (j, partition) in topic.partitions.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(
                    f,
                    "{{index: {}, error_code: {}, base_offset: {}}}",
                    partition.index, partition.error_code, partition.base_offset,
                )?;
            }
            write!(f, "]}}")?;
        }
        write!(f, "], throttle_time_ms: {}}}", self.throttle_time_ms)
    }
}

impl Request {
    /// Human-readable body used in telemetry records.
    #[must_use]
    pub fn render_body(&self) -> String {
        match &self.body {
            RequestBody::Produce(produce) => produce.to_string(),
            RequestBody::Undecoded => String::new(),
        }
    }
}

impl Response {
    /// Human-readable body used in telemetry records.
    #[must_use]
    pub fn render_body(&self) -> String {
        match &self.body {
            ResponseBody::Produce(produce) => produce.to_string(),
            ResponseBody::Undecoded => String::new(),
        }
    }
}
