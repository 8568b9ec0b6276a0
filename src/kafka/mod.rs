//! Kafka wire-protocol support: framing, payload decoding, and stitching.
//!
//! Kafka is the demanding protocol in this engine: big-endian fixed-width
//! fields mixed with varint "compact" encodings from the flexible versions
//! onwards, nested record batches, and response layouts that cannot be
//! decoded without the api version the client negotiated in its request.
//! Frames therefore queue as raw [`types::Packet`]s and are decoded when
//! the stitcher pairs them.

pub mod decoder;
pub mod stitch;
pub mod types;
pub mod wire;

pub use decoder::PacketDecoder;
pub use types::{ApiKey, Packet, Record, Request, Response};
pub use wire::KafkaFraming;
