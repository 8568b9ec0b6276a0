#![doc(html_root_url = "https://docs.rs/tapframe/latest")]
//! Public API for the `tapframe` library.
//!
//! This crate turns captured byte buffers into structured request/response
//! telemetry records. It is the decode-and-stitch stage of a passive
//! observability pipeline: upstream capture classifies a connection's
//! protocol and delivers per-direction byte streams; `tapframe` finds frame
//! boundaries, decodes frames, pairs requests with responses, and emits
//! flattened rows. It opens no sockets and performs no I/O of its own.
//!
//! Feed a [`connection::ConnectionDecoder`] with [`framing::Direction`]-
//! tagged buffers and drain [`connection::RecordEntry`] rows:
//!
//! ```
//! use tapframe::{ConnectionDecoder, Direction, ProtocolKind};
//!
//! let query = tapframe::testing::encode_dns_query(7, "example.com", 1);
//! let answer = tapframe::testing::encode_dns_a_response(7, "example.com", [10, 0, 0, 1]);
//!
//! let mut conn = ConnectionDecoder::new(ProtocolKind::Dns, "10.0.0.53:53");
//! conn.consume(Direction::Request, &query, 1_000);
//! conn.consume(Direction::Response, &answer, 2_500);
//! let stitched = conn.stitch();
//! assert_eq!(stitched.records[0].latency_ns, 1_500);
//! ```

pub mod byte_order;
pub mod connection;
pub mod cursor;
pub mod decode;
pub mod dns;
pub mod framing;
pub mod kafka;
pub mod metrics;
pub mod stitcher;
pub mod testing;

pub use connection::{ConnectionDecoder, ConsumeSummary, RecordEntry};
pub use cursor::BinaryCursor;
pub use decode::{DecodeError, DecodeResult};
pub use framing::{Direction, Framing, ParseState, ProtocolKind};
pub use stitcher::{StitchConfig, StitchFrame, StitchResult};
