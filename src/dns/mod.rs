//! DNS wire-protocol support.
//!
//! The counterpoint to [`crate::kafka`]: datagram-shaped frames with no
//! length prefix, fully decoded at parse time, and stitched positionally
//! with a transaction-id check. Name compression is the only stateful part
//! of the format.

pub mod parse;
pub mod types;

pub use parse::{DnsFraming, parse_message};
pub use types::{DnsFrame, DnsHeader, DnsRecord};
