//! Metric helpers for `tapframe`.
//!
//! This module defines metric names and simple helper functions wrapping
//! the [`metrics`](https://docs.rs/metrics) crate. With the `metrics`
//! feature disabled every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking parsed frames.
pub const FRAMES_PARSED: &str = "tapframe_frames_parsed_total";
/// Name of the counter tracking bytes discarded during boundary recovery.
pub const PARSE_ERRORS: &str = "tapframe_parse_errors_total";
/// Name of the counter tracking frames lost during stitching.
pub const STITCH_ERRORS: &str = "tapframe_stitch_errors_total";

/// Record a parsed frame for the given protocol and direction.
pub fn frames_parsed(protocol: &'static str, direction: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_PARSED, "protocol" => protocol, "direction" => direction).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = (protocol, direction);
}

/// Record an invalid frame start encountered while parsing.
pub fn parse_errors(protocol: &'static str, direction: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(PARSE_ERRORS, "protocol" => protocol, "direction" => direction).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = (protocol, direction);
}

/// Record frames lost to orphaning, expiry, or decode failure while
/// stitching.
pub fn stitch_errors(protocol: &'static str, count: u64) {
    #[cfg(feature = "metrics")]
    if count > 0 {
        counter!(STITCH_ERRORS, "protocol" => protocol).increment(count);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (protocol, count);
}
