//! Generic request/response stitching.
//!
//! Each connection owns two FIFO queues, one per direction. Frames are
//! appended in capture order and never reordered; stitching walks the two
//! heads and either pairs them into a record or discards the one that can
//! no longer match. A protocol plugs in by implementing [`StitchFrame`] on
//! its frame type and supplying a pair hook that turns a matched
//! request/response pair into a record.
//!
//! Protocols whose responses arrive in request order and carry no
//! correlation field (`correlation_id()` returning `None`) pair purely by
//! queue position. Protocols with correlation ids additionally detect skew:
//! a response older than every live request is an orphan, and a request the
//! server never answered is detected when a younger response shows up.

use std::collections::VecDeque;

use tracing::{debug, warn};

/// A frame that can participate in request/response pairing.
pub trait StitchFrame {
    /// Capture timestamp, nanoseconds since an arbitrary epoch shared by
    /// all frames on the connection.
    fn timestamp_ns(&self) -> u64;

    /// Correlation key, when the protocol carries one. Keys are assumed
    /// monotonically non-decreasing per connection and direction.
    fn correlation_id(&self) -> Option<i64>;
}

/// Stitching knobs shared by all protocols.
#[derive(Clone, Copy, Debug)]
pub struct StitchConfig {
    /// Unmatched frames older than the newest observed capture timestamp
    /// minus this bound are discarded and counted. Discard is final.
    pub retention_ns: u64,
}

impl Default for StitchConfig {
    fn default() -> Self {
        // Ten seconds covers broker-side produce timeouts with headroom.
        Self {
            retention_ns: 10_000_000_000,
        }
    }
}

/// Records produced by one stitching pass, plus the number of frames that
/// could not be paired or decoded during it.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StitchResult<R> {
    pub records: Vec<R>,
    pub error_count: u64,
}

/// Pair queued requests with queued responses, oldest first.
///
/// Both queues are mutated in place: matched and unmatchable frames are
/// popped, everything else is retained for the next pass. The `pair` hook
/// converts a matched pair into a record; returning `None` marks the pair
/// as a decode failure, which pops both frames and counts one error.
pub fn stitch_frames<Req, Resp, R>(
    config: &StitchConfig,
    requests: &mut VecDeque<Req>,
    responses: &mut VecDeque<Resp>,
    mut pair: impl FnMut(&Req, &Resp) -> Option<R>,
) -> StitchResult<R>
where
    Req: StitchFrame,
    Resp: StitchFrame,
{
    let mut result = StitchResult {
        records: Vec::new(),
        error_count: 0,
    };
    while let (Some(req), Some(resp)) = (requests.front(), responses.front()) {
        match (req.correlation_id(), resp.correlation_id()) {
            (Some(req_id), Some(resp_id)) if resp_id < req_id => {
                // Every live request is younger than this response, so its
                // request fell outside the capture window.
                warn!(correlation_id = resp_id, "discarding orphaned response");
                responses.pop_front();
                result.error_count += 1;
            }
            (Some(req_id), Some(resp_id)) if req_id < resp_id => {
                // A younger response has arrived, so this request's
                // response is lost.
                warn!(correlation_id = req_id, "discarding request with lost response");
                requests.pop_front();
                result.error_count += 1;
            }
            _ => {
                match pair(req, resp) {
                    Some(record) => result.records.push(record),
                    None => result.error_count += 1,
                }
                requests.pop_front();
                responses.pop_front();
            }
        }
    }
    result.error_count += purge_expired(config, requests, responses);
    result
}

/// Discard unmatched frames that have aged past the retention bound.
///
/// "Now" is the newest capture timestamp present in either queue, so a
/// quiescent connection never expires anything spuriously.
fn purge_expired<Req, Resp>(
    config: &StitchConfig,
    requests: &mut VecDeque<Req>,
    responses: &mut VecDeque<Resp>,
) -> u64
where
    Req: StitchFrame,
    Resp: StitchFrame,
{
    let newest = requests
        .iter()
        .map(StitchFrame::timestamp_ns)
        .chain(responses.iter().map(StitchFrame::timestamp_ns))
        .max();
    let Some(newest) = newest else {
        return 0;
    };
    let cutoff = newest.saturating_sub(config.retention_ns);
    let mut purged = 0;
    while requests
        .front()
        .is_some_and(|frame| frame.timestamp_ns() < cutoff)
    {
        requests.pop_front();
        purged += 1;
    }
    while responses
        .front()
        .is_some_and(|frame| frame.timestamp_ns() < cutoff)
    {
        responses.pop_front();
        purged += 1;
    }
    if purged > 0 {
        debug!(purged, "expired unmatched frames past retention bound");
    }
    purged
}

/// Drain both queues on connection teardown, counting residual frames as
/// orphans. No further pairing is possible once the connection closes.
pub fn flush_closed<Req, Resp>(requests: &mut VecDeque<Req>, responses: &mut VecDeque<Resp>) -> u64 {
    let residual = (requests.len() + responses.len()) as u64;
    requests.clear();
    responses.clear();
    if residual > 0 {
        debug!(residual, "flushed unmatched frames on connection close");
    }
    residual
}

#[cfg(test)]
#[path = "stitcher_tests.rs"]
mod tests;
