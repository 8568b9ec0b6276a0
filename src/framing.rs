//! Protocol-agnostic framing interface.
//!
//! Traffic capture hands each connection's bytes to the engine as an
//! append-only stream per direction. A [`Framing`] implementation turns
//! that stream into typed frames in two steps: [`Framing::find_frame_boundary`]
//! resynchronises after loss or mid-stream attachment by scanning for the
//! next plausible frame start, and [`Framing::parse_frame`] consumes one
//! frame from a position known (or believed) to be a boundary.

use crate::decode::DecodeError;

/// Which half of a connection a byte stream belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client-to-server bytes.
    Request,
    /// Server-to-client bytes.
    Response,
}

impl Direction {
    /// Lowercase label used in logs and metrics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

/// Outcome of attempting to parse one frame from a stream position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseState<F> {
    /// A complete frame was consumed.
    Success(F),
    /// The stream ends mid-frame; retry once more bytes arrive.
    NeedsMoreData,
    /// The bytes at this position are not a valid frame start.
    Invalid(DecodeError),
}

/// The protocols this engine can attribute a connection to.
///
/// Classification happens once per connection, upstream of decoding; the
/// engine then dispatches on this tag for the connection's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    Kafka,
    Dns,
}

impl ProtocolKind {
    /// Lowercase label used in logs and metrics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Kafka => "kafka",
            Self::Dns => "dns",
        }
    }
}

/// Per-protocol framing: boundary discovery plus single-frame parsing.
///
/// Implementations keep any cross-frame session state (negotiated versions,
/// flexible-encoding flags) inside `Self`; the engine owns one value per
/// connection and threads every call through it.
pub trait Framing {
    /// The typed frame this protocol produces.
    type Frame;

    /// Scan `buf[start..]` for the next position that plausibly begins a
    /// frame travelling in `direction`. Returns the absolute offset, or
    /// `None` when no plausible start exists in the captured bytes.
    fn find_frame_boundary(&self, direction: Direction, buf: &[u8], start: usize) -> Option<usize>;

    /// Parse one frame from `buf[*pos..]`. On [`ParseState::Success`] the
    /// implementation advances `*pos` past the consumed frame; on any other
    /// outcome `*pos` is unchanged.
    fn parse_frame(
        &mut self,
        direction: Direction,
        buf: &[u8],
        pos: &mut usize,
        timestamp_ns: u64,
    ) -> ParseState<Self::Frame>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{Direction, ProtocolKind};

    #[rstest]
    #[case::request(Direction::Request, "request")]
    #[case::response(Direction::Response, "response")]
    fn direction_labels_are_lowercase(#[case] direction: Direction, #[case] expected: &str) {
        assert_eq!(direction.label(), expected);
    }

    #[rstest]
    #[case::kafka(ProtocolKind::Kafka, "kafka")]
    #[case::dns(ProtocolKind::Dns, "dns")]
    fn protocol_labels_are_lowercase(#[case] kind: ProtocolKind, #[case] expected: &str) {
        assert_eq!(kind.label(), expected);
    }
}
