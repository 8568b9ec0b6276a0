//! Error taxonomy for the decoding layer.
//!
//! Every decode failure is an explicit [`DecodeError`] propagated to the
//! frame-queue driver; nothing in this crate panics on captured input. The
//! taxonomy distinguishes the one retryable condition (more bytes may still
//! arrive) from the three conditions that make the current frame
//! unrecoverable:
//!
//! - [`DecodeError::InsufficientData`]: retry later with the same bytes plus
//!   more. Routine during capture, not a failure.
//! - [`DecodeError::Malformed`]: structurally invalid field. Abort this frame
//!   and resynchronise at the next plausible boundary.
//! - [`DecodeError::Unsupported`]: recognised but unhandled wire variant
//!   (for example a legacy record-batch format). Abort this frame only.
//! - [`DecodeError::Internal`]: a decoder invariant was violated, such as a
//!   declared length not matching consumed bytes. Abort and flag for
//!   diagnosis.

use thiserror::Error;

/// Result alias for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Failure modes of the binary decoding layer.
///
/// # Examples
///
/// ```
/// use tapframe::decode::DecodeError;
///
/// let err = DecodeError::InsufficientData { have: 3, need: 8 };
/// assert!(err.is_retryable());
///
/// let err = DecodeError::Malformed {
///     reason: "varint exceeds bit-length ceiling",
/// };
/// assert!(!err.is_retryable());
/// ```
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes remain than the read requires.
    ///
    /// The capture layer delivers buffers incrementally, so this is the
    /// cooperative-retry signal: callers must retry once more bytes arrive
    /// and never treat it as permanent.
    #[error("insufficient data: have {have}, need {need}")]
    InsufficientData {
        /// Bytes remaining in the buffer (or bounded sub-view).
        have: usize,
        /// Bytes the read required.
        need: usize,
    },

    /// A field is structurally invalid for the wire grammar.
    #[error("malformed field: {reason}")]
    Malformed {
        /// What was wrong with the bytes.
        reason: &'static str,
    },

    /// A recognised but unhandled wire-format variant.
    #[error("unsupported wire format: {reason}")]
    Unsupported {
        /// Which variant was rejected.
        reason: &'static str,
    },

    /// A decoder invariant was violated.
    #[error("decoder invariant violated: {reason}")]
    Internal {
        /// Which invariant failed.
        reason: &'static str,
    },
}

impl DecodeError {
    /// Returns true when the failure may resolve once more bytes arrive.
    ///
    /// Only [`DecodeError::InsufficientData`] is retryable; every other kind
    /// means the current frame is unrecoverable and the stream must be
    /// resynchronised at the next plausible frame boundary.
    #[must_use]
    pub fn is_retryable(&self) -> bool { matches!(self, Self::InsufficientData { .. }) }

    /// Returns the error category as a string for logging and metrics.
    ///
    /// One of: `"insufficient_data"`, `"malformed"`, `"unsupported"`, or
    /// `"internal"`.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
            Self::Malformed { .. } => "malformed",
            Self::Unsupported { .. } => "unsupported",
            Self::Internal { .. } => "internal",
        }
    }
}
