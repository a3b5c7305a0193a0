//! Error types for IEC 60870-5-104 protocol.
//!
//! Errors fall into three groups:
//!
//! - [`CodecError`]: a malformed ASDU payload. Recoverable; the link stays up.
//! - [`FrameError`]: a corrupt APCI header. Fatal for the session.
//! - [`AbortReason`]: why a session was torn down. Every fatal condition is
//!   funneled through a single abort path and surfaces as
//!   [`Iec104Error::SessionAborted`].

use thiserror::Error;

use crate::session::SessionState;
use crate::types::{TypeId, UFunction};

/// Result type alias for IEC 104 operations.
pub type Result<T> = std::result::Result<T, Iec104Error>;

/// ASDU encode/decode failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Fewer bytes remain than the layout requires.
    #[error("Truncated buffer: need {needed} bytes, {remaining} remaining")]
    TruncatedBuffer { needed: usize, remaining: usize },

    /// Type identification not in the supported table.
    #[error("Unknown type ID: {0}")]
    UnknownType(u8),

    /// Cause of transmission code not defined.
    #[error("Unknown cause of transmission: {0}")]
    UnknownCause(u8),

    /// VSQ count is zero, above 127, or disagrees with the object list.
    #[error("Invalid object count: {0}")]
    InvalidCount(usize),

    /// A time tag field is out of range.
    #[error("Malformed time tag: {0}")]
    MalformedTime(&'static str),

    /// Common address is zero or does not fit the configured width.
    #[error("Invalid common address: {0}")]
    InvalidCommonAddress(u16),

    /// Information object address does not fit the configured width.
    #[error("Invalid information object address: {0}")]
    InvalidAddress(u32),

    /// SQ=1 ASDU whose addresses are not consecutive.
    #[error("Non-sequential address {actual} (expected {expected})")]
    NonSequentialAddress { expected: u32, actual: u32 },

    /// Element or time tag shape does not match the type identification.
    #[error("Element does not match type {0}")]
    ElementMismatch(TypeId),

    /// Encoded ASDU exceeds the 249 bytes an I-frame can carry.
    #[error("ASDU too large: {0} bytes")]
    AsduTooLarge(usize),

    /// Bytes left over after the declared objects were decoded.
    #[error("{0} trailing bytes after last information object")]
    TrailingBytes(usize),

    /// Parameter set widths out of range.
    #[error("Invalid parameters: {0}")]
    InvalidParams(&'static str),
}

/// APCI framing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// First byte is not 0x68.
    #[error("Bad start byte: 0x{0:02X}")]
    BadStartByte(u8),

    /// Declared APDU length disagrees with the bytes available.
    #[error("Length mismatch: declared {declared}, available {available}")]
    LengthMismatch { declared: usize, available: usize },

    /// Control field bits do not form a valid I, S or U pattern.
    #[error("Unknown control pattern: {0:02X?}")]
    UnknownControlPattern([u8; 4]),

    /// S-frame or U-frame carrying payload bytes.
    #[error("Unexpected payload of {0} bytes on S/U frame")]
    UnexpectedPayload(usize),

    /// Payload too large for a single I-frame.
    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),
}

/// Cause of a fatal session teardown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortReason {
    /// Stream read or write failed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Peer closed the stream.
    #[error("connection closed by peer")]
    PeerClosed,

    /// Corrupt frame header.
    #[error("framing error: {0}")]
    Framing(#[from] FrameError),

    /// No STARTDT con within t1.
    #[error("STARTDT confirmation timeout")]
    ActivationTimeout,

    /// No STOPDT con within t1.
    #[error("STOPDT confirmation timeout")]
    DeactivationTimeout,

    /// No TESTFR con within t1.
    #[error("TESTFR confirmation timeout")]
    TestFrameTimeout,

    /// An I-frame was not acknowledged within t1.
    #[error("acknowledgment timeout for I-frame {0}")]
    AckTimeout(u16),

    /// Received N(S) is not the expected receive sequence number.
    #[error("sequence error: expected {expected}, got {actual}")]
    SequenceError { expected: u16, actual: u16 },

    /// Received N(R) acknowledges frames never sent.
    #[error("acknowledgment {ack} outside window [{oldest}, {next}]")]
    AckOutOfRange { ack: u16, oldest: u16, next: u16 },

    /// I-frame received while data transfer is not active.
    #[error("I-frame received in state {0:?}")]
    UnexpectedIFrame(SessionState),

    /// Confirmation received without a matching activation.
    #[error("unexpected {0} in state {1:?}")]
    UnexpectedConfirmation(UFunction, SessionState),
}

/// IEC 60870-5-104 protocol error types.
#[derive(Debug, Error)]
pub enum Iec104Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ASDU codec error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Frame layer error
    #[error("Invalid frame: {0}")]
    Frame(#[from] FrameError),

    /// Timer/window configuration out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(&'static str),

    /// Connection timeout (t0)
    #[error("Connection timeout")]
    ConnectTimeout,

    /// Send window has k unacknowledged I-frames
    #[error("Send window full")]
    WindowFull,

    /// Session closed before the operation completed
    #[error("Session closed")]
    SessionClosed,

    /// Operation not allowed in the current state
    #[error("{operation} not allowed in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Session torn down by a fatal condition
    #[error("Session aborted: {0}")]
    SessionAborted(#[from] AbortReason),
}

impl Iec104Error {
    /// Check if this error ended the session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Frame(_) | Self::SessionAborted(_) | Self::SessionClosed
        )
    }

    /// Check if this error indicates a connection problem.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::ConnectTimeout
                | Self::SessionClosed
                | Self::SessionAborted(AbortReason::Transport(_) | AbortReason::PeerClosed)
        )
    }

    /// Check if the owner may retry by reconnecting.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout
                | Self::WindowFull
                | Self::SessionAborted(
                    AbortReason::ActivationTimeout
                        | AbortReason::TestFrameTimeout
                        | AbortReason::AckTimeout(_)
                )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Iec104Error::WindowFull;
        assert_eq!(err.to_string(), "Send window full");

        let err = Iec104Error::from(CodecError::UnknownType(255));
        assert_eq!(err.to_string(), "Codec error: Unknown type ID: 255");

        let err = Iec104Error::from(AbortReason::SequenceError {
            expected: 10,
            actual: 5,
        });
        assert_eq!(
            err.to_string(),
            "Session aborted: sequence error: expected 10, got 5"
        );
    }

    #[test]
    fn test_frame_error_display() {
        assert_eq!(
            FrameError::BadStartByte(0x69).to_string(),
            "Bad start byte: 0x69"
        );
        assert_eq!(
            FrameError::LengthMismatch {
                declared: 14,
                available: 10
            }
            .to_string(),
            "Length mismatch: declared 14, available 10"
        );
    }

    #[test]
    fn test_is_fatal() {
        assert!(Iec104Error::SessionAborted(AbortReason::AckTimeout(3)).is_fatal());
        assert!(Iec104Error::Frame(FrameError::BadStartByte(0)).is_fatal());
        assert!(!Iec104Error::Codec(CodecError::UnknownType(0)).is_fatal());
        assert!(!Iec104Error::WindowFull.is_fatal());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Iec104Error::ConnectTimeout.is_connection_error());
        assert!(Iec104Error::SessionAborted(AbortReason::PeerClosed).is_connection_error());
        assert!(!Iec104Error::SessionAborted(AbortReason::AckTimeout(0)).is_connection_error());
    }

    #[test]
    fn test_is_retryable() {
        assert!(Iec104Error::ConnectTimeout.is_retryable());
        assert!(Iec104Error::SessionAborted(AbortReason::TestFrameTimeout).is_retryable());
        assert!(!Iec104Error::SessionClosed.is_retryable());
    }
}
