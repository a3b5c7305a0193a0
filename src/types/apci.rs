//! APCI and the pure frame layer.
//!
//! Every APDU starts with a 6-byte APCI: the start byte 0x68, a length
//! byte counting the bytes after it, and a 4-byte control field that
//! selects the frame format. The `wrap_*` functions and [`parse_header`]
//! build and check these headers without touching a stream.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FrameError;

/// Start byte for IEC 104 frames.
pub const START_BYTE: u8 = 0x68;

/// Length byte of a frame with no ASDU (the control field alone).
pub const MIN_APDU_LENGTH: usize = 4;

/// Largest value of the length byte.
pub const MAX_APDU_LENGTH: usize = 253;

/// Maximum ASDU payload of an I-frame.
pub const MAX_PAYLOAD_LENGTH: usize = MAX_APDU_LENGTH - MIN_APDU_LENGTH;

/// Sequence numbers count modulo 2^15.
pub const SEQ_MODULUS: u16 = 0x8000;

const SEQ_MASK: u16 = SEQ_MODULUS - 1;

/// Successor of a sequence number.
#[inline]
pub const fn seq_next(seq: u16) -> u16 {
    seq.wrapping_add(1) & SEQ_MASK
}

/// Number of steps from `from` forward to `to`, modulo 2^15.
#[inline]
pub const fn seq_distance(from: u16, to: u16) -> u16 {
    to.wrapping_sub(from) & SEQ_MASK
}

/// Pack a 15-bit sequence number into two control octets (bit 0 left free).
#[inline]
const fn seq_octets(seq: u16) -> [u8; 2] {
    [((seq & 0x7F) << 1) as u8, ((seq >> 7) & 0xFF) as u8]
}

#[inline]
const fn seq_from_octets(low: u8, high: u8) -> u16 {
    ((high as u16) << 7) | (low >> 1) as u16
}

/// Function of a U-frame. Each sets exactly one of bits 2-7 of the first
/// control octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UFunction {
    /// STARTDT act
    StartDtAct,
    /// STARTDT con
    StartDtCon,
    /// STOPDT act
    StopDtAct,
    /// STOPDT con
    StopDtCon,
    /// TESTFR act
    TestFrAct,
    /// TESTFR con
    TestFrCon,
}

impl UFunction {
    /// Every U-frame function, ordered by control bit.
    pub const ALL: [Self; 6] = [
        Self::StartDtAct,
        Self::StartDtCon,
        Self::StopDtAct,
        Self::StopDtCon,
        Self::TestFrAct,
        Self::TestFrCon,
    ];

    /// First control octet: the function bit plus format bits `11`.
    #[inline]
    pub const fn control_byte(&self) -> u8 {
        let bit = match self {
            Self::StartDtAct => 2,
            Self::StartDtCon => 3,
            Self::StopDtAct => 4,
            Self::StopDtCon => 5,
            Self::TestFrAct => 6,
            Self::TestFrCon => 7,
        };
        (1 << bit) | 0x03
    }

    /// Inverse of [`control_byte`](Self::control_byte). Any other pattern,
    /// including several function bits at once, yields `None`.
    #[inline]
    pub const fn from_control_byte(byte: u8) -> Option<Self> {
        match byte {
            0x07 => Some(Self::StartDtAct),
            0x0B => Some(Self::StartDtCon),
            0x13 => Some(Self::StopDtAct),
            0x23 => Some(Self::StopDtCon),
            0x43 => Some(Self::TestFrAct),
            0x83 => Some(Self::TestFrCon),
            _ => None,
        }
    }

    /// The confirmation that answers this function, if it is an activation.
    #[inline]
    pub const fn confirmation(&self) -> Option<Self> {
        match self {
            Self::StartDtAct => Some(Self::StartDtCon),
            Self::StopDtAct => Some(Self::StopDtCon),
            Self::TestFrAct => Some(Self::TestFrCon),
            _ => None,
        }
    }

    /// Standard name, e.g. "STARTDT act".
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartDtAct => "STARTDT act",
            Self::StartDtCon => "STARTDT con",
            Self::StopDtAct => "STOPDT act",
            Self::StopDtCon => "STOPDT con",
            Self::TestFrAct => "TESTFR act",
            Self::TestFrCon => "TESTFR con",
        }
    }
}

impl std::fmt::Display for UFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded control field of an APDU.
///
/// ```text
/// I:  | N(S) low 7 bits, 0 | N(S) high 8 | N(R) low 7 bits, 0 | N(R) high 8 |
/// S:  | 0000 0001          | 0           | N(R) low 7 bits, 0 | N(R) high 8 |
/// U:  | function bit, 11   | 0           | 0                  | 0           |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apci {
    /// Numbered information transfer.
    IFrame {
        /// N(S), 0-32767
        send_seq: u16,
        /// N(R), 0-32767
        recv_seq: u16,
    },
    /// Supervisory acknowledgement.
    SFrame {
        /// N(R), 0-32767
        recv_seq: u16,
    },
    /// Unnumbered control.
    UFrame {
        /// U-frame function
        function: UFunction,
    },
}

impl Apci {
    /// I-frame control field.
    #[inline]
    pub const fn i_frame(send_seq: u16, recv_seq: u16) -> Self {
        Self::IFrame { send_seq, recv_seq }
    }

    /// S-frame control field.
    #[inline]
    pub const fn s_frame(recv_seq: u16) -> Self {
        Self::SFrame { recv_seq }
    }

    /// U-frame control field.
    #[inline]
    pub const fn u_frame(function: UFunction) -> Self {
        Self::UFrame { function }
    }

    /// Decode a 4-byte control field.
    ///
    /// Bytes 1-3 of a U-frame are not inspected.
    pub fn parse(control: [u8; 4]) -> Result<Self, FrameError> {
        let [c0, c1, c2, c3] = control;
        match c0 & 0x03 {
            0x00 | 0x02 => Ok(Self::IFrame {
                send_seq: seq_from_octets(c0, c1),
                recv_seq: seq_from_octets(c2, c3),
            }),
            0x01 => Ok(Self::SFrame {
                recv_seq: seq_from_octets(c2, c3),
            }),
            _ => UFunction::from_control_byte(c0)
                .map(Self::u_frame)
                .ok_or(FrameError::UnknownControlPattern(control)),
        }
    }

    /// Encode to the 4-byte control field.
    #[inline]
    pub const fn encode(&self) -> [u8; 4] {
        match *self {
            Self::IFrame { send_seq, recv_seq } => {
                let [s0, s1] = seq_octets(send_seq);
                let [r0, r1] = seq_octets(recv_seq);
                [s0, s1, r0, r1]
            }
            Self::SFrame { recv_seq } => {
                let [r0, r1] = seq_octets(recv_seq);
                [0x01, 0x00, r0, r1]
            }
            Self::UFrame { function } => [function.control_byte(), 0x00, 0x00, 0x00],
        }
    }

    /// Start byte, length byte and control field for a frame carrying
    /// `asdu_len` payload bytes.
    #[inline]
    pub const fn encode_header(&self, asdu_len: usize) -> [u8; 6] {
        let [c0, c1, c2, c3] = self.encode();
        [START_BYTE, (MIN_APDU_LENGTH + asdu_len) as u8, c0, c1, c2, c3]
    }

    #[inline]
    pub const fn is_i_frame(&self) -> bool {
        matches!(self, Self::IFrame { .. })
    }

    #[inline]
    pub const fn is_s_frame(&self) -> bool {
        matches!(self, Self::SFrame { .. })
    }

    #[inline]
    pub const fn is_u_frame(&self) -> bool {
        matches!(self, Self::UFrame { .. })
    }

    /// N(S) of an I-frame.
    #[inline]
    pub const fn send_seq(&self) -> Option<u16> {
        match self {
            Self::IFrame { send_seq, .. } => Some(*send_seq),
            _ => None,
        }
    }

    /// N(R) of an I-frame or S-frame.
    #[inline]
    pub const fn recv_seq(&self) -> Option<u16> {
        match self {
            Self::IFrame { recv_seq, .. } | Self::SFrame { recv_seq } => Some(*recv_seq),
            Self::UFrame { .. } => None,
        }
    }
}

impl std::fmt::Display for Apci {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IFrame { send_seq, recv_seq } => write!(f, "I(S={send_seq}, R={recv_seq})"),
            Self::SFrame { recv_seq } => write!(f, "S(R={recv_seq})"),
            Self::UFrame { function } => write!(f, "U({function})"),
        }
    }
}

/// Parsed APDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Control information
    pub apci: Apci,
    /// Number of ASDU bytes following the 6-byte header
    pub payload_len: usize,
}

/// Parse one complete APDU held in `buf`.
///
/// The length byte must match the bytes after it exactly; a short or
/// over-long buffer is a [`FrameError::LengthMismatch`].
pub fn parse_header(buf: &[u8]) -> Result<Header, FrameError> {
    let available = buf.len().saturating_sub(2);
    let Some(&start) = buf.first() else {
        return Err(FrameError::LengthMismatch {
            declared: MIN_APDU_LENGTH,
            available: 0,
        });
    };
    if start != START_BYTE {
        return Err(FrameError::BadStartByte(start));
    }
    let Some(&len) = buf.get(1) else {
        return Err(FrameError::LengthMismatch {
            declared: MIN_APDU_LENGTH,
            available,
        });
    };
    let declared = usize::from(len);
    if !(MIN_APDU_LENGTH..=MAX_APDU_LENGTH).contains(&declared) || available != declared {
        return Err(FrameError::LengthMismatch {
            declared,
            available,
        });
    }

    let apci = Apci::parse([buf[2], buf[3], buf[4], buf[5]])?;
    let payload_len = declared - MIN_APDU_LENGTH;
    if !apci.is_i_frame() && payload_len != 0 {
        return Err(FrameError::UnexpectedPayload(payload_len));
    }
    Ok(Header { apci, payload_len })
}

/// Serialize an I-frame carrying `payload`.
pub fn wrap_i(send_seq: u16, recv_seq: u16, payload: &[u8]) -> Result<Bytes, FrameError> {
    if payload.len() > MAX_PAYLOAD_LENGTH {
        return Err(FrameError::PayloadTooLarge(payload.len()));
    }
    let mut buf = BytesMut::with_capacity(6 + payload.len());
    buf.put_slice(&Apci::i_frame(send_seq, recv_seq).encode_header(payload.len()));
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Serialize an S-frame.
pub fn wrap_s(recv_seq: u16) -> Bytes {
    Bytes::copy_from_slice(&Apci::s_frame(recv_seq).encode_header(0))
}

/// Serialize a U-frame.
pub fn wrap_u(function: UFunction) -> Bytes {
    Bytes::copy_from_slice(&Apci::u_frame(function).encode_header(0))
}
