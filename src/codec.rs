//! IEC 60870-5-104 codec for tokio.
//!
//! This module provides a codec implementation for encoding and decoding
//! IEC 104 APDUs using the tokio-util codec framework. The ASDU payload is
//! carried as raw bytes; decoding it is the session's concern so that a
//! malformed payload never desynchronizes the stream.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{FrameError, Iec104Error};
use crate::types::{
    parse_header, Apci, UFunction, MAX_PAYLOAD_LENGTH, MIN_APDU_LENGTH, START_BYTE,
};

/// An IEC 104 APDU (Application Protocol Data Unit).
///
/// Contains the APCI header and the raw ASDU bytes (empty for S/U frames).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apdu {
    /// APCI (Application Protocol Control Information)
    pub apci: Apci,
    /// ASDU bytes, only non-empty in I-frames
    pub payload: Bytes,
}

impl Apdu {
    /// Create a new I-frame APDU.
    pub fn i_frame(send_seq: u16, recv_seq: u16, payload: Bytes) -> Self {
        Self {
            apci: Apci::i_frame(send_seq, recv_seq),
            payload,
        }
    }

    /// Create a new S-frame APDU.
    pub fn s_frame(recv_seq: u16) -> Self {
        Self {
            apci: Apci::s_frame(recv_seq),
            payload: Bytes::new(),
        }
    }

    /// Create a new U-frame APDU.
    pub fn u_frame(function: UFunction) -> Self {
        Self {
            apci: Apci::u_frame(function),
            payload: Bytes::new(),
        }
    }

    /// Check if this is an I-frame.
    pub fn is_i_frame(&self) -> bool {
        self.apci.is_i_frame()
    }

    /// Check if this is an S-frame.
    pub fn is_s_frame(&self) -> bool {
        self.apci.is_s_frame()
    }

    /// Check if this is a U-frame.
    pub fn is_u_frame(&self) -> bool {
        self.apci.is_u_frame()
    }
}

impl std::fmt::Display for Apdu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.apci)?;
        if !self.payload.is_empty() {
            write!(f, " +{}B", self.payload.len())?;
        }
        Ok(())
    }
}

/// IEC 60870-5-104 codec.
///
/// A byte other than 0x68 where a frame must start is a fatal decode error;
/// the codec does not hunt for the next start byte.
///
/// # Example
///
/// ```rust,ignore
/// use futures::{SinkExt, StreamExt};
/// use tokio_util::codec::Framed;
/// use voltage_cs104::codec::{Apdu, Iec104Codec};
///
/// let stream = TcpStream::connect("192.168.1.100:2404").await?;
/// let mut framed = Framed::new(stream, Iec104Codec::new());
///
/// framed.send(Apdu::u_frame(UFunction::StartDtAct)).await?;
/// while let Some(apdu) = framed.next().await {
///     println!("Received: {}", apdu?);
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Iec104Codec;

impl Iec104Codec {
    /// Create a new IEC 104 codec.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for Iec104Codec {
    type Item = Apdu;
    type Error = Iec104Error;

    fn decode(
        &mut self,
        src: &mut BytesMut,
    ) -> std::result::Result<Option<Self::Item>, Self::Error> {
        let Some(&start) = src.first() else {
            return Ok(None);
        };
        if start != START_BYTE {
            return Err(FrameError::BadStartByte(start).into());
        }
        let Some(&length) = src.get(1) else {
            return Ok(None);
        };

        if usize::from(length) < MIN_APDU_LENGTH {
            return Err(FrameError::LengthMismatch {
                declared: usize::from(length),
                available: src.len() - 2,
            }
            .into());
        }

        let total_length = 2 + usize::from(length);
        if src.len() < total_length {
            src.reserve(total_length - src.len());
            return Ok(None);
        }

        let header = parse_header(&src[..total_length])?;
        let mut frame = src.split_to(total_length);
        let payload = frame.split_off(6).freeze();
        debug_assert_eq!(payload.len(), header.payload_len);

        Ok(Some(Apdu {
            apci: header.apci,
            payload,
        }))
    }
}

impl Encoder<Apdu> for Iec104Codec {
    type Error = Iec104Error;

    fn encode(&mut self, item: Apdu, dst: &mut BytesMut) -> std::result::Result<(), Self::Error> {
        let asdu_len = item.payload.len();
        if !item.apci.is_i_frame() && asdu_len != 0 {
            return Err(FrameError::UnexpectedPayload(asdu_len).into());
        }
        if asdu_len > MAX_PAYLOAD_LENGTH {
            return Err(FrameError::PayloadTooLarge(asdu_len).into());
        }

        dst.reserve(6 + asdu_len);
        dst.put_slice(&item.apci.encode_header(asdu_len));
        dst.put_slice(&item.payload);
        Ok(())
    }
}
