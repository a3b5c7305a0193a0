//! IEC 60870-5-104 ASDU (Application Service Data Unit).
//!
//! ASDU contains the actual data (measurements, commands, etc.).
//!
//! ```text
//! +---------+-----+-----+------------+----------------+-----------------------+
//! | TypeID  | VSQ | COT | Originator | Common address | Information objects   |
//! | 1 byte  | 1   | 1   | 0 or 1     | 1 or 2 (LE)    | IOA + element [+ time] |
//! +---------+-----+-----+------------+----------------+-----------------------+
//! ```
//!
//! Field widths come from [`Params`], which every encode/decode call takes.

use bytes::{BufMut, Bytes, BytesMut};

use super::element::{CommandQualifier, DoublePointValue, Element, SetpointQualifier, FIXED_TEST_PATTERN};
use super::reader::Reader;
use super::time::{Cp24Time2a, Cp56Time2a, TimeTag};
use super::type_id::{TimeTagKind, TypeId};
use super::{CauseOfTransmission, Cot};
use crate::config::Params;
use crate::error::CodecError;

/// Largest ASDU an I-frame can carry.
pub const MAX_ASDU_LENGTH: usize = 249;

/// Largest number of information objects in one ASDU.
pub const MAX_OBJECTS: usize = 127;

/// Qualifier of interrogation for station interrogation.
pub const QOI_STATION: u8 = 20;

/// Qualifier of counter interrogation: general request, no freeze.
pub const QCC_GENERAL: u8 = 5;

/// Variable Structure Qualifier (VSQ).
///
/// Defines the structure of information objects in an ASDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vsq {
    /// Number of information objects (1-127)
    pub count: u8,
    /// If true, addresses are sequential (SQ=1)
    pub sequence: bool,
}

impl Vsq {
    /// Create a new VSQ.
    #[inline]
    pub const fn new(count: u8, sequence: bool) -> Self {
        Self { count, sequence }
    }

    /// Parse VSQ from byte.
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        Self {
            count: value & 0x7F,
            sequence: (value & 0x80) != 0,
        }
    }

    /// Encode VSQ to byte.
    #[inline]
    pub const fn as_u8(&self) -> u8 {
        (self.count & 0x7F) | if self.sequence { 0x80 } else { 0 }
    }
}

/// Information Object Address (IOA).
///
/// Up to 3 bytes on the wire, little-endian; the width comes from [`Params`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Ioa(pub u32);

impl Ioa {
    /// Create IOA from u32 (lower 24 bits).
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value & 0x00FF_FFFF)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Address `n` positions after this one.
    #[inline]
    pub const fn offset(&self, n: u32) -> Self {
        Self(self.0.wrapping_add(n))
    }

    fn write(&self, buf: &mut BytesMut, params: &Params) -> Result<(), CodecError> {
        if self.0 > params.max_ioa() {
            return Err(CodecError::InvalidAddress(self.0));
        }
        buf.put_slice(&self.0.to_le_bytes()[..usize::from(params.ioa_size)]);
        Ok(())
    }
}

impl From<u32> for Ioa {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Ioa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Data unit identifier (fixed part of the ASDU).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identifier {
    /// Type identification
    pub type_id: TypeId,
    /// Variable structure qualifier
    pub variable: Vsq,
    /// Cause of transmission with test and P/N flags
    pub cause: CauseOfTransmission,
    /// Originator address (0 if not used); only on the wire when cause size is 2
    pub originator: u8,
    /// Common address of ASDU (station address)
    pub common_address: u16,
}

impl Identifier {
    /// Create an identifier with no objects counted yet.
    pub fn new(type_id: TypeId, cause: impl Into<CauseOfTransmission>, common_address: u16) -> Self {
        Self {
            type_id,
            variable: Vsq::new(0, false),
            cause: cause.into(),
            originator: 0,
            common_address,
        }
    }

    /// Set the originator address.
    pub fn with_originator(mut self, originator: u8) -> Self {
        self.originator = originator;
        self
    }

    /// Set the SQ bit.
    pub fn with_sequence(mut self, sequence: bool) -> Self {
        self.variable.sequence = sequence;
        self
    }

    fn write(&self, buf: &mut BytesMut, params: &Params) -> Result<(), CodecError> {
        if self.common_address == 0 || self.common_address > params.max_common_address() {
            return Err(CodecError::InvalidCommonAddress(self.common_address));
        }
        buf.put_u8(self.type_id.as_u8());
        buf.put_u8(self.variable.as_u8());
        let cause = if params.cause_flags {
            self.cause
        } else {
            CauseOfTransmission::new(self.cause.cot)
        };
        buf.put_u8(cause.as_u8());
        if params.has_originator() {
            buf.put_u8(self.originator);
        }
        if params.common_addr_size == 1 {
            buf.put_u8(self.common_address as u8);
        } else {
            buf.put_u16_le(self.common_address);
        }
        Ok(())
    }

    fn read(r: &mut Reader<'_>, params: &Params) -> Result<Self, CodecError> {
        let type_id = TypeId::from_u8(r.u8()?)?;
        let variable = Vsq::from_u8(r.u8()?);
        let cause = match r.u8()? {
            byte if params.cause_flags => CauseOfTransmission::from_u8(byte)?,
            byte => CauseOfTransmission::new(Cot::from_u8(byte)?),
        };
        let originator = if params.has_originator() { r.u8()? } else { 0 };
        let common_address = r.uint(params.common_addr_size)? as u16;
        Ok(Self {
            type_id,
            variable,
            cause,
            originator,
            common_address,
        })
    }
}

/// Information object: address, element and optional time tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfoObject {
    /// Information object address
    pub ioa: Ioa,
    /// Information element
    pub element: Element,
    /// Time tag, present exactly when the type carries one
    pub time: Option<TimeTag>,
}

impl InfoObject {
    /// Object without time tag.
    pub fn new(ioa: impl Into<Ioa>, element: Element) -> Self {
        Self {
            ioa: ioa.into(),
            element,
            time: None,
        }
    }

    /// Object with time tag.
    pub fn with_time(ioa: impl Into<Ioa>, element: Element, time: impl Into<TimeTag>) -> Self {
        Self {
            ioa: ioa.into(),
            element,
            time: Some(time.into()),
        }
    }

    fn check_shape(&self, type_id: TypeId) -> Result<(), CodecError> {
        let (kind, tag) = type_id.layout();
        let tag_matches = matches!(
            (tag, &self.time),
            (TimeTagKind::None, None)
                | (TimeTagKind::Cp24, Some(TimeTag::Cp24(_)))
                | (TimeTagKind::Cp56, Some(TimeTag::Cp56(_)))
        );
        if self.element.kind() != kind || !tag_matches {
            return Err(CodecError::ElementMismatch(type_id));
        }
        Ok(())
    }

    fn write_body(&self, buf: &mut BytesMut, params: &Params) {
        self.element.write(buf, params);
        match &self.time {
            Some(TimeTag::Cp24(t)) => buf.put_slice(&t.to_bytes()),
            Some(TimeTag::Cp56(t)) => buf.put_slice(&t.to_bytes()),
            None => {}
        }
    }

    fn read_body(ioa: Ioa, type_id: TypeId, r: &mut Reader<'_>, params: &Params) -> Result<Self, CodecError> {
        let (kind, tag) = type_id.layout();
        let element = Element::read(kind, r, params)?;
        let time = match tag {
            TimeTagKind::None => None,
            TimeTagKind::Cp24 => Some(TimeTag::Cp24(Cp24Time2a::from_bytes(r.take(3)?)?)),
            TimeTagKind::Cp56 => Some(TimeTag::Cp56(Cp56Time2a::from_bytes(r.take(7)?)?)),
        };
        Ok(Self { ioa, element, time })
    }
}

/// Complete ASDU.
#[derive(Debug, Clone, PartialEq)]
pub struct Asdu {
    /// Data unit identifier
    pub identifier: Identifier,
    /// Information objects, always with explicit addresses
    pub objects: Vec<InfoObject>,
}

impl Asdu {
    /// Create an ASDU with no objects.
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            objects: Vec::new(),
        }
    }

    /// Append an object and keep the VSQ count in step.
    pub fn push(&mut self, object: InfoObject) -> &mut Self {
        self.objects.push(object);
        self.identifier.variable.count = self.objects.len().min(0x7F) as u8;
        self
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_object(mut self, object: InfoObject) -> Self {
        self.push(object);
        self
    }

    /// Type identification.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.identifier.type_id
    }

    /// Cause of transmission code.
    #[inline]
    pub fn cot(&self) -> Cot {
        self.identifier.cause.cot
    }

    /// Common address.
    #[inline]
    pub fn common_address(&self) -> u16 {
        self.identifier.common_address
    }

    /// Copy of this ASDU with a different cause, as used for confirmations.
    pub fn mirror(&self, cause: impl Into<CauseOfTransmission>) -> Self {
        let mut reply = self.clone();
        reply.identifier.cause = cause.into();
        reply
    }

    /// Encode with the given parameter set.
    pub fn encode(&self, params: &Params) -> Result<Bytes, CodecError> {
        params.validate()?;

        let count = self.objects.len();
        if count == 0 || count > MAX_OBJECTS || usize::from(self.identifier.variable.count) != count {
            return Err(CodecError::InvalidCount(count));
        }

        let type_id = self.identifier.type_id;
        let mut buf = BytesMut::with_capacity(MAX_ASDU_LENGTH);
        self.identifier.write(&mut buf, params)?;

        if self.identifier.variable.sequence {
            let first = self.objects[0].ioa;
            first.write(&mut buf, params)?;
            for (i, obj) in self.objects.iter().enumerate() {
                let expected = first.offset(i as u32);
                if obj.ioa != expected {
                    return Err(CodecError::NonSequentialAddress {
                        expected: expected.0,
                        actual: obj.ioa.0,
                    });
                }
                obj.check_shape(type_id)?;
                obj.write_body(&mut buf, params);
            }
            if first.offset(count as u32 - 1).0 > params.max_ioa() {
                return Err(CodecError::InvalidAddress(first.offset(count as u32 - 1).0));
            }
        } else {
            for obj in &self.objects {
                obj.check_shape(type_id)?;
                obj.ioa.write(&mut buf, params)?;
                obj.write_body(&mut buf, params);
            }
        }

        if buf.len() > MAX_ASDU_LENGTH {
            return Err(CodecError::AsduTooLarge(buf.len()));
        }
        Ok(buf.freeze())
    }

    /// Decode with the given parameter set.
    pub fn decode(data: &[u8], params: &Params) -> Result<Self, CodecError> {
        params.validate()?;

        let mut r = Reader::new(data);
        let identifier = Identifier::read(&mut r, params)?;
        let count = usize::from(identifier.variable.count);
        if count == 0 {
            return Err(CodecError::InvalidCount(0));
        }

        let type_id = identifier.type_id;
        let mut objects = Vec::with_capacity(count);
        if identifier.variable.sequence {
            let first = Ioa(r.uint(params.ioa_size)?);
            let last = first.offset(count as u32 - 1);
            if last.0 > params.max_ioa() {
                return Err(CodecError::InvalidAddress(last.0));
            }
            for i in 0..count {
                objects.push(InfoObject::read_body(first.offset(i as u32), type_id, &mut r, params)?);
            }
        } else {
            for _ in 0..count {
                let ioa = Ioa(r.uint(params.ioa_size)?);
                objects.push(InfoObject::read_body(ioa, type_id, &mut r, params)?);
            }
        }

        if r.remaining() > 0 {
            return Err(CodecError::TrailingBytes(r.remaining()));
        }
        Ok(Self { identifier, objects })
    }

    fn command(type_id: TypeId, common_address: u16, ioa: u32, element: Element) -> Self {
        Self::new(Identifier::new(type_id, Cot::Activation, common_address))
            .with_object(InfoObject::new(ioa, element))
    }

    /// Create an interrogation command ASDU (C_IC_NA_1).
    pub fn interrogation_command(common_address: u16, qoi: u8) -> Self {
        Self::command(TypeId::InterrogationCommand, common_address, 0, Element::Interrogation(qoi))
    }

    /// Create a counter interrogation command ASDU (C_CI_NA_1).
    pub fn counter_interrogation_command(common_address: u16, qcc: u8) -> Self {
        Self::command(
            TypeId::CounterInterrogation,
            common_address,
            0,
            Element::CounterInterrogation(qcc),
        )
    }

    /// Create a read command ASDU (C_RD_NA_1).
    pub fn read_command(common_address: u16, ioa: u32) -> Self {
        Self::new(Identifier::new(TypeId::ReadCommand, Cot::Request, common_address))
            .with_object(InfoObject::new(ioa, Element::Read))
    }

    /// Create a clock synchronization command ASDU (C_CS_NA_1).
    pub fn clock_sync_command(common_address: u16, time: Cp56Time2a) -> Self {
        Self::command(TypeId::ClockSync, common_address, 0, Element::ClockSync(time))
    }

    /// Create a test command ASDU (C_TS_NA_1).
    pub fn test_command(common_address: u16) -> Self {
        Self::command(
            TypeId::TestCommand,
            common_address,
            0,
            Element::TestCommand(FIXED_TEST_PATTERN),
        )
    }

    /// Create a reset process command ASDU (C_RP_NA_1).
    pub fn reset_process_command(common_address: u16, qrp: u8) -> Self {
        Self::command(TypeId::ResetProcess, common_address, 0, Element::ResetProcess(qrp))
    }

    /// Create a single command ASDU (C_SC_NA_1).
    pub fn single_command(common_address: u16, ioa: u32, value: bool, select: bool) -> Self {
        Self::command(
            TypeId::SingleCommand,
            common_address,
            ioa,
            Element::SingleCommand {
                value,
                qualifier: CommandQualifier {
                    qualifier: 0,
                    select,
                },
            },
        )
    }

    /// Create a double command ASDU (C_DC_NA_1).
    pub fn double_command(common_address: u16, ioa: u32, value: DoublePointValue, select: bool) -> Self {
        Self::command(
            TypeId::DoubleCommand,
            common_address,
            ioa,
            Element::DoubleCommand {
                value,
                qualifier: CommandQualifier {
                    qualifier: 0,
                    select,
                },
            },
        )
    }

    /// Create a short floating point set-point command ASDU (C_SE_NC_1).
    pub fn setpoint_float_command(common_address: u16, ioa: u32, value: f32, select: bool) -> Self {
        Self::command(
            TypeId::SetpointFloat,
            common_address,
            ioa,
            Element::SetpointFloat {
                value,
                qualifier: SetpointQualifier {
                    qualifier: 0,
                    select,
                },
            },
        )
    }
}
