//! Information elements.
//!
//! [`Element`] holds exactly one information element in decoded form. Its
//! variant is fixed by the ASDU type identification (see
//! [`TypeId::layout`](super::TypeId::layout)); the codec rejects an element
//! whose [`Element::kind`] disagrees with the type.

use bytes::{BufMut, BytesMut};

use super::reader::Reader;
use super::time::{Cp16Time2a, Cp56Time2a};
use super::type_id::ElementKind;
use crate::config::{FloatByteOrder, Params};
use crate::error::CodecError;

/// Fixed bit pattern of the test command (C_TS_NA_1).
pub const FIXED_TEST_PATTERN: u16 = 0x55AA;

/// Quality descriptor bits, stored in their on-wire positions.
///
/// The same type serves QDS, the quality half of SIQ/DIQ, and QDP:
/// - Bit 0: overflow (OV), QDS only
/// - Bit 3: elapsed time invalid (EI), QDP/SEP only
/// - Bit 4: blocked (BL)
/// - Bit 5: substituted (SB)
/// - Bit 6: not topical (NT)
/// - Bit 7: invalid (IV)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Quality(u8);

impl Quality {
    const OV_MASK: u8 = 0b0000_0001;
    const EI_MASK: u8 = 0b0000_1000;
    const BL_MASK: u8 = 0b0001_0000;
    const SB_MASK: u8 = 0b0010_0000;
    const NT_MASK: u8 = 0b0100_0000;
    const IV_MASK: u8 = 0b1000_0000;

    const QDS_BITS: u8 = 0xF1;
    const SIQ_BITS: u8 = 0xF0;
    const QDP_BITS: u8 = 0xF8;

    /// Good quality (all flags false).
    #[allow(non_upper_case_globals)]
    pub const Good: Self = Self(0);

    /// Invalid quality.
    #[allow(non_upper_case_globals)]
    pub const Invalid: Self = Self(Self::IV_MASK);

    #[inline(always)]
    const fn with_bit(mut self, mask: u8, value: bool) -> Self {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
        self
    }

    /// Overflow (OV) - value exceeds predefined range
    #[inline(always)]
    pub const fn overflow(&self) -> bool {
        (self.0 & Self::OV_MASK) != 0
    }

    /// Set overflow flag
    #[inline(always)]
    pub const fn set_overflow(self, value: bool) -> Self {
        self.with_bit(Self::OV_MASK, value)
    }

    /// Blocked (BL) - value is blocked for transmission
    #[inline(always)]
    pub const fn blocked(&self) -> bool {
        (self.0 & Self::BL_MASK) != 0
    }

    /// Set blocked flag
    #[inline(always)]
    pub const fn set_blocked(self, value: bool) -> Self {
        self.with_bit(Self::BL_MASK, value)
    }

    /// Substituted (SB) - value is substituted
    #[inline(always)]
    pub const fn substituted(&self) -> bool {
        (self.0 & Self::SB_MASK) != 0
    }

    /// Set substituted flag
    #[inline(always)]
    pub const fn set_substituted(self, value: bool) -> Self {
        self.with_bit(Self::SB_MASK, value)
    }

    /// Not topical (NT) - value is not topical (outdated)
    #[inline(always)]
    pub const fn not_topical(&self) -> bool {
        (self.0 & Self::NT_MASK) != 0
    }

    /// Set not_topical flag
    #[inline(always)]
    pub const fn set_not_topical(self, value: bool) -> Self {
        self.with_bit(Self::NT_MASK, value)
    }

    /// Invalid (IV) - value is invalid
    #[inline(always)]
    pub const fn invalid(&self) -> bool {
        (self.0 & Self::IV_MASK) != 0
    }

    /// Set invalid flag
    #[inline(always)]
    pub const fn set_invalid(self, value: bool) -> Self {
        self.with_bit(Self::IV_MASK, value)
    }

    /// Elapsed time invalid (EI), protection events only
    #[inline(always)]
    pub const fn elapsed_time_invalid(&self) -> bool {
        (self.0 & Self::EI_MASK) != 0
    }

    /// Set elapsed_time_invalid flag
    #[inline(always)]
    pub const fn set_elapsed_time_invalid(self, value: bool) -> Self {
        self.with_bit(Self::EI_MASK, value)
    }

    /// Get the raw byte value
    #[inline(always)]
    pub const fn as_raw(&self) -> u8 {
        self.0
    }

    /// Create from raw byte value
    #[inline(always)]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Parse from QDS byte.
    #[inline(always)]
    pub const fn from_qds(byte: u8) -> Self {
        Self(byte & Self::QDS_BITS)
    }

    /// Parse the quality half of a SIQ or DIQ byte.
    #[inline(always)]
    pub const fn from_siq(byte: u8) -> Self {
        Self(byte & Self::SIQ_BITS)
    }

    /// Parse from QDP byte (protection equipment).
    #[inline(always)]
    pub const fn from_qdp(byte: u8) -> Self {
        Self(byte & Self::QDP_BITS)
    }

    /// Check if quality is good (no flags set).
    #[inline(always)]
    pub const fn is_good(&self) -> bool {
        self.0 == 0
    }

    /// Create a new Quality with only the invalid flag set based on a boolean.
    #[inline(always)]
    pub const fn with_invalid(invalid: bool) -> Self {
        if invalid {
            Self(Self::IV_MASK)
        } else {
            Self(0)
        }
    }
}

impl std::fmt::Debug for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Quality")
            .field("overflow", &self.overflow())
            .field("blocked", &self.blocked())
            .field("substituted", &self.substituted())
            .field("not_topical", &self.not_topical())
            .field("invalid", &self.invalid())
            .field("elapsed_time_invalid", &self.elapsed_time_invalid())
            .finish()
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_good() {
            return f.write_str("Good");
        }

        let flags = [
            (self.overflow(), "OV"),
            (self.blocked(), "BL"),
            (self.substituted(), "SB"),
            (self.not_topical(), "NT"),
            (self.invalid(), "IV"),
            (self.elapsed_time_invalid(), "EI"),
        ];
        let mut first = true;
        for (set, name) in flags {
            if set {
                if !first {
                    f.write_str("|")?;
                }
                first = false;
                f.write_str(name)?;
            }
        }
        Ok(())
    }
}

/// Double-point information value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoublePointValue {
    /// Indeterminate or intermediate (00)
    Indeterminate = 0,
    /// Determined OFF (01)
    Off = 1,
    /// Determined ON (10)
    On = 2,
    /// Indeterminate (11)
    IndeterminateOrFaulty = 3,
}

impl DoublePointValue {
    /// Parse from byte (lower 2 bits).
    pub const fn from_u8(value: u8) -> Self {
        match value & 0x03 {
            1 => Self::Off,
            2 => Self::On,
            3 => Self::IndeterminateOrFaulty,
            _ => Self::Indeterminate,
        }
    }

    /// Two-bit wire value.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Regulating step command state (RCS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepCommand {
    /// Not permitted (00)
    NotPermitted = 0,
    /// Next step lower (01)
    Lower = 1,
    /// Next step higher (10)
    Higher = 2,
    /// Not permitted (11)
    NotPermittedHigh = 3,
}

impl StepCommand {
    /// Parse from byte (lower 2 bits).
    pub const fn from_u8(value: u8) -> Self {
        match value & 0x03 {
            1 => Self::Lower,
            2 => Self::Higher,
            3 => Self::NotPermittedHigh,
            _ => Self::NotPermitted,
        }
    }
}

/// Step position value with transient state indication (VTI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StepPosition {
    /// Position, -64..=63
    pub value: i8,
    /// Equipment is in transient state
    pub transient: bool,
}

impl StepPosition {
    /// Parse from VTI byte.
    pub const fn from_u8(byte: u8) -> Self {
        Self {
            value: ((byte << 1) as i8) >> 1,
            transient: byte & 0x80 != 0,
        }
    }

    /// Encode to VTI byte.
    pub const fn as_u8(&self) -> u8 {
        (self.value as u8 & 0x7F) | if self.transient { 0x80 } else { 0 }
    }
}

/// Normalized value (NVA), a fixed-point fraction in [-1, 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Normalized(pub i16);

impl Normalized {
    /// Value as a fraction.
    pub fn to_f32(self) -> f32 {
        f32::from(self.0) / 32768.0
    }

    /// Nearest representable value, clamped to the range.
    pub fn from_f32(value: f32) -> Self {
        Self((value * 32768.0).round().clamp(-32768.0, 32767.0) as i16)
    }
}

/// Binary counter reading (BCR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BinaryCounterReading {
    /// Counter value
    pub value: i32,
    /// Sequence number, 0..=31
    pub sequence: u8,
    /// Counter overflowed in the integration period (CY)
    pub carry: bool,
    /// Counter was adjusted (CA)
    pub adjusted: bool,
    /// Reading is invalid (IV)
    pub invalid: bool,
}

impl BinaryCounterReading {
    fn flags(&self) -> u8 {
        (self.sequence & 0x1F)
            | if self.carry { 0x20 } else { 0 }
            | if self.adjusted { 0x40 } else { 0 }
            | if self.invalid { 0x80 } else { 0 }
    }

    fn from_parts(value: i32, flags: u8) -> Self {
        Self {
            value,
            sequence: flags & 0x1F,
            carry: flags & 0x20 != 0,
            adjusted: flags & 0x40 != 0,
            invalid: flags & 0x80 != 0,
        }
    }
}

/// Qualifier of command: QU in bits 2-6, S/E in bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CommandQualifier {
    /// Qualifier (0 = no additional definition, 1 short pulse, 2 long pulse, 3 persistent)
    pub qualifier: u8,
    /// Select (true) or execute (false)
    pub select: bool,
}

impl CommandQualifier {
    /// Execute with no additional definition.
    pub const EXECUTE: Self = Self {
        qualifier: 0,
        select: false,
    };

    /// Select with no additional definition.
    pub const SELECT: Self = Self {
        qualifier: 0,
        select: true,
    };

    const fn from_u8(byte: u8) -> Self {
        Self {
            qualifier: (byte >> 2) & 0x1F,
            select: byte & 0x80 != 0,
        }
    }

    const fn as_u8(&self) -> u8 {
        ((self.qualifier & 0x1F) << 2) | if self.select { 0x80 } else { 0 }
    }
}

/// Qualifier of set-point command (QOS): QL in bits 0-6, S/E in bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SetpointQualifier {
    /// Qualifier (0 = default)
    pub qualifier: u8,
    /// Select (true) or execute (false)
    pub select: bool,
}

impl SetpointQualifier {
    /// Execute with default qualifier.
    pub const EXECUTE: Self = Self {
        qualifier: 0,
        select: false,
    };

    /// Select with default qualifier.
    pub const SELECT: Self = Self {
        qualifier: 0,
        select: true,
    };

    const fn from_u8(byte: u8) -> Self {
        Self {
            qualifier: byte & 0x7F,
            select: byte & 0x80 != 0,
        }
    }

    const fn as_u8(&self) -> u8 {
        (self.qualifier & 0x7F) | if self.select { 0x80 } else { 0 }
    }
}

/// One decoded information element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element {
    /// SIQ
    SinglePoint { value: bool, quality: Quality },
    /// DIQ
    DoublePoint {
        value: DoublePointValue,
        quality: Quality,
    },
    /// VTI + QDS
    StepPosition { value: StepPosition, quality: Quality },
    /// BSI + QDS
    Bitstring { value: u32, quality: Quality },
    /// NVA + QDS
    Normalized { value: Normalized, quality: Quality },
    /// NVA
    NormalizedNoQuality(Normalized),
    /// SVA + QDS
    Scaled { value: i16, quality: Quality },
    /// Short float + QDS
    Float { value: f32, quality: Quality },
    /// BCR
    BinaryCounter(BinaryCounterReading),
    /// SEP + elapsed time
    ProtectionEvent {
        state: DoublePointValue,
        quality: Quality,
        elapsed: Cp16Time2a,
    },
    /// SPE + QDP + relay duration
    PackedStartEvents {
        events: u8,
        quality: Quality,
        duration: Cp16Time2a,
    },
    /// OCI + QDP + relay operating time
    PackedOutputCircuit {
        circuits: u8,
        quality: Quality,
        operating_time: Cp16Time2a,
    },
    /// SCD + QDS
    PackedSinglePoint { status: u16, change: u16, quality: Quality },
    /// SCO
    SingleCommand {
        value: bool,
        qualifier: CommandQualifier,
    },
    /// DCO
    DoubleCommand {
        value: DoublePointValue,
        qualifier: CommandQualifier,
    },
    /// RCO
    RegulatingStep {
        value: StepCommand,
        qualifier: CommandQualifier,
    },
    /// NVA + QOS
    SetpointNormalized {
        value: Normalized,
        qualifier: SetpointQualifier,
    },
    /// SVA + QOS
    SetpointScaled {
        value: i16,
        qualifier: SetpointQualifier,
    },
    /// Short float + QOS
    SetpointFloat {
        value: f32,
        qualifier: SetpointQualifier,
    },
    /// BSI
    BitstringCommand(u32),
    /// COI: cause in bits 0-6, bit 7 set after a parameter change
    EndOfInit { cause: u8, after_change: bool },
    /// QOI (20 = station interrogation, 21..=36 groups)
    Interrogation(u8),
    /// QCC: request in bits 0-5, freeze in bits 6-7
    CounterInterrogation(u8),
    /// IOA only
    Read,
    /// Clock synchronization time
    ClockSync(Cp56Time2a),
    /// FBP
    TestCommand(u16),
    /// QRP
    ResetProcess(u8),
    /// Delay in milliseconds
    DelayAcquisition(Cp16Time2a),
    /// TSC
    TestCommandCounter(u16),
    /// NVA + QPM
    ParameterNormalized { value: Normalized, qualifier: u8 },
    /// SVA + QPM
    ParameterScaled { value: i16, qualifier: u8 },
    /// Short float + QPM
    ParameterFloat { value: f32, qualifier: u8 },
    /// QPA
    ParameterActivation(u8),
}

impl Element {
    /// Shape of this element.
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::SinglePoint { .. } => ElementKind::SinglePoint,
            Self::DoublePoint { .. } => ElementKind::DoublePoint,
            Self::StepPosition { .. } => ElementKind::StepPosition,
            Self::Bitstring { .. } => ElementKind::Bitstring,
            Self::Normalized { .. } => ElementKind::Normalized,
            Self::NormalizedNoQuality(_) => ElementKind::NormalizedNoQuality,
            Self::Scaled { .. } => ElementKind::Scaled,
            Self::Float { .. } => ElementKind::Float,
            Self::BinaryCounter(_) => ElementKind::BinaryCounter,
            Self::ProtectionEvent { .. } => ElementKind::ProtectionEvent,
            Self::PackedStartEvents { .. } => ElementKind::PackedStartEvents,
            Self::PackedOutputCircuit { .. } => ElementKind::PackedOutputCircuit,
            Self::PackedSinglePoint { .. } => ElementKind::PackedSinglePoint,
            Self::SingleCommand { .. } => ElementKind::SingleCommand,
            Self::DoubleCommand { .. } => ElementKind::DoubleCommand,
            Self::RegulatingStep { .. } => ElementKind::RegulatingStep,
            Self::SetpointNormalized { .. } => ElementKind::SetpointNormalized,
            Self::SetpointScaled { .. } => ElementKind::SetpointScaled,
            Self::SetpointFloat { .. } => ElementKind::SetpointFloat,
            Self::BitstringCommand(_) => ElementKind::BitstringCommand,
            Self::EndOfInit { .. } => ElementKind::EndOfInit,
            Self::Interrogation(_) => ElementKind::Interrogation,
            Self::CounterInterrogation(_) => ElementKind::CounterInterrogation,
            Self::Read => ElementKind::Read,
            Self::ClockSync(_) => ElementKind::ClockSync,
            Self::TestCommand(_) => ElementKind::TestCommand,
            Self::ResetProcess(_) => ElementKind::ResetProcess,
            Self::DelayAcquisition(_) => ElementKind::DelayAcquisition,
            Self::TestCommandCounter(_) => ElementKind::TestCommandCounter,
            Self::ParameterNormalized { .. } => ElementKind::ParameterNormalized,
            Self::ParameterScaled { .. } => ElementKind::ParameterScaled,
            Self::ParameterFloat { .. } => ElementKind::ParameterFloat,
            Self::ParameterActivation(_) => ElementKind::ParameterActivation,
        }
    }

    /// Quality descriptor, for monitor-direction elements that carry one.
    pub const fn quality(&self) -> Option<Quality> {
        match self {
            Self::SinglePoint { quality, .. }
            | Self::DoublePoint { quality, .. }
            | Self::StepPosition { quality, .. }
            | Self::Bitstring { quality, .. }
            | Self::Normalized { quality, .. }
            | Self::Scaled { quality, .. }
            | Self::Float { quality, .. }
            | Self::ProtectionEvent { quality, .. }
            | Self::PackedStartEvents { quality, .. }
            | Self::PackedOutputCircuit { quality, .. }
            | Self::PackedSinglePoint { quality, .. } => Some(*quality),
            _ => None,
        }
    }

    /// Decode one element of the given kind.
    pub(crate) fn read(
        kind: ElementKind,
        r: &mut Reader<'_>,
        params: &Params,
    ) -> Result<Self, CodecError> {
        let order = params.float_order;
        let element = match kind {
            ElementKind::SinglePoint => {
                let b = r.u8()?;
                Self::SinglePoint {
                    value: b & 0x01 != 0,
                    quality: Quality::from_siq(b),
                }
            }
            ElementKind::DoublePoint => {
                let b = r.u8()?;
                Self::DoublePoint {
                    value: DoublePointValue::from_u8(b),
                    quality: Quality::from_siq(b),
                }
            }
            ElementKind::StepPosition => Self::StepPosition {
                value: StepPosition::from_u8(r.u8()?),
                quality: Quality::from_qds(r.u8()?),
            },
            ElementKind::Bitstring => Self::Bitstring {
                value: r.u32()?,
                quality: Quality::from_qds(r.u8()?),
            },
            ElementKind::Normalized => Self::Normalized {
                value: Normalized(r.i16()?),
                quality: Quality::from_qds(r.u8()?),
            },
            ElementKind::NormalizedNoQuality => Self::NormalizedNoQuality(Normalized(r.i16()?)),
            ElementKind::Scaled => Self::Scaled {
                value: r.i16()?,
                quality: Quality::from_qds(r.u8()?),
            },
            ElementKind::Float => Self::Float {
                value: r.f32(order)?,
                quality: Quality::from_qds(r.u8()?),
            },
            ElementKind::BinaryCounter => {
                let value = r.i32()?;
                Self::BinaryCounter(BinaryCounterReading::from_parts(value, r.u8()?))
            }
            ElementKind::ProtectionEvent => {
                let b = r.u8()?;
                Self::ProtectionEvent {
                    state: DoublePointValue::from_u8(b),
                    quality: Quality::from_qdp(b),
                    elapsed: Cp16Time2a::from_bytes(r.take(2)?)?,
                }
            }
            ElementKind::PackedStartEvents => Self::PackedStartEvents {
                events: r.u8()? & 0x3F,
                quality: Quality::from_qdp(r.u8()?),
                duration: Cp16Time2a::from_bytes(r.take(2)?)?,
            },
            ElementKind::PackedOutputCircuit => Self::PackedOutputCircuit {
                circuits: r.u8()? & 0x0F,
                quality: Quality::from_qdp(r.u8()?),
                operating_time: Cp16Time2a::from_bytes(r.take(2)?)?,
            },
            ElementKind::PackedSinglePoint => Self::PackedSinglePoint {
                status: r.u16()?,
                change: r.u16()?,
                quality: Quality::from_qds(r.u8()?),
            },
            ElementKind::SingleCommand => {
                let b = r.u8()?;
                Self::SingleCommand {
                    value: b & 0x01 != 0,
                    qualifier: CommandQualifier::from_u8(b),
                }
            }
            ElementKind::DoubleCommand => {
                let b = r.u8()?;
                Self::DoubleCommand {
                    value: DoublePointValue::from_u8(b),
                    qualifier: CommandQualifier::from_u8(b),
                }
            }
            ElementKind::RegulatingStep => {
                let b = r.u8()?;
                Self::RegulatingStep {
                    value: StepCommand::from_u8(b),
                    qualifier: CommandQualifier::from_u8(b),
                }
            }
            ElementKind::SetpointNormalized => Self::SetpointNormalized {
                value: Normalized(r.i16()?),
                qualifier: SetpointQualifier::from_u8(r.u8()?),
            },
            ElementKind::SetpointScaled => Self::SetpointScaled {
                value: r.i16()?,
                qualifier: SetpointQualifier::from_u8(r.u8()?),
            },
            ElementKind::SetpointFloat => Self::SetpointFloat {
                value: r.f32(order)?,
                qualifier: SetpointQualifier::from_u8(r.u8()?),
            },
            ElementKind::BitstringCommand => Self::BitstringCommand(r.u32()?),
            ElementKind::EndOfInit => {
                let b = r.u8()?;
                Self::EndOfInit {
                    cause: b & 0x7F,
                    after_change: b & 0x80 != 0,
                }
            }
            ElementKind::Interrogation => Self::Interrogation(r.u8()?),
            ElementKind::CounterInterrogation => Self::CounterInterrogation(r.u8()?),
            ElementKind::Read => Self::Read,
            ElementKind::ClockSync => Self::ClockSync(Cp56Time2a::from_bytes(r.take(7)?)?),
            ElementKind::TestCommand => Self::TestCommand(r.u16()?),
            ElementKind::ResetProcess => Self::ResetProcess(r.u8()?),
            ElementKind::DelayAcquisition => {
                Self::DelayAcquisition(Cp16Time2a::from_bytes(r.take(2)?)?)
            }
            ElementKind::TestCommandCounter => Self::TestCommandCounter(r.u16()?),
            ElementKind::ParameterNormalized => Self::ParameterNormalized {
                value: Normalized(r.i16()?),
                qualifier: r.u8()?,
            },
            ElementKind::ParameterScaled => Self::ParameterScaled {
                value: r.i16()?,
                qualifier: r.u8()?,
            },
            ElementKind::ParameterFloat => Self::ParameterFloat {
                value: r.f32(order)?,
                qualifier: r.u8()?,
            },
            ElementKind::ParameterActivation => Self::ParameterActivation(r.u8()?),
        };
        Ok(element)
    }

    /// Append the encoded element.
    pub(crate) fn write(&self, buf: &mut BytesMut, params: &Params) {
        let order = params.float_order;
        match *self {
            Self::SinglePoint { value, quality } => {
                buf.put_u8(u8::from(value) | (quality.as_raw() & Quality::SIQ_BITS));
            }
            Self::DoublePoint { value, quality } => {
                buf.put_u8(value.as_u8() | (quality.as_raw() & Quality::SIQ_BITS));
            }
            Self::StepPosition { value, quality } => {
                buf.put_u8(value.as_u8());
                put_qds(buf, quality);
            }
            Self::Bitstring { value, quality } => {
                buf.put_u32_le(value);
                put_qds(buf, quality);
            }
            Self::Normalized { value, quality } => {
                buf.put_i16_le(value.0);
                put_qds(buf, quality);
            }
            Self::NormalizedNoQuality(value) => buf.put_i16_le(value.0),
            Self::Scaled { value, quality } => {
                buf.put_i16_le(value);
                put_qds(buf, quality);
            }
            Self::Float { value, quality } => {
                put_f32(buf, value, order);
                put_qds(buf, quality);
            }
            Self::BinaryCounter(bcr) => {
                buf.put_i32_le(bcr.value);
                buf.put_u8(bcr.flags());
            }
            Self::ProtectionEvent {
                state,
                quality,
                elapsed,
            } => {
                buf.put_u8(state.as_u8() | (quality.as_raw() & Quality::QDP_BITS));
                buf.put_slice(&elapsed.to_bytes());
            }
            Self::PackedStartEvents {
                events,
                quality,
                duration,
            } => {
                buf.put_u8(events & 0x3F);
                buf.put_u8(quality.as_raw() & Quality::QDP_BITS);
                buf.put_slice(&duration.to_bytes());
            }
            Self::PackedOutputCircuit {
                circuits,
                quality,
                operating_time,
            } => {
                buf.put_u8(circuits & 0x0F);
                buf.put_u8(quality.as_raw() & Quality::QDP_BITS);
                buf.put_slice(&operating_time.to_bytes());
            }
            Self::PackedSinglePoint {
                status,
                change,
                quality,
            } => {
                buf.put_u16_le(status);
                buf.put_u16_le(change);
                put_qds(buf, quality);
            }
            Self::SingleCommand { value, qualifier } => {
                buf.put_u8(u8::from(value) | qualifier.as_u8());
            }
            Self::DoubleCommand { value, qualifier } => {
                buf.put_u8(value.as_u8() | qualifier.as_u8());
            }
            Self::RegulatingStep { value, qualifier } => {
                buf.put_u8(value as u8 | qualifier.as_u8());
            }
            Self::SetpointNormalized { value, qualifier } => {
                buf.put_i16_le(value.0);
                buf.put_u8(qualifier.as_u8());
            }
            Self::SetpointScaled { value, qualifier } => {
                buf.put_i16_le(value);
                buf.put_u8(qualifier.as_u8());
            }
            Self::SetpointFloat { value, qualifier } => {
                put_f32(buf, value, order);
                buf.put_u8(qualifier.as_u8());
            }
            Self::BitstringCommand(value) => buf.put_u32_le(value),
            Self::EndOfInit {
                cause,
                after_change,
            } => {
                buf.put_u8((cause & 0x7F) | if after_change { 0x80 } else { 0 });
            }
            Self::Interrogation(qoi) => buf.put_u8(qoi),
            Self::CounterInterrogation(qcc) => buf.put_u8(qcc),
            Self::Read => {}
            Self::ClockSync(time) => buf.put_slice(&time.to_bytes()),
            Self::TestCommand(fbp) => buf.put_u16_le(fbp),
            Self::ResetProcess(qrp) => buf.put_u8(qrp),
            Self::DelayAcquisition(delay) => buf.put_slice(&delay.to_bytes()),
            Self::TestCommandCounter(tsc) => buf.put_u16_le(tsc),
            Self::ParameterNormalized { value, qualifier } => {
                buf.put_i16_le(value.0);
                buf.put_u8(qualifier);
            }
            Self::ParameterScaled { value, qualifier } => {
                buf.put_i16_le(value);
                buf.put_u8(qualifier);
            }
            Self::ParameterFloat { value, qualifier } => {
                put_f32(buf, value, order);
                buf.put_u8(qualifier);
            }
            Self::ParameterActivation(qpa) => buf.put_u8(qpa),
        }
    }
}

#[inline]
fn put_qds(buf: &mut BytesMut, quality: Quality) {
    buf.put_u8(quality.as_raw() & Quality::QDS_BITS);
}

#[inline]
fn put_f32(buf: &mut BytesMut, value: f32, order: FloatByteOrder) {
    match order {
        FloatByteOrder::LittleEndian => buf.put_f32_le(value),
        FloatByteOrder::BigEndian => buf.put_f32(value),
    }
}

impl ElementKind {
    /// Encoded size in bytes, excluding IOA and time tag.
    pub const fn size(self) -> usize {
        match self {
            Self::Read => 0,
            Self::SinglePoint
            | Self::DoublePoint
            | Self::SingleCommand
            | Self::DoubleCommand
            | Self::RegulatingStep
            | Self::EndOfInit
            | Self::Interrogation
            | Self::CounterInterrogation
            | Self::ResetProcess
            | Self::ParameterActivation => 1,
            Self::StepPosition
            | Self::NormalizedNoQuality
            | Self::TestCommand
            | Self::DelayAcquisition
            | Self::TestCommandCounter => 2,
            Self::Normalized
            | Self::Scaled
            | Self::ProtectionEvent
            | Self::SetpointNormalized
            | Self::SetpointScaled
            | Self::ParameterNormalized
            | Self::ParameterScaled => 3,
            Self::PackedStartEvents | Self::PackedOutputCircuit | Self::BitstringCommand => 4,
            Self::Bitstring
            | Self::Float
            | Self::BinaryCounter
            | Self::PackedSinglePoint
            | Self::SetpointFloat
            | Self::ParameterFloat => 5,
            Self::ClockSync => 7,
        }
    }
}
