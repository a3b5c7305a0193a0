//! Cause of transmission.
//!
//! The first COT octet carries the cause code in bits 0-5, the P/N
//! (negative confirmation) flag in bit 6 and the T (test) flag in bit 7.
//! An originator address octet follows when the parameter set has a
//! two-octet cause field.

use crate::error::CodecError;

macro_rules! causes {
    ($( $(#[$doc:meta])* $name:ident = $code:literal, $abbrev:literal; )*) => {
        /// Cause of transmission code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Cot {
            $( $(#[$doc])* $name = $code, )*
        }

        impl Cot {
            /// Decode the cause code from the low 6 bits of `value`.
            pub fn from_u8(value: u8) -> Result<Self, CodecError> {
                match value & Self::CODE_MASK {
                    $( $code => Ok(Self::$name), )*
                    code => Err(CodecError::UnknownCause(code)),
                }
            }

            /// Abbreviation used in IEC 60870-5-101 tables, e.g. "spont".
            pub const fn abbreviation(&self) -> &'static str {
                match self {
                    $( Self::$name => $abbrev, )*
                }
            }
        }
    };
}

causes! {
    /// Periodic, cyclic
    Periodic = 1, "per/cyc";
    /// Background scan
    Background = 2, "back";
    /// Spontaneous
    Spontaneous = 3, "spont";
    /// Initialized
    Initialized = 4, "init";
    /// Request or requested
    Request = 5, "req";
    /// Activation
    Activation = 6, "act";
    /// Activation confirmation
    ActivationConfirm = 7, "actcon";
    /// Deactivation
    Deactivation = 8, "deact";
    /// Deactivation confirmation
    DeactivationConfirm = 9, "deactcon";
    /// Activation termination
    ActivationTermination = 10, "actterm";
    /// Return information caused by a remote command
    ReturnRemoteCommand = 11, "retrem";
    /// Return information caused by a local command
    ReturnLocalCommand = 12, "retloc";
    /// File transfer
    FileTransfer = 13, "file";
    /// Interrogated by station interrogation
    InterrogatedByStation = 20, "inrogen";
    InterrogatedByGroup1 = 21, "inro1";
    InterrogatedByGroup2 = 22, "inro2";
    InterrogatedByGroup3 = 23, "inro3";
    InterrogatedByGroup4 = 24, "inro4";
    InterrogatedByGroup5 = 25, "inro5";
    InterrogatedByGroup6 = 26, "inro6";
    InterrogatedByGroup7 = 27, "inro7";
    InterrogatedByGroup8 = 28, "inro8";
    InterrogatedByGroup9 = 29, "inro9";
    InterrogatedByGroup10 = 30, "inro10";
    InterrogatedByGroup11 = 31, "inro11";
    InterrogatedByGroup12 = 32, "inro12";
    InterrogatedByGroup13 = 33, "inro13";
    InterrogatedByGroup14 = 34, "inro14";
    InterrogatedByGroup15 = 35, "inro15";
    InterrogatedByGroup16 = 36, "inro16";
    /// Requested by general counter request
    RequestedByGeneralCounter = 37, "reqcogen";
    RequestedByGroup1Counter = 38, "reqco1";
    RequestedByGroup2Counter = 39, "reqco2";
    RequestedByGroup3Counter = 40, "reqco3";
    RequestedByGroup4Counter = 41, "reqco4";
    /// Unknown type identification
    UnknownTypeId = 44, "unknown type";
    /// Unknown cause of transmission
    UnknownCot = 45, "unknown cause";
    /// Unknown common address of ASDU
    UnknownCommonAddress = 46, "unknown CA";
    /// Unknown information object address
    UnknownIoa = 47, "unknown IOA";
}

impl Cot {
    const CODE_MASK: u8 = 0x3F;

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Cot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Full cause of transmission field: code plus the test and P/N flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CauseOfTransmission {
    /// Cause code
    pub cot: Cot,
    /// T flag: the ASDU was generated under test conditions
    pub test: bool,
    /// P/N flag: negative confirmation of an activation
    pub negative: bool,
}

impl CauseOfTransmission {
    const TEST_BIT: u8 = 0x80;
    const NEGATIVE_BIT: u8 = 0x40;

    /// Cause with both flags cleared.
    #[inline]
    pub const fn new(cot: Cot) -> Self {
        Self {
            cot,
            test: false,
            negative: false,
        }
    }

    #[inline]
    pub const fn with_test(mut self, test: bool) -> Self {
        self.test = test;
        self
    }

    #[inline]
    pub const fn with_negative(mut self, negative: bool) -> Self {
        self.negative = negative;
        self
    }

    /// Decode the first COT octet.
    pub fn from_u8(value: u8) -> Result<Self, CodecError> {
        Ok(Self {
            cot: Cot::from_u8(value)?,
            test: value & Self::TEST_BIT != 0,
            negative: value & Self::NEGATIVE_BIT != 0,
        })
    }

    /// Encode the first COT octet.
    pub const fn as_u8(self) -> u8 {
        let test = if self.test { Self::TEST_BIT } else { 0 };
        let negative = if self.negative { Self::NEGATIVE_BIT } else { 0 };
        self.cot.as_u8() | test | negative
    }
}

impl From<Cot> for CauseOfTransmission {
    fn from(cot: Cot) -> Self {
        Self::new(cot)
    }
}

impl std::fmt::Display for CauseOfTransmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cot)?;
        if self.negative {
            f.write_str(",neg")?;
        }
        if self.test {
            f.write_str(",test")?;
        }
        Ok(())
    }
}
