//! IEC 60870-5-104 Type Identification.
//!
//! Type identification defines the structure and meaning of information objects.
//! [`TypeId::layout`] is the single table that fixes the element shape and
//! time tag of each type.

use crate::error::CodecError;

/// Shape of the information element that follows each IOA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// SIQ
    SinglePoint,
    /// DIQ
    DoublePoint,
    /// VTI + QDS
    StepPosition,
    /// BSI + QDS
    Bitstring,
    /// NVA + QDS
    Normalized,
    /// NVA without quality
    NormalizedNoQuality,
    /// SVA + QDS
    Scaled,
    /// IEEE STD 754 + QDS
    Float,
    /// BCR
    BinaryCounter,
    /// SEP + CP16Time2a
    ProtectionEvent,
    /// SPE + QDP + CP16Time2a
    PackedStartEvents,
    /// OCI + QDP + CP16Time2a
    PackedOutputCircuit,
    /// SCD + QDS
    PackedSinglePoint,
    /// SCO
    SingleCommand,
    /// DCO
    DoubleCommand,
    /// RCO
    RegulatingStep,
    /// NVA + QOS
    SetpointNormalized,
    /// SVA + QOS
    SetpointScaled,
    /// IEEE STD 754 + QOS
    SetpointFloat,
    /// BSI
    BitstringCommand,
    /// COI
    EndOfInit,
    /// QOI
    Interrogation,
    /// QCC
    CounterInterrogation,
    /// No element, IOA only
    Read,
    /// CP56Time2a
    ClockSync,
    /// FBP
    TestCommand,
    /// QRP
    ResetProcess,
    /// CP16Time2a
    DelayAcquisition,
    /// TSC
    TestCommandCounter,
    /// NVA + QPM
    ParameterNormalized,
    /// SVA + QPM
    ParameterScaled,
    /// IEEE STD 754 + QPM
    ParameterFloat,
    /// QPA
    ParameterActivation,
}

/// Time tag trailing each information element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeTagKind {
    /// No time tag
    None,
    /// Three octet binary time
    Cp24,
    /// Seven octet binary time
    Cp56,
}

impl TimeTagKind {
    /// Encoded size in bytes.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::None => 0,
            Self::Cp24 => 3,
            Self::Cp56 => 7,
        }
    }
}

macro_rules! type_ids {
    ($( $(#[$doc:meta])* $name:ident = $code:literal, $std:literal, $kind:ident, $tag:ident; )*) => {
        /// IEC 60870-5-104 Type Identification.
        ///
        /// Defines the type of information contained in an ASDU.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum TypeId {
            $( $(#[$doc])* $name = $code, )*
        }

        impl TypeId {
            /// Every supported type identification, in ascending order.
            pub const ALL: &'static [TypeId] = &[$( Self::$name, )*];

            /// Create TypeId from raw byte value.
            #[inline]
            pub fn from_u8(value: u8) -> Result<Self, CodecError> {
                match value {
                    $( $code => Ok(Self::$name), )*
                    _ => Err(CodecError::UnknownType(value)),
                }
            }

            /// Get the IEC standard name (e.g., "M_SP_NA_1").
            #[inline]
            pub const fn standard_name(&self) -> &'static str {
                match self {
                    $( Self::$name => $std, )*
                }
            }

            /// Element shape and time tag carried by each information object.
            #[inline]
            pub const fn layout(&self) -> (ElementKind, TimeTagKind) {
                match self {
                    $( Self::$name => (ElementKind::$kind, TimeTagKind::$tag), )*
                }
            }
        }
    };
}

type_ids! {
    // Process information in monitoring direction
    /// Single-point information (M_SP_NA_1)
    SinglePoint = 1, "M_SP_NA_1", SinglePoint, None;
    /// Single-point information with time tag (M_SP_TA_1)
    SinglePointTime24 = 2, "M_SP_TA_1", SinglePoint, Cp24;
    /// Double-point information (M_DP_NA_1)
    DoublePoint = 3, "M_DP_NA_1", DoublePoint, None;
    /// Double-point information with time tag (M_DP_TA_1)
    DoublePointTime24 = 4, "M_DP_TA_1", DoublePoint, Cp24;
    /// Step position information (M_ST_NA_1)
    StepPosition = 5, "M_ST_NA_1", StepPosition, None;
    /// Step position information with time tag (M_ST_TA_1)
    StepPositionTime24 = 6, "M_ST_TA_1", StepPosition, Cp24;
    /// Bitstring of 32 bit (M_BO_NA_1)
    Bitstring32 = 7, "M_BO_NA_1", Bitstring, None;
    /// Bitstring of 32 bit with time tag (M_BO_TA_1)
    Bitstring32Time24 = 8, "M_BO_TA_1", Bitstring, Cp24;
    /// Measured value, normalized (M_ME_NA_1)
    MeasuredNormalized = 9, "M_ME_NA_1", Normalized, None;
    /// Measured value, normalized with time tag (M_ME_TA_1)
    MeasuredNormalizedTime24 = 10, "M_ME_TA_1", Normalized, Cp24;
    /// Measured value, scaled (M_ME_NB_1)
    MeasuredScaled = 11, "M_ME_NB_1", Scaled, None;
    /// Measured value, scaled with time tag (M_ME_TB_1)
    MeasuredScaledTime24 = 12, "M_ME_TB_1", Scaled, Cp24;
    /// Measured value, short floating point (M_ME_NC_1)
    MeasuredFloat = 13, "M_ME_NC_1", Float, None;
    /// Measured value, short floating point with time tag (M_ME_TC_1)
    MeasuredFloatTime24 = 14, "M_ME_TC_1", Float, Cp24;
    /// Integrated totals (M_IT_NA_1)
    IntegratedTotals = 15, "M_IT_NA_1", BinaryCounter, None;
    /// Integrated totals with time tag (M_IT_TA_1)
    IntegratedTotalsTime24 = 16, "M_IT_TA_1", BinaryCounter, Cp24;
    /// Event of protection equipment with time tag (M_EP_TA_1)
    ProtectionEventTime24 = 17, "M_EP_TA_1", ProtectionEvent, Cp24;
    /// Packed start events of protection equipment with time tag (M_EP_TB_1)
    PackedStartEventsTime24 = 18, "M_EP_TB_1", PackedStartEvents, Cp24;
    /// Packed output circuit information with time tag (M_EP_TC_1)
    PackedOutputCircuitTime24 = 19, "M_EP_TC_1", PackedOutputCircuit, Cp24;
    /// Packed single-point information with status change detection (M_PS_NA_1)
    PackedSinglePoint = 20, "M_PS_NA_1", PackedSinglePoint, None;
    /// Measured value, normalized without quality descriptor (M_ME_ND_1)
    MeasuredNormalizedNoQuality = 21, "M_ME_ND_1", NormalizedNoQuality, None;
    /// Single-point information with time tag CP56Time2a (M_SP_TB_1)
    SinglePointTime56 = 30, "M_SP_TB_1", SinglePoint, Cp56;
    /// Double-point information with time tag CP56Time2a (M_DP_TB_1)
    DoublePointTime56 = 31, "M_DP_TB_1", DoublePoint, Cp56;
    /// Step position information with time tag CP56Time2a (M_ST_TB_1)
    StepPositionTime56 = 32, "M_ST_TB_1", StepPosition, Cp56;
    /// Bitstring of 32 bit with time tag CP56Time2a (M_BO_TB_1)
    Bitstring32Time56 = 33, "M_BO_TB_1", Bitstring, Cp56;
    /// Measured value, normalized with time tag CP56Time2a (M_ME_TD_1)
    MeasuredNormalizedTime56 = 34, "M_ME_TD_1", Normalized, Cp56;
    /// Measured value, scaled with time tag CP56Time2a (M_ME_TE_1)
    MeasuredScaledTime56 = 35, "M_ME_TE_1", Scaled, Cp56;
    /// Measured value, short floating point with time tag CP56Time2a (M_ME_TF_1)
    MeasuredFloatTime56 = 36, "M_ME_TF_1", Float, Cp56;
    /// Integrated totals with time tag CP56Time2a (M_IT_TB_1)
    IntegratedTotalsTime56 = 37, "M_IT_TB_1", BinaryCounter, Cp56;
    /// Event of protection equipment with time tag CP56Time2a (M_EP_TD_1)
    ProtectionEventTime56 = 38, "M_EP_TD_1", ProtectionEvent, Cp56;
    /// Packed start events of protection equipment with time tag CP56Time2a (M_EP_TE_1)
    PackedStartEventsTime56 = 39, "M_EP_TE_1", PackedStartEvents, Cp56;
    /// Packed output circuit information with time tag CP56Time2a (M_EP_TF_1)
    PackedOutputCircuitTime56 = 40, "M_EP_TF_1", PackedOutputCircuit, Cp56;

    // Process information in control direction
    /// Single command (C_SC_NA_1)
    SingleCommand = 45, "C_SC_NA_1", SingleCommand, None;
    /// Double command (C_DC_NA_1)
    DoubleCommand = 46, "C_DC_NA_1", DoubleCommand, None;
    /// Regulating step command (C_RC_NA_1)
    RegulatingStep = 47, "C_RC_NA_1", RegulatingStep, None;
    /// Set-point command, normalized (C_SE_NA_1)
    SetpointNormalized = 48, "C_SE_NA_1", SetpointNormalized, None;
    /// Set-point command, scaled (C_SE_NB_1)
    SetpointScaled = 49, "C_SE_NB_1", SetpointScaled, None;
    /// Set-point command, short floating point (C_SE_NC_1)
    SetpointFloat = 50, "C_SE_NC_1", SetpointFloat, None;
    /// Bitstring of 32 bit command (C_BO_NA_1)
    Bitstring32Command = 51, "C_BO_NA_1", BitstringCommand, None;
    /// Single command with time tag CP56Time2a (C_SC_TA_1)
    SingleCommandTime56 = 58, "C_SC_TA_1", SingleCommand, Cp56;
    /// Double command with time tag CP56Time2a (C_DC_TA_1)
    DoubleCommandTime56 = 59, "C_DC_TA_1", DoubleCommand, Cp56;
    /// Regulating step command with time tag CP56Time2a (C_RC_TA_1)
    RegulatingStepTime56 = 60, "C_RC_TA_1", RegulatingStep, Cp56;
    /// Set-point command, normalized with time tag CP56Time2a (C_SE_TA_1)
    SetpointNormalizedTime56 = 61, "C_SE_TA_1", SetpointNormalized, Cp56;
    /// Set-point command, scaled with time tag CP56Time2a (C_SE_TB_1)
    SetpointScaledTime56 = 62, "C_SE_TB_1", SetpointScaled, Cp56;
    /// Set-point command, short floating point with time tag CP56Time2a (C_SE_TC_1)
    SetpointFloatTime56 = 63, "C_SE_TC_1", SetpointFloat, Cp56;
    /// Bitstring of 32 bit command with time tag CP56Time2a (C_BO_TA_1)
    Bitstring32CommandTime56 = 64, "C_BO_TA_1", BitstringCommand, Cp56;

    // System information in monitoring direction
    /// End of initialization (M_EI_NA_1)
    EndOfInit = 70, "M_EI_NA_1", EndOfInit, None;

    // System information in control direction
    /// Interrogation command (C_IC_NA_1)
    InterrogationCommand = 100, "C_IC_NA_1", Interrogation, None;
    /// Counter interrogation command (C_CI_NA_1)
    CounterInterrogation = 101, "C_CI_NA_1", CounterInterrogation, None;
    /// Read command (C_RD_NA_1)
    ReadCommand = 102, "C_RD_NA_1", Read, None;
    /// Clock synchronization command (C_CS_NA_1)
    ClockSync = 103, "C_CS_NA_1", ClockSync, None;
    /// Test command (C_TS_NA_1)
    TestCommand = 104, "C_TS_NA_1", TestCommand, None;
    /// Reset process command (C_RP_NA_1)
    ResetProcess = 105, "C_RP_NA_1", ResetProcess, None;
    /// Delay acquisition command (C_CD_NA_1)
    DelayAcquisition = 106, "C_CD_NA_1", DelayAcquisition, None;
    /// Test command with time tag CP56Time2a (C_TS_TA_1)
    TestCommandTime56 = 107, "C_TS_TA_1", TestCommandCounter, Cp56;

    // Parameter in control direction
    /// Parameter of measured value, normalized (P_ME_NA_1)
    ParameterNormalized = 110, "P_ME_NA_1", ParameterNormalized, None;
    /// Parameter of measured value, scaled (P_ME_NB_1)
    ParameterScaled = 111, "P_ME_NB_1", ParameterScaled, None;
    /// Parameter of measured value, short floating point (P_ME_NC_1)
    ParameterFloat = 112, "P_ME_NC_1", ParameterFloat, None;
    /// Parameter activation (P_AC_NA_1)
    ParameterActivation = 113, "P_AC_NA_1", ParameterActivation, None;
}

impl TypeId {
    /// Convert to raw byte value.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this type is in the monitoring direction (from RTU to master).
    #[inline]
    pub const fn is_monitoring(&self) -> bool {
        matches!(self.as_u8(), 1..=44 | 70)
    }

    /// Check if this type is in the control direction (from master to RTU).
    #[inline]
    pub const fn is_control(&self) -> bool {
        matches!(self.as_u8(), 45..=69 | 100..=113)
    }

    /// Check if this type contains a time tag.
    #[inline]
    pub const fn has_time_tag(&self) -> bool {
        !matches!(self.layout().1, TimeTagKind::None)
    }

    /// Element kind carried by this type.
    #[inline]
    pub const fn element_kind(&self) -> ElementKind {
        self.layout().0
    }

    /// Time tag carried by this type.
    #[inline]
    pub const fn time_tag(&self) -> TimeTagKind {
        self.layout().1
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.standard_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_from_u8() {
        assert_eq!(TypeId::from_u8(1).unwrap(), TypeId::SinglePoint);
        assert_eq!(TypeId::from_u8(13).unwrap(), TypeId::MeasuredFloat);
        assert_eq!(TypeId::from_u8(100).unwrap(), TypeId::InterrogationCommand);
        assert_eq!(TypeId::from_u8(255), Err(CodecError::UnknownType(255)));
    }

    #[test]
    fn test_type_id_table_size() {
        assert_eq!(TypeId::ALL.len(), 59);
        for window in TypeId::ALL.windows(2) {
            assert!(window[0].as_u8() < window[1].as_u8());
        }
    }

    #[test]
    fn test_type_id_all_values_roundtrip() {
        for &type_id in TypeId::ALL {
            assert_eq!(TypeId::from_u8(type_id.as_u8()).unwrap(), type_id);
        }
    }

    #[test]
    fn test_type_id_invalid_values() {
        let invalid_values = [0, 22, 29, 41, 44, 52, 57, 65, 71, 99, 108, 109, 114, 120, 127, 200, 255];

        for val in invalid_values {
            assert!(TypeId::from_u8(val).is_err(), "Expected error for TypeId value {}", val);
        }
    }

    #[test]
    fn test_type_id_direction() {
        assert!(TypeId::SinglePoint.is_monitoring());
        assert!(!TypeId::SinglePoint.is_control());
        assert!(TypeId::EndOfInit.is_monitoring());
        assert!(TypeId::PackedOutputCircuitTime56.is_monitoring());

        assert!(TypeId::SingleCommand.is_control());
        assert!(TypeId::InterrogationCommand.is_control());
        assert!(TypeId::ParameterActivation.is_control());
    }

    #[test]
    fn test_type_id_time_tag() {
        assert!(!TypeId::SinglePoint.has_time_tag());
        assert!(TypeId::SinglePointTime24.has_time_tag());
        assert!(TypeId::MeasuredFloatTime56.has_time_tag());
        assert!(TypeId::TestCommandTime56.has_time_tag());
        // C_CS_NA_1 carries its time as the element itself
        assert!(!TypeId::ClockSync.has_time_tag());
        assert_eq!(TypeId::ProtectionEventTime24.time_tag(), TimeTagKind::Cp24);
        assert_eq!(TypeId::IntegratedTotalsTime56.time_tag(), TimeTagKind::Cp56);
    }

    #[test]
    fn test_type_id_layout() {
        assert_eq!(
            TypeId::MeasuredNormalizedNoQuality.layout(),
            (ElementKind::NormalizedNoQuality, TimeTagKind::None)
        );
        assert_eq!(
            TypeId::PackedStartEventsTime56.layout(),
            (ElementKind::PackedStartEvents, TimeTagKind::Cp56)
        );
        assert_eq!(TypeId::ReadCommand.element_kind(), ElementKind::Read);
        assert_eq!(TypeId::ParameterFloat.element_kind(), ElementKind::ParameterFloat);
    }

    #[test]
    fn test_type_id_standard_name() {
        assert_eq!(TypeId::SinglePoint.standard_name(), "M_SP_NA_1");
        assert_eq!(TypeId::MeasuredFloat.standard_name(), "M_ME_NC_1");
        assert_eq!(TypeId::SingleCommand.standard_name(), "C_SC_NA_1");
        assert_eq!(TypeId::DelayAcquisition.standard_name(), "C_CD_NA_1");
        assert_eq!(TypeId::ParameterActivation.standard_name(), "P_AC_NA_1");
    }

    #[test]
    fn test_type_id_display() {
        assert_eq!(format!("{}", TypeId::SinglePoint), "M_SP_NA_1");
        assert_eq!(format!("{}", TypeId::InterrogationCommand), "C_IC_NA_1");
    }

    #[test]
    fn test_type_id_numeric_values() {
        assert_eq!(TypeId::SinglePoint.as_u8(), 1);
        assert_eq!(TypeId::MeasuredNormalizedNoQuality.as_u8(), 21);
        assert_eq!(TypeId::SinglePointTime56.as_u8(), 30);
        assert_eq!(TypeId::Bitstring32CommandTime56.as_u8(), 64);
        assert_eq!(TypeId::EndOfInit.as_u8(), 70);
        assert_eq!(TypeId::TestCommandTime56.as_u8(), 107);
        assert_eq!(TypeId::ParameterActivation.as_u8(), 113);
    }
}
