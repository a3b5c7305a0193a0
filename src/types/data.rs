//! Data point types for IEC 60870-5-104.
//!
//! A flattened view of monitor-direction information objects: one
//! [`DataPoint`] per object, with the value reduced to a [`DataValue`].

use super::{
    BinaryCounterReading, DoublePointValue, Element, InfoObject, Quality, TimeTag,
};

/// Unified data point representing an information object.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    /// Information object address (IOA)
    pub ioa: u32,
    /// Data value
    pub value: DataValue,
    /// Quality flags
    pub quality: Quality,
    /// Time tag (if present)
    pub timestamp: Option<TimeTag>,
}

impl DataPoint {
    /// Create a new data point.
    #[inline]
    pub const fn new(ioa: u32, value: DataValue) -> Self {
        Self {
            ioa,
            value,
            quality: Quality::Good,
            timestamp: None,
        }
    }

    /// Create a data point with quality.
    #[inline]
    pub const fn with_quality(ioa: u32, value: DataValue, quality: Quality) -> Self {
        Self {
            ioa,
            value,
            quality,
            timestamp: None,
        }
    }

    /// Flatten an information object.
    ///
    /// Returns `None` for commands and system information, which carry no
    /// point value.
    pub fn from_object(object: &InfoObject) -> Option<Self> {
        let value = DataValue::from_element(&object.element)?;
        let quality = match object.element {
            Element::BinaryCounter(reading) => Quality::with_invalid(reading.invalid),
            ref element => element.quality().unwrap_or(Quality::Good),
        };
        Some(Self {
            ioa: object.ioa.value(),
            value,
            quality,
            timestamp: object.time,
        })
    }

    /// Check if the data point has good quality.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.quality.is_good()
    }

    /// Get the value as f64 if numeric.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }

    /// Get the value as bool if boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }
}

/// Data value types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataValue {
    /// Single-point information (M_SP_NA_1, M_SP_TB_1)
    Single(bool),

    /// Double-point information (M_DP_NA_1, M_DP_TB_1)
    Double(DoublePointValue),

    /// Normalized value -1.0 to +1.0 (M_ME_NA_1, M_ME_TD_1, M_ME_ND_1)
    Normalized(f32),

    /// Scaled value (M_ME_NB_1, M_ME_TE_1)
    Scaled(i16),

    /// Short floating point (M_ME_NC_1, M_ME_TF_1)
    Float(f32),

    /// Bitstring of 32 bits (M_BO_NA_1, M_BO_TB_1)
    Bitstring(u32),

    /// Step position (-64 to +63) with transient flag (M_ST_NA_1, M_ST_TB_1)
    StepPosition {
        /// Position
        value: i8,
        /// Equipment in transient state
        transient: bool,
    },

    /// Binary counter reading with sequence and flags (M_IT_NA_1, M_IT_TB_1)
    Counter(BinaryCounterReading),

    /// Packed single points with status change detection (M_PS_NA_1)
    PackedSinglePoint {
        /// Status bits
        status: u16,
        /// Change-detected bits
        change: u16,
    },
}

impl DataValue {
    /// Point value of an element, if it has one.
    pub fn from_element(element: &Element) -> Option<Self> {
        Some(match *element {
            Element::SinglePoint { value, .. } => Self::Single(value),
            Element::DoublePoint { value, .. } => Self::Double(value),
            Element::StepPosition { value, .. } => Self::StepPosition {
                value: value.value,
                transient: value.transient,
            },
            Element::Bitstring { value, .. } => Self::Bitstring(value),
            Element::Normalized { value, .. } | Element::NormalizedNoQuality(value) => {
                Self::Normalized(value.to_f32())
            }
            Element::Scaled { value, .. } => Self::Scaled(value),
            Element::Float { value, .. } => Self::Float(value),
            Element::BinaryCounter(reading) => Self::Counter(reading),
            Element::PackedSinglePoint { status, change, .. } => {
                Self::PackedSinglePoint { status, change }
            }
            _ => return None,
        })
    }

    /// Convert to f64 if numeric.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Single(v) => Some(if *v { 1.0 } else { 0.0 }),
            Self::Double(v) => Some(match v {
                DoublePointValue::Off => 0.0,
                DoublePointValue::On => 1.0,
                _ => f64::NAN,
            }),
            Self::Normalized(v) => Some(*v as f64),
            Self::Scaled(v) => Some(*v as f64),
            Self::Float(v) => Some(*v as f64),
            Self::Bitstring(v) => Some(*v as f64),
            Self::StepPosition { value, .. } => Some(*value as f64),
            Self::Counter(reading) => Some(reading.value as f64),
            Self::PackedSinglePoint { .. } => None,
        }
    }

    /// Convert to bool if boolean type.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Single(v) => Some(*v),
            Self::Double(v) => match v {
                DoublePointValue::Off => Some(false),
                DoublePointValue::On => Some(true),
                _ => None,
            },
            _ => None,
        }
    }

    /// Check if this is a boolean type.
    #[inline]
    pub const fn is_boolean(&self) -> bool {
        matches!(self, Self::Single(_) | Self::Double(_))
    }

    /// Check if this is a numeric type.
    #[inline]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Normalized(_)
                | Self::Scaled(_)
                | Self::Float(_)
                | Self::Counter(_)
                | Self::StepPosition { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cp24Time2a, Normalized, StepPosition};

    #[test]
    fn test_data_point_creation() {
        let dp = DataPoint::new(1001, DataValue::Float(23.5));
        assert_eq!(dp.ioa, 1001);
        assert!(dp.is_good());
        assert_eq!(dp.as_f64(), Some(23.5));
    }

    #[test]
    fn test_data_value_conversions() {
        assert_eq!(DataValue::Single(true).as_bool(), Some(true));
        assert_eq!(DataValue::Single(false).as_bool(), Some(false));
        assert_eq!(DataValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(DataValue::Scaled(100).as_f64(), Some(100.0));
        assert_eq!(DataValue::Bitstring(0xFF).as_f64(), Some(255.0));
        assert_eq!(
            DataValue::Double(DoublePointValue::On).as_bool(),
            Some(true)
        );
        assert_eq!(
            DataValue::Double(DoublePointValue::Indeterminate).as_bool(),
            None
        );
        assert!(DataValue::Double(DoublePointValue::IndeterminateOrFaulty)
            .as_f64()
            .unwrap()
            .is_nan());
    }

    #[test]
    fn test_data_value_categories() {
        assert!(DataValue::Single(true).is_boolean());
        assert!(!DataValue::Float(1.0).is_boolean());
        assert!(DataValue::Float(1.0).is_numeric());
        assert!(!DataValue::Bitstring(0).is_numeric());
        assert!(!DataValue::Single(false).is_numeric());
    }

    #[test]
    fn test_data_point_with_quality() {
        let dp = DataPoint::with_quality(1001, DataValue::Float(50.0), Quality::Invalid);
        assert_eq!(dp.ioa, 1001);
        assert!(!dp.is_good());
        assert!(dp.quality.invalid());
    }

    #[test]
    fn test_from_object_with_time() {
        let time = Cp24Time2a {
            milliseconds: 1500,
            minutes: 7,
            invalid: false,
        };
        let object = InfoObject::with_time(
            12u32,
            Element::StepPosition {
                value: StepPosition {
                    value: -3,
                    transient: true,
                },
                quality: Quality::Good.set_blocked(true),
            },
            time,
        );

        let dp = DataPoint::from_object(&object).unwrap();
        assert_eq!(dp.ioa, 12);
        assert_eq!(
            dp.value,
            DataValue::StepPosition {
                value: -3,
                transient: true
            }
        );
        assert!(dp.quality.blocked());
        assert_eq!(dp.timestamp, Some(TimeTag::Cp24(time)));
    }

    #[test]
    fn test_from_object_counter_quality() {
        let object = InfoObject::new(
            1u32,
            Element::BinaryCounter(BinaryCounterReading {
                value: 42,
                invalid: true,
                ..Default::default()
            }),
        );
        let dp = DataPoint::from_object(&object).unwrap();
        assert_eq!(dp.as_f64(), Some(42.0));
        assert!(dp.quality.invalid());
    }

    #[test]
    fn test_from_object_normalized_without_quality() {
        let object = InfoObject::new(5u32, Element::NormalizedNoQuality(Normalized(16384)));
        let dp = DataPoint::from_object(&object).unwrap();
        assert_eq!(dp.value, DataValue::Normalized(0.5));
        assert!(dp.is_good());
    }

    #[test]
    fn test_from_object_command_has_no_point() {
        let object = InfoObject::new(0u32, Element::Interrogation(20));
        assert!(DataPoint::from_object(&object).is_none());
    }
}
