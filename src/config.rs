//! Parameter set and link timer configuration.
//!
//! [`Params`] fixes the ASDU field widths for a connection and is passed to
//! every codec call. [`Config`] carries the link timers (t0..t3) and window
//! sizes (k, w).

use std::time::Duration;

use crate::error::{CodecError, Iec104Error, Result};

/// Default IEC 104 port.
pub const DEFAULT_PORT: u16 = 2404;

/// Default t0 (connection establishment) in seconds.
pub const DEFAULT_T0: u64 = 30;

/// Default t1 (send or test APDU acknowledgment) in seconds.
pub const DEFAULT_T1: u64 = 15;

/// Default t2 (acknowledge received I-frames) in seconds.
pub const DEFAULT_T2: u64 = 10;

/// Default t3 (idle test frame) in seconds.
pub const DEFAULT_T3: u64 = 20;

/// Default K parameter (max unconfirmed I-frames).
pub const DEFAULT_K: u16 = 12;

/// Default W parameter (max unconfirmed receives before sending S-frame).
pub const DEFAULT_W: u16 = 8;

/// Byte order of 4-byte IEEE-754 values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatByteOrder {
    /// Least significant byte first (IEC 60870-5-4 default).
    #[default]
    LittleEndian,
    /// Most significant byte first, used by some peers.
    BigEndian,
}

/// ASDU parameter set.
///
/// Immutable for the lifetime of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    /// Cause of transmission size: 1, or 2 when the originator address is present.
    pub cause_size: u8,
    /// Common address size: 1 or 2.
    pub common_addr_size: u8,
    /// Information object address size: 1, 2 or 3.
    pub ioa_size: u8,
    /// Byte order for short floating point values.
    pub float_order: FloatByteOrder,
    /// Whether the T (test) and P/N (negative) cause flags are carried.
    /// When off they are written as zero and ignored on receive.
    pub cause_flags: bool,
}

impl Params {
    /// Standard IEC 104 widths: COT 2, common address 2, IOA 3.
    pub const WIDE: Self = Self {
        cause_size: 2,
        common_addr_size: 2,
        ioa_size: 3,
        float_order: FloatByteOrder::LittleEndian,
        cause_flags: true,
    };

    /// Minimal widths: COT 1, common address 1, IOA 1.
    pub const NARROW: Self = Self {
        cause_size: 1,
        common_addr_size: 1,
        ioa_size: 1,
        float_order: FloatByteOrder::LittleEndian,
        cause_flags: true,
    };

    /// Create a parameter set, validating the widths.
    pub fn new(cause_size: u8, common_addr_size: u8, ioa_size: u8) -> std::result::Result<Self, CodecError> {
        let params = Self {
            cause_size,
            common_addr_size,
            ioa_size,
            float_order: FloatByteOrder::LittleEndian,
            cause_flags: true,
        };
        params.validate()?;
        Ok(params)
    }

    /// Set float byte order.
    pub fn float_order(mut self, order: FloatByteOrder) -> Self {
        self.float_order = order;
        self
    }

    /// Enable or disable the test and negative cause flags.
    pub fn cause_flags(mut self, enabled: bool) -> Self {
        self.cause_flags = enabled;
        self
    }

    /// Check the widths are ones the standard allows.
    pub fn validate(&self) -> std::result::Result<(), CodecError> {
        if !matches!(self.cause_size, 1 | 2) {
            return Err(CodecError::InvalidParams("cause size must be 1 or 2"));
        }
        if !matches!(self.common_addr_size, 1 | 2) {
            return Err(CodecError::InvalidParams("common address size must be 1 or 2"));
        }
        if !matches!(self.ioa_size, 1..=3) {
            return Err(CodecError::InvalidParams("IOA size must be 1, 2 or 3"));
        }
        Ok(())
    }

    /// Whether the originator address byte is on the wire.
    #[inline]
    pub const fn has_originator(&self) -> bool {
        self.cause_size == 2
    }

    /// Largest common address representable.
    #[inline]
    pub const fn max_common_address(&self) -> u16 {
        if self.common_addr_size == 1 {
            0xFF
        } else {
            0xFFFF
        }
    }

    /// Largest IOA representable.
    #[inline]
    pub const fn max_ioa(&self) -> u32 {
        match self.ioa_size {
            1 => 0xFF,
            2 => 0xFFFF,
            _ => 0xFF_FFFF,
        }
    }

    /// Size of the data unit identifier in bytes.
    #[inline]
    pub const fn identifier_size(&self) -> usize {
        2 + self.cause_size as usize + self.common_addr_size as usize
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::WIDE
    }
}

/// Link timer and window configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// t0: connection establishment timeout
    pub t0: Duration,
    /// t1: timeout for acknowledgment of sent I-frames and U-frame activations
    pub t1: Duration,
    /// t2: acknowledge received I-frames no later than this
    pub t2: Duration,
    /// t3: send a test frame after this much idle time
    pub t3: Duration,
    /// k: max unacknowledged sent I-frames
    pub k: u16,
    /// w: acknowledge after this many received I-frames
    pub w: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            t0: Duration::from_secs(DEFAULT_T0),
            t1: Duration::from_secs(DEFAULT_T1),
            t2: Duration::from_secs(DEFAULT_T2),
            t3: Duration::from_secs(DEFAULT_T3),
            k: DEFAULT_K,
            w: DEFAULT_W,
        }
    }
}

impl Config {
    /// Create a configuration with standard defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set t0.
    pub fn t0(mut self, timeout: Duration) -> Self {
        self.t0 = timeout;
        self
    }

    /// Set t1.
    pub fn t1(mut self, timeout: Duration) -> Self {
        self.t1 = timeout;
        self
    }

    /// Set t2.
    pub fn t2(mut self, timeout: Duration) -> Self {
        self.t2 = timeout;
        self
    }

    /// Set t3.
    pub fn t3(mut self, timeout: Duration) -> Self {
        self.t3 = timeout;
        self
    }

    /// Set k.
    pub fn k(mut self, k: u16) -> Self {
        self.k = k;
        self
    }

    /// Set w.
    pub fn w(mut self, w: u16) -> Self {
        self.w = w;
        self
    }

    /// Check ranges.
    ///
    /// t0, t1 and t2 must be 1..=255 s with t2 < t1; t3 1 s..=48 h;
    /// k and w 1..=32767.
    pub fn validate(&self) -> Result<()> {
        let secs = Duration::from_secs(1)..=Duration::from_secs(255);
        if !secs.contains(&self.t0) {
            return Err(Iec104Error::InvalidConfig("t0 must be within 1..=255 s"));
        }
        if !secs.contains(&self.t1) {
            return Err(Iec104Error::InvalidConfig("t1 must be within 1..=255 s"));
        }
        if !secs.contains(&self.t2) {
            return Err(Iec104Error::InvalidConfig("t2 must be within 1..=255 s"));
        }
        if self.t2 >= self.t1 {
            return Err(Iec104Error::InvalidConfig("t2 must be less than t1"));
        }
        if !(Duration::from_secs(1)..=Duration::from_secs(48 * 3600)).contains(&self.t3) {
            return Err(Iec104Error::InvalidConfig("t3 must be within 1 s..=48 h"));
        }
        if !(1..=32767).contains(&self.k) {
            return Err(Iec104Error::InvalidConfig("k must be within 1..=32767"));
        }
        if !(1..=32767).contains(&self.w) {
            return Err(Iec104Error::InvalidConfig("w must be within 1..=32767"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_presets() {
        assert!(Params::WIDE.validate().is_ok());
        assert!(Params::NARROW.validate().is_ok());
        assert_eq!(Params::WIDE.identifier_size(), 6);
        assert_eq!(Params::NARROW.identifier_size(), 4);
        assert!(Params::WIDE.has_originator());
        assert!(!Params::NARROW.has_originator());
        assert_eq!(Params::default(), Params::WIDE);
        assert!(Params::WIDE.cause_flags);
        assert!(!Params::NARROW.cause_flags(false).cause_flags);
    }

    #[test]
    fn test_params_invalid_widths() {
        assert!(Params::new(3, 2, 3).is_err());
        assert!(Params::new(2, 0, 3).is_err());
        assert!(Params::new(2, 2, 4).is_err());
        assert!(Params::new(1, 2, 2).is_ok());
    }

    #[test]
    fn test_params_limits() {
        let p = Params::new(1, 1, 2).unwrap();
        assert_eq!(p.max_common_address(), 0xFF);
        assert_eq!(p.max_ioa(), 0xFFFF);
        assert_eq!(Params::WIDE.max_ioa(), 0xFF_FFFF);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::new();
        assert_eq!(config.t0, Duration::from_secs(DEFAULT_T0));
        assert_eq!(config.t1, Duration::from_secs(DEFAULT_T1));
        assert_eq!(config.t2, Duration::from_secs(DEFAULT_T2));
        assert_eq!(config.t3, Duration::from_secs(DEFAULT_T3));
        assert_eq!(config.k, 12);
        assert_eq!(config.w, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .t1(Duration::from_secs(10))
            .t2(Duration::from_secs(5))
            .k(4)
            .w(2);
        assert_eq!(config.t1, Duration::from_secs(10));
        assert_eq!(config.t2, Duration::from_secs(5));
        assert_eq!(config.k, 4);
        assert_eq!(config.w, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_rejects() {
        assert!(Config::new().t2(Duration::from_secs(15)).validate().is_err());
        assert!(Config::new().t1(Duration::from_secs(300)).validate().is_err());
        assert!(Config::new().t0(Duration::ZERO).validate().is_err());
        assert!(Config::new().k(0).validate().is_err());
        assert!(Config::new().w(40000).validate().is_err());
        assert!(Config::new()
            .t3(Duration::from_secs(49 * 3600))
            .validate()
            .is_err());
    }
}
