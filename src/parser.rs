//! ASDU information object parser.
//!
//! Flattens decoded monitor-direction ASDUs into [`DataPoint`] values.

use crate::config::Params;
use crate::error::CodecError;
use crate::types::{Asdu, DataPoint};

/// Parse an ASDU into a list of data points.
///
/// Objects without a point value (commands, system information) are
/// skipped, so a command ASDU yields an empty list.
///
/// # Example
///
/// ```rust,ignore
/// session.on_asdu(|asdu| {
///     for point in parse_asdu(&asdu) {
///         println!("IOA {}: {:?} ({})", point.ioa, point.value, point.quality);
///     }
/// })?;
/// ```
pub fn parse_asdu(asdu: &Asdu) -> Vec<DataPoint> {
    asdu.objects
        .iter()
        .filter_map(DataPoint::from_object)
        .collect()
}

/// Decode an ASDU payload and flatten it into data points.
pub fn parse_payload(payload: &[u8], params: &Params) -> Result<Vec<DataPoint>, CodecError> {
    Asdu::decode(payload, params).map(|asdu| parse_asdu(&asdu))
}
