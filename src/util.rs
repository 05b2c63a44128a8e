//! Display helpers for durations and byte counts.
use std::{fmt, time::Duration};

use byte_unit::{AdjustedByte, Byte, UnitType};

/// A duration rendered in a unit appropriate for its magnitude.
pub(crate) struct HumanDuration(pub Duration);

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.as_nanos();
        let (scale, unit) = match nanos {
            n if n < 1_000 => (1.0, "ns"),
            n if n < 1_000_000 => (1e3, "µs"),
            n if n < 1_000_000_000 => (1e6, "ms"),
            n if n < 60 * 1_000_000_000 => (1e9, "s"),
            _ => (60e9, "m"),
        };
        write!(f, "{:.2}{}", nanos as f64 / scale, unit)
    }
}

/// Bytes rendered with a binary unit suffix.
pub(crate) fn adjusted_bytes(bytes: u64) -> AdjustedByte {
    Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary)
}
