//! APRS payload interpretation
//!
//! Decodes the subset of APRS needed by the logger and waypoint sinks:
//! position reports (uncompressed and compressed), object reports, the
//! course/speed data extension and comment altitude.

mod decode;

pub use decode::{decode, AprsError, AprsReport};

/// Feet to meters, for waypoint altitude.
pub fn feet_to_meters(ft: f64) -> f64 {
    ft * 0.3048
}
