//! Telemetry producers: wheel speed, color segmentation, filtered range.

pub mod color;
pub mod range;
pub mod velocity;
