//! telemetry.rs
//! Shared telemetry store: one typed slot per subsystem.
//!
//! Three periodic producers (speed monitor, color sampler, range sampler)
//! write here; the mission loop reads the latest snapshot each tick and never
//! blocks on a producer. Speed and color slots are last-write-wins; the range
//! slot keeps the whole [`RangeFilter`] behind one mutex so the (latest,
//! window) pair can never be read torn.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::sensing::color::ColorSegment;
use crate::sensing::range::RangeFilter;

/// Latest per-wheel rotational speed, revolutions per second (magnitudes).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelSpeeds {
    pub left: f64,
    pub right: f64,
}

/// One detection cycle's output: color name -> runs in ascending start order.
pub type ColorSnapshot = BTreeMap<String, Vec<ColorSegment>>;

/// What the mission loop needs from telemetry each tick. The production
/// implementation is [`TelemetryStore`]; tests script their own feeds.
pub trait TelemetrySource: Send + Sync {
    fn latest_segments(&self) -> ColorSnapshot;
    /// Filtered distance in centimeters; -1.0 until a first valid sample.
    fn latest_distance_cm(&self) -> f32;
    fn wheel_speeds(&self) -> WheelSpeeds;
    /// Toggle boundary-run dismissal in the segmenter for upcoming frames.
    fn set_edge_dismiss(&self, on: bool);
}

#[derive(Default)]
pub struct TelemetryStore {
    speeds: Mutex<WheelSpeeds>,
    segments: Mutex<ColorSnapshot>,
    range: Mutex<RangeFilter>,
    edge_dismiss: AtomicBool,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_speeds(&self, speeds: WheelSpeeds) {
        *self.speeds.lock() = speeds;
    }

    pub fn publish_segments(&self, snapshot: ColorSnapshot) {
        *self.segments.lock() = snapshot;
    }

    /// Run one raw range sample (cm) through the outlier filter under the
    /// slot mutex. Returns the accepted value, `None` on rejection.
    pub fn accept_range_sample(&self, raw_cm: f32) -> Option<f32> {
        self.range.lock().accept(raw_cm)
    }

    /// True when the filtered distance is valid and at or below `threshold_cm`.
    pub fn is_collision_possible(&self, threshold_cm: f32) -> bool {
        self.range.lock().is_collision_possible(threshold_cm)
    }

    pub fn edge_dismiss(&self) -> bool {
        self.edge_dismiss.load(Ordering::Relaxed)
    }
}

impl TelemetrySource for TelemetryStore {
    fn latest_segments(&self) -> ColorSnapshot {
        self.segments.lock().clone()
    }

    fn latest_distance_cm(&self) -> f32 {
        self.range.lock().latest_cm()
    }

    fn wheel_speeds(&self) -> WheelSpeeds {
        *self.speeds.lock()
    }

    fn set_edge_dismiss(&self, on: bool) {
        self.edge_dismiss.store(on, Ordering::Relaxed);
    }
}
