//! range.rs
//! Ultrasonic range denoising: sliding-window outlier rejection.
//!
//! The sensor occasionally returns wild values on glancing echoes. A sample
//! is compared against the mean of the last five window entries; deviations
//! beyond 40 cm are rejected from the exposed value but still enter the
//! window, so a sustained level shift re-converges instead of deadlocking
//! the filter.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::debug;
use spin_sleep::{SpinSleeper, SpinStrategy};

use crate::hw::Ultrasonic;
use crate::recorder::{EventRecorder, MissionEvent};
use crate::telemetry::TelemetryStore;

/// Sensor ceiling; the module reports in this range or not at all.
pub const MAX_DISTANCE_CM: f32 = 500.0;
/// Maximum deviation from the window mean before a sample is an outlier.
pub const MAX_DEVIATION_CM: f32 = 40.0;
const WINDOW_LEN: usize = 5;

pub struct RangeFilter {
    latest_cm: f32,
    window: VecDeque<f32>,
}

impl Default for RangeFilter {
    fn default() -> Self {
        Self {
            latest_cm: -1.0,
            window: VecDeque::with_capacity(WINDOW_LEN),
        }
    }
}

impl RangeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw sample in centimeters. Returns the accepted value, or
    /// `None` when the sample is out of sensor range or an outlier.
    pub fn accept(&mut self, raw_cm: f32) -> Option<f32> {
        if raw_cm < 0.0 || raw_cm > MAX_DISTANCE_CM {
            return None;
        }

        if self.window.len() < WINDOW_LEN {
            self.window.push_back(raw_cm);
            self.latest_cm = raw_cm;
            return Some(raw_cm);
        }

        let mean = self.window.iter().sum::<f32>() / self.window.len() as f32;

        // Outliers still enter the window: a consistent burst eventually
        // shifts the mean and gets accepted (intentional drift tolerance).
        self.window.pop_front();
        self.window.push_back(raw_cm);

        if (raw_cm - mean).abs() > MAX_DEVIATION_CM {
            return None;
        }

        self.latest_cm = raw_cm;
        Some(raw_cm)
    }

    /// Last accepted distance in cm; -1.0 until the first valid sample.
    pub fn latest_cm(&self) -> f32 {
        self.latest_cm
    }

    pub fn is_collision_possible(&self, threshold_cm: f32) -> bool {
        self.latest_cm >= 0.0 && self.latest_cm <= threshold_cm
    }

    pub fn window_mean(&self) -> Option<f32> {
        if self.window.is_empty() {
            None
        } else {
            Some(self.window.iter().sum::<f32>() / self.window.len() as f32)
        }
    }
}

/// Spawns the range sampler: read, filter under the store mutex, sleep.
/// Read failures are logged and retried on the next tick.
pub fn spawn_range_sampler(
    mut sensor: Box<dyn Ultrasonic>,
    store: Arc<TelemetryStore>,
    recorder: Arc<EventRecorder>,
    running: Arc<AtomicBool>,
    interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);

        while running.load(Ordering::Acquire) {
            match sensor.read_raw_distance() {
                Ok(mm) => {
                    let cm = mm as f32 / 10.0;
                    if store.accept_range_sample(cm).is_none() {
                        debug!("[range] sample {:.1}cm rejected", cm);
                        recorder.record(MissionEvent::RangeRejected { raw_cm: cm });
                    }
                }
                Err(e) => debug!("[range] read failed: {}", e),
            }
            sleeper.sleep(interval);
        }

        debug!("[range] sampler stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warmed(values: &[f32]) -> RangeFilter {
        let mut f = RangeFilter::new();
        for &v in values {
            assert!(f.accept(v).is_some());
        }
        f
    }

    #[test]
    fn first_five_samples_accepted_unconditionally() {
        let mut f = RangeFilter::new();
        for v in [100.0, 180.0, 60.0, 140.0, 20.0] {
            assert_eq!(f.accept(v), Some(v));
        }
    }

    #[test]
    fn deviation_past_40_is_rejected_but_39_is_accepted() {
        // Window mean M = 100.
        let mut f = warmed(&[100.0; 5]);
        assert_eq!(f.accept(141.0), None);
        assert_eq!(f.latest_cm(), 100.0);

        let mut f = warmed(&[100.0; 5]);
        assert_eq!(f.accept(139.0), Some(139.0));
        assert_eq!(f.latest_cm(), 139.0);
    }

    #[test]
    fn out_of_range_always_rejected() {
        let mut f = RangeFilter::new();
        assert_eq!(f.accept(600.0), None);
        assert_eq!(f.accept(-3.0), None);
        assert_eq!(f.window_mean(), None);

        let mut f = warmed(&[100.0; 5]);
        assert_eq!(f.accept(600.0), None);
        // Ceiling rejections do not enter the window.
        assert_eq!(f.window_mean(), Some(100.0));
    }

    #[test]
    fn rejected_outliers_still_warm_the_window() {
        let mut f = warmed(&[100.0; 5]);
        // A consistent burst at 300cm: first rejections shift the mean...
        for _ in 0..5 {
            f.accept(300.0);
        }
        // ...until the level change is accepted.
        assert_eq!(f.accept(300.0), Some(300.0));
    }

    #[test]
    fn collision_predicate_requires_valid_distance() {
        let f = RangeFilter::new();
        assert!(!f.is_collision_possible(20.0));

        let f = warmed(&[15.0]);
        assert!(f.is_collision_possible(20.0));
        assert!(!f.is_collision_possible(10.0));
    }
}
