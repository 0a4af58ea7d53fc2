//! velocity.rs
//! Wheel speed estimation from encoder edge counts.
//!
//! Each sample converts the rising-edge counts accumulated since the
//! previous sample into revolutions per second, then resets both counters.
//! Speeds are magnitudes; single-channel encoders cannot see direction.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::debug;
use spin_sleep::{SpinSleeper, SpinStrategy};

use crate::hw::EncoderCounter;
use crate::telemetry::{TelemetryStore, WheelSpeeds};

/// Encoder pulses per full wheel revolution.
pub const PULSES_PER_REV: f64 = 585.0;

pub struct VelocityEstimator {
    encoder: Arc<dyn EncoderCounter>,
}

impl VelocityEstimator {
    pub fn new(encoder: Arc<dyn EncoderCounter>) -> Self {
        Self { encoder }
    }

    /// Counts since the previous call, over `interval_secs`, as rev/s.
    pub fn sample(&self, interval_secs: f64) -> WheelSpeeds {
        let (left, right) = self.encoder.take_counts();
        WheelSpeeds {
            left: left as f64 / PULSES_PER_REV / interval_secs,
            right: right as f64 / PULSES_PER_REV / interval_secs,
        }
    }
}

/// Spawns the speed monitor: sample counters, publish, sleep.
pub fn spawn_speed_monitor(
    estimator: VelocityEstimator,
    store: Arc<TelemetryStore>,
    running: Arc<AtomicBool>,
    interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);
        let interval_secs = interval.as_secs_f64();

        while running.load(Ordering::Acquire) {
            sleeper.sleep(interval);
            store.publish_speeds(estimator.sample(interval_secs));
        }

        debug!("[speed] monitor stopped");
    })
}
