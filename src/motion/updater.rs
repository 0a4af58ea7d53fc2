//! updater.rs
//! Periodic PWM update task.
//!
//! The single writer of PID state during normal operation: each cycle it
//! reads the latest wheel speeds from telemetry, advances both PIDs, and
//! applies duty to the drive train. Spawned at max OS priority so actuation
//! does not lose its cadence under load.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use log::debug;
use spin_sleep::{SpinSleeper, SpinStrategy};
use thread_priority::{ThreadBuilderExt, ThreadPriority};

use crate::motion::actuator::MotionActuator;
use crate::telemetry::{TelemetrySource, TelemetryStore};

pub fn spawn_pwm_updater(
    actuator: Arc<MotionActuator>,
    store: Arc<TelemetryStore>,
    running: Arc<AtomicBool>,
    interval: Duration,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("pwm-updater".to_string())
        .spawn_with_priority(ThreadPriority::Max, move |_| {
            let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);

            while running.load(Ordering::Acquire) {
                actuator.update_duty(store.wheel_speeds());
                sleeper.sleep(interval);
            }

            debug!("[pwm] updater stopped");
        })
        .expect("failed to spawn PWM updater thread")
}
