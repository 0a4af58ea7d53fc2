//! Closed-loop controller for a differential-wheel cube-chasing robot.
//!
//! Three periodic sensor tasks (wheel speed, color segmentation, ultrasonic
//! range) publish into a shared telemetry store; a fixed-cadence PWM updater
//! drives both wheels through per-wheel PID regulators; and the mission loop
//! sequences SEARCH, APPROACH, and BYPASS across three cube encounters
//! before the final sprint.

pub mod config;
pub mod error;
pub mod hw;
pub mod mission;
pub mod motion;
pub mod recorder;
pub mod sensing;
pub mod telemetry;
