//! Closed-loop locomotion: PID regulators, motion primitives, PWM cadence.

pub mod actuator;
pub mod pid;
pub mod updater;
