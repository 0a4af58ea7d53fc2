//! actuator.rs
//! Motion primitives over the two-wheel drive train.
//!
//! All primitives funnel into `set_motor_speed`, which stores signed wheel
//! targets and lets each wheel's PID converge toward the magnitude. The
//! periodic PWM updater applies the sign when it pushes duty to the drive
//! train; `stop_motor` bypasses that cadence for an immediate zero.

use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::config::Config;
use crate::hw::{DriveTrain, MotorDirection, SpinDirection, Wheel};
use crate::motion::pid::PidController;
use crate::telemetry::WheelSpeeds;

struct WheelState {
    pid: Option<PidController>,
    /// Signed target in rev/s; the PID only ever sees its magnitude.
    target: f64,
}

struct DriveState {
    left: WheelState,
    right: WheelState,
}

pub struct MotionActuator {
    state: Mutex<DriveState>,
    drive: Arc<dyn DriveTrain>,
    cfg: Config,
}

impl MotionActuator {
    pub fn new(drive: Arc<dyn DriveTrain>, cfg: Config) -> Self {
        Self {
            state: Mutex::new(DriveState {
                left: WheelState { pid: None, target: 0.0 },
                right: WheelState { pid: None, target: 0.0 },
            }),
            drive,
            cfg,
        }
    }

    /// Store signed per-wheel targets. PID state is created lazily on the
    /// first command and retargeted (history kept) afterwards.
    pub fn set_motor_speed(&self, left_target: f64, right_target: f64) {
        let mut state = self.state.lock();

        match state.left.pid.as_mut() {
            Some(pid) => pid.set_target_speed(left_target.abs()),
            None => {
                state.left.pid = Some(PidController::new(self.cfg.left_pid, left_target.abs()))
            }
        }
        state.left.target = left_target;

        match state.right.pid.as_mut() {
            Some(pid) => pid.set_target_speed(right_target.abs()),
            None => {
                state.right.pid = Some(PidController::new(self.cfg.right_pid, right_target.abs()))
            }
        }
        state.right.target = right_target;
    }

    pub fn drive_straight(&self, speed: f64) {
        self.set_motor_speed(speed, speed);
    }

    pub fn rotate_in_place(&self, direction: SpinDirection, speed: f64) {
        match direction {
            SpinDirection::Clockwise => self.set_motor_speed(speed, -speed),
            SpinDirection::CounterClockwise => self.set_motor_speed(-speed, speed),
        }
    }

    /// Proportional steering toward a detected target: the wheel on the
    /// target's side is slowed by `offset_factor × normalized offset`, the
    /// opposite wheel keeps the full base speed.
    pub fn drive_with_color(&self, center_offset: i32, speed: f64) {
        let normalized = (center_offset.abs() as f64 / self.cfg.steer_offset_scale).min(1.0);
        let reduced = speed * (1.0 - self.cfg.steer_offset_factor * normalized);

        if center_offset > 0 {
            self.set_motor_speed(speed, reduced);
        } else {
            self.set_motor_speed(reduced, speed);
        }
    }

    /// Reset both PIDs and force zero duty on both wheels immediately,
    /// without waiting for the updater's next cycle.
    pub fn stop_motor(&self) {
        let mut state = self.state.lock();
        let DriveState { left, right } = &mut *state;
        for wheel in [left, right] {
            if let Some(pid) = wheel.pid.as_mut() {
                pid.reset();
                pid.set_target_speed(0.0);
            }
            wheel.target = 0.0;
        }
        drop(state);

        self.drive.apply_duty_cycle(Wheel::Left, 0.0, MotorDirection::Forward);
        self.drive.apply_duty_cycle(Wheel::Right, 0.0, MotorDirection::Forward);
        debug!("[motion] stop");
    }

    /// One actuation cycle: advance each wheel's PID against the measured
    /// magnitude and push duty with the stored sign. Called only by the
    /// PWM updater task.
    pub fn update_duty(&self, measured: WheelSpeeds) {
        let mut state = self.state.lock();

        if let Some(pid) = state.left.pid.as_mut() {
            let duty = pid.update(measured.left);
            let dir = direction_for(state.left.target);
            self.drive.apply_duty_cycle(Wheel::Left, duty, dir);
        }
        if let Some(pid) = state.right.pid.as_mut() {
            let duty = pid.update(measured.right);
            let dir = direction_for(state.right.target);
            self.drive.apply_duty_cycle(Wheel::Right, duty, dir);
        }
    }

    /// Signed targets currently stored (left, right); diagnostic accessor.
    pub fn targets(&self) -> (f64, f64) {
        let state = self.state.lock();
        (state.left.target, state.right.target)
    }
}

fn direction_for(target: f64) -> MotorDirection {
    if target < 0.0 {
        MotorDirection::Reverse
    } else {
        MotorDirection::Forward
    }
}
