//! pid.rs
//! Per-wheel PID velocity regulator.
//!
//! Operates on magnitudes only: the target and the measured speed are both
//! non-negative, and the sign is applied at the actuation stage. Output is
//! clamped to [0,100] duty; the integral term itself is not bounded, which
//! is a known limitation carried over from the field-tuned controller.

use crate::config::PidGains;

#[derive(Debug)]
pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    integral: f64,
    previous_error: f64,
    target_speed: f64,
    output: f64,
}

impl PidController {
    pub fn new(gains: PidGains, target_speed: f64) -> Self {
        Self {
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,
            integral: 0.0,
            previous_error: 0.0,
            target_speed,
            output: 0.0,
        }
    }

    /// One control step against a measured speed; returns duty in [0,100].
    pub fn update(&mut self, measured_speed: f64) -> f64 {
        let error = self.target_speed - measured_speed;
        self.integral += error;
        let output = self.kp * error
            + self.ki * self.integral
            + self.kd * (error - self.previous_error);
        self.previous_error = error;
        self.output = output.clamp(0.0, 100.0);
        self.output
    }

    /// Re-target without clearing history, for smooth speed changes.
    pub fn set_target_speed(&mut self, speed: f64) {
        self.target_speed = speed;
    }

    /// Zero integral, error history, and output. Called on stop.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = 0.0;
        self.output = 0.0;
    }

    pub fn target_speed(&self) -> f64 {
        self.target_speed
    }

    pub fn last_output(&self) -> f64 {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAINS: PidGains = PidGains { kp: 45.0, ki: 0.1, kd: 70.0 };

    #[test]
    fn output_is_clamped_for_arbitrary_errors() {
        let mut pid = PidController::new(GAINS, 1_000_000.0);
        assert_eq!(pid.update(0.0), 100.0);

        let mut pid = PidController::new(GAINS, 0.0);
        assert_eq!(pid.update(1_000_000.0), 0.0);
    }

    #[test]
    fn reset_then_zero_target_yields_zero_output() {
        let mut pid = PidController::new(GAINS, 1.5);
        pid.update(0.2);
        pid.update(0.4);
        pid.reset();
        pid.set_target_speed(0.0);
        assert_eq!(pid.update(0.0), 0.0);
    }

    #[test]
    fn retargeting_keeps_integral_history() {
        let mut pid = PidController::new(GAINS, 1.0);
        pid.update(0.0); // integral = 1.0
        pid.set_target_speed(0.0);
        // error = -measured; with history kept, integral = 1.0 - 0.5 = 0.5
        let out = pid.update(0.5);
        let expected = (45.0_f64 * -0.5 + 0.1 * 0.5 + 70.0 * (-0.5 - 1.0)).clamp(0.0, 100.0);
        assert_eq!(out, expected);
    }

    #[test]
    fn converged_loop_settles_on_nonsaturated_duty() {
        let mut pid = PidController::new(PidGains { kp: 10.0, ki: 0.0, kd: 0.0 }, 1.0);
        let out = pid.update(0.95);
        assert!(out > 0.0 && out < 100.0);
    }
}
