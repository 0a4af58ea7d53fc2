//! mock.rs
//! Bench-top stand-ins for the hardware collaborators.
//!
//! The mock drive train feeds the mock encoder so the PID loop has a plant
//! to converge against: applied duty is integrated into encoder pulses at a
//! nominal 2 rev/s full-scale wheel speed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::debug;
use parking_lot::Mutex;
use rand::random_range;

use crate::error::Result;
use crate::hw::{Camera, DriveTrain, EncoderCounter, Frame, MotorDirection, Ultrasonic, Wheel};
use crate::sensing::velocity::PULSES_PER_REV;

/// Full-scale wheel speed the mock plant reaches at 100% duty.
const FULL_SCALE_RPS: f64 = 2.0;

/// Camera that paints one colored block wandering across a gray frame.
pub struct MockCamera {
    width: u32,
    height: u32,
    block_bgr: [u8; 3],
    block_center: i32,
    drift: i32,
}

impl MockCamera {
    pub fn new(width: u32, height: u32, block_bgr: [u8; 3]) -> Self {
        Self {
            width,
            height,
            block_bgr,
            block_center: (width / 4) as i32,
            drift: 3,
        }
    }
}

impl Camera for MockCamera {
    fn capture_frame(&mut self) -> Option<Frame> {
        let mut frame = Frame::solid(self.width, self.height, [120, 120, 120]);

        // Wander toward and past the frame center, then bounce.
        self.block_center += self.drift + random_range(-1..=1);
        if self.block_center < 40 || self.block_center > (self.width as i32 - 40) {
            self.drift = -self.drift;
        }
        let half = 30;
        let x0 = (self.block_center - half).max(0) as u32;
        let x1 = (self.block_center + half).max(0) as u32;
        frame.paint_block(x0, x1, 0, self.height, self.block_bgr);

        Some(frame)
    }

    fn release(&mut self) {
        debug!("[MockCamera] released");
    }
}

/// Ranger that walks from its start distance toward the target, with jitter.
pub struct MockUltrasonic {
    current_mm: f64,
    approach_mm_per_read: f64,
}

impl MockUltrasonic {
    pub fn new(start_cm: f64) -> Self {
        Self {
            current_mm: start_cm * 10.0,
            approach_mm_per_read: 8.0,
        }
    }
}

impl Ultrasonic for MockUltrasonic {
    fn read_raw_distance(&mut self) -> Result<i32> {
        self.current_mm = (self.current_mm - self.approach_mm_per_read).max(150.0);
        let noisy = self.current_mm + random_range(-10.0..10.0);
        Ok(noisy as i32)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppliedDuty {
    pub percent: f64,
    pub reverse: bool,
}

struct PlantState {
    left: AppliedDuty,
    right: AppliedDuty,
    last_update: Instant,
}

/// Drive train that records the last applied duty per wheel and integrates
/// it into the paired encoder's pulse counters.
pub struct MockDriveTrain {
    state: Mutex<PlantState>,
    encoder: Arc<MockEncoder>,
}

impl MockDriveTrain {
    pub fn new(encoder: Arc<MockEncoder>) -> Self {
        Self {
            state: Mutex::new(PlantState {
                left: AppliedDuty::default(),
                right: AppliedDuty::default(),
                last_update: Instant::now(),
            }),
            encoder,
        }
    }

    pub fn last_applied(&self, wheel: Wheel) -> AppliedDuty {
        let state = self.state.lock();
        match wheel {
            Wheel::Left => state.left,
            Wheel::Right => state.right,
        }
    }
}

impl DriveTrain for MockDriveTrain {
    fn apply_duty_cycle(&self, wheel: Wheel, percent: f64, direction: MotorDirection) {
        let mut state = self.state.lock();

        // Integrate the previously applied duty over the elapsed interval.
        let dt = state.last_update.elapsed().as_secs_f64();
        state.last_update = Instant::now();
        let pulses = |duty: &AppliedDuty| {
            (duty.percent / 100.0 * FULL_SCALE_RPS * PULSES_PER_REV * dt) as u64
        };
        self.encoder.feed(pulses(&state.left), pulses(&state.right));

        let applied = AppliedDuty {
            percent: percent.clamp(0.0, 100.0),
            reverse: direction == MotorDirection::Reverse,
        };
        match wheel {
            Wheel::Left => state.left = applied,
            Wheel::Right => state.right = applied,
        }
    }
}

/// Pair of atomic pulse counters, read-and-reset by the speed monitor.
#[derive(Default)]
pub struct MockEncoder {
    left: AtomicU64,
    right: AtomicU64,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self, left_pulses: u64, right_pulses: u64) {
        self.left.fetch_add(left_pulses, Ordering::Relaxed);
        self.right.fetch_add(right_pulses, Ordering::Relaxed);
    }
}

impl EncoderCounter for MockEncoder {
    fn take_counts(&self) -> (u64, u64) {
        (
            self.left.swap(0, Ordering::Relaxed),
            self.right.swap(0, Ordering::Relaxed),
        )
    }
}
