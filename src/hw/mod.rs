//! hw.rs
//! Narrow accessor traits over the hardware collaborators.
//!
//! Driver initialization (GPIO, I2C, V4L) is out of scope; the control core
//! only sees these seams. Mock implementations live in [`mock`] and are what
//! the binary wires up by default.

pub mod mock;

use crate::error::Result;

/// Which side of the differential drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    Left,
    Right,
}

/// Rotation sense of one motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorDirection {
    Forward,
    Reverse,
}

/// Rotation sense of the whole chassis for in-place turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinDirection {
    Clockwise,
    CounterClockwise,
}

/// One captured camera frame, packed BGR, row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Frame filled with a single BGR value.
    pub fn solid(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&bgr);
        }
        Self { width, height, data }
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * self.width + x) * 3) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Paint an axis-aligned block; columns/rows outside the frame are ignored.
    pub fn paint_block(&mut self, x0: u32, x1: u32, y0: u32, y1: u32, bgr: [u8; 3]) {
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                let i = ((y * self.width + x) * 3) as usize;
                self.data[i..i + 3].copy_from_slice(&bgr);
            }
        }
    }
}

/// Monocular camera. A failed capture returns `None`; the color sampler
/// retries on its next tick.
pub trait Camera: Send {
    fn capture_frame(&mut self) -> Option<Frame>;
    fn release(&mut self);
}

/// Ultrasonic ranger. Returns raw distance in millimeters; a transient read
/// failure is an `Err` the sampler logs and rides out.
pub trait Ultrasonic: Send {
    fn read_raw_distance(&mut self) -> Result<i32>;
}

/// PWM drive train. `percent` is the duty-cycle magnitude in [0,100];
/// direction carries the sign. Shared by the updater thread and the mission
/// thread (for the immediate stop), so methods take `&self`.
pub trait DriveTrain: Send + Sync {
    fn apply_duty_cycle(&self, wheel: Wheel, percent: f64, direction: MotorDirection);
}

/// Edge-triggered wheel encoders. `take_counts` returns the rising-edge
/// counts accumulated since the previous call and resets both counters.
pub trait EncoderCounter: Send + Sync {
    fn take_counts(&self) -> (u64, u64);
}
