//! config.rs
//! Tunable mission parameters and persisted HSV color thresholds.
//!
//! Everything that was tuned on the field lives here: speeds, the approach
//! distance threshold, the debounce count, and the per-direction bypass leg
//! durations. The HSV threshold table is produced by an external calibration
//! tool and loaded once at startup; a missing or unreadable file falls back
//! to the built-in table.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mission::BypassDirection;

/// One inclusive HSV interval. H in [0,179], S and V in [0,255]
/// (OpenCV-style half-degree hue).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

/// Ordered map of color name -> HSV intervals. Red needs two intervals
/// because its hue wraps around zero.
pub type ColorTable = BTreeMap<String, Vec<ColorRange>>;

/// Color names ignored even when present in the threshold file. "white" is
/// the arena floor; "oranges" is a stale calibration entry.
const EXCLUDED_COLORS: &[&str] = &["white", "oranges"];

/// Built-in fallback thresholds for {red, orange, yellow, green, blue}.
pub fn default_color_table() -> ColorTable {
    let mut table = ColorTable::new();
    table.insert(
        "red".into(),
        vec![
            ColorRange { lower: [0, 100, 100], upper: [10, 255, 255] },
            ColorRange { lower: [160, 100, 100], upper: [179, 255, 255] },
        ],
    );
    table.insert(
        "orange".into(),
        vec![ColorRange { lower: [11, 100, 100], upper: [20, 255, 255] }],
    );
    table.insert(
        "yellow".into(),
        vec![ColorRange { lower: [21, 100, 100], upper: [40, 255, 255] }],
    );
    table.insert(
        "green".into(),
        vec![ColorRange { lower: [41, 100, 100], upper: [80, 255, 255] }],
    );
    table.insert(
        "blue".into(),
        vec![ColorRange { lower: [81, 100, 100], upper: [130, 255, 255] }],
    );
    table
}

/// Strict parse of a threshold file; excluded names are dropped.
///
/// File format: `{"red": [{"lower": [0,100,100], "upper": [10,255,255]}, ...], ...}`.
pub fn read_color_table(path: &Path) -> Result<ColorTable> {
    let raw = fs::read_to_string(path)?;
    let mut table: ColorTable = serde_json::from_str(&raw)?;
    for name in EXCLUDED_COLORS {
        table.remove(*name);
    }
    Ok(table)
}

/// Load the HSV threshold table, falling back to [`default_color_table`]
/// when the file is missing or invalid.
pub fn load_color_table(path: &Path) -> ColorTable {
    match read_color_table(path) {
        Ok(table) => {
            info!("loaded {} color thresholds from {:?}", table.len(), path);
            table
        }
        Err(e) => {
            warn!("HSV threshold file {:?} unusable ({}); using defaults", path, e);
            default_color_table()
        }
    }
}

/// PID gains for one wheel.
#[derive(Debug, Clone, Copy)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Timed-leg durations for the rectangular bypass detour, in seconds.
/// The two turn legs are independently tunable per direction because the
/// wheels do not respond symmetrically.
#[derive(Debug, Clone, Copy)]
pub struct BypassTimings {
    pub left_turn_out: f64,
    pub left_turn_back: f64,
    pub right_turn_out: f64,
    pub right_turn_back: f64,
    pub side_short: f64,
    pub side_long: f64,
    pub stabilize: f64,
    pub stabilize_speed: f64,
}

impl Default for BypassTimings {
    fn default() -> Self {
        Self {
            left_turn_out: 0.45,
            left_turn_back: 0.35,
            right_turn_out: 0.25,
            right_turn_back: 0.35,
            side_short: 0.85,
            side_long: 3.0,
            stabilize: 1.0,
            stabilize_speed: 0.5,
        }
    }
}

impl BypassTimings {
    /// Turn durations (out, back) for a bypass direction.
    pub fn turns(&self, direction: BypassDirection) -> (f64, f64) {
        match direction {
            BypassDirection::Left => (self.left_turn_out, self.left_turn_back),
            BypassDirection::Right => (self.right_turn_out, self.right_turn_back),
        }
    }
}

/// All mission tunables. Speeds are wheel targets in revolutions per second.
#[derive(Debug, Clone)]
pub struct Config {
    /// Consecutive ticks the same color must stay widest before it counts.
    pub color_confirm_count: u32,
    /// Filtered range at or below this switches APPROACH -> BYPASS (cm).
    pub distance_threshold_cm: f32,
    pub search_speed: f64,
    pub forward_speed: f64,
    pub turn_speed: f64,
    pub sprint_speed: f64,
    pub sprint_secs: f64,
    /// First sweep duration T; the reverse sweep runs up to 2T.
    pub sweep_secs: f64,
    pub approach_timeout_secs: f64,
    /// Mission loop tick, also the debounce sampling cadence.
    pub tick_secs: f64,
    /// Colors that send the first and third bypass to the left.
    pub left_turn_colors: Vec<String>,
    pub bypass: BypassTimings,
    pub left_pid: PidGains,
    pub right_pid: PidGains,
    /// Steering: |center offset| is normalized against this many pixels.
    pub steer_offset_scale: f64,
    /// Fraction of base speed shed on the target-side wheel at full offset.
    pub steer_offset_factor: f64,
    /// Sampler periods, seconds.
    pub sample_interval_secs: f64,
    /// Vertical placement of the scan band, as a fraction of frame height.
    pub band_row_fraction: f32,
    pub band_height_px: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            color_confirm_count: 3,
            distance_threshold_cm: 55.0,
            search_speed: 0.4,
            forward_speed: 1.0,
            turn_speed: 0.8,
            sprint_speed: 0.5,
            sprint_secs: 3.0,
            sweep_secs: 1.2,
            approach_timeout_secs: 30.0,
            tick_secs: 0.1,
            left_turn_colors: vec!["red".into(), "yellow".into()],
            bypass: BypassTimings::default(),
            left_pid: PidGains { kp: 45.0, ki: 0.1, kd: 70.0 },
            right_pid: PidGains { kp: 40.0, ki: 0.1, kd: 70.0 },
            steer_offset_scale: 200.0,
            steer_offset_factor: 0.2,
            sample_interval_secs: 0.1,
            band_row_fraction: 0.25,
            band_height_px: 50,
        }
    }
}
