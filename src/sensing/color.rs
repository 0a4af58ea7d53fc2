//! color.rs
//! Horizontal-band color segmentation.
//!
//! One band of the frame is converted to HSV and matched against the
//! configured threshold table; contiguous horizontal runs of matching
//! columns become [`ColorSegment`]s with coordinates relative to the frame
//! center. Scanning a band instead of the full frame keeps the per-tick cost
//! bounded on the target board.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use spin_sleep::{SpinSleeper, SpinStrategy};

use crate::config::{ColorRange, ColorTable};
use crate::hw::{Camera, Frame};
use crate::telemetry::{ColorSnapshot, TelemetryStore};

/// One contiguous horizontal run of a color, in pixels relative to the
/// frame's horizontal center (negative = left of center).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSegment {
    pub start_rel: i32,
    pub end_rel: i32,
    pub center_rel: i32,
}

impl ColorSegment {
    #[inline]
    pub fn width(&self) -> i32 {
        (self.end_rel - self.start_rel).abs()
    }
}

/// BGR -> HSV with OpenCV conventions: H in [0,179], S and V in [0,255].
pub fn bgr_to_hsv(bgr: [u8; 3]) -> [u8; 3] {
    let b = bgr[0] as f32;
    let g = bgr[1] as f32;
    let r = bgr[2] as f32;

    let max = b.max(g).max(r);
    let min = b.min(g).min(r);
    let diff = max - min;

    let v = max;
    let s = if max == 0.0 { 0.0 } else { 255.0 * diff / max };

    let h_deg = if diff == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / diff
    } else if max == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    let h_deg = if h_deg < 0.0 { h_deg + 360.0 } else { h_deg };

    [(h_deg / 2.0).round() as u8, s.round() as u8, v.round() as u8]
}

#[inline]
fn in_range(hsv: [u8; 3], range: &ColorRange) -> bool {
    (0..3).all(|i| range.lower[i] <= hsv[i] && hsv[i] <= range.upper[i])
}

/// Extracts per-color segments from one horizontal band of a frame.
pub struct ColorSegmenter {
    table: ColorTable,
    row_fraction: f32,
    band_height: u32,
}

impl ColorSegmenter {
    pub fn new(table: ColorTable, row_fraction: f32, band_height: u32) -> Self {
        Self { table, row_fraction, band_height }
    }

    /// Detect segments for every registered color. Colors with no surviving
    /// run are absent from the result. With `dismiss_edges` set, runs that
    /// touch the left or right frame boundary are dropped (partially visible
    /// objects during mid-mission sweeps).
    pub fn detect(&self, frame: &Frame, dismiss_edges: bool) -> ColorSnapshot {
        let width = frame.width as usize;
        let height = frame.height;

        let start_row = ((height as f32 * self.row_fraction) as u32).min(height.saturating_sub(1));
        let end_row = (start_row + self.band_height).clamp(start_row + 1, height);
        let center_x = (width / 2) as i32;

        let mut result = ColorSnapshot::new();

        for (name, ranges) in &self.table {
            // OR of all range masks, collapsed to per-column occupancy.
            let mut columns = vec![false; width];
            for y in start_row..end_row {
                for x in 0..frame.width {
                    let xi = x as usize;
                    if columns[xi] {
                        continue;
                    }
                    let hsv = bgr_to_hsv(frame.pixel(x, y));
                    if ranges.iter().any(|r| in_range(hsv, r)) {
                        columns[xi] = true;
                    }
                }
            }

            let mut runs = extract_runs(&columns, width);
            if runs.len() > 1 {
                runs = merge_close_runs(runs);
            }

            let segments: Vec<ColorSegment> = runs
                .into_iter()
                .filter(|&(start, end)| {
                    !(dismiss_edges && (start == 0 || end == width - 1))
                })
                .map(|(start, end)| ColorSegment {
                    start_rel: start as i32 - center_x,
                    end_rel: end as i32 - center_x,
                    center_rel: ((start + end) / 2) as i32 - center_x,
                })
                .collect();

            if !segments.is_empty() {
                result.insert(name.clone(), segments);
            }
        }

        result
    }
}

/// Contiguous runs of set columns, keeping only runs spanning at least
/// `max(3, 4% of width)` pixels. Runs come out in ascending start order.
fn extract_runs(columns: &[bool], width: usize) -> Vec<(usize, usize)> {
    let min_len = 3.max((width as f32 * 0.04) as usize);

    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    for (x, &set) in columns.iter().enumerate() {
        match (set, start) {
            (true, None) => start = Some(x),
            (false, Some(s)) => {
                if x - 1 - s >= min_len {
                    runs.push((s, x - 1));
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        if columns.len() - 1 - s >= min_len {
            runs.push((s, columns.len() - 1));
        }
    }
    runs
}

/// One merging pass over start-sorted runs: a gap is bridged when it is at
/// most 30% of the total surviving run length. Bridges specular holes inside
/// one physical object without gluing distinct objects together.
pub fn merge_close_runs(mut runs: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    if runs.len() <= 1 {
        return runs;
    }
    runs.sort_by_key(|r| r.0);

    let total_len: usize = runs.iter().map(|&(s, e)| e - s).sum();
    let max_gap = total_len as f32 * 0.3;

    let mut merged = Vec::new();
    let (mut cur_start, mut cur_end) = runs[0];
    for &(start, end) in &runs[1..] {
        if start.saturating_sub(cur_end) as f32 <= max_gap {
            cur_end = end;
        } else {
            merged.push((cur_start, cur_end));
            cur_start = start;
            cur_end = end;
        }
    }
    merged.push((cur_start, cur_end));
    merged
}

/// Spawns the color sampler: capture, segment, publish, sleep.
/// A failed capture is logged and retried on the next tick.
pub fn spawn_color_sampler(
    mut camera: Box<dyn Camera>,
    segmenter: ColorSegmenter,
    store: Arc<TelemetryStore>,
    running: Arc<AtomicBool>,
    interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);

        while running.load(Ordering::Acquire) {
            match camera.capture_frame() {
                Some(frame) => {
                    let dismiss = store.edge_dismiss();
                    let snapshot = segmenter.detect(&frame, dismiss);
                    store.publish_segments(snapshot);
                }
                None => warn!("[color] frame capture failed; retrying next tick"),
            }
            sleeper.sleep(interval);
        }

        camera.release();
        debug!("[color] sampler stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_color_table;

    const GREEN: [u8; 3] = [0, 255, 0];
    const RED: [u8; 3] = [0, 0, 255];
    const GRAY: [u8; 3] = [120, 120, 120];

    fn segmenter() -> ColorSegmenter {
        ColorSegmenter::new(default_color_table(), 0.25, 50)
    }

    fn frame_with_green(width: u32, x0: u32, x1: u32) -> Frame {
        let mut f = Frame::solid(width, 100, GRAY);
        f.paint_block(x0, x1, 0, 100, GREEN);
        f
    }

    #[test]
    fn hsv_matches_opencv_for_primaries() {
        assert_eq!(bgr_to_hsv([0, 0, 255]), [0, 255, 255]); // red
        assert_eq!(bgr_to_hsv([0, 255, 0]), [60, 255, 255]); // green
        assert_eq!(bgr_to_hsv([255, 0, 0]), [120, 255, 255]); // blue
        assert_eq!(bgr_to_hsv([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn wide_run_is_reported_short_run_is_not() {
        // width 200 -> min span = 8 columns
        let frame = frame_with_green(200, 20, 60);
        let result = segmenter().detect(&frame, false);
        let segs = &result["green"];
        assert_eq!(segs.len(), 1);
        assert!(segs[0].width() >= 39);

        let narrow = frame_with_green(200, 20, 24);
        assert!(segmenter().detect(&narrow, false).get("green").is_none());
    }

    #[test]
    fn colors_without_runs_are_omitted_entirely() {
        let frame = frame_with_green(200, 20, 60);
        let result = segmenter().detect(&frame, false);
        assert!(result.contains_key("green"));
        assert!(!result.contains_key("red"));
        assert!(!result.contains_key("blue"));
    }

    #[test]
    fn red_hue_wraparound_uses_both_intervals() {
        let mut frame = Frame::solid(200, 100, GRAY);
        frame.paint_block(20, 40, 0, 100, RED); // hue 0
        frame.paint_block(40, 60, 0, 100, [10, 0, 255]); // hue ~179
        let result = segmenter().detect(&frame, false);
        let segs = &result["red"];
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].start_rel, 20 - 100);
        assert_eq!(segs[0].end_rel, 59 - 100);
    }

    #[test]
    fn symmetric_runs_have_negated_centers() {
        let mut frame = Frame::solid(200, 100, GRAY);
        // Mirrored about column 100; gap of 120 >> merge threshold.
        frame.paint_block(20, 41, 0, 100, GREEN);
        frame.paint_block(160, 181, 0, 100, GREEN);
        let result = segmenter().detect(&frame, false);
        let segs = &result["green"];
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].center_rel, -segs[1].center_rel);
    }

    #[test]
    fn nearby_runs_merge_into_one() {
        let mut frame = Frame::solid(200, 100, GRAY);
        // Two 30-column runs, 10-column gap: gap <= 0.3 * 58.
        frame.paint_block(50, 80, 0, 100, GREEN);
        frame.paint_block(90, 120, 0, 100, GREEN);
        let result = segmenter().detect(&frame, false);
        assert_eq!(result["green"].len(), 1);
        assert_eq!(result["green"][0].start_rel, 50 - 100);
        assert_eq!(result["green"][0].end_rel, 119 - 100);
    }

    #[test]
    fn merge_is_idempotent() {
        let runs = vec![(10, 40), (50, 80), (200, 260)];
        let once = merge_close_runs(runs);
        let twice = merge_close_runs(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn edge_dismiss_drops_boundary_runs() {
        let mut frame = Frame::solid(200, 100, GRAY);
        frame.paint_block(0, 30, 0, 100, GREEN);
        frame.paint_block(100, 130, 0, 100, GREEN);

        let kept = segmenter().detect(&frame, false);
        assert_eq!(kept["green"].len(), 2);

        let dismissed = segmenter().detect(&frame, true);
        assert_eq!(dismissed["green"].len(), 1);
        assert_eq!(dismissed["green"][0].start_rel, 0);
    }
}
