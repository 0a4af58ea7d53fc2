//! recorder.rs
//! Non-blocking mission event log with background CSV export.
//!
//! Producers push into a bounded lock-free queue and never block; a
//! background thread drains the queue into a CSV file for post-run analysis.
//! Events are dropped silently if the queue fills.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_queue::ArrayQueue;
use log::error;
use serde::Serialize;

use crate::mission::{BypassDirection, MissionState};

const EVENT_QUEUE_CAPACITY: usize = 8_192;
const EXPORT_POLL_MS: u64 = 20;

#[derive(Debug, Clone)]
pub enum MissionEvent {
    StateChanged { encounter: u8, state: MissionState },
    ColorConfirmed { color: String },
    SearchDegraded { encounter: u8 },
    BypassStarted { direction: BypassDirection },
    BypassLeg { index: usize, description: &'static str },
    RangeRejected { raw_cm: f32 },
    ApproachReached { distance_cm: f32 },
}

#[derive(Serialize)]
struct CsvRow {
    ts_ms: u64,
    event: &'static str,
    detail: String,
    value: f64,
}

impl MissionEvent {
    fn to_row(&self, ts_ms: u64) -> CsvRow {
        match self {
            MissionEvent::StateChanged { encounter, state } => CsvRow {
                ts_ms,
                event: "state_changed",
                detail: format!("{:?}", state),
                value: *encounter as f64,
            },
            MissionEvent::ColorConfirmed { color } => CsvRow {
                ts_ms,
                event: "color_confirmed",
                detail: color.clone(),
                value: 0.0,
            },
            MissionEvent::SearchDegraded { encounter } => CsvRow {
                ts_ms,
                event: "search_degraded",
                detail: String::new(),
                value: *encounter as f64,
            },
            MissionEvent::BypassStarted { direction } => CsvRow {
                ts_ms,
                event: "bypass_started",
                detail: format!("{:?}", direction),
                value: 0.0,
            },
            MissionEvent::BypassLeg { index, description } => CsvRow {
                ts_ms,
                event: "bypass_leg",
                detail: (*description).to_string(),
                value: *index as f64,
            },
            MissionEvent::RangeRejected { raw_cm } => CsvRow {
                ts_ms,
                event: "range_rejected",
                detail: String::new(),
                value: *raw_cm as f64,
            },
            MissionEvent::ApproachReached { distance_cm } => CsvRow {
                ts_ms,
                event: "approach_reached",
                detail: String::new(),
                value: *distance_cm as f64,
            },
        }
    }
}

pub struct EventRecorder {
    queue: Arc<ArrayQueue<(u64, MissionEvent)>>,
    run_start: Instant,
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRecorder {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(EVENT_QUEUE_CAPACITY)),
            run_start: Instant::now(),
        }
    }

    /// Append an event; returns immediately, drops on a full queue.
    #[inline]
    pub fn record(&self, event: MissionEvent) {
        let ts_ms = self.run_start.elapsed().as_millis() as u64;
        let _ = self.queue.push((ts_ms, event));
    }

    /// Spawns the background exporter. It drains until `running` clears and
    /// the queue is empty, then flushes and exits.
    pub fn start_exporter(&self, path: PathBuf, running: Arc<AtomicBool>) -> JoinHandle<()> {
        let queue = self.queue.clone();

        thread::spawn(move || {
            let mut writer = match csv::Writer::from_path(&path) {
                Ok(w) => w,
                Err(e) => {
                    error!("failed to create mission log {:?}: {}", path, e);
                    return;
                }
            };

            loop {
                match queue.pop() {
                    Some((ts_ms, event)) => {
                        if let Err(e) = writer.serialize(event.to_row(ts_ms)) {
                            error!("mission log write failed: {}", e);
                        }
                    }
                    None => {
                        if !running.load(Ordering::Acquire) && queue.is_empty() {
                            break;
                        }
                        thread::sleep(Duration::from_millis(EXPORT_POLL_MS));
                    }
                }
            }

            let _ = writer.flush();
        })
    }
}
