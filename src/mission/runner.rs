//! runner.rs
//! Top-level mission loop: three cube encounters, then the sprint.
//!
//! Each encounter runs SEARCH (confirm a cube color), APPROACH (close to the
//! range threshold while steering at the cube), and BYPASS (timed detour).
//! A search that never confirms completes the encounter degraded, skipping
//! the approach and bypass; an approach that exceeds its time bound aborts
//! the whole run.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::config::Config;
use crate::error::{CubebotError, Result};
use crate::hw::SpinDirection;
use crate::mission::bypass::{Sequencer, bypass_plan};
use crate::mission::clock::Clock;
use crate::mission::{ENCOUNTERS, MissionContext, MissionState, widest_color};
use crate::motion::actuator::MotionActuator;
use crate::recorder::{EventRecorder, MissionEvent};
use crate::telemetry::TelemetrySource;

/// Wheel target while creeping forward during the first encounter's search.
const CREEP_SPEED: f64 = 0.3;
/// Opening nudge that gets the robot off the start line before it settles
/// into the creep.
const NUDGE_SECS: f64 = 0.5;
/// Blind advance after a failed sweep, before the encounter is marked
/// complete.
const DEGRADED_FORWARD_SECS: f64 = 2.0;

pub struct MissionRunner<T: TelemetrySource, C: Clock> {
    telemetry: Arc<T>,
    actuator: Arc<MotionActuator>,
    clock: C,
    recorder: Arc<EventRecorder>,
    cfg: Config,
    pub ctx: MissionContext,
}

impl<T: TelemetrySource, C: Clock> MissionRunner<T, C> {
    pub fn new(
        telemetry: Arc<T>,
        actuator: Arc<MotionActuator>,
        clock: C,
        recorder: Arc<EventRecorder>,
        cfg: Config,
    ) -> Self {
        Self { telemetry, actuator, clock, recorder, cfg, ctx: MissionContext::new() }
    }

    /// Run the whole mission. Returns after the sprint, or early with the
    /// error that aborted the run. The actuator is stopped on the failure
    /// path; the success path leaves it stopped after the sprint.
    pub fn run(&mut self) -> Result<()> {
        for encounter in 1..=ENCOUNTERS {
            self.set_state(encounter, MissionState::Search);
            let Some(color) = self.search(encounter) else {
                // Degraded completion: the search's blind advance stands in
                // for the approach, and the encounter counts without a
                // bypass.
                warn!("[mission] encounter {}: search degraded, moving on", encounter);
                self.ctx.detected_color = None;
                self.ctx.encounters_done[(encounter - 1) as usize] = true;
                self.ctx.reset_confirmation();
                continue;
            };

            info!("[mission] encounter {}: confirmed {}", encounter, color);
            self.recorder.record(MissionEvent::ColorConfirmed { color: color.clone() });
            self.ctx.detected_color = Some(color);

            self.set_state(encounter, MissionState::Approach);
            if let Err(e) = self.approach(encounter) {
                self.ctx.current_state = MissionState::Failed;
                self.actuator.stop_motor();
                return Err(e);
            }

            self.set_state(encounter, MissionState::Bypass);
            let direction =
                self.ctx.decide_bypass_direction(encounter, &self.cfg.left_turn_colors);
            self.recorder.record(MissionEvent::BypassStarted { direction });
            let plan = bypass_plan(
                direction,
                &self.cfg.bypass,
                self.cfg.turn_speed,
                self.cfg.forward_speed,
            );
            Sequencer::new(&self.actuator, &self.clock, &self.recorder).run(&plan);

            self.ctx.encounters_done[(encounter - 1) as usize] = true;
            self.ctx.reset_confirmation();
        }

        self.set_state(ENCOUNTERS, MissionState::Sprint);
        self.actuator.drive_straight(self.cfg.sprint_speed);
        self.clock.sleep(Duration::from_secs_f64(self.cfg.sprint_secs));
        self.actuator.stop_motor();

        self.ctx.current_state = MissionState::Done;
        self.recorder
            .record(MissionEvent::StateChanged { encounter: ENCOUNTERS, state: MissionState::Done });
        info!("[mission] done");
        Ok(())
    }

    fn set_state(&mut self, encounter: u8, state: MissionState) {
        info!("[mission] encounter {}: -> {:?}", encounter, state);
        self.ctx.current_state = state;
        self.recorder.record(MissionEvent::StateChanged { encounter, state });
    }

    /// Per-encounter search policy. The first cube sits straight ahead of
    /// the start line, so encounter 1 creeps forward and confirms on the
    /// move. Encounters 2 and 3 creep briefly and then sweep; encounter 2
    /// additionally dismisses boundary-touching runs, since the just-passed
    /// cube tends to linger at the frame edge after the bypass.
    fn search(&mut self, encounter: u8) -> Option<String> {
        match encounter {
            1 => {
                self.actuator.set_motor_speed(1.0, 1.0);
                self.clock.sleep(Duration::from_secs_f64(NUDGE_SECS));
                self.actuator.set_motor_speed(CREEP_SPEED, CREEP_SPEED);
                self.creeping_confirm(encounter)
            }
            2 => {
                self.telemetry.set_edge_dismiss(true);
                self.actuator.set_motor_speed(CREEP_SPEED, CREEP_SPEED);
                self.search_sweep(encounter)
            }
            _ => {
                self.telemetry.set_edge_dismiss(false);
                self.actuator.set_motor_speed(CREEP_SPEED, CREEP_SPEED);
                self.clock.sleep(Duration::from_secs_f64(NUDGE_SECS));
                self.search_sweep(encounter)
            }
        }
    }

    /// Creep forward until a color confirms. Bounded by the approach
    /// timeout; on expiry the search degrades and the encounter completes
    /// without a bypass.
    fn creeping_confirm(&mut self, encounter: u8) -> Option<String> {
        let tick = Duration::from_secs_f64(self.cfg.tick_secs);
        let limit = Duration::from_secs_f64(self.cfg.approach_timeout_secs);
        let start = self.clock.now();

        while self.clock.now() - start < limit {
            if let Some(color) = self.observe_once() {
                return Some(color);
            }
            self.clock.sleep(tick);
        }

        self.recorder.record(MissionEvent::SearchDegraded { encounter });
        None
    }

    /// Rotary sweep: counter-clockwise up to the sweep duration T, then
    /// clockwise up to 2T through the starting heading to the mirror
    /// extreme. A confirmation rotates back by the offset accumulated since
    /// the pre-sweep heading, so the approach starts roughly where the
    /// search began. A dry sweep recenters, advances blind, and degrades.
    fn search_sweep(&mut self, encounter: u8) -> Option<String> {
        let sweep = Duration::from_secs_f64(self.cfg.sweep_secs);

        if let Some((color, elapsed)) = self.sweep_leg(SpinDirection::CounterClockwise, sweep) {
            self.rotate_back(SpinDirection::Clockwise, elapsed);
            return Some(color);
        }
        if let Some((color, elapsed)) = self.sweep_leg(SpinDirection::Clockwise, sweep * 2) {
            // Net offset after T counter-clockwise then `elapsed` clockwise.
            if elapsed <= sweep {
                self.rotate_back(SpinDirection::Clockwise, sweep - elapsed);
            } else {
                self.rotate_back(SpinDirection::CounterClockwise, elapsed - sweep);
            }
            return Some(color);
        }

        // Back at the clockwise extreme; recenter before moving on.
        self.actuator.rotate_in_place(SpinDirection::CounterClockwise, self.cfg.search_speed);
        self.clock.sleep(sweep);

        self.recorder.record(MissionEvent::SearchDegraded { encounter });
        self.actuator.drive_straight(self.cfg.forward_speed);
        self.clock.sleep(Duration::from_secs_f64(DEGRADED_FORWARD_SECS));
        None
    }

    /// One rotating leg; on confirmation returns the color and how long the
    /// leg had been rotating.
    fn sweep_leg(&mut self, spin: SpinDirection, limit: Duration) -> Option<(String, Duration)> {
        let tick = Duration::from_secs_f64(self.cfg.tick_secs);
        self.actuator.rotate_in_place(spin, self.cfg.search_speed);

        let start = self.clock.now();
        while self.clock.now() - start < limit {
            self.clock.sleep(tick);
            if let Some(color) = self.observe_once() {
                return Some((color, self.clock.now() - start));
            }
        }
        None
    }

    /// Undo sweep rotation so the approach starts near the pre-sweep heading.
    fn rotate_back(&mut self, spin: SpinDirection, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        self.actuator.rotate_in_place(spin, self.cfg.search_speed);
        self.clock.sleep(duration);
    }

    /// One debounce tick against the latest color snapshot.
    fn observe_once(&mut self) -> Option<String> {
        let snapshot = self.telemetry.latest_segments();
        let widest = widest_color(&snapshot).map(|(color, _)| color);
        self.ctx.register_observation(widest, self.cfg.color_confirm_count)
    }

    /// Drive at the cube until the filtered range crosses the threshold.
    /// Steers at the widest run of the confirmed color while it is visible,
    /// otherwise holds straight. A run past the time bound is fatal.
    pub fn approach(&mut self, encounter: u8) -> Result<()> {
        let tick = Duration::from_secs_f64(self.cfg.tick_secs);
        let timeout = Duration::from_secs_f64(self.cfg.approach_timeout_secs);
        let start = self.clock.now();

        loop {
            let distance = self.telemetry.latest_distance_cm();
            if distance > 0.0 && distance <= self.cfg.distance_threshold_cm {
                self.recorder.record(MissionEvent::ApproachReached { distance_cm: distance });
                return Ok(());
            }
            if self.clock.now() - start >= timeout {
                return Err(CubebotError::ApproachTimeout(
                    self.cfg.approach_timeout_secs,
                    encounter,
                ));
            }

            let snapshot = self.telemetry.latest_segments();
            let target = self
                .ctx
                .detected_color
                .as_deref()
                .and_then(|color| snapshot.get(color))
                .and_then(|segments| segments.iter().max_by_key(|s| s.width()))
                .map(|s| s.center_rel);
            match target {
                Some(center) => self.actuator.drive_with_color(center, self.cfg.forward_speed),
                None => self.actuator.drive_straight(self.cfg.forward_speed),
            }

            self.clock.sleep(tick);
        }
    }
}
