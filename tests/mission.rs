//! End-to-end mission runs under test time: a scripted telemetry feed and a
//! mock clock drive the state machine without threads or real hardware.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cubebot::config::Config;
use cubebot::hw::mock::{MockDriveTrain, MockEncoder};
use cubebot::mission::clock::{Clock, MockClock};
use cubebot::mission::runner::MissionRunner;
use cubebot::mission::{BypassDirection, MissionState};
use cubebot::motion::actuator::MotionActuator;
use cubebot::recorder::EventRecorder;
use cubebot::sensing::color::ColorSegment;
use cubebot::telemetry::{ColorSnapshot, TelemetrySource, WheelSpeeds};

const TICK_MS: u64 = 100;

/// Telemetry scripted against the mock clock: a green cube dead ahead, and
/// a range that drops below the threshold at a chosen tick.
struct ScriptedTelemetry {
    clock: Arc<MockClock>,
    near_from_tick: u64,
}

impl ScriptedTelemetry {
    fn tick(&self) -> u64 {
        self.clock.now().as_millis() as u64 / TICK_MS
    }
}

impl TelemetrySource for ScriptedTelemetry {
    fn latest_segments(&self) -> ColorSnapshot {
        let mut snapshot = ColorSnapshot::new();
        snapshot.insert(
            "green".into(),
            vec![ColorSegment { start_rel: -40, end_rel: 40, center_rel: 0 }],
        );
        snapshot
    }

    fn latest_distance_cm(&self) -> f32 {
        if self.tick() >= self.near_from_tick { 50.0 } else { 100.0 }
    }

    fn wheel_speeds(&self) -> WheelSpeeds {
        WheelSpeeds::default()
    }

    fn set_edge_dismiss(&self, _on: bool) {}
}

fn test_rig(
    near_from_tick: u64,
) -> (MissionRunner<ScriptedTelemetry, Arc<MockClock>>, Arc<MockClock>, Arc<EventRecorder>) {
    let clock = Arc::new(MockClock::new());
    let telemetry = Arc::new(ScriptedTelemetry { clock: clock.clone(), near_from_tick });

    let encoder = Arc::new(MockEncoder::new());
    let drive = Arc::new(MockDriveTrain::new(encoder));
    let actuator = Arc::new(MotionActuator::new(drive, Config::default()));
    let recorder = Arc::new(EventRecorder::new());

    let runner = MissionRunner::new(
        telemetry,
        actuator,
        clock.clone(),
        recorder.clone(),
        Config::default(),
    );
    (runner, clock, recorder)
}

#[test]
fn approach_hands_off_on_the_exact_threshold_tick() {
    let (mut runner, clock, _) = test_rig(12);

    // The range feed reads 100cm for ticks 0..=11 and 50cm from tick 12.
    runner.approach(1).unwrap();

    assert_eq!(clock.now(), Duration::from_millis(12 * TICK_MS));
}

#[test]
fn full_run_completes_and_alternates_bypass_directions() {
    let (mut runner, _clock, recorder) = test_rig(0);

    // Drain the event queue through the real CSV exporter and read it back.
    let running = Arc::new(AtomicBool::new(true));
    let log_path = std::env::temp_dir().join("cubebot_test_mission_events.csv");
    let exporter = recorder.start_exporter(log_path.clone(), running.clone());

    runner.run().unwrap();

    running.store(false, Ordering::Release);
    exporter.join().unwrap();

    assert_eq!(runner.ctx.current_state, MissionState::Done);
    assert_eq!(runner.ctx.encounters_done, [true, true, true]);
    assert_eq!(runner.ctx.detected_color.as_deref(), Some("green"));

    // Green is not a left-turn color: encounter 1 goes right, encounter 2
    // takes the opposite, encounter 3 decides by color again.
    let log = std::fs::read_to_string(&log_path).unwrap();
    let directions: Vec<&str> = log
        .lines()
        .filter(|l| l.contains("bypass_started"))
        .map(|l| l.split(',').nth(2).unwrap())
        .collect();
    assert_eq!(directions, vec!["Right", "Left", "Right"]);
    assert_eq!(runner.ctx.last_bypass_direction, Some(BypassDirection::Right));

    let _ = std::fs::remove_file(&log_path);
}
