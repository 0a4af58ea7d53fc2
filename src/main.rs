//! main.rs
//! Bench-top mission run against the mock hardware.
//!
//! Wires the mock camera, ranger, drive train, and encoders to the sensor
//! tasks and the PWM updater, runs the three-encounter mission, then tears
//! everything down: clear the running flag, join every task, and force the
//! drive to zero duty.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{error, info};

use cubebot::config::{Config, load_color_table};
use cubebot::error::{CubebotError, Result};
use cubebot::hw::mock::{MockCamera, MockDriveTrain, MockEncoder, MockUltrasonic};
use cubebot::hw::{Camera, Ultrasonic};
use cubebot::mission::clock::SystemClock;
use cubebot::mission::runner::MissionRunner;
use cubebot::motion::actuator::MotionActuator;
use cubebot::motion::updater::spawn_pwm_updater;
use cubebot::recorder::EventRecorder;
use cubebot::sensing::color::{ColorSegmenter, spawn_color_sampler};
use cubebot::sensing::range::spawn_range_sampler;
use cubebot::sensing::velocity::{VelocityEstimator, spawn_speed_monitor};
use cubebot::telemetry::TelemetryStore;

const THRESHOLD_FILE: &str = "hsv_thresholds.json";
const MISSION_LOG: &str = "mission_events.csv";

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("mission aborted: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cfg = Config::default();
    let table = load_color_table(std::path::Path::new(THRESHOLD_FILE));

    let running = Arc::new(AtomicBool::new(true));
    let store = Arc::new(TelemetryStore::new());
    let recorder = Arc::new(EventRecorder::new());

    // Mock rig: the drive train integrates applied duty into the encoder so
    // the PID loop has a plant to converge against.
    let encoder = Arc::new(MockEncoder::new());
    let drive = Arc::new(MockDriveTrain::new(encoder.clone()));

    // Probe both sensors once before spawning anything; a dead collaborator
    // at startup is fatal.
    let mut camera = Box::new(MockCamera::new(640, 480, [0, 255, 0]));
    if camera.capture_frame().is_none() {
        return Err(CubebotError::SensorUnavailable("camera produced no frame".into()));
    }
    let mut ranger = Box::new(MockUltrasonic::new(300.0));
    ranger
        .read_raw_distance()
        .map_err(|e| CubebotError::SensorUnavailable(format!("ultrasonic: {e}")))?;

    let actuator = Arc::new(MotionActuator::new(drive, cfg.clone()));
    let interval = Duration::from_secs_f64(cfg.sample_interval_secs);

    let segmenter = ColorSegmenter::new(table, cfg.band_row_fraction, cfg.band_height_px);
    let mut handles = vec![
        spawn_color_sampler(camera, segmenter, store.clone(), running.clone(), interval),
        spawn_range_sampler(ranger, store.clone(), recorder.clone(), running.clone(), interval),
        spawn_speed_monitor(
            VelocityEstimator::new(encoder),
            store.clone(),
            running.clone(),
            interval,
        ),
        spawn_pwm_updater(actuator.clone(), store.clone(), running.clone(), interval),
        recorder.start_exporter(PathBuf::from(MISSION_LOG), running.clone()),
    ];

    info!("mission start");
    let mut runner = MissionRunner::new(
        store,
        actuator.clone(),
        SystemClock::new(),
        recorder,
        cfg,
    );
    let outcome = runner.run();

    // Teardown runs on both paths and is idempotent.
    running.store(false, Ordering::Release);
    for handle in handles.drain(..) {
        if handle.join().is_err() {
            error!("a worker thread panicked during shutdown");
        }
    }
    actuator.stop_motor();

    outcome?;
    info!("mission complete, log at {}", MISSION_LOG);
    Ok(())
}
