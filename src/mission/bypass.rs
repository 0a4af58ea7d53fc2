//! bypass.rs
//! Rectangular open-loop detour around a confirmed cube.
//!
//! A bypass is a fixed plan of timed legs: turn away, clear the cube along
//! the short side, counter-turn back to the original heading, cross the long
//! side past the cube, then a slow stabilize leg to settle both PIDs before
//! the next encounter's search begins.

use std::time::Duration;

use log::info;

use crate::config::BypassTimings;
use crate::hw::SpinDirection;
use crate::mission::BypassDirection;
use crate::mission::clock::Clock;
use crate::motion::actuator::MotionActuator;
use crate::recorder::{EventRecorder, MissionEvent};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimedAction {
    Rotate { direction: SpinDirection, speed: f64 },
    Straight { speed: f64 },
    Wheels { left: f64, right: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedLeg {
    pub action: TimedAction,
    pub duration: Duration,
    pub description: &'static str,
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

/// Build the five-leg detour plan for one direction. Turn legs use
/// per-direction durations because the drive train does not respond
/// symmetrically.
pub fn bypass_plan(
    direction: BypassDirection,
    timings: &BypassTimings,
    turn_speed: f64,
    forward_speed: f64,
) -> Vec<TimedLeg> {
    let (out_secs, back_secs) = timings.turns(direction);
    let (out_spin, back_spin) = match direction {
        BypassDirection::Left => (SpinDirection::CounterClockwise, SpinDirection::Clockwise),
        BypassDirection::Right => (SpinDirection::Clockwise, SpinDirection::CounterClockwise),
    };

    vec![
        TimedLeg {
            action: TimedAction::Rotate { direction: out_spin, speed: turn_speed },
            duration: secs(out_secs),
            description: "turn_out",
        },
        TimedLeg {
            action: TimedAction::Straight { speed: forward_speed },
            duration: secs(timings.side_short),
            description: "side_short",
        },
        TimedLeg {
            action: TimedAction::Rotate { direction: back_spin, speed: turn_speed },
            duration: secs(back_secs),
            description: "turn_back",
        },
        TimedLeg {
            action: TimedAction::Straight { speed: forward_speed },
            duration: secs(timings.side_long),
            description: "side_long",
        },
        TimedLeg {
            action: TimedAction::Wheels {
                left: timings.stabilize_speed,
                right: timings.stabilize_speed,
            },
            duration: secs(timings.stabilize),
            description: "stabilize",
        },
    ]
}

/// Runs a timed plan against the actuator, one leg at a time.
pub struct Sequencer<'a, C: Clock> {
    actuator: &'a MotionActuator,
    clock: &'a C,
    recorder: &'a EventRecorder,
}

impl<'a, C: Clock> Sequencer<'a, C> {
    pub fn new(actuator: &'a MotionActuator, clock: &'a C, recorder: &'a EventRecorder) -> Self {
        Self { actuator, clock, recorder }
    }

    pub fn run(&self, plan: &[TimedLeg]) {
        for (index, leg) in plan.iter().enumerate() {
            info!("[bypass] leg {} {} for {:?}", index, leg.description, leg.duration);
            self.recorder.record(MissionEvent::BypassLeg { index, description: leg.description });

            match leg.action {
                TimedAction::Rotate { direction, speed } => {
                    self.actuator.rotate_in_place(direction, speed)
                }
                TimedAction::Straight { speed } => self.actuator.drive_straight(speed),
                TimedAction::Wheels { left, right } => self.actuator.set_motor_speed(left, right),
            }
            self.clock.sleep(leg.duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::hw::mock::{MockDriveTrain, MockEncoder};
    use crate::mission::clock::MockClock;
    use std::sync::Arc;

    #[test]
    fn left_plan_turns_counterclockwise_first() {
        let timings = BypassTimings::default();
        let plan = bypass_plan(BypassDirection::Left, &timings, 0.8, 1.0);
        assert_eq!(plan.len(), 5);
        assert_eq!(
            plan[0].action,
            TimedAction::Rotate { direction: SpinDirection::CounterClockwise, speed: 0.8 }
        );
        assert_eq!(plan[0].duration, Duration::from_secs_f64(0.45));
        assert_eq!(
            plan[2].action,
            TimedAction::Rotate { direction: SpinDirection::Clockwise, speed: 0.8 }
        );
        assert_eq!(plan[2].duration, Duration::from_secs_f64(0.35));
        assert_eq!(plan[4].action, TimedAction::Wheels { left: 0.5, right: 0.5 });
    }

    #[test]
    fn right_plan_uses_right_turn_durations() {
        let timings = BypassTimings::default();
        let plan = bypass_plan(BypassDirection::Right, &timings, 0.8, 1.0);
        assert_eq!(
            plan[0].action,
            TimedAction::Rotate { direction: SpinDirection::Clockwise, speed: 0.8 }
        );
        assert_eq!(plan[0].duration, Duration::from_secs_f64(0.25));
        assert_eq!(plan[1].duration, Duration::from_secs_f64(0.85));
        assert_eq!(plan[3].duration, Duration::from_secs_f64(3.0));
    }

    #[test]
    fn sequencer_consumes_the_whole_plan_in_plan_time() {
        let encoder = Arc::new(MockEncoder::new());
        let drive = Arc::new(MockDriveTrain::new(encoder));
        let actuator = MotionActuator::new(drive, Config::default());
        let clock = MockClock::new();
        let recorder = EventRecorder::new();

        let timings = BypassTimings::default();
        let plan = bypass_plan(BypassDirection::Left, &timings, 0.8, 1.0);
        let total: Duration = plan.iter().map(|l| l.duration).sum();

        Sequencer::new(&actuator, &clock, &recorder).run(&plan);

        assert_eq!(clock.now(), total);
        // Last leg's targets stay applied until the caller issues the next
        // command.
        assert_eq!(actuator.targets(), (0.5, 0.5));
    }
}
