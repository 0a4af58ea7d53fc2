//! Mission sequencing: state bookkeeping, timed bypass maneuvers, and the
//! top-level run loop.

pub mod bypass;
pub mod clock;
pub mod runner;

use std::collections::HashMap;

use crate::telemetry::ColorSnapshot;

pub const ENCOUNTERS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionState {
    Search,
    Approach,
    Bypass,
    Sprint,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassDirection {
    Left,
    Right,
}

impl BypassDirection {
    pub fn opposite(self) -> Self {
        match self {
            BypassDirection::Left => BypassDirection::Right,
            BypassDirection::Right => BypassDirection::Left,
        }
    }
}

/// Mission-loop-private bookkeeping. Only the mission thread touches this.
#[derive(Debug)]
pub struct MissionContext {
    pub current_state: MissionState,
    pub detected_color: Option<String>,
    color_confirm: HashMap<String, u32>,
    pub last_bypass_direction: Option<BypassDirection>,
    pub encounters_done: [bool; ENCOUNTERS as usize],
}

impl Default for MissionContext {
    fn default() -> Self {
        Self {
            current_state: MissionState::Search,
            detected_color: None,
            color_confirm: HashMap::new(),
            last_bypass_direction: None,
            encounters_done: [false; ENCOUNTERS as usize],
        }
    }
}

impl MissionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Debounce step: feed one tick's widest-color observation. Returns the
    /// color once it has been the widest for `confirm_count` consecutive
    /// ticks. Any interruption (different widest color, or an empty
    /// snapshot) resets the counters involved.
    pub fn register_observation(
        &mut self,
        widest: Option<&str>,
        confirm_count: u32,
    ) -> Option<String> {
        let Some(color) = widest else {
            self.color_confirm.clear();
            return None;
        };

        *self.color_confirm.entry(color.to_string()).or_insert(0) += 1;
        for (name, count) in self.color_confirm.iter_mut() {
            if name != color {
                *count = 0;
            }
        }

        if self.color_confirm.get(color).copied().unwrap_or(0) >= confirm_count {
            Some(color.to_string())
        } else {
            None
        }
    }

    pub fn reset_confirmation(&mut self) {
        self.color_confirm.clear();
    }

    /// Bypass direction policy. Encounters 1 and 3 go left when the
    /// confirmed color is in `left_set`, otherwise right; encounter 2 takes
    /// the opposite of the previous bypass. The chosen direction is stored
    /// as the new "previous".
    pub fn decide_bypass_direction(&mut self, encounter: u8, left_set: &[String]) -> BypassDirection {
        let direction = if encounter == 2 {
            match self.last_bypass_direction {
                Some(prev) => prev.opposite(),
                None => BypassDirection::Left,
            }
        } else {
            let by_color = self
                .detected_color
                .as_deref()
                .is_some_and(|c| left_set.iter().any(|l| l == c));
            if by_color {
                BypassDirection::Left
            } else {
                BypassDirection::Right
            }
        };

        self.last_bypass_direction = Some(direction);
        direction
    }
}

/// The widest segment's color across all colors in a snapshot, with the
/// widest segment's center offset. `None` for an empty snapshot.
pub fn widest_color(snapshot: &ColorSnapshot) -> Option<(&str, i32)> {
    let mut best: Option<(&str, i32, i32)> = None;
    for (color, segments) in snapshot {
        for segment in segments {
            let width = segment.width();
            if best.is_none_or(|(_, w, _)| width > w) {
                best = Some((color, width, segment.center_rel));
            }
        }
    }
    best.map(|(color, _, center)| (color, center))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::color::ColorSegment;

    fn seg(start: i32, end: i32) -> ColorSegment {
        ColorSegment { start_rel: start, end_rel: end, center_rel: (start + end) / 2 }
    }

    #[test]
    fn confirmation_requires_three_consecutive_ticks() {
        let mut ctx = MissionContext::new();

        // Two reds, one blue, then three reds: the interruption resets the
        // red counter, so only the third red of the second run confirms.
        assert_eq!(ctx.register_observation(Some("red"), 3), None);
        assert_eq!(ctx.register_observation(Some("red"), 3), None);
        assert_eq!(ctx.register_observation(Some("blue"), 3), None);
        assert_eq!(ctx.register_observation(Some("red"), 3), None);
        assert_eq!(ctx.register_observation(Some("red"), 3), None);
        assert_eq!(ctx.register_observation(Some("red"), 3), Some("red".to_string()));
    }

    #[test]
    fn empty_snapshot_clears_all_counters() {
        let mut ctx = MissionContext::new();
        ctx.register_observation(Some("red"), 3);
        ctx.register_observation(Some("red"), 3);
        ctx.register_observation(None, 3);
        assert_eq!(ctx.register_observation(Some("red"), 3), None);
    }

    #[test]
    fn widest_color_picks_across_colors() {
        let mut snapshot = ColorSnapshot::new();
        snapshot.insert("red".into(), vec![seg(-50, -10)]);
        snapshot.insert("green".into(), vec![seg(0, 20), seg(30, 120)]);
        let (color, center) = widest_color(&snapshot).unwrap();
        assert_eq!(color, "green");
        assert_eq!(center, 75);

        assert!(widest_color(&ColorSnapshot::new()).is_none());
    }

    #[test]
    fn bypass_direction_by_color_then_opposite_then_by_color() {
        let left_set = vec!["red".to_string(), "yellow".to_string()];
        let mut ctx = MissionContext::new();

        ctx.detected_color = Some("red".into());
        assert_eq!(ctx.decide_bypass_direction(1, &left_set), BypassDirection::Left);

        // Encounter 2 toggles regardless of color.
        ctx.detected_color = Some("yellow".into());
        assert_eq!(ctx.decide_bypass_direction(2, &left_set), BypassDirection::Right);

        ctx.detected_color = Some("blue".into());
        assert_eq!(ctx.decide_bypass_direction(3, &left_set), BypassDirection::Right);
    }

    #[test]
    fn unconfirmed_color_defaults_right() {
        let left_set = vec!["red".to_string(), "yellow".to_string()];
        let mut ctx = MissionContext::new();
        ctx.detected_color = None;
        assert_eq!(ctx.decide_bypass_direction(1, &left_set), BypassDirection::Right);
    }
}
