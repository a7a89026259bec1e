use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::models::SessionPlan;

use super::phase::{next_phase, Phase, PhaseStep};

pub const MIN_CADENCE_BPM: u32 = 165;
pub const MAX_CADENCE_BPM: u32 = 180;
pub const DEFAULT_CADENCE_BPM: u32 = 170;

pub fn clamp_cadence(bpm: u32) -> u32 {
    bpm.clamp(MIN_CADENCE_BPM, MAX_CADENCE_BPM)
}

/// Mutable progress of one selected plan. Only the session controller writes to it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRunState {
    pub session_id: String,
    pub phase: Phase,
    /// 0 outside run/walk, otherwise 1..=repetitions.
    pub repetition: u32,
    pub time_left_seconds: u32,
    pub phase_duration_seconds: u32,
    pub is_running: bool,
    pub cadence_bpm: u32,
    /// Wall-clock time of the first start since selection or the last reset.
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionRunState {
    pub fn new(session_id: String, plan: &SessionPlan, cadence_bpm: u32) -> Self {
        Self {
            session_id,
            phase: Phase::Warmup,
            repetition: 0,
            time_left_seconds: plan.warmup_seconds,
            phase_duration_seconds: plan.warmup_seconds,
            is_running: false,
            cadence_bpm: clamp_cadence(cadence_bpm),
            started_at: None,
        }
    }

    /// Back to the warm-up countdown. Cadence is a user preference and survives.
    pub fn reset(&mut self, plan: &SessionPlan) {
        let cadence_bpm = self.cadence_bpm;
        *self = Self::new(std::mem::take(&mut self.session_id), plan, cadence_bpm);
    }

    /// Returns whether the run flag changed.
    pub fn start(&mut self, plan: &SessionPlan, now: DateTime<Utc>) -> bool {
        if self.phase == Phase::Finished {
            self.reset(plan);
        } else if self.is_running {
            return false;
        }

        self.is_running = true;
        self.started_at.get_or_insert(now);
        true
    }

    /// Returns whether the run flag changed.
    pub fn pause(&mut self) -> bool {
        std::mem::replace(&mut self.is_running, false)
    }

    /// Stores the clamped cadence and returns whether it differs from the old one.
    pub fn set_cadence(&mut self, bpm: u32) -> bool {
        let bpm = clamp_cadence(bpm);
        std::mem::replace(&mut self.cadence_bpm, bpm) != bpm
    }

    /// One second of countdown. Returns the step taken when the phase expired.
    pub fn tick(&mut self, plan: &SessionPlan) -> Option<PhaseStep> {
        if !self.is_running {
            return None;
        }
        debug_assert!(self.time_left_seconds > 0, "running countdown already at zero");

        self.time_left_seconds = self.time_left_seconds.saturating_sub(1);
        if self.time_left_seconds > 0 {
            return None;
        }

        let step = next_phase(plan, self.phase, self.repetition)?;
        self.phase = step.phase;
        self.repetition = step.repetition;
        match step.duration_seconds {
            Some(duration) => {
                self.phase_duration_seconds = duration;
                self.time_left_seconds = duration;
            }
            None => self.is_running = false,
        }

        self.debug_check_invariants();
        Some(step)
    }

    /// The metronome only sounds while actually running a run interval.
    pub fn cadence_active(&self) -> bool {
        self.is_running && self.phase == Phase::Run
    }

    pub fn cadence_period(&self) -> Duration {
        Duration::from_micros(60_000_000 / u64::from(self.cadence_bpm))
    }

    /// Sweep fraction of the progress ring.
    pub fn progress(&self) -> f64 {
        if self.phase_duration_seconds == 0 {
            return 0.0;
        }
        f64::from(self.time_left_seconds) / f64::from(self.phase_duration_seconds)
    }

    fn debug_check_invariants(&self) {
        debug_assert!(self.phase_duration_seconds > 0);
        debug_assert!(self.time_left_seconds <= self.phase_duration_seconds);
        debug_assert!(self.phase.counts_repetitions() || self.repetition == 0);
        debug_assert!(self.phase != Phase::Finished || !self.is_running);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::phase::WALK_CUE;

    fn state_for(plan: &SessionPlan) -> SessionRunState {
        SessionRunState::new("test-session".into(), plan, DEFAULT_CADENCE_BPM)
    }

    /// Runs `ticks` seconds and returns the cues emitted along the way.
    fn run_ticks(state: &mut SessionRunState, plan: &SessionPlan, ticks: u32) -> Vec<&'static str> {
        (0..ticks)
            .filter_map(|_| state.tick(plan).and_then(|step| step.cue))
            .collect()
    }

    #[test]
    fn new_state_waits_in_warmup() {
        let plan = SessionPlan::new(180, 180, 30, 30, 2).unwrap();
        let state = state_for(&plan);
        assert_eq!(state.phase, Phase::Warmup);
        assert_eq!(state.repetition, 0);
        assert_eq!(state.time_left_seconds, 180);
        assert_eq!(state.phase_duration_seconds, 180);
        assert!(!state.is_running);
        assert_eq!(state.progress(), 1.0);
    }

    #[test]
    fn ticks_are_ignored_while_paused() {
        let plan = SessionPlan::new(180, 180, 30, 30, 2).unwrap();
        let mut state = state_for(&plan);
        assert!(state.tick(&plan).is_none());
        assert_eq!(state.time_left_seconds, 180);
    }

    #[test]
    fn walk_plan_walkthrough() {
        let plan = SessionPlan::new(180, 180, 30, 30, 2).unwrap();
        let mut state = state_for(&plan);
        assert!(state.start(&plan, Utc::now()));

        assert!(run_ticks(&mut state, &plan, 179).is_empty());
        assert_eq!((state.phase, state.time_left_seconds), (Phase::Warmup, 1));
        run_ticks(&mut state, &plan, 1);
        assert_eq!((state.phase, state.repetition, state.time_left_seconds), (Phase::Run, 1, 30));

        assert_eq!(run_ticks(&mut state, &plan, 30), vec![WALK_CUE]);
        assert_eq!((state.phase, state.repetition, state.time_left_seconds), (Phase::Walk, 1, 30));

        assert!(run_ticks(&mut state, &plan, 30).is_empty());
        assert_eq!((state.phase, state.repetition, state.time_left_seconds), (Phase::Run, 2, 30));

        assert_eq!(run_ticks(&mut state, &plan, 30), vec![WALK_CUE]);
        assert_eq!((state.phase, state.repetition), (Phase::Walk, 2));

        run_ticks(&mut state, &plan, 30);
        assert_eq!((state.phase, state.repetition, state.time_left_seconds), (Phase::Cooldown, 0, 180));

        run_ticks(&mut state, &plan, 180);
        assert_eq!(state.phase, Phase::Finished);
        assert!(!state.is_running);
        assert_eq!(state.time_left_seconds, 0);

        // No further transitions once finished.
        assert!(state.tick(&plan).is_none());
    }

    #[test]
    fn single_long_run_skips_walk() {
        let plan = SessionPlan::new(180, 180, 900, 0, 1).unwrap();
        let mut state = state_for(&plan);
        state.start(&plan, Utc::now());

        run_ticks(&mut state, &plan, 180);
        assert_eq!((state.phase, state.repetition, state.time_left_seconds), (Phase::Run, 1, 900));

        let cues = run_ticks(&mut state, &plan, 900);
        assert!(cues.is_empty());
        assert_eq!((state.phase, state.time_left_seconds), (Phase::Cooldown, 180));
    }

    #[test]
    fn time_left_never_increases_within_a_phase() {
        let plan = SessionPlan::new(5, 4, 3, 2, 3).unwrap();
        let mut state = state_for(&plan);
        state.start(&plan, Utc::now());

        let mut previous = (state.phase, state.repetition, state.time_left_seconds);
        while state.is_running {
            let transitioned = state.tick(&plan).is_some();
            let current = (state.phase, state.repetition, state.time_left_seconds);
            if transitioned {
                if state.phase != Phase::Finished {
                    assert_eq!(state.time_left_seconds, state.phase_duration_seconds);
                }
            } else {
                assert_eq!(current.2 + 1, previous.2);
            }
            previous = current;
        }
        assert_eq!(state.phase, Phase::Finished);
    }

    #[test]
    fn reset_from_anywhere_is_identical() {
        let plan = SessionPlan::new(10, 10, 5, 5, 3).unwrap();
        let initial = state_for(&plan);

        for ticks in [0, 3, 10, 12, 17, 31, 50, 200] {
            let mut state = state_for(&plan);
            state.start(&plan, Utc::now());
            run_ticks(&mut state, &plan, ticks);
            state.reset(&plan);
            assert_eq!(state, initial, "after {ticks} ticks");
        }
    }

    #[test]
    fn start_after_finish_restarts_warmup() {
        let plan = SessionPlan::new(2, 2, 2, 0, 1).unwrap();
        let mut state = state_for(&plan);
        state.start(&plan, Utc::now());
        run_ticks(&mut state, &plan, 6);
        assert_eq!(state.phase, Phase::Finished);

        assert!(state.start(&plan, Utc::now()));
        assert_eq!(state.phase, Phase::Warmup);
        assert_eq!(state.time_left_seconds, 2);
        assert!(state.is_running);
    }

    #[test]
    fn start_twice_is_a_no_op() {
        let plan = SessionPlan::new(10, 10, 5, 5, 1).unwrap();
        let mut state = state_for(&plan);
        assert!(state.start(&plan, Utc::now()));
        let started_at = state.started_at;
        assert!(!state.start(&plan, Utc::now()));
        assert_eq!(state.started_at, started_at);
    }

    #[test]
    fn pause_preserves_position() {
        let plan = SessionPlan::new(10, 10, 5, 5, 2).unwrap();
        let mut state = state_for(&plan);
        state.start(&plan, Utc::now());
        run_ticks(&mut state, &plan, 13);
        let before = (state.phase, state.repetition, state.time_left_seconds);

        assert!(state.pause());
        assert!(!state.pause());
        run_ticks(&mut state, &plan, 5);
        assert_eq!((state.phase, state.repetition, state.time_left_seconds), before);
    }

    #[test]
    fn cadence_is_clamped_and_only_active_when_running() {
        let plan = SessionPlan::new(1, 10, 5, 5, 1).unwrap();
        let mut state = state_for(&plan);
        assert!(state.set_cadence(200));
        assert_eq!(state.cadence_bpm, MAX_CADENCE_BPM);
        assert!(!state.set_cadence(190));
        state.set_cadence(100);
        assert_eq!(state.cadence_bpm, MIN_CADENCE_BPM);

        state.start(&plan, Utc::now());
        assert!(!state.cadence_active());
        state.tick(&plan);
        assert_eq!(state.phase, Phase::Run);
        assert!(state.cadence_active());
        state.pause();
        assert!(!state.cadence_active());
    }

    #[test]
    fn cadence_period_follows_bpm() {
        let plan = SessionPlan::new(1, 1, 1, 0, 1).unwrap();
        let mut state = state_for(&plan);
        state.set_cadence(180);
        assert_eq!(state.cadence_period(), Duration::from_micros(333_333));
        state.set_cadence(165);
        assert_eq!(state.cadence_period(), Duration::from_micros(363_636));
    }

    #[test]
    fn serializes_for_front_ends() {
        let plan = SessionPlan::new(180, 180, 30, 30, 2).unwrap();
        let json = serde_json::to_value(state_for(&plan)).unwrap();
        assert_eq!(json["phase"], "warmup");
        assert_eq!(json["timeLeftSeconds"], 180);
        assert_eq!(json["cadenceBpm"], DEFAULT_CADENCE_BPM);
        assert_eq!(json["isRunning"], false);
    }
}
