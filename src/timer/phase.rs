use serde::Serialize;

use crate::models::SessionPlan;

/// Spoken when a run hands over to a walk.
pub const WALK_CUE: &str = "Marchez";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Warmup,
    Run,
    Walk,
    Cooldown,
    Finished,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Warmup
    }
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Warmup => "warmup",
            Phase::Run => "run",
            Phase::Walk => "walk",
            Phase::Cooldown => "cooldown",
            Phase::Finished => "finished",
        }
    }

    /// Whether the repetition counter means anything in this phase.
    pub fn counts_repetitions(&self) -> bool {
        matches!(self, Phase::Run | Phase::Walk)
    }
}

/// Result of leaving a phase whose countdown expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseStep {
    pub phase: Phase,
    pub repetition: u32,
    /// `None` once the session is finished and the countdown stops.
    pub duration_seconds: Option<u32>,
    pub cue: Option<&'static str>,
}

impl PhaseStep {
    fn enter(phase: Phase, repetition: u32, duration_seconds: u32) -> Self {
        Self {
            phase,
            repetition,
            duration_seconds: Some(duration_seconds),
            cue: None,
        }
    }
}

/// Sequencing table for a session. Returns `None` from `Finished`.
///
/// Walk-less plans count a repetition when one run chains into the next; plans
/// with a walk count it when the walk hands back to a run.
pub fn next_phase(plan: &SessionPlan, phase: Phase, repetition: u32) -> Option<PhaseStep> {
    let intervals = &plan.intervals;
    let last_repetition = repetition >= intervals.repetitions;

    let step = match phase {
        Phase::Warmup => PhaseStep::enter(Phase::Run, 1, intervals.run_seconds),
        Phase::Run if plan.has_walk() => PhaseStep {
            cue: Some(WALK_CUE),
            ..PhaseStep::enter(Phase::Walk, repetition, intervals.walk_seconds)
        },
        Phase::Run | Phase::Walk if !last_repetition => {
            PhaseStep::enter(Phase::Run, repetition + 1, intervals.run_seconds)
        }
        Phase::Run | Phase::Walk => PhaseStep::enter(Phase::Cooldown, 0, plan.cooldown_seconds),
        Phase::Cooldown => PhaseStep {
            phase: Phase::Finished,
            repetition: 0,
            duration_seconds: None,
            cue: None,
        },
        Phase::Finished => return None,
    };

    Some(step)
}
