//! Training plan definitions.
//!
//! A `SessionPlan` is immutable once selected. Its serialized shape matches the
//! catalog files: `{ "warmup": 180, "cooldown": 180, "intervals": { "run": 30, "walk": 30, "reps": 15 } }`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejections raised when a plan is selected, never mid-run.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    #[error("warm-up must last at least one second")]
    ZeroWarmup,

    #[error("cool-down must last at least one second")]
    ZeroCooldown,

    #[error("run intervals must last at least one second")]
    ZeroRun,

    #[error("a plan needs at least one repetition")]
    NoRepetitions,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Intervals {
    #[serde(rename = "run")]
    pub run_seconds: u32,
    /// Zero means the plan has no walk phase.
    #[serde(rename = "walk")]
    pub walk_seconds: u32,
    #[serde(rename = "reps")]
    pub repetitions: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionPlan {
    #[serde(rename = "warmup")]
    pub warmup_seconds: u32,
    #[serde(rename = "cooldown")]
    pub cooldown_seconds: u32,
    pub intervals: Intervals,
}

impl SessionPlan {
    pub fn new(
        warmup_seconds: u32,
        cooldown_seconds: u32,
        run_seconds: u32,
        walk_seconds: u32,
        repetitions: u32,
    ) -> Result<Self, PlanError> {
        let plan = Self {
            warmup_seconds,
            cooldown_seconds,
            intervals: Intervals {
                run_seconds,
                walk_seconds,
                repetitions,
            },
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Plans loaded through serde bypass `new`, so selection re-checks them here.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.warmup_seconds == 0 {
            return Err(PlanError::ZeroWarmup);
        }
        if self.cooldown_seconds == 0 {
            return Err(PlanError::ZeroCooldown);
        }
        if self.intervals.run_seconds == 0 {
            return Err(PlanError::ZeroRun);
        }
        if self.intervals.repetitions == 0 {
            return Err(PlanError::NoRepetitions);
        }
        Ok(())
    }

    pub fn has_walk(&self) -> bool {
        self.intervals.walk_seconds > 0
    }
}
