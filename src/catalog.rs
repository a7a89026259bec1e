use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::{fs, path::Path};

use crate::models::{Intervals, SessionPlan};

const WARMUP_SECONDS: u32 = 180;
const COOLDOWN_SECONDS: u32 = 180;

const fn plan(run_seconds: u32, walk_seconds: u32, repetitions: u32) -> SessionPlan {
    SessionPlan {
        warmup_seconds: WARMUP_SECONDS,
        cooldown_seconds: COOLDOWN_SECONDS,
        intervals: Intervals {
            run_seconds,
            walk_seconds,
            repetitions,
        },
    }
}

/// Progressive programme, from short runs with long walks to continuous runs.
pub const BUILTIN_PLANS: [SessionPlan; 16] = [
    plan(10, 50, 15),
    plan(20, 40, 15),
    plan(30, 30, 15),
    plan(30, 30, 20),
    plan(40, 20, 15),
    plan(40, 20, 20),
    plan(60, 30, 10),
    plan(60, 30, 12),
    plan(120, 60, 5),
    plan(180, 60, 4),
    plan(240, 60, 4),
    plan(360, 60, 3),
    plan(480, 60, 2),
    plan(600, 60, 2),
    plan(900, 0, 1),
    plan(1200, 0, 1),
];

/// Ordered, read-only list of plans offered for selection.
#[derive(Debug, Clone)]
pub struct Catalog {
    plans: Vec<SessionPlan>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            plans: BUILTIN_PLANS.to_vec(),
        }
    }

    pub fn from_plans(plans: Vec<SessionPlan>) -> Self {
        Self { plans }
    }

    /// Reads a JSON array of plans. Entries are only validated when selected.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog from {}", path.display()))?;
        let plans: Vec<SessionPlan> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
        let catalog = Self { plans };
        if catalog.is_empty() {
            bail!("Catalog {} contains no plans", path.display());
        }

        for (index, plan) in catalog.iter().enumerate() {
            if let Err(err) = plan.validate() {
                warn!("Catalog entry {} in {} cannot be started: {err}", index + 1, path.display());
            }
        }
        info!("Loaded {} plans from {}", catalog.len(), path.display());

        Ok(catalog)
    }

    /// Uses the file at `path` when given, the built-in programme otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn get(&self, index: usize) -> Option<&SessionPlan> {
        self.plans.get(index)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionPlan> {
        self.plans.iter()
    }
}
