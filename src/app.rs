use std::sync::Arc;

use anyhow::Result;
use log::info;
use thiserror::Error;

use crate::{
    audio::Cues,
    catalog::Catalog,
    models::PlanError,
    timer::{state::clamp_cadence, SessionController},
};

/// Builds a fresh cue backend for every selected session, so the audio device
/// is only held while a session is open.
pub type CuesFactory = Box<dyn Fn() -> Arc<dyn Cues> + Send + Sync>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectError {
    #[error("there is no plan number {}", .0 + 1)]
    UnknownPlan(usize),

    #[error("plan {} cannot be started: {source}", .index + 1)]
    InvalidPlan {
        index: usize,
        #[source]
        source: PlanError,
    },
}

struct ActiveSession {
    index: usize,
    controller: SessionController,
}

/// Catalog screen plus at most one open session.
pub struct WorkoutApp {
    catalog: Catalog,
    cues_factory: CuesFactory,
    default_cadence: u32,
    active: Option<ActiveSession>,
}

impl WorkoutApp {
    pub fn new(catalog: Catalog, default_cadence: u32, cues_factory: CuesFactory) -> Self {
        Self {
            catalog,
            cues_factory,
            default_cadence: clamp_cadence(default_cadence),
            active: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn default_cadence(&self) -> u32 {
        self.default_cadence
    }

    /// Cadence the next selected session starts with.
    pub fn set_default_cadence(&mut self, bpm: u32) {
        self.default_cadence = clamp_cadence(bpm);
    }

    /// Opens the plan at `index`, closing any session already open. Invalid
    /// plans are refused here and never reach the timer.
    pub async fn select_plan(&mut self, index: usize) -> Result<&SessionController, SelectError> {
        let plan = *self
            .catalog
            .get(index)
            .ok_or(SelectError::UnknownPlan(index))?;
        plan.validate()
            .map_err(|source| SelectError::InvalidPlan { index, source })?;

        if let Err(err) = self.back().await {
            log::warn!("previous session did not shut down cleanly: {err:#}");
        }

        let controller = SessionController::spawn(plan, self.default_cadence, (self.cues_factory)())
            .map_err(|source| SelectError::InvalidPlan { index, source })?;
        info!("Opened plan {}", index + 1);

        let active = self.active.insert(ActiveSession { index, controller });
        Ok(&active.controller)
    }

    pub fn session(&self) -> Option<&SessionController> {
        self.active.as_ref().map(|active| &active.controller)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.index)
    }

    /// Discards the open session, if any, and returns to the catalog.
    pub async fn back(&mut self) -> Result<()> {
        match self.active.take() {
            Some(active) => {
                info!("Closing plan {}", active.index + 1);
                active.controller.shutdown().await
            }
            None => Ok(()),
        }
    }
}
