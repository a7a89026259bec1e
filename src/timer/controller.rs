use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, Instant, Interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    audio::Cues,
    models::{PlanError, SessionPlan},
};

use super::state::SessionRunState;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

/// Read-only view handed to the presentation layer.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionRunState,
    pub plan: SessionPlan,
    /// Sweep fraction of the progress ring, `time_left / phase_duration`.
    pub progress: f64,
}

impl SessionSnapshot {
    fn of(state: &SessionRunState, plan: &SessionPlan) -> Self {
        Self {
            progress: state.progress(),
            state: state.clone(),
            plan: *plan,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ControlMessage {
    Start,
    Pause,
    Toggle,
    Reset,
    SetCadence(u32),
}

/// Handle on one running session.
///
/// The session itself lives in a single task that owns the run state, both
/// periodic timers and the cue backend. User intents are queued to that task,
/// so countdown ticks, metronome ticks and intents never interleave. Dropping
/// the handle tears the task down and releases the cue backend.
pub struct SessionController {
    commands: mpsc::UnboundedSender<ControlMessage>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    plan: SessionPlan,
}

impl SessionController {
    /// Validates `plan` and spawns the session task. Must be called inside a
    /// Tokio runtime.
    pub fn spawn(
        plan: SessionPlan,
        cadence_bpm: u32,
        cues: Arc<dyn Cues>,
    ) -> Result<Self, PlanError> {
        plan.validate()?;

        let state = SessionRunState::new(Uuid::new_v4().to_string(), &plan, cadence_bpm);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::of(&state, &plan));
        let (commands, command_rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();

        log_info!(
            "session {} selected: warmup {}s, {}x run {}s / walk {}s, cooldown {}s",
            state.session_id,
            plan.warmup_seconds,
            plan.intervals.repetitions,
            plan.intervals.run_seconds,
            plan.intervals.walk_seconds,
            plan.cooldown_seconds
        );

        let actor = SessionActor {
            plan,
            state,
            cues,
            countdown: None,
            cadence: None,
            snapshot_tx,
        };
        let handle = tokio::spawn(actor.run(command_rx, cancel_token.clone()));

        Ok(Self {
            commands,
            snapshot_rx,
            cancel_token,
            handle: Some(handle),
            plan,
        })
    }

    pub fn start(&self) -> Result<()> {
        self.send(ControlMessage::Start)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(ControlMessage::Pause)
    }

    /// Single start/pause button: pauses when running, starts otherwise.
    pub fn toggle(&self) -> Result<()> {
        self.send(ControlMessage::Toggle)
    }

    pub fn reset(&self) -> Result<()> {
        self.send(ControlMessage::Reset)
    }

    /// Clamped to 165..=180 bpm.
    pub fn set_cadence(&self, bpm: u32) -> Result<()> {
        self.send(ControlMessage::SetCadence(bpm))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receives a new snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    /// Stops both timers, waits for the session task and releases the cue backend.
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel_token.cancel();
        match self.handle.take() {
            Some(handle) => handle.await.context("session task failed to join"),
            None => Ok(()),
        }
    }

    fn send(&self, message: ControlMessage) -> Result<()> {
        self.commands
            .send(message)
            .map_err(|_| anyhow!("session has already been torn down"))
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

struct SessionActor {
    plan: SessionPlan,
    state: SessionRunState,
    cues: Arc<dyn Cues>,
    countdown: Option<Interval>,
    cadence: Option<Interval>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<ControlMessage>,
        cancel_token: CancellationToken,
    ) {
        loop {
            // Order matters: intents before countdown, countdown before the
            // metronome, so a transition out of `run` drops a pending click.
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                message = commands.recv() => match message {
                    Some(message) => self.handle(message),
                    None => break,
                },
                _ = next_tick(&mut self.countdown) => self.on_countdown_tick(),
                _ = next_tick(&mut self.cadence) => self.cues.tick(),
            }
        }

        self.countdown = None;
        self.cadence = None;
        log_info!("session {} torn down", self.state.session_id);
    }

    fn handle(&mut self, message: ControlMessage) {
        let mut rearm_cadence = false;
        let changed = match message {
            ControlMessage::Start => self.state.start(&self.plan, Utc::now()),
            ControlMessage::Pause => self.state.pause(),
            ControlMessage::Toggle if self.state.is_running => self.state.pause(),
            ControlMessage::Toggle => self.state.start(&self.plan, Utc::now()),
            ControlMessage::Reset => {
                self.state.reset(&self.plan);
                true
            }
            ControlMessage::SetCadence(bpm) => {
                rearm_cadence = self.state.set_cadence(bpm);
                rearm_cadence
            }
        };

        if changed {
            log_debug!(
                "session {}: {:?} -> running={} phase={} cadence={}",
                self.state.session_id,
                message,
                self.state.is_running,
                self.state.phase.as_str(),
                self.state.cadence_bpm
            );
        }

        self.sync_timers(rearm_cadence);
        self.publish();
    }

    fn on_countdown_tick(&mut self) {
        let from = self.state.phase;
        if let Some(step) = self.state.tick(&self.plan) {
            log_info!(
                "session {}: {} -> {} (repetition {})",
                self.state.session_id,
                from.as_str(),
                step.phase.as_str(),
                step.repetition
            );
            if let Some(cue) = step.cue {
                self.cues.announce(cue);
            }
        }

        self.sync_timers(false);
        self.publish();
    }

    /// Arms or disarms both loops to match the run state. A fresh interval is
    /// built on every arm so neither loop carries phase from a previous run.
    fn sync_timers(&mut self, rearm_cadence: bool) {
        if !self.state.is_running {
            self.countdown = None;
        } else if self.countdown.is_none() {
            self.countdown = Some(periodic(COUNTDOWN_PERIOD));
        }

        if !self.state.cadence_active() {
            self.cadence = None;
        } else if self.cadence.is_none() || rearm_cadence {
            self.cadence = Some(periodic(self.state.cadence_period()));
        }
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(SessionSnapshot::of(&self.state, &self.plan));
    }
}

/// First tick lands one full period after arming.
fn periodic(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
