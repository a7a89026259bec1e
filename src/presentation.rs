//! Labels and formatting shared by any front end that renders a session.

use crate::models::SessionPlan;
use crate::timer::{Phase, SessionRunState, SessionSnapshot};

const RING_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDetails {
    pub label: &'static str,
    /// Theme token the front end maps to a colour.
    pub color: &'static str,
}

pub fn phase_details(phase: Phase) -> PhaseDetails {
    match phase {
        Phase::Warmup => PhaseDetails {
            label: "Échauffement",
            color: "warmup-color",
        },
        Phase::Run => PhaseDetails {
            label: "Course",
            color: "run-color",
        },
        Phase::Walk => PhaseDetails {
            label: "Marche",
            color: "walk-color",
        },
        Phase::Cooldown => PhaseDetails {
            label: "Récupération",
            color: "cooldown-color",
        },
        Phase::Finished => PhaseDetails {
            label: "Terminé",
            color: "primary-color",
        },
    }
}

/// `mm:ss`, minutes are not wrapped into hours.
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Catalog card notation: `30"` under a minute, `2'` on whole minutes, `1'30"` otherwise.
pub fn format_interval(seconds: u32) -> String {
    match (seconds / 60, seconds % 60) {
        (0, secs) => format!("{secs}\""),
        (mins, 0) => format!("{mins}'"),
        (mins, secs) => format!("{mins}'{secs:02}\""),
    }
}

pub fn session_title(index: usize) -> String {
    format!("Séance {}", index + 1)
}

pub fn plan_summary(plan: &SessionPlan) -> String {
    let intervals = &plan.intervals;
    let mut summary = format!("{} Course", format_interval(intervals.run_seconds));
    if plan.has_walk() {
        summary.push_str(&format!(" / {} Marche", format_interval(intervals.walk_seconds)));
    }
    summary.push_str(&format!(", {} fois", intervals.repetitions));
    summary
}

/// Only shown while running or walking.
pub fn repetition_label(snapshot: &SessionSnapshot) -> Option<String> {
    snapshot.state.phase.counts_repetitions().then(|| {
        format!(
            "Répétition: {} / {}",
            snapshot.state.repetition, snapshot.plan.intervals.repetitions
        )
    })
}

pub fn start_button_label(state: &SessionRunState) -> &'static str {
    if state.phase == Phase::Finished {
        "RECOMMENCER"
    } else if state.is_running {
        "PAUSE"
    } else {
        "DÉMARRER"
    }
}

/// Text rendering of the progress ring.
pub fn progress_bar(progress: f64) -> String {
    let filled = (progress.clamp(0.0, 1.0) * RING_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(RING_WIDTH - filled))
}

pub fn render_status(snapshot: &SessionSnapshot) -> String {
    let state = &snapshot.state;
    let mut line = format!(
        "[{}] {} {}",
        phase_details(state.phase).label,
        format_time(state.time_left_seconds),
        progress_bar(snapshot.progress)
    );
    if let Some(repetition) = repetition_label(snapshot) {
        line.push_str("  ");
        line.push_str(&repetition);
    }
    if state.phase == Phase::Run {
        line.push_str(&format!("  MÉTRONOME: {} PPM", state.cadence_bpm));
    }
    line.push_str(&format!("  ({})", start_button_label(state)));
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(phase: Phase, repetition: u32, time_left: u32, duration: u32) -> SessionSnapshot {
        let plan = SessionPlan::new(180, 180, 30, 30, 15).unwrap();
        let mut state = SessionRunState::new("id".into(), &plan, 170);
        state.phase = phase;
        state.repetition = repetition;
        state.time_left_seconds = time_left;
        state.phase_duration_seconds = duration;
        SessionSnapshot {
            progress: state.progress(),
            state,
            plan,
        }
    }

    #[test]
    fn formats_countdown() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(59), "00:59");
        assert_eq!(format_time(180), "03:00");
        assert_eq!(format_time(1200), "20:00");
    }

    #[test]
    fn summarises_catalog_cards() {
        let walk = SessionPlan::new(180, 180, 30, 30, 15).unwrap();
        assert_eq!(plan_summary(&walk), "30\" Course / 30\" Marche, 15 fois");

        let long = SessionPlan::new(180, 180, 120, 60, 5).unwrap();
        assert_eq!(plan_summary(&long), "2' Course / 1' Marche, 5 fois");

        let continuous = SessionPlan::new(180, 180, 900, 0, 1).unwrap();
        assert_eq!(plan_summary(&continuous), "15' Course, 1 fois");

        assert_eq!(format_interval(90), "1'30\"");
        assert_eq!(session_title(0), "Séance 1");
    }

    #[test]
    fn repetition_only_during_intervals() {
        assert_eq!(
            repetition_label(&snapshot(Phase::Walk, 3, 10, 30)).as_deref(),
            Some("Répétition: 3 / 15")
        );
        assert!(repetition_label(&snapshot(Phase::Warmup, 0, 10, 180)).is_none());
        assert!(repetition_label(&snapshot(Phase::Cooldown, 0, 10, 180)).is_none());
    }

    #[test]
    fn status_line_shows_phase_time_and_metronome() {
        let line = render_status(&snapshot(Phase::Run, 2, 15, 30));
        assert!(line.starts_with("[Course] 00:15 ██████████░░░░░░░░░░"));
        assert!(line.contains("Répétition: 2 / 15"));
        assert!(line.contains("MÉTRONOME: 170 PPM"));
        assert!(line.ends_with("(DÉMARRER)"));

        let line = render_status(&snapshot(Phase::Warmup, 0, 180, 180));
        assert!(!line.contains("MÉTRONOME"));
    }

    #[test]
    fn button_caption_tracks_state() {
        let mut finished = snapshot(Phase::Finished, 0, 0, 180).state;
        assert_eq!(start_button_label(&finished), "RECOMMENCER");
        finished.phase = Phase::Run;
        finished.is_running = true;
        assert_eq!(start_button_label(&finished), "PAUSE");
    }

    #[test]
    fn progress_bar_is_clamped() {
        assert_eq!(progress_bar(1.0).chars().filter(|c| *c == '█').count(), 20);
        assert_eq!(progress_bar(-1.0).chars().filter(|c| *c == '░').count(), 20);
    }
}
