use std::io::Write;

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};

use crate::{
    app::WorkoutApp,
    presentation::render_status,
    settings::SettingsStore,
    timer::{
        commands::{catalog_listing, dispatch, HELP},
        Intent, SessionSnapshot,
    },
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_warn};

/// Terminal front end: reads intents from stdin and redraws the status line on
/// every snapshot the open session publishes.
pub async fn run_shell(mut app: WorkoutApp, settings: &SettingsStore) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut updates: Option<watch::Receiver<SessionSnapshot>> = None;

    println!("Programme de Course\n{}\n{HELP}", catalog_listing(&app));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read from stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                let intent = match line.parse::<Intent>() {
                    Ok(intent) => intent,
                    Err(err) => {
                        eprintln!("{err}");
                        continue;
                    }
                };
                if intent == Intent::Quit {
                    break;
                }

                let outcome = dispatch(&mut app, intent).await;
                if let Some(bpm) = cadence_to_remember(intent, &outcome) {
                    if let Err(err) = settings.update_default_cadence(bpm) {
                        log_warn!("could not remember cadence {bpm}: {err:#}");
                    }
                }

                match outcome {
                    Ok(Some(text)) => println!("{text}"),
                    Ok(None) => {}
                    Err(err) => {
                        log_error!("{intent:?} failed: {err}");
                        eprintln!("{err}");
                    }
                }

                updates = app.session().map(|controller| controller.subscribe());
            }
            snapshot = next_update(&mut updates) => match snapshot {
                Some(snapshot) => redraw(&snapshot),
                None => updates = None,
            },
        }
    }

    println!();
    app.back().await
}

/// A cadence is only saved for next time once the app accepted it.
fn cadence_to_remember(intent: Intent, outcome: &Result<Option<String>, String>) -> Option<u32> {
    match (intent, outcome) {
        (Intent::Cadence(bpm), Ok(_)) => Some(bpm),
        _ => None,
    }
}

async fn next_update(
    updates: &mut Option<watch::Receiver<SessionSnapshot>>,
) -> Option<SessionSnapshot> {
    match updates {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

fn redraw(snapshot: &SessionSnapshot) {
    let mut stdout = std::io::stdout().lock();
    let _ = write!(stdout, "\r\x1b[2K{}", render_status(snapshot));
    let _ = stdout.flush();
}
