use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::{process::Command, task::JoinHandle};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Speaks cues through the platform speech command.
///
/// Each announcement spawns one process and never waits on it from the caller.
/// When the speech binary is missing the first failure is logged and later cues
/// are dropped without retrying. Dropping the announcer kills any cue still
/// being spoken.
pub struct SpeechAnnouncer {
    locale: String,
    unavailable: Arc<AtomicBool>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl SpeechAnnouncer {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            unavailable: Arc::new(AtomicBool::new(false)),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn announce(&self, text: &str) {
        if self.unavailable.load(Ordering::Relaxed) {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log_warn!("no async runtime available, dropping cue {text:?}");
            return;
        };

        let mut command = speech_command(&self.locale, text);
        let unavailable = Arc::clone(&self.unavailable);
        let text = text.to_string();

        let task = runtime.spawn(async move {
            match command.status().await {
                Ok(status) if status.success() => log_debug!("announced {text:?}"),
                Ok(status) => log_warn!("speech command exited with {status} for {text:?}"),
                Err(err) => {
                    if !unavailable.swap(true, Ordering::Relaxed) {
                        log_warn!("speech backend unavailable, cues will be silent: {err}");
                    }
                }
            }
        });
        self.track(task);
    }

    fn track(&self, task: JoinHandle<()>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.retain(|task| !task.is_finished());
        in_flight.push(task);
    }
}

impl Drop for SpeechAnnouncer {
    fn drop(&mut self) {
        let in_flight = self.in_flight.get_mut().unwrap_or_else(PoisonError::into_inner);
        for task in in_flight.drain(..) {
            task.abort();
        }
    }
}

#[cfg(target_os = "macos")]
fn speech_command(locale: &str, text: &str) -> Command {
    let mut command = Command::new("say");
    if let Some(voice) = macos_voice(locale) {
        command.args(["-v", voice]);
    }
    command.arg(text);
    quiet(command)
}

#[cfg(not(target_os = "macos"))]
fn speech_command(locale: &str, text: &str) -> Command {
    let mut command = Command::new("espeak-ng");
    command.args(["-v", espeak_voice(locale)]);
    command.arg(text);
    quiet(command)
}

fn quiet(mut command: Command) -> Command {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    command
}

fn language(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn macos_voice(locale: &str) -> Option<&'static str> {
    match language(locale) {
        "fr" => Some("Thomas"),
        "en" => Some("Samantha"),
        "de" => Some("Anna"),
        "es" => Some("Monica"),
        _ => None,
    }
}

#[cfg_attr(target_os = "macos", allow(dead_code))]
fn espeak_voice(locale: &str) -> &str {
    match language(locale) {
        "" => "fr",
        lang => lang,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voices_follow_locale_language() {
        assert_eq!(macos_voice("fr-FR"), Some("Thomas"));
        assert_eq!(macos_voice("en_US"), Some("Samantha"));
        assert_eq!(macos_voice("pt-BR"), None);
        assert_eq!(espeak_voice("fr-FR"), "fr");
        assert_eq!(espeak_voice("de"), "de");
        assert_eq!(espeak_voice(""), "fr");
    }

    #[test]
    fn announce_without_runtime_is_silent() {
        let announcer = SpeechAnnouncer::new("fr-FR");
        announcer.announce("Marchez");
        assert!(announcer.in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropping_the_announcer_stops_cues_in_flight() {
        let announcer = SpeechAnnouncer::new("fr-FR");
        let task = tokio::spawn(std::future::pending::<()>());
        let abort = task.abort_handle();
        announcer.track(task);

        drop(announcer);
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(abort.is_finished());
    }
}
