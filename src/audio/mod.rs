pub mod click;
pub mod speech;

use click::Click;
use speech::SpeechAnnouncer;

use rodio::{OutputStream, Sink};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread::{self, JoinHandle};

use crate::settings::AudioSettings;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Audio side effects a running session can trigger.
///
/// Both calls are fire-and-forget; an implementation without a device simply
/// does nothing.
pub trait Cues: Send + Sync {
    fn announce(&self, text: &str);
    fn tick(&self);
}

/// Used when audio is disabled in the settings.
pub struct SilentCues;

impl Cues for SilentCues {
    fn announce(&self, _text: &str) {}

    fn tick(&self) {}
}

/// Metronome and speech backed by the local output device.
pub struct DeviceCues {
    tone: Option<ToneEngine>,
    speech: Option<SpeechAnnouncer>,
}

impl DeviceCues {
    pub fn new(settings: &AudioSettings) -> Self {
        Self {
            tone: settings
                .metronome_enabled
                .then(|| ToneEngine::new(settings.click_frequency_hz, settings.volume)),
            speech: settings
                .speech_enabled
                .then(|| SpeechAnnouncer::new(settings.locale.clone())),
        }
    }
}

impl Cues for DeviceCues {
    fn announce(&self, text: &str) {
        if let Some(speech) = &self.speech {
            speech.announce(text);
        }
    }

    fn tick(&self) {
        if let Some(tone) = &self.tone {
            if let Err(err) = tone.click() {
                log_warn!("metronome click dropped: {err}");
            }
        }
    }
}

/// Builds the cue backend described by the audio settings.
pub fn cues_from_settings(settings: &AudioSettings) -> Arc<dyn Cues> {
    if settings.metronome_enabled || settings.speech_enabled {
        Arc::new(DeviceCues::new(settings))
    } else {
        Arc::new(SilentCues)
    }
}

enum ToneCommand {
    Click,
    Shutdown,
}

/// Owns the output device on a dedicated thread.
///
/// The device is opened on the first click and closed when the engine is
/// dropped. If it cannot be opened, the failure is logged once and every later
/// click is skipped.
pub struct ToneEngine {
    tx: Mutex<Option<Sender<ToneCommand>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    frequency: f32,
    volume: f32,
    device_unavailable: Arc<AtomicBool>,
}

impl ToneEngine {
    pub fn new(frequency: f32, volume: f32) -> Self {
        Self {
            tx: Mutex::new(None),
            thread: Mutex::new(None),
            frequency,
            volume: volume.clamp(0.0, 1.0),
            device_unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<ToneCommand>, String> {
        let mut tx_guard = self.tx.lock().map_err(|e| e.to_string())?;
        if let Some(tx) = tx_guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<ToneCommand>();
        let frequency = self.frequency;
        let volume = self.volume;
        let device_unavailable = Arc::clone(&self.device_unavailable);

        // OutputStream is not Send, so it lives and dies on this thread
        let handle = thread::Builder::new()
            .name("metronome".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                    volume: f32,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        new_sink.set_volume(volume);
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        ToneCommand::Click => {
                            if device_unavailable.load(Ordering::Relaxed) {
                                continue;
                            }
                            if let Err(err) = ensure_sink(&mut _stream, &mut sink, volume) {
                                device_unavailable.store(true, Ordering::Relaxed);
                                log_warn!("metronome disabled, no audio device: {err}");
                                continue;
                            }
                            if let Some(ref s) = sink {
                                s.append(Click::new(frequency));
                            }
                        }
                        ToneCommand::Shutdown => break,
                    }
                }

                if let Some(s) = sink.take() {
                    s.stop();
                }
                _stream = None;
                log_debug!("metronome audio thread released the output device");
            })
            .map_err(|e| e.to_string())?;

        *self.thread.lock().map_err(|e| e.to_string())? = Some(handle);
        let tx_clone = tx.clone();
        *tx_guard = Some(tx);
        Ok(tx_clone)
    }

    pub fn click(&self) -> Result<(), String> {
        if self.device_unavailable.load(Ordering::Relaxed) {
            return Ok(());
        }
        let tx = self.ensure_thread()?;
        tx.send(ToneCommand::Click).map_err(|e| e.to_string())
    }

    /// Tells the audio thread to close the output device and hands back its
    /// handle. `None` once the thread was already stopped, or never started.
    fn stop_thread(&self) -> Option<JoinHandle<()>> {
        if let Ok(Some(tx)) = self.tx.lock().map(|mut g| g.take()) {
            let _ = tx.send(ToneCommand::Shutdown);
        }
        self.thread.lock().ok().and_then(|mut g| g.take())
    }
}

impl Drop for ToneEngine {
    fn drop(&mut self) {
        let Some(handle) = self.stop_thread() else {
            return;
        };
        // never block a runtime worker on the device teardown
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || {
                    if handle.join().is_err() {
                        log_warn!("metronome audio thread panicked");
                    }
                });
            }
            Err(_) => {
                if handle.join().is_err() {
                    log_warn!("metronome audio thread panicked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_audio_builds_silent_cues() {
        let settings = AudioSettings {
            metronome_enabled: false,
            speech_enabled: false,
            ..AudioSettings::default()
        };
        let cues = cues_from_settings(&settings);
        cues.tick();
        cues.announce("Marchez");
    }

    #[test]
    fn stopping_without_clicks_is_a_no_op() {
        let engine = ToneEngine::new(880.0, 2.0);
        assert_eq!(engine.volume, 1.0);
        assert!(engine.stop_thread().is_none());
        assert!(engine.stop_thread().is_none());
    }

    #[tokio::test]
    async fn audio_thread_exits_once_stopped() {
        let engine = ToneEngine::new(880.0, 0.0);
        engine.click().unwrap();
        let handle = engine.stop_thread().expect("first click starts the audio thread");
        assert!(engine.stop_thread().is_none());

        let joined = tokio::task::spawn_blocking(move || handle.join()).await.unwrap();
        assert!(joined.is_ok());
    }

    #[tokio::test]
    async fn dropping_inside_a_runtime_returns_immediately() {
        let engine = ToneEngine::new(880.0, 0.0);
        engine.click().unwrap();
        drop(engine);
        tokio::task::yield_now().await;
    }
}
