use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use crate::timer::state::{clamp_cadence, DEFAULT_CADENCE_BPM};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioSettings {
    pub metronome_enabled: bool,
    pub speech_enabled: bool,
    /// Spoken locale for every cue of a session.
    pub locale: String,
    pub click_frequency_hz: f32,
    pub volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            metronome_enabled: true,
            speech_enabled: true,
            locale: "fr-FR".into(),
            click_frequency_hz: 880.0,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub default_cadence_bpm: u32,
    pub audio: AudioSettings,
    /// Replaces the built-in catalog when set.
    pub catalog_path: Option<PathBuf>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_cadence_bpm: DEFAULT_CADENCE_BPM,
            audio: AudioSettings::default(),
            catalog_path: None,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`, falling back to defaults when the file is
    /// missing or unparsable. Only I/O errors on an existing file are fatal.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring malformed settings in {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> UserSettings {
        self.data.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn audio(&self) -> AudioSettings {
        self.snapshot().audio
    }

    pub fn default_cadence(&self) -> u32 {
        clamp_cadence(self.snapshot().default_cadence_bpm)
    }

    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.snapshot().catalog_path
    }

    pub fn update_default_cadence(&self, bpm: u32) -> Result<u32> {
        let bpm = clamp_cadence(bpm);
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.default_cadence_bpm = bpm;
        self.persist(&guard)?;
        Ok(bpm)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
