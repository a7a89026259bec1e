use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const CLICK_MS: u32 = 50;
const FINAL_GAIN: f32 = 0.001;

/// Metronome click
/// A short sine burst whose gain decays exponentially from 1.0 to 0.001
pub struct Click {
    frequency: f32,
    sample_rate: u32,
    num_sample: u32,
    total_samples: u32,
    decay_per_sample: f32,
    gain: f32,
}

impl Click {
    pub fn new(frequency: f32) -> Self {
        let total_samples = SAMPLE_RATE * CLICK_MS / 1000;
        Self {
            frequency,
            sample_rate: SAMPLE_RATE,
            num_sample: 0,
            total_samples,
            decay_per_sample: FINAL_GAIN.powf(1.0 / total_samples as f32),
            gain: 1.0,
        }
    }
}

impl Iterator for Click {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }

        let t = self.num_sample as f32 / self.sample_rate as f32;
        let sample = (2.0 * PI * self.frequency * t).sin() * self.gain;

        self.num_sample += 1;
        self.gain *= self.decay_per_sample;

        Some(sample)
    }
}

impl Source for Click {
    fn current_frame_len(&self) -> Option<usize> {
        Some((self.total_samples - self.num_sample) as usize)
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_millis(u64::from(CLICK_MS)))
    }
}
