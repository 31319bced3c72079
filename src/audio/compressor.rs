// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Dynamics compression for the master bus.

/// Levels below this are treated as silence.
const SILENCE_DB: f32 = -120.0;

/// Configuration for the compressor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    /// Threshold in dB.
    pub threshold_db: f32,
    /// Width of the soft knee in dB, centred on the threshold.
    pub knee_db: f32,
    /// Compression ratio above the knee.
    pub ratio: f32,
    /// Attack time in seconds.
    pub attack: f32,
    /// Release time in seconds.
    pub release: f32,
}

impl Default for CompressorSettings {
    /// Settings for the master bus: keeps stacked notes from clipping.
    fn default() -> Self {
        Self {
            threshold_db: -6.0,
            knee_db: 12.0,
            ratio: 12.0,
            attack: 0.003,
            release: 0.15,
        }
    }
}

/// A peak-sensing, soft-knee compressor. Linked across channels so the
/// stereo image doesn't shift under gain reduction.
#[derive(Debug, Clone)]
pub struct Compressor {
    settings: CompressorSettings,
    attack_coeff: f32,
    release_coeff: f32,
    /// Current gain reduction in dB (>= 0).
    reduction_db: f32,
}

fn smoothing_coeff(seconds: f32, sample_rate: u32) -> f32 {
    if seconds <= 0.0 || sample_rate == 0 {
        return 0.0;
    }
    (-1.0 / (seconds * sample_rate as f32)).exp()
}

impl Compressor {
    pub fn new(settings: CompressorSettings, sample_rate: u32) -> Compressor {
        Compressor {
            settings,
            attack_coeff: smoothing_coeff(settings.attack, sample_rate),
            release_coeff: smoothing_coeff(settings.release, sample_rate),
            reduction_db: 0.0,
        }
    }

    /// Returns the current gain reduction in dB.
    pub fn reduction_db(&self) -> f32 {
        self.reduction_db
    }

    /// Static gain reduction, in dB, for a given input level.
    fn static_reduction(&self, level_db: f32) -> f32 {
        let slope = 1.0 - 1.0 / self.settings.ratio.max(1.0);
        let over = level_db - self.settings.threshold_db;
        let half_knee = self.settings.knee_db / 2.0;

        if over <= -half_knee {
            0.0
        } else if over < half_knee {
            let x = over + half_knee;
            slope * x * x / (2.0 * self.settings.knee_db)
        } else {
            slope * over
        }
    }

    /// Compresses one interleaved frame in place.
    #[inline]
    pub fn process_frame(&mut self, frame: &mut [f32]) {
        let peak = frame.iter().fold(0.0f32, |max, s| max.max(s.abs()));
        let level_db = if peak > 1e-6 {
            20.0 * peak.log10()
        } else {
            SILENCE_DB
        };

        let target = self.static_reduction(level_db);
        let coeff = if target > self.reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.reduction_db = target + coeff * (self.reduction_db - target);

        if self.reduction_db > 0.0 {
            let gain = 10f32.powf(-self.reduction_db / 20.0);
            for sample in frame.iter_mut() {
                *sample *= gain;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44100;

    fn run(compressor: &mut Compressor, level: f32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|_| {
                let mut frame = [level, level];
                compressor.process_frame(&mut frame);
                frame[0]
            })
            .collect()
    }

    #[test]
    fn test_quiet_signal_untouched() {
        let mut compressor = Compressor::new(CompressorSettings::default(), SAMPLE_RATE);
        // -20 dB is below the bottom of the knee (-12 dB).
        let out = run(&mut compressor, 0.1, 4410);
        assert!(out.iter().all(|&s| s == 0.1));
        assert_eq!(compressor.reduction_db(), 0.0);
    }

    #[test]
    fn test_loud_signal_reduced() {
        let mut compressor = Compressor::new(CompressorSettings::default(), SAMPLE_RATE);
        let out = run(&mut compressor, 1.0, 4410);

        // 0 dBFS sits at the top of the knee: 11/12 * 12^2 / 24 = 5.5 dB.
        let settled = out[out.len() - 1];
        let expected = 10f32.powf(-5.5 / 20.0);
        assert!((settled - expected).abs() < 0.01, "settled at {}", settled);

        // Attack is not instantaneous.
        assert!(out[0] > settled);
    }

    #[test]
    fn test_heavy_overload_is_limited() {
        let mut compressor = Compressor::new(CompressorSettings::default(), SAMPLE_RATE);
        // Four notes stacked at full scale: +12 dB.
        let out = run(&mut compressor, 4.0, 4410);
        let settled = out[out.len() - 1];
        // 18 dB over threshold at 12:1 leaves -4.5 dBFS.
        let expected = 10f32.powf(-4.5 / 20.0);
        assert!((settled - expected).abs() < 0.01, "settled at {}", settled);
    }

    #[test]
    fn test_release_recovers() {
        let mut compressor = Compressor::new(CompressorSettings::default(), SAMPLE_RATE);
        run(&mut compressor, 1.0, 4410);
        assert!(compressor.reduction_db() > 5.0);

        // Two seconds of quiet is plenty for a 150 ms release.
        run(&mut compressor, 0.0, 2 * SAMPLE_RATE as usize);
        assert!(compressor.reduction_db() < 0.01);
    }

    #[test]
    fn test_knee_is_continuous() {
        let compressor = Compressor::new(CompressorSettings::default(), SAMPLE_RATE);
        let bottom = compressor.static_reduction(-12.0);
        let top_inside = compressor.static_reduction(-0.0001);
        let top_outside = compressor.static_reduction(0.0001);
        assert_eq!(bottom, 0.0);
        assert!((top_inside - top_outside).abs() < 1e-3);
    }
}
