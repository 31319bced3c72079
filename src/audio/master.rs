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

//! The master bus: every voice is summed, compressed, then scaled by the
//! master volume before reaching the device.

use parking_lot::Mutex;
use tracing::debug;

use super::compressor::{Compressor, CompressorSettings};
use super::param::AudioParam;

/// Time constant, in seconds, for master volume changes.
pub const VOLUME_TIME_CONSTANT: f64 = 0.015;

/// The shared master output stage.
pub struct MasterOutput {
    sample_rate: u32,
    gain: Mutex<AudioParam>,
    compressor: Mutex<Compressor>,
}

impl MasterOutput {
    /// Creates a master stage at full volume.
    pub fn new(sample_rate: u32) -> MasterOutput {
        Self::with_settings(sample_rate, CompressorSettings::default())
    }

    pub fn with_settings(sample_rate: u32, settings: CompressorSettings) -> MasterOutput {
        MasterOutput {
            sample_rate,
            gain: Mutex::new(AudioParam::new(1.0)),
            compressor: Mutex::new(Compressor::new(settings, sample_rate)),
        }
    }

    /// Glides the master volume towards `value`, starting at `now`.
    /// Values outside 0..=1 are passed through as given.
    pub fn set_volume(&self, value: f32, now: f64) {
        debug!(volume = value, at = now, "Setting master volume.");
        let mut gain = self.gain.lock();
        gain.cancel_and_hold_at_time(now);
        gain.set_target_at_time(value, now, VOLUME_TIME_CONSTANT);
    }

    /// Returns the master volume at the given audio time.
    pub fn volume_at(&self, time: f64) -> f32 {
        self.gain.lock().value_at(time)
    }

    /// Applies compression and master gain to an interleaved block that
    /// starts at `start_frame`.
    pub fn process(&self, output: &mut [f32], channels: usize, start_frame: u64) {
        if channels == 0 {
            return;
        }
        let mut compressor = self.compressor.lock();
        let gain = self.gain.lock();
        for (offset, frame) in output.chunks_exact_mut(channels).enumerate() {
            compressor.process_frame(frame);
            let time = (start_frame + offset as u64) as f64 / self.sample_rate as f64;
            let level = gain.value_at(time);
            for sample in frame.iter_mut() {
                *sample *= level;
            }
        }
    }
}
