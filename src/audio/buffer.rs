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

//! Decoded, ready-to-play sample data.

use std::sync::Arc;
use std::time::Duration;

/// A decoded sample held in memory.
/// The sample data is stored in an Arc so every voice playing it shares one copy.
#[derive(Clone)]
pub struct AudioBuffer {
    /// Interleaved f32 samples.
    data: Arc<Vec<f32>>,
    channel_count: u16,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Creates a buffer from interleaved samples.
    pub fn new(data: Vec<f32>, channel_count: u16, sample_rate: u32) -> AudioBuffer {
        AudioBuffer {
            data: Arc::new(data),
            channel_count: channel_count.max(1),
            sample_rate,
        }
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.data.len() / self.channel_count as usize
    }

    /// Returns the sample at the given frame and channel.
    /// Channels past the last one read the last channel.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channel_count as usize;
        self.data
            .get(frame * channels + channel.min(channels - 1))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate.max(1) as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    /// Returns a copy of this buffer at another sample rate.
    /// Linear interpolation is enough for one-shot instrument samples.
    pub fn resampled(&self, target_rate: u32) -> AudioBuffer {
        if target_rate == self.sample_rate || self.sample_rate == 0 {
            return self.clone();
        }

        let ratio = target_rate as f64 / self.sample_rate as f64;
        let channels = self.channel_count as usize;
        let target_frames = (self.frames() as f64 * ratio).ceil() as usize;

        let mut output = Vec::with_capacity(target_frames * channels);
        for target_frame in 0..target_frames {
            let source_pos = target_frame as f64 / ratio;
            let source_frame = source_pos.floor() as usize;
            let frac = source_pos.fract() as f32;

            for channel in 0..channels {
                let s0 = self.data.get(source_frame * channels + channel).copied().unwrap_or(0.0);
                let s1 = self
                    .data
                    .get((source_frame + 1) * channels + channel)
                    .copied()
                    .unwrap_or(s0);
                output.push(s0 + (s1 - s0) * frac);
            }
        }

        AudioBuffer::new(output, self.channel_count, target_rate)
    }
}

impl std::fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("channels", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames())
            .finish()
    }
}
