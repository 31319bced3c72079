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

// Core audio mixing logic that can be used by both CPAL and test implementations
use crossbeam_channel::Receiver;

use super::master::MasterOutput;
use super::voice::BufferVoice;

/// Sums active voices into output blocks. Owned by whichever thread renders.
pub struct AudioMixer {
    /// Voices currently playing.
    active_voices: Vec<BufferVoice>,
    /// New voices handed over from control threads.
    voice_rx: Receiver<BufferVoice>,
    /// Number of output channels
    num_channels: u16,
    /// Sample rate
    sample_rate: u32,
}

impl AudioMixer {
    /// Creates a new audio mixer fed by the given channel.
    pub fn new(num_channels: u16, sample_rate: u32, voice_rx: Receiver<BufferVoice>) -> Self {
        Self {
            active_voices: Vec::new(),
            voice_rx,
            num_channels,
            sample_rate,
        }
    }

    /// Renders one interleaved block starting at `start_frame`. The block is
    /// overwritten, not added to. Finished voices are dropped, which signals
    /// their end.
    pub fn process(&mut self, output: &mut [f32], start_frame: u64, master: Option<&MasterOutput>) {
        output.fill(0.0);

        self.active_voices.extend(self.voice_rx.try_iter());

        let channels = self.num_channels as usize;
        let sample_rate = self.sample_rate;
        self.active_voices
            .retain_mut(|voice| voice.render(output, channels, start_frame, sample_rate));

        if let Some(master) = master {
            master.process(output, channels, start_frame);
        }
    }

    /// Gets the number of voices still playing.
    pub fn active_count(&self) -> usize {
        self.active_voices.len()
    }
}
