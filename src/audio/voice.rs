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

//! Buffer playback voices.
//!
//! A voice is split in two: the [`BufferVoice`] lives on the audio thread and
//! produces samples, the [`VoiceHandle`] stays with the caller and schedules
//! the release gain and stop time through shared state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::buffer::AudioBuffer;
use super::param::AudioParam;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// Stop frame meaning "no stop scheduled".
const NO_STOP: u64 = u64::MAX;

/// Resolves once the voice has stopped producing sound, whether it ran out of
/// buffer or reached its scheduled stop.
pub type VoiceEnded = oneshot::Receiver<u64>;

/// Converts a detune in cents to a playback-rate multiplier.
pub fn detune_to_rate(detune_cents: i32) -> f64 {
    if detune_cents == 0 {
        return 1.0;
    }
    2f64.powf(detune_cents as f64 / 1200.0)
}

/// The audio-thread half of a voice.
pub struct BufferVoice {
    id: u64,
    buffer: AudioBuffer,
    /// Source frames advanced per output frame.
    playback_rate: f64,
    /// Read position in source frames.
    position: f64,
    /// Gain used only for the release fade.
    release_gain: Arc<Mutex<AudioParam>>,
    /// Output frame at which this voice should stop.
    stop_at_frame: Arc<AtomicU64>,
    ended: Option<oneshot::Sender<u64>>,
}

/// The caller's half of a voice.
#[derive(Clone)]
pub struct VoiceHandle {
    id: u64,
    sample_rate: u32,
    release_gain: Arc<Mutex<AudioParam>>,
    stop_at_frame: Arc<AtomicU64>,
}

impl BufferVoice {
    /// Creates a voice playing `buffer` detuned by `detune_cents`, rendered at
    /// `output_rate`.
    pub fn new(
        buffer: AudioBuffer,
        detune_cents: i32,
        output_rate: u32,
    ) -> (BufferVoice, VoiceHandle, VoiceEnded) {
        let id = NEXT_VOICE_ID.fetch_add(1, Ordering::SeqCst);
        let release_gain = Arc::new(Mutex::new(AudioParam::new(1.0)));
        let stop_at_frame = Arc::new(AtomicU64::new(NO_STOP));
        let (ended_tx, ended_rx) = oneshot::channel();

        let mut playback_rate = detune_to_rate(detune_cents);
        if buffer.sample_rate() != output_rate && output_rate > 0 {
            playback_rate *= buffer.sample_rate() as f64 / output_rate as f64;
        }

        let voice = BufferVoice {
            id,
            buffer,
            playback_rate,
            position: 0.0,
            release_gain: release_gain.clone(),
            stop_at_frame: stop_at_frame.clone(),
            ended: Some(ended_tx),
        };
        let handle = VoiceHandle {
            id,
            sample_rate: output_rate,
            release_gain,
            stop_at_frame,
        };
        (voice, handle, ended_rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn finish(&mut self) {
        if let Some(ended) = self.ended.take() {
            // The receiver may be gone if nobody is tracking this voice anymore.
            let _ = ended.send(self.id);
        }
    }

    /// Mixes this voice into an interleaved output block that starts at
    /// `start_frame`. Returns false once the voice has finished.
    pub fn render(
        &mut self,
        output: &mut [f32],
        channels: usize,
        start_frame: u64,
        sample_rate: u32,
    ) -> bool {
        if channels == 0 {
            return true;
        }

        let stop_at = self.stop_at_frame.load(Ordering::Relaxed);
        let source_frames = self.buffer.frames();
        let gain = self.release_gain.lock();

        for (offset, frame) in output.chunks_exact_mut(channels).enumerate() {
            let frame_index = start_frame + offset as u64;
            let index = self.position as usize;
            if frame_index >= stop_at || index >= source_frames {
                drop(gain);
                self.finish();
                return false;
            }

            let frac = (self.position - index as f64) as f32;
            let level = gain.value_at(frame_index as f64 / sample_rate as f64);
            for (channel, out) in frame.iter_mut().enumerate() {
                let s0 = self.buffer.sample(index, channel);
                let s1 = if index + 1 < source_frames {
                    self.buffer.sample(index + 1, channel)
                } else {
                    s0
                };
                *out += (s0 + (s1 - s0) * frac) * level;
            }

            self.position += self.playback_rate;
        }

        true
    }
}

impl Drop for BufferVoice {
    fn drop(&mut self) {
        self.finish();
    }
}

impl VoiceHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ramps the release gain linearly from full volume down to `floor` over
    /// `duration` seconds starting at `now`.
    pub fn fade_out(&self, now: f64, duration: f64, floor: f32) {
        let mut gain = self.release_gain.lock();
        gain.set_value_at_time(1.0, now);
        gain.linear_ramp_to_value_at_time(floor, now + duration);
    }

    /// Schedules the voice to stop at `time` on the audio clock. An earlier
    /// scheduled stop is kept.
    pub fn stop_at(&self, time: f64) {
        let frame = (time.max(0.0) * self.sample_rate as f64).round() as u64;
        self.stop_at_frame.fetch_min(frame, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for VoiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceHandle")
            .field("id", &self.id)
            .field("stop_at_frame", &self.stop_at_frame.load(Ordering::Relaxed))
            .finish()
    }
}
