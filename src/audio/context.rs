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

//! Shared audio context. Owns the audio clock, the master output stage and the
//! hand-off to the render thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{info, warn};

use super::buffer::AudioBuffer;
use super::master::MasterOutput;
use super::mixer::AudioMixer;
use super::voice::{BufferVoice, VoiceEnded, VoiceHandle};

/// The process-wide audio graph: voices feed a mixer that renders through the
/// master output. The master stage is built on first use and shared by every
/// engine using this context.
pub struct AudioContext {
    sample_rate: u32,
    num_channels: u16,
    /// Frames rendered so far; this is the audio clock.
    frames_rendered: AtomicU64,
    master: OnceLock<Arc<MasterOutput>>,
    voice_tx: Sender<BufferVoice>,
    mixer: Mutex<AudioMixer>,
}

impl AudioContext {
    /// Builds a context for the given output format.
    pub fn new(sample_rate: u32, num_channels: u16) -> AudioContext {
        let (voice_tx, voice_rx) = crossbeam_channel::unbounded();
        AudioContext {
            sample_rate,
            num_channels,
            frames_rendered: AtomicU64::new(0),
            master: OnceLock::new(),
            voice_tx,
            mixer: Mutex::new(AudioMixer::new(num_channels, sample_rate, voice_rx)),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Returns the audio clock in frames.
    pub fn current_frame(&self) -> u64 {
        self.frames_rendered.load(Ordering::Acquire)
    }

    /// Returns the audio clock in seconds.
    pub fn current_time(&self) -> f64 {
        self.current_frame() as f64 / self.sample_rate as f64
    }

    /// Returns the master output, creating it the first time it's asked for.
    pub fn master_output(&self) -> Arc<MasterOutput> {
        self.master
            .get_or_init(|| {
                info!(
                    sample_rate = self.sample_rate,
                    channels = self.num_channels,
                    "Master output created."
                );
                Arc::new(MasterOutput::new(self.sample_rate))
            })
            .clone()
    }

    /// Returns true once the master output exists.
    pub fn has_master_output(&self) -> bool {
        self.master.get().is_some()
    }

    /// Glides the master volume to `value`.
    pub fn set_master_volume(&self, value: f32) {
        self.master_output().set_volume(value, self.current_time());
    }

    /// Starts playing a buffer detuned by `detune_cents`. Returns a handle to
    /// control the voice and a signal that fires once it has stopped.
    pub fn start_voice(&self, buffer: AudioBuffer, detune_cents: i32) -> (VoiceHandle, VoiceEnded) {
        self.master_output();
        let (voice, handle, ended) = BufferVoice::new(buffer, detune_cents, self.sample_rate);
        if self.voice_tx.send(voice).is_err() {
            // The dropped voice still signals its end.
            warn!(voice = handle.id(), "Mixer is gone, voice dropped.");
        }
        (handle, ended)
    }

    /// Renders the next interleaved block and advances the audio clock.
    pub fn render(&self, output: &mut [f32]) {
        let channels = self.num_channels.max(1) as usize;
        let frames = (output.len() / channels) as u64;
        let start_frame = self.current_frame();
        let master = self.master.get().cloned();

        self.mixer
            .lock()
            .process(output, start_frame, master.as_deref());
        self.frames_rendered
            .store(start_frame + frames, Ordering::Release);
    }

    /// Returns the number of voices the renderer is still playing.
    pub fn active_voices(&self) -> usize {
        self.mixer.lock().active_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_with_render() {
        let context = AudioContext::new(1000, 2);
        assert_eq!(context.current_time(), 0.0);

        let mut out = vec![0.0; 200];
        context.render(&mut out);
        assert_eq!(context.current_frame(), 100);
        assert!((context.current_time() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_master_created_lazily_once() {
        let context = AudioContext::new(1000, 2);
        assert!(!context.has_master_output());

        let first = context.master_output();
        let second = context.master_output();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_start_voice_plays_through_master() {
        let context = AudioContext::new(1000, 1);
        let (_handle, mut ended) = context.start_voice(AudioBuffer::new(vec![0.25; 10], 1, 1000), 0);
        assert!(context.has_master_output());

        let mut out = vec![0.0; 5];
        context.render(&mut out);
        assert_eq!(out, vec![0.25; 5]);
        assert_eq!(context.active_voices(), 1);

        let mut out = vec![0.0; 10];
        context.render(&mut out);
        assert_eq!(context.active_voices(), 0);
        assert!(ended.try_recv().is_ok());
    }

    #[test]
    fn test_master_volume_uses_audio_clock() {
        let context = AudioContext::new(1000, 1);
        let mut out = vec![0.0; 500];
        context.render(&mut out);

        context.set_master_volume(0.2);
        let master = context.master_output();
        assert_eq!(master.volume_at(0.5), 1.0);
        assert!((master.volume_at(1.0) - 0.2).abs() < 1e-3);
    }
}
