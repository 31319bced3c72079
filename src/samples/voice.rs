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

//! Per-note voice lifecycle.
//!
//! Each note id has at most one tracked voice. Stopping a note untracks its
//! voice right away and lets it fade out on its own, so the same note can be
//! pressed again while the old voice is still fading.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::store::SampleStore;
use crate::audio::voice::{VoiceEnded, VoiceHandle};
use crate::audio::AudioContext;
use crate::instrument::Instrument;

/// Length of the release fade, in seconds.
pub const RELEASE_TIME: f64 = 1.0;
/// Delay between a stop request and the source stopping, in seconds.
pub const STOP_DELAY: f64 = 1.05;
/// Gain the release fade ends at.
pub const RELEASE_FLOOR: f32 = 0.0001;

/// A tracked, sounding voice.
struct ActiveVoice {
    handle: VoiceHandle,
    sample_name: String,
    detune_cents: i32,
}

#[derive(Default)]
struct VoiceState {
    /// Tracked voices by note id.
    active: HashMap<String, ActiveVoice>,
    /// Notes pressed before the samples were loaded and not yet released.
    pending: HashSet<String>,
}

/// Starts and stops voices for one instrument.
#[derive(Clone)]
pub struct VoiceEngine {
    instrument: Arc<Instrument>,
    store: SampleStore,
    context: Arc<AudioContext>,
    runtime: Handle,
    state: Arc<Mutex<VoiceState>>,
}

impl VoiceEngine {
    pub fn new(
        instrument: Arc<Instrument>,
        store: SampleStore,
        context: Arc<AudioContext>,
        runtime: Handle,
    ) -> VoiceEngine {
        VoiceEngine {
            instrument,
            store,
            context,
            runtime,
            state: Arc::new(Mutex::new(VoiceState::default())),
        }
    }

    /// Starts a voice for `note_id` unless one is already tracked. If the
    /// samples aren't loaded yet, loading is kicked off and the note plays once
    /// it finishes, provided it hasn't been released in the meantime.
    pub fn play_note(&self, note_id: &str) {
        let mut state = self.state.lock();
        if state.active.contains_key(note_id) {
            debug!(note = note_id, "Note already sounding");
            return;
        }

        if !self.store.is_loaded() {
            if state.pending.insert(note_id.to_string()) {
                drop(state);
                self.defer(note_id.to_string());
            }
            return;
        }

        self.start_locked(&mut state, note_id);
    }

    /// Releases the voice for `note_id`, if any: it fades out over
    /// `RELEASE_TIME` and stops `STOP_DELAY` after now.
    pub fn stop_note(&self, note_id: &str) {
        let voice = {
            let mut state = self.state.lock();
            state.pending.remove(note_id);
            state.active.remove(note_id)
        };
        let Some(voice) = voice else {
            return;
        };

        let now = self.context.current_time();
        voice.handle.fade_out(now, RELEASE_TIME, RELEASE_FLOOR);
        voice.handle.stop_at(now + STOP_DELAY);
        debug!(
            note = note_id,
            voice = voice.handle.id(),
            sample = voice.sample_name,
            "Note released"
        );
    }

    /// Returns the number of tracked voices.
    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    /// Returns the id of the voice tracked for `note_id`.
    pub fn voice_id(&self, note_id: &str) -> Option<u64> {
        self.state.lock().active.get(note_id).map(|v| v.handle.id())
    }

    /// Returns the tracked notes, sorted.
    pub fn active_notes(&self) -> Vec<String> {
        let mut notes: Vec<String> = self.state.lock().active.keys().cloned().collect();
        notes.sort();
        notes
    }

    fn defer(&self, note_id: String) {
        debug!(note = note_id, "Samples not loaded, deferring note");
        let load = self.store.load();
        let engine = self.clone();
        self.runtime.spawn(async move {
            let result = load.await;
            let mut state = engine.state.lock();
            if !state.pending.remove(&note_id) {
                debug!(note = note_id, "Note released while loading, dropping it");
                return;
            }
            match result {
                Ok(()) if !state.active.contains_key(&note_id) => {
                    engine.start_locked(&mut state, &note_id);
                }
                Ok(()) => {}
                Err(e) => warn!(note = note_id, error = %e, "Unable to play note"),
            }
        });
    }

    fn start_locked(&self, state: &mut VoiceState, note_id: &str) {
        let mapping = self.instrument.note_to_sample(note_id);
        let Some(buffer) = self.store.buffer(&mapping.sample_name) else {
            debug!(
                note = note_id,
                sample = mapping.sample_name,
                "No buffer for sample"
            );
            return;
        };

        let (handle, ended) = self.context.start_voice(buffer, mapping.detune_cents);
        let voice_id = handle.id();
        debug!(
            note = note_id,
            voice = voice_id,
            sample = mapping.sample_name,
            detune = mapping.detune_cents,
            "Note started"
        );
        state.active.insert(
            note_id.to_string(),
            ActiveVoice {
                handle,
                sample_name: mapping.sample_name,
                detune_cents: mapping.detune_cents,
            },
        );
        self.watch(note_id.to_string(), voice_id, ended);
    }

    /// Untracks the voice once it stops sounding, unless the note has moved on
    /// to another voice.
    fn watch(&self, note_id: String, voice_id: u64, ended: VoiceEnded) {
        let state = self.state.clone();
        self.runtime.spawn(async move {
            // A dropped sender means the voice is gone too.
            let _ = ended.await;
            let mut state = state.lock();
            if state
                .active
                .get(&note_id)
                .is_some_and(|voice| voice.handle.id() == voice_id)
            {
                state.active.remove(&note_id);
                debug!(note = note_id, voice = voice_id, "Voice finished");
            }
        });
    }

    /// Returns the sample and detune of the tracked voice for `note_id`.
    pub fn voice_mapping(&self, note_id: &str) -> Option<(String, i32)> {
        self.state
            .lock()
            .active
            .get(note_id)
            .map(|v| (v.sample_name.clone(), v.detune_cents))
    }
}
