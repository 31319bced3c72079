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

//! Sample engine: one instrument's samples and voices behind init/play/stop.

use std::sync::Arc;

use tokio::runtime::{Handle, TryCurrentError};
use tracing::info;

use super::fetch::SampleFetcher;
use super::store::{LoadError, LoadStatus, SampleStore};
use super::voice::VoiceEngine;
use crate::audio::AudioContext;
use crate::instrument::Instrument;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("sample engine needs a tokio runtime: {0}")]
    NoRuntime(#[from] TryCurrentError),

    #[error("unable to load samples: {0}")]
    Load(#[from] Arc<LoadError>),
}

/// Plays one instrument through a shared audio context.
pub struct SampleEngine {
    instrument: Arc<Instrument>,
    context: Arc<AudioContext>,
    store: SampleStore,
    voices: VoiceEngine,
}

impl SampleEngine {
    /// Creates an engine on the current tokio runtime. Nothing is fetched
    /// until `init` or the first `play_note`.
    pub fn new(
        instrument: Arc<Instrument>,
        fetcher: Arc<dyn SampleFetcher>,
        context: Arc<AudioContext>,
    ) -> Result<SampleEngine, EngineError> {
        Ok(Self::with_runtime(
            instrument,
            fetcher,
            context,
            Handle::try_current()?,
        ))
    }

    /// Creates an engine whose background work runs on `runtime`.
    pub fn with_runtime(
        instrument: Arc<Instrument>,
        fetcher: Arc<dyn SampleFetcher>,
        context: Arc<AudioContext>,
        runtime: Handle,
    ) -> SampleEngine {
        let store = SampleStore::new(
            instrument.clone(),
            fetcher,
            context.sample_rate(),
            runtime.clone(),
        );
        let voices = VoiceEngine::new(instrument.clone(), store.clone(), context.clone(), runtime);
        info!(instrument = %instrument, "Sample engine created");
        SampleEngine {
            instrument,
            context,
            store,
            voices,
        }
    }

    /// Loads every sample. Completes once they are all ready, or with the
    /// first failure; a failed init can be retried.
    pub async fn init(&self) -> Result<(), EngineError> {
        self.store.load().await?;
        Ok(())
    }

    /// Starts `note_id`. Never fails: notes that can't be played are ignored.
    pub fn play_note(&self, note_id: &str) {
        self.voices.play_note(note_id);
    }

    /// Releases `note_id` with a fade out. Does nothing if it isn't sounding.
    pub fn stop_note(&self, note_id: &str) {
        self.voices.stop_note(note_id);
    }

    /// Glides the shared master volume to `value`.
    pub fn set_master_volume(&self, value: f32) {
        self.context.set_master_volume(value);
    }

    pub fn instrument(&self) -> &Arc<Instrument> {
        &self.instrument
    }

    pub fn status(&self) -> LoadStatus {
        self.store.status()
    }

    /// Returns the number of notes with a tracked voice.
    pub fn active_voice_count(&self) -> usize {
        self.voices.active_count()
    }

    /// Returns the notes with a tracked voice, sorted.
    pub fn active_notes(&self) -> Vec<String> {
        self.voices.active_notes()
    }

    /// Returns the memory used by decoded samples, in bytes.
    pub fn memory_size(&self) -> usize {
        self.store.memory_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument;
    use crate::testutil::MemoryFetcher;

    fn context() -> Arc<AudioContext> {
        Arc::new(AudioContext::new(1000, 2))
    }

    #[test]
    fn test_new_needs_runtime() {
        let piano = Arc::new(instrument::piano());
        let result = SampleEngine::new(piano, Arc::new(MemoryFetcher::new()), context());
        assert!(matches!(result, Err(EngineError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn test_init_then_play() {
        let piano = Arc::new(instrument::piano());
        let fetcher = Arc::new(MemoryFetcher::new().with_instrument(&piano, 4410));
        let context = context();
        let engine = SampleEngine::new(piano.clone(), fetcher.clone(), context.clone()).unwrap();

        assert_eq!(engine.status(), LoadStatus::Unloaded);
        engine.init().await.unwrap();
        assert_eq!(engine.status(), LoadStatus::Loaded);
        assert_eq!(fetcher.fetches(), 37);
        assert!(engine.memory_size() > 0);

        engine.play_note("C#4");
        engine.play_note("F5");
        // No sample by that name, so nothing plays.
        engine.play_note("C2147483647");
        assert_eq!(engine.active_notes(), vec!["C#4", "F5"]);

        // Every piano note has its own sample, so nothing is detuned.
        let mut out = vec![0.0; 20];
        context.render(&mut out);
        assert_eq!(context.active_voices(), 2);

        engine.stop_note("C#4");
        assert_eq!(engine.active_voice_count(), 1);
    }

    #[tokio::test]
    async fn test_init_failure_reported_and_retryable() {
        let piano = Arc::new(instrument::piano());
        let fetcher = Arc::new(MemoryFetcher::new().with_instrument(&piano, 64));
        let missing = piano.sample_path("Fs4");
        let payload = crate::testutil::wav_bytes(&[0.5; 64], 1, 44100);
        fetcher.remove(&missing);
        let engine = SampleEngine::new(piano, fetcher.clone(), context()).unwrap();

        let err = engine.init().await.unwrap_err();
        assert!(matches!(err, EngineError::Load(_)));
        assert_eq!(engine.status(), LoadStatus::Unloaded);

        // Nothing is playable after a failed load. The press retries the load,
        // which fails the same way.
        engine.play_note("C4");
        assert!(engine.init().await.is_err());
        assert_eq!(engine.active_voice_count(), 0);

        fetcher.insert(&missing, payload);
        engine.init().await.unwrap();
        engine.play_note("C4");
        assert_eq!(engine.active_voice_count(), 1);
    }

    #[tokio::test]
    async fn test_master_volume_is_shared() {
        let context = context();
        let piano = SampleEngine::new(
            Arc::new(instrument::piano()),
            Arc::new(MemoryFetcher::new()),
            context.clone(),
        )
        .unwrap();
        let violin = SampleEngine::new(
            Arc::new(instrument::violin()),
            Arc::new(MemoryFetcher::new()),
            context.clone(),
        )
        .unwrap();

        piano.set_master_volume(0.3);
        violin.set_master_volume(0.6);

        let master = context.master_output();
        assert!((master.volume_at(1.0) - 0.6).abs() < 1e-3);
    }
}
