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

//! Sample loading and caching for an instrument.
//!
//! Every sample the instrument lists is fetched and decoded into memory before
//! any of them is used, so playback never waits on I/O. Only one load runs at a
//! time; callers arriving while it runs share its outcome.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use futures_util::future::{try_join_all, BoxFuture, Shared};
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::decode::{decode, DecodeError};
use super::fetch::SampleFetcher;
use crate::audio::AudioBuffer;
use crate::instrument::Instrument;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to fetch sample {path}: {source}")]
    Fetch { path: PathBuf, source: io::Error },

    #[error("failed to decode sample {path}: {source}")]
    Decode { path: PathBuf, source: DecodeError },

    #[error("sample load task failed: {0}")]
    Task(String),
}

/// Where a store is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Unloaded,
    Loading,
    Loaded,
}

type LoadFuture = Shared<BoxFuture<'static, Result<(), Arc<LoadError>>>>;

struct Inner {
    instrument: Arc<Instrument>,
    fetcher: Arc<dyn SampleFetcher>,
    /// Buffers are resampled to this rate when they're decoded.
    output_rate: u32,
    /// Set once, when a load succeeds.
    buffers: OnceLock<HashMap<String, AudioBuffer>>,
    in_flight: Mutex<Option<LoadFuture>>,
}

/// Decoded samples for one instrument.
#[derive(Clone)]
pub struct SampleStore {
    inner: Arc<Inner>,
    runtime: Handle,
}

impl SampleStore {
    /// Creates an empty store. Loads run as tasks on `runtime`.
    pub fn new(
        instrument: Arc<Instrument>,
        fetcher: Arc<dyn SampleFetcher>,
        output_rate: u32,
        runtime: Handle,
    ) -> SampleStore {
        SampleStore {
            inner: Arc::new(Inner {
                instrument,
                fetcher,
                output_rate,
                buffers: OnceLock::new(),
                in_flight: Mutex::new(None),
            }),
            runtime,
        }
    }

    pub fn status(&self) -> LoadStatus {
        if self.inner.buffers.get().is_some() {
            LoadStatus::Loaded
        } else if self.inner.in_flight.lock().is_some() {
            LoadStatus::Loading
        } else {
            LoadStatus::Unloaded
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.buffers.get().is_some()
    }

    /// Returns the decoded buffer for a sample, if the store is loaded and has it.
    pub fn buffer(&self, sample_name: &str) -> Option<AudioBuffer> {
        self.inner.buffers.get()?.get(sample_name).cloned()
    }

    /// Returns the memory used by decoded samples, in bytes.
    pub fn memory_size(&self) -> usize {
        self.inner
            .buffers
            .get()
            .map(|buffers| buffers.values().map(AudioBuffer::memory_size).sum())
            .unwrap_or(0)
    }

    /// Loads every sample the instrument lists. Returns immediately if that
    /// has already happened, joins the running load if there is one and starts
    /// a new one otherwise. A failed load leaves the store unloaded.
    pub fn load(&self) -> impl std::future::Future<Output = Result<(), Arc<LoadError>>> + Send {
        let pending = self.start_load();
        async move {
            match pending {
                Some(load) => load.await,
                None => Ok(()),
            }
        }
    }

    fn start_load(&self) -> Option<LoadFuture> {
        let mut in_flight = self.inner.in_flight.lock();
        if self.inner.buffers.get().is_some() {
            return None;
        }
        if let Some(load) = in_flight.as_ref() {
            debug!(instrument = self.inner.instrument.id(), "Joining in-flight load");
            return Some(load.clone());
        }

        // The task clears `in_flight` when it finishes, which it can't do before
        // we've stored the future below since we hold the lock.
        let task = self.runtime.spawn(Inner::run_load(self.inner.clone()));
        let inner = self.inner.clone();
        let load = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    inner.in_flight.lock().take();
                    Err(Arc::new(LoadError::Task(e.to_string())))
                }
            }
        }
        .boxed()
        .shared();

        *in_flight = Some(load.clone());
        Some(load)
    }
}

impl Inner {
    async fn run_load(self: Arc<Self>) -> Result<(), Arc<LoadError>> {
        let start = Instant::now();
        let instrument = self.instrument.id();
        info!(
            instrument,
            samples = self.instrument.sample_list().len(),
            "Loading samples"
        );

        let result = try_join_all(
            self.instrument
                .sample_list()
                .iter()
                .map(|name| self.load_sample(name.clone())),
        )
        .await;

        let result = match result {
            Ok(loaded) => {
                let buffers: HashMap<String, AudioBuffer> = loaded.into_iter().collect();
                let memory_kb = buffers.values().map(AudioBuffer::memory_size).sum::<usize>() / 1024;
                // Only this task ever sets the buffers.
                let _ = self.buffers.set(buffers);
                info!(
                    instrument,
                    memory_kb,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Samples loaded"
                );
                Ok(())
            }
            Err(e) => {
                warn!(instrument, error = %e, "Failed to load samples");
                Err(Arc::new(e))
            }
        };

        self.in_flight.lock().take();
        result
    }

    async fn load_sample(&self, name: String) -> Result<(String, AudioBuffer), LoadError> {
        let path = self.instrument.sample_path(&name);
        let bytes = self
            .fetcher
            .fetch(&path)
            .await
            .map_err(|source| LoadError::Fetch {
                path: path.clone(),
                source,
            })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string);
        let output_rate = self.output_rate;
        let decode_path = path.clone();
        let buffer = tokio::task::spawn_blocking(move || {
            decode(bytes, extension.as_deref())
                .map(|buffer| buffer.resampled(output_rate))
                .map_err(|source| LoadError::Decode {
                    path: decode_path,
                    source,
                })
        })
        .await
        .map_err(|e| LoadError::Task(e.to_string()))??;

        debug!(
            path = ?path,
            channels = buffer.channel_count(),
            duration_ms = buffer.duration().as_millis(),
            "Sample decoded"
        );
        Ok((name, buffer))
    }
}

impl fmt::Debug for SampleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleStore")
            .field("instrument", &self.inner.instrument.id())
            .field("status", &self.status())
            .field("memory_kb", &(self.memory_size() / 1024))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument;
    use crate::testutil::{eventually_async, wav_bytes, MemoryFetcher};

    fn store(fetcher: Arc<MemoryFetcher>, output_rate: u32) -> SampleStore {
        SampleStore::new(
            Arc::new(instrument::violin()),
            fetcher,
            output_rate,
            Handle::current(),
        )
    }

    #[tokio::test]
    async fn test_load_decodes_every_sample() {
        let violin = instrument::violin();
        let fetcher = Arc::new(MemoryFetcher::new().with_instrument(&violin, 441));
        let store = store(fetcher.clone(), 44100);

        assert_eq!(store.status(), LoadStatus::Unloaded);
        assert!(store.buffer("C4").is_none());

        store.load().await.unwrap();
        assert_eq!(store.status(), LoadStatus::Loaded);
        assert_eq!(fetcher.fetches(), violin.sample_list().len());
        for name in violin.sample_list() {
            assert_eq!(store.buffer(name).unwrap().frames(), 441);
        }
        assert!(store.memory_size() > 0);

        // Loading again is a no-op.
        store.load().await.unwrap();
        assert_eq!(fetcher.fetches(), violin.sample_list().len());
    }

    #[tokio::test]
    async fn test_samples_resampled_to_output_rate() {
        let violin = instrument::violin();
        let fetcher = Arc::new(MemoryFetcher::new().with_instrument(&violin, 441));
        let store = store(fetcher, 88200);

        store.load().await.unwrap();
        let buffer = store.buffer("G4").unwrap();
        assert_eq!(buffer.sample_rate(), 88200);
        assert!((buffer.frames() as i64 - 882).abs() <= 1);
    }

    #[tokio::test]
    async fn test_concurrent_loads_fetch_once() {
        let violin = instrument::violin();
        let fetcher = Arc::new(MemoryFetcher::gated().with_instrument(&violin, 64));
        let store = store(fetcher.clone(), 44100);

        let loads: Vec<_> = (0..5).map(|_| store.load()).collect();
        assert_eq!(store.status(), LoadStatus::Loading);

        let joined = tokio::spawn(futures_util::future::join_all(loads));
        eventually_async(
            || async { fetcher.fetches() == violin.sample_list().len() },
            "fetches never started",
        )
        .await;
        fetcher.release();

        let results = joined.await.unwrap();
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(fetcher.fetches(), violin.sample_list().len());
        assert_eq!(store.status(), LoadStatus::Loaded);
    }

    #[tokio::test]
    async fn test_failure_then_retry() {
        let violin = instrument::violin();
        let fetcher = Arc::new(MemoryFetcher::new().with_instrument(&violin, 64));
        let missing = violin.sample_path("A5");
        fetcher.remove(&missing);
        let store = store(fetcher.clone(), 44100);

        let (first, second) = tokio::join!(store.load(), store.load());
        let first = first.unwrap_err();
        let second = second.unwrap_err();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(matches!(*first, LoadError::Fetch { .. }));
        assert_eq!(store.status(), LoadStatus::Unloaded);
        assert!(store.buffer("C4").is_none());

        fetcher.insert(&missing, wav_bytes(&[0.5; 64], 1, 44100));
        store.load().await.unwrap();
        assert_eq!(store.status(), LoadStatus::Loaded);
    }

    #[tokio::test]
    async fn test_decode_failure_fails_load() {
        let violin = instrument::violin();
        let fetcher = Arc::new(MemoryFetcher::new().with_instrument(&violin, 64));
        fetcher.insert(&violin.sample_path("E4"), b"not audio".to_vec());
        let store = store(fetcher, 44100);

        let err = store.load().await.unwrap_err();
        assert!(matches!(*err, LoadError::Decode { .. }));
        assert!(err.to_string().contains("E4"));
        assert!(!store.is_loaded());
    }
}
