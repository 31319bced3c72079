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

use std::{
    collections::HashMap,
    io::{self, Cursor},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::samples::SampleFetcher;

/// Encodes interleaved samples as a 16-bit WAV file in memory.
pub fn wav_bytes(samples: &[f32], channels: u16, sample_rate: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(
            &mut cursor,
            WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            },
        )
        .unwrap();
        for sample in samples {
            writer
                .write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// A fetcher serving files from memory. Counts fetches and can hold them back
/// until released.
pub struct MemoryFetcher {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    fetches: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl MemoryFetcher {
    pub fn new() -> MemoryFetcher {
        MemoryFetcher {
            files: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// A fetcher whose fetches wait until `release` is called.
    pub fn gated() -> MemoryFetcher {
        MemoryFetcher {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..MemoryFetcher::new()
        }
    }

    /// Serves every sample of an instrument as a short mono WAV.
    pub fn with_instrument(self, instrument: &crate::instrument::Instrument, frames: usize) -> Self {
        for name in instrument.sample_list() {
            self.insert(
                &instrument.sample_path(name),
                wav_bytes(&vec![0.5; frames], 1, 44100),
            );
        }
        self
    }

    pub fn insert(&self, path: &Path, bytes: Vec<u8>) {
        self.files.lock().insert(path.to_path_buf(), bytes);
    }

    pub fn remove(&self, path: &Path) {
        self.files.lock().remove(path);
    }

    /// Lets every pending and future fetch through.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1024);
        }
    }

    /// Returns the number of fetches started.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SampleFetcher for MemoryFetcher {
    fn fetch(&self, path: &Path) -> BoxFuture<'static, io::Result<Vec<u8>>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let result = self
            .files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()));
        let gate = self.gate.clone();
        async move {
            if let Some(gate) = gate {
                let _permit = gate.acquire_owned().await;
            }
            result
        }
        .boxed()
    }
}

/// Wait for the given predicate to return true or fail.
pub fn eventually<F>(predicate: F, error_msg: &str)
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    let tick = Duration::from_millis(10);
    let timeout = Duration::from_secs(3);

    loop {
        if start.elapsed() > timeout {
            panic!("{}", error_msg);
        }
        if predicate() {
            return;
        }
        thread::sleep(tick);
    }
}

/// Wait for the given async predicate to return true or fail.
pub async fn eventually_async<F, Fut>(mut predicate: F, error_msg: &str)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    let tick = Duration::from_millis(10);
    let timeout = Duration::from_secs(3);

    loop {
        if start.elapsed() > timeout {
            panic!("{}", error_msg);
        }
        if predicate().await {
            return;
        }
        tokio::time::sleep(tick).await;
    }
}
