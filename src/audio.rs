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
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use tracing::warn;

use crate::config;

pub mod buffer;
pub mod compressor;
pub mod context;
pub mod cpal;
pub mod master;
pub mod mixer;
pub mod mock;
pub mod param;
pub mod thread_priority;
pub mod voice;

pub use buffer::AudioBuffer;
pub use context::AudioContext;

/// An output device that can drive an audio context.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Starts pulling audio from the context. Output continues until the
    /// returned handle is stopped or dropped.
    fn start(&self, context: Arc<AudioContext>) -> Result<OutputHandle, Box<dyn Error>>;
}

/// Keeps an output stream running. Dropping it stops the stream.
pub struct OutputHandle {
    stop: Arc<AtomicBool>,
    join: Option<thread::JoinHandle<()>>,
}

impl OutputHandle {
    fn new(stop: Arc<AtomicBool>, join: thread::JoinHandle<()>) -> OutputHandle {
        OutputHandle {
            stop,
            join: Some(join),
        }
    }

    /// Stops the stream and waits for its thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("Output thread panicked.");
            }
        }
    }
}

impl Drop for OutputHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets a device with the given name.
pub fn get_device(config: Option<config::Audio>) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let config = match config {
        Some(config) => config,
        None => return Err("there must be an audio device specified".into()),
    };

    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device, config.buffer_size())));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
