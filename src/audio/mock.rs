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
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use tracing::{info, span, Level};

use super::context::AudioContext;
use super::OutputHandle;

/// A mock device. Renders the audio graph at real-time pace and throws the
/// output away.
#[derive(Clone)]
pub struct Device {
    name: String,
    buffer_size: u32,
    is_playing: Arc<AtomicBool>,
    blocks_rendered: Arc<AtomicU64>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str, buffer_size: u32) -> Device {
        Device {
            name: name.to_string(),
            buffer_size: buffer_size.max(1),
            is_playing: Arc::new(AtomicBool::new(false)),
            blocks_rendered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns true if the device is currently rendering.
    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::Relaxed)
    }

    /// Returns the number of blocks rendered so far.
    pub fn blocks_rendered(&self) -> u64 {
        self.blocks_rendered.load(Ordering::Relaxed)
    }
}

impl super::Device for Device {
    fn start(&self, context: Arc<AudioContext>) -> Result<OutputHandle, Box<dyn Error>> {
        let span = span!(Level::INFO, "output stream (mock)");
        let _enter = span.enter();

        info!(
            device = self.name,
            sample_rate = context.sample_rate(),
            channels = context.num_channels(),
            buffer_size = self.buffer_size,
            "Starting output stream."
        );

        let stop = Arc::new(AtomicBool::new(false));
        let block_frames = self.buffer_size as usize;
        let block_period =
            Duration::from_secs_f64(block_frames as f64 / context.sample_rate().max(1) as f64);

        self.is_playing.store(true, Ordering::Relaxed);
        let join = {
            let stop = stop.clone();
            let is_playing = self.is_playing.clone();
            let blocks_rendered = self.blocks_rendered.clone();
            thread::spawn(move || {
                let mut block = vec![0.0f32; block_frames * context.num_channels().max(1) as usize];
                let mut deadline = Instant::now();
                while !stop.load(Ordering::Relaxed) {
                    context.render(&mut block);
                    blocks_rendered.fetch_add(1, Ordering::Relaxed);

                    deadline += block_period;
                    if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
                        thread::sleep(wait);
                    }
                }
                is_playing.store(false, Ordering::Relaxed);
            })
        };

        Ok(OutputHandle::new(stop, join))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
