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

//! Sample-backed note playback.
//!
//! This module provides:
//! - Fetching and decoding an instrument's samples into memory
//! - One voice per sounding note, with a release fade on stop
//! - The engine binding both to an instrument

mod decode;
mod engine;
mod fetch;
mod store;
mod voice;

pub use decode::{decode, DecodeError};
pub use engine::{EngineError, SampleEngine};
pub use fetch::{FileFetcher, SampleFetcher};
pub use store::{LoadError, LoadStatus, SampleStore};
pub use voice::{VoiceEngine, RELEASE_FLOOR, RELEASE_TIME, STOP_DELAY};
