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

use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use super::audio::Audio;
use super::error::ConfigError;

const DEFAULT_INSTRUMENT: &str = "piano";
const DEFAULT_MASTER_VOLUME: f32 = 1.0;
const DEFAULT_SAMPLES_PATH: &str = "samples";

/// The configuration for the keyboard player.
#[derive(Deserialize, Clone, Debug)]
pub struct Player {
    /// The audio output configuration.
    audio: Audio,
    /// Base path that instrument sample directories live under.
    samples: Option<PathBuf>,
    /// The instrument to play (default: piano).
    instrument: Option<String>,
    /// Initial master volume (default: 1.0).
    master_volume: Option<f32>,

    /// Directory of the file this was read from; relative paths resolve
    /// against it.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Player {
    /// Parse a player configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Player, ConfigError> {
        let mut player = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Player>()?;
        player.base_dir = path.parent().map(Path::to_path_buf);
        Ok(player)
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// Returns the sample base path, resolved against the config file's directory.
    pub fn samples(&self) -> PathBuf {
        let samples = self
            .samples
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SAMPLES_PATH));
        match &self.base_dir {
            Some(base_dir) if samples.is_relative() => base_dir.join(samples),
            _ => samples,
        }
    }

    /// Returns the instrument id (default: piano).
    pub fn instrument(&self) -> &str {
        self.instrument.as_deref().unwrap_or(DEFAULT_INSTRUMENT)
    }

    /// Returns the initial master volume (default: 1.0).
    pub fn master_volume(&self) -> f32 {
        self.master_volume.unwrap_or(DEFAULT_MASTER_VOLUME)
    }
}
