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

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::audio::AudioContext;
use crate::instrument;
use crate::samples::{FileFetcher, SampleEngine};

mod audio;
mod error;
mod player;

pub use self::audio::Audio;
pub use self::error::ConfigError;
pub use self::player::Player;

/// Everything needed to play an instrument, built from a player configuration.
pub struct Setup {
    pub device: Arc<dyn crate::audio::Device>,
    pub context: Arc<AudioContext>,
    pub engine: SampleEngine,
}

/// Builds the audio context, device and engine described by the given
/// configuration file. Nothing is started or loaded yet.
pub fn init_player(path: &Path) -> Result<(Player, Setup), Box<dyn Error>> {
    let player = Player::deserialize(path)?;
    let setup = init_from(&player)?;
    Ok((player, setup))
}

/// Builds the audio context, device and engine for a parsed configuration.
pub fn init_from(player: &Player) -> Result<Setup, Box<dyn Error>> {
    let instrument = instrument::by_id(player.instrument())
        .ok_or_else(|| format!("unknown instrument {}", player.instrument()))?;
    let audio_config = player.audio().clone();
    let context = Arc::new(AudioContext::new(
        audio_config.sample_rate(),
        audio_config.channels(),
    ));
    let device = crate::audio::get_device(Some(audio_config))?;
    let fetcher = Arc::new(FileFetcher::new(&player.samples()));
    let engine = SampleEngine::new(instrument, fetcher, context.clone())?;

    info!(
        instrument = player.instrument(),
        device = %device,
        samples = %player.samples().display(),
        "Player configured."
    );

    Ok(Setup {
        device,
        context,
        engine,
    })
}
