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
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use tracing::info;

use keysampler::controller::{keyboard, Controller};
use keysampler::samples::STOP_DELAY;
use keysampler::{audio, config, instrument};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A sample-backed virtual keyboard."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the built-in instruments.
    Instruments {},
    /// Prints the key layout of an instrument.
    Keys {
        /// The instrument id.
        instrument: String,
    },
    /// Loads every sample of the configured instrument and reports on them.
    Verify {
        /// The path to the player config.
        config_path: String,
    },
    /// Plays notes together through the configured device, then releases them.
    Play {
        /// The path to the player config.
        config_path: String,
        /// The notes to play. Key labels and codes work too.
        #[arg(required = true)]
        notes: Vec<String>,
        /// How long to hold the notes, in seconds.
        #[arg(short = 'H', long, default_value_t = 1.0)]
        hold: f64,
    },
    /// Start will play the configured instrument from the keyboard.
    Start {
        /// The path to the player config.
        config_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Instruments {} => {
            println!("Instruments:");
            for instrument in instrument::all() {
                println!("- {}", instrument);
            }
        }
        Commands::Keys { instrument } => {
            let instrument = instrument::by_id(&instrument)
                .ok_or_else(|| format!("unknown instrument {}", instrument))?;

            println!("{}:", instrument.display_name());
            for key in instrument.keys().keys() {
                let mapping = instrument.note_to_sample(&key.note);
                println!(
                    "- {:<4} {:<13} {:<4} {:<5} {:<6} row={} sample={} detune={}",
                    key.display_label,
                    key.code,
                    key.note,
                    key.solfege,
                    key.octave_label,
                    key.row,
                    mapping.sample_name,
                    mapping.detune_cents,
                );
            }
        }
        Commands::Verify { config_path } => {
            let player = config::Player::deserialize(&PathBuf::from(&config_path))?;
            let instrument = instrument::by_id(player.instrument())
                .ok_or_else(|| format!("unknown instrument {}", player.instrument()))?;
            let context = Arc::new(audio::AudioContext::new(
                player.audio().sample_rate(),
                player.audio().channels(),
            ));
            let fetcher = Arc::new(keysampler::samples::FileFetcher::new(&player.samples()));
            let engine =
                keysampler::samples::SampleEngine::new(instrument.clone(), fetcher, context)?;

            engine.init().await?;
            println!(
                "{}: {} samples loaded from {} ({} KiB)",
                instrument.display_name(),
                instrument.sample_list().len(),
                player.samples().display(),
                engine.memory_size() / 1024
            );
        }
        Commands::Play {
            config_path,
            notes,
            hold,
        } => {
            let (player, setup) = config::init_player(&PathBuf::from(&config_path))?;
            let output = setup.device.start(setup.context.clone())?;
            setup.engine.set_master_volume(player.master_volume());
            setup.engine.init().await?;

            let keys = setup.engine.instrument().keys();
            let notes: Vec<String> = notes
                .iter()
                .map(|note| {
                    keys.find(note)
                        .map(|key| key.note.clone())
                        .unwrap_or_else(|| note.clone())
                })
                .collect();

            info!(notes = ?notes, hold, "Playing notes.");
            for note in notes.iter() {
                setup.engine.play_note(note);
            }
            tokio::time::sleep(Duration::from_secs_f64(hold.max(0.0))).await;
            for note in notes.iter() {
                setup.engine.stop_note(note);
            }
            tokio::time::sleep(Duration::from_secs_f64(STOP_DELAY)).await;
            output.stop();
        }
        Commands::Start { config_path } => {
            let (player, setup) = config::init_player(&PathBuf::from(&config_path))?;
            let output = setup.device.start(setup.context.clone())?;
            setup.engine.set_master_volume(player.master_volume());
            setup.engine.init().await?;

            let engine = Arc::new(setup.engine);
            let driver = Arc::new(keyboard::Driver::new(engine.instrument().keys().clone()));
            let mut controller = Controller::new(engine, driver);
            controller.join().await?;
            output.stop();
        }
    }

    Ok(())
}
