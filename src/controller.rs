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

use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Instrument, Level};

use crate::samples::SampleEngine;

pub mod keyboard;

/// Controller events that will trigger behavior in the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Starts the given note.
    Press(String),

    /// Releases the given note.
    Release(String),

    /// Glides the master volume to the given value.
    Volume(f32),

    /// Stops the controller.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Drives an engine from a driver's events.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(engine: Arc<SampleEngine>, driver: Arc<dyn Driver>) -> Controller {
        let span = span!(Level::INFO, "controller");
        Controller {
            handle: tokio::spawn(Controller::trigger_events(engine, driver).instrument(span)),
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Triggers engine events by watching the driver and getting events from it.
    async fn trigger_events(engine: Arc<SampleEngine>, driver: Arc<dyn Driver>) {
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let join_handle = driver.monitor_events(events_tx);

        info!(instrument = SampleEngine::instrument(&engine).id(), "Controller started.");

        while let Some(event) = events_rx.recv().await {
            info!(event = ?event, "Received event.");
            match event {
                Event::Press(note) => engine.play_note(&note),
                Event::Release(note) => engine.stop_note(&note),
                Event::Volume(volume) => engine.set_master_volume(volume),
                Event::Quit => break,
            }
        }

        info!("Controller closing.");
        // Reading stdin can't be interrupted, so a driver blocked on input is
        // left behind rather than awaited.
        if join_handle.is_finished() {
            match join_handle.await {
                Ok(Err(e)) => error!("Event monitor failed: {}", e),
                Err(e) => error!("Error waiting for event monitor to stop: {}", e),
                Ok(Ok(())) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioContext;
    use crate::instrument;
    use crate::testutil::MemoryFetcher;

    /// Replays a fixed list of events.
    struct ScriptedDriver {
        events: Vec<Event>,
    }

    impl Driver for ScriptedDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events = self.events.clone();
            tokio::spawn(async move {
                for event in events {
                    events_tx.send(event).await.map_err(io::Error::other)?;
                }
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_controller_drives_engine() {
        let violin = Arc::new(instrument::violin());
        let fetcher = Arc::new(MemoryFetcher::new().with_instrument(&violin, 44100));
        let context = Arc::new(AudioContext::new(1000, 2));
        let engine = Arc::new(SampleEngine::new(violin, fetcher, context.clone()).unwrap());
        engine.init().await.unwrap();

        let driver = Arc::new(ScriptedDriver {
            events: vec![
                Event::Press("C4".into()),
                Event::Press("E4".into()),
                Event::Release("C4".into()),
                Event::Volume(0.5),
                Event::Quit,
                Event::Press("G4".into()),
            ],
        });
        let mut controller = Controller::new(engine.clone(), driver);
        controller.join().await.unwrap();

        assert_eq!(engine.active_notes(), vec!["E4"]);
        assert!((context.master_output().volume_at(10.0) - 0.5).abs() < 1e-3);
    }
}
