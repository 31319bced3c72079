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

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;
use crate::keymap::KeyMap;
use crate::note::Note;

const QUIT: &str = "quit";
const VOLUME: &str = "volume";
const RELEASE_PREFIX: char = '-';

/// A controller that plays notes from lines typed on stdin. Each token is a key
/// label, key code or note id; a leading `-` releases the note instead.
pub struct Driver {
    keys: KeyMap,
}

impl Driver {
    pub fn new(keys: KeyMap) -> Driver {
        Driver { keys }
    }

    /// Resolves a token to a note id.
    fn note_for(&self, token: &str) -> Option<String> {
        if let Some(key) = self.keys.find(token) {
            return Some(key.note.clone());
        }
        token.parse::<Note>().ok().map(|note| note.to_string())
    }

    /// Turns one line of input into events.
    fn parse_line(&self, line: &str) -> Vec<Event> {
        let mut tokens = line.split_whitespace().peekable();
        let mut events = Vec::new();

        while let Some(token) = tokens.next() {
            if token.eq_ignore_ascii_case(QUIT) {
                events.push(Event::Quit);
                break;
            }
            if token.eq_ignore_ascii_case(VOLUME) {
                match tokens.next().map(str::parse::<f32>) {
                    Some(Ok(volume)) => events.push(Event::Volume(volume)),
                    _ => warn!(line, "Volume needs a number"),
                }
                continue;
            }

            let (release, key) = match token.strip_prefix(RELEASE_PREFIX) {
                Some(key) if !key.is_empty() => (true, key),
                _ => (false, token),
            };
            match self.note_for(key) {
                Some(note) if release => events.push(Event::Release(note)),
                Some(note) => events.push(Event::Press(note)),
                None => warn!(input = token, "Unrecognized input"),
            }
        }

        events
    }

    /// Reads and dispatches one line. Returns false once input is exhausted or
    /// the user quit.
    fn monitor_io<R, W>(
        &self,
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Keys (label, code or note; {}key releases; {} <level>; {}): ",
            RELEASE_PREFIX, VOLUME, QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            events_tx
                .blocking_send(Event::Quit)
                .map_err(io::Error::other)?;
            return Ok(false);
        }

        let mut keep_going = true;
        for event in self.parse_line(&input) {
            keep_going &= event != Event::Quit;
            events_tx.blocking_send(event).map_err(io::Error::other)?;
        }
        Ok(keep_going)
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let driver = Driver::new(self.keys.clone());
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!(keys = driver.keys.keys().len(), "Keyboard driver started.");

            while driver.monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            Ok(())
        })
    }
}
