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

use crate::keymap::{build_chromatic_keys, ChromaticRow, KeyMap, OctaveLabel};
use crate::note::Note;

use super::{Instrument, NoteResolver};

/// One sample per note from C3 through C6, as semitones from C3.
const SAMPLE_RANGE: std::ops::RangeInclusive<i32> = 0..=36;

const ROWS: [ChromaticRow; 3] = [
    ChromaticRow {
        octave: 3,
        white_keys: [
            "Comma",
            "Period",
            "Slash",
            "KeyO",
            "KeyP",
            "BracketLeft",
            "BracketRight",
        ],
        black_keys: ["KeyL", "Semicolon", "Digit0", "Minus", "Equal"],
        next_c_key: None,
        octave_label: OctaveLabel::Lower,
        row: 0,
    },
    ChromaticRow {
        octave: 4,
        white_keys: ["KeyZ", "KeyX", "KeyC", "KeyV", "KeyB", "KeyN", "KeyM"],
        black_keys: ["KeyS", "KeyD", "KeyG", "KeyH", "KeyJ"],
        next_c_key: None,
        octave_label: OctaveLabel::Middle,
        row: 1,
    },
    ChromaticRow {
        octave: 5,
        white_keys: ["KeyQ", "KeyW", "KeyE", "KeyR", "KeyT", "KeyY", "KeyU"],
        black_keys: ["Digit2", "Digit3", "Digit5", "Digit6", "Digit7"],
        next_c_key: Some("KeyI"),
        octave_label: OctaveLabel::Upper,
        row: 2,
    },
];

fn sample_list() -> Vec<String> {
    SAMPLE_RANGE
        .map(|semitone| Note::from_semitone(semitone).sample_name())
        .collect()
}

/// A grand piano with a recorded sample for every key.
pub fn piano() -> Instrument {
    Instrument::new(
        "piano",
        "Grand Piano",
        "piano",
        "mp3",
        sample_list(),
        NoteResolver::Direct,
        KeyMap::new(build_chromatic_keys(&ROWS)),
    )
}
