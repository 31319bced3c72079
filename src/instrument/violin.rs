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

use crate::keymap::{build_diatonic_keys, DiatonicRow, KeyMap, OctaveLabel};

use super::{Instrument, NoteResolver, TieBreak};

/// Recorded pitches with their semitone offsets from C3. Notes in between are
/// detuned from the nearest one.
const SAMPLES: [(&str, i32); 9] = [
    ("C4", 12),
    ("E4", 16),
    ("G4", 19),
    ("A4", 21),
    ("C5", 24),
    ("E5", 28),
    ("G5", 31),
    ("A5", 33),
    ("C6", 36),
];

const ROWS: [DiatonicRow; 2] = [
    DiatonicRow {
        octave: 4,
        keys: ["KeyA", "KeyS", "KeyD", "KeyF", "KeyG", "KeyH", "KeyJ"],
        next_c_key: None,
        octave_label: OctaveLabel::Lower,
        row: 0,
    },
    DiatonicRow {
        octave: 5,
        keys: ["KeyQ", "KeyW", "KeyE", "KeyR", "KeyT", "KeyY", "KeyU"],
        next_c_key: Some("KeyI"),
        octave_label: OctaveLabel::Upper,
        row: 1,
    },
];

/// A violin with four samples per octave.
///
/// Equidistant notes (D between C and E) are pitched down from the sample
/// above.
pub fn violin() -> Instrument {
    let resolver = NoteResolver::Nearest {
        samples: SAMPLES
            .iter()
            .map(|&(name, semitone)| (name.to_string(), semitone))
            .collect(),
        tie_break: TieBreak::Higher,
    };

    Instrument::new(
        "violin",
        "Violin",
        "violin",
        "mp3",
        SAMPLES.iter().map(|(name, _)| name.to_string()).collect(),
        resolver,
        KeyMap::new(build_diatonic_keys(&ROWS)),
    )
}
