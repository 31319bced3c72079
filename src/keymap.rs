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

//! Physical key to note mappings.
//!
//! Keys are identified by their physical position code (`KeyZ`, `Comma`,
//! `Digit2`, ...). Display labels fall back to the QWERTY legend for the code.

use std::collections::HashMap;
use std::fmt;

use crate::note::NOTE_NAMES;

const SOLFEGE: [&str; 12] = [
    "DO", "DO#", "RE", "RE#", "MI", "FA", "FA#", "SOL", "SOL#", "LA", "LA#", "SI",
];
const NOTE_NUMBERS: [u8; 12] = [1, 1, 2, 2, 3, 4, 4, 5, 5, 6, 6, 7];
const IS_BLACK: [bool; 12] = [
    false, true, false, true, false, false, true, false, true, false, true, false,
];

/// Natural notes as (pitch class, solfège number).
const NATURALS: [(usize, u8); 7] = [(0, 1), (2, 2), (4, 3), (5, 4), (7, 5), (9, 6), (11, 7)];

/// Which octave band of the keyboard a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OctaveLabel {
    Lower,
    Middle,
    Upper,
}

impl fmt::Display for OctaveLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OctaveLabel::Lower => write!(f, "lower"),
            OctaveLabel::Middle => write!(f, "middle"),
            OctaveLabel::Upper => write!(f, "upper"),
        }
    }
}

/// One physical key and the note it plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMapping {
    /// The note id, e.g. "C#4".
    pub note: String,
    /// The physical key code, e.g. "KeyS".
    pub code: String,
    /// The label shown for the key.
    pub display_label: String,
    pub is_black: bool,
    /// Solfège number, 1-7.
    pub note_number: u8,
    pub solfege: &'static str,
    pub octave_label: OctaveLabel,
    /// Keyboard row, 0 is the bottom row.
    pub row: u8,
}

/// A row of keys laid out chromatically (white and black keys).
pub struct ChromaticRow {
    pub octave: i32,
    /// Codes for C D E F G A B.
    pub white_keys: [&'static str; 7],
    /// Codes for C# D# F# G# A#.
    pub black_keys: [&'static str; 5],
    /// Code for the C of the next octave, if the row has one.
    pub next_c_key: Option<&'static str>,
    pub octave_label: OctaveLabel,
    pub row: u8,
}

/// A row of keys with natural notes only.
pub struct DiatonicRow {
    pub octave: i32,
    /// Codes for C D E F G A B.
    pub keys: [&'static str; 7],
    pub next_c_key: Option<&'static str>,
    pub octave_label: OctaveLabel,
    pub row: u8,
}

/// Derives the QWERTY legend for a key code.
pub fn code_to_label(code: &str) -> String {
    if let Some(letter) = code.strip_prefix("Key") {
        return letter.to_string();
    }
    if let Some(digit) = code.strip_prefix("Digit") {
        return digit.to_string();
    }
    match code {
        "Comma" => ",",
        "Period" => ".",
        "Slash" => "/",
        "Semicolon" => ";",
        "Quote" => "'",
        "BracketLeft" => "[",
        "BracketRight" => "]",
        "Minus" => "-",
        "Equal" => "=",
        "Space" => "␣",
        "Backslash" => "\\",
        other => other,
    }
    .to_string()
}

fn next_c(code: &str, octave: i32, octave_label: OctaveLabel, row: u8) -> KeyMapping {
    KeyMapping {
        note: format!("C{}", octave + 1),
        code: code.to_string(),
        display_label: code_to_label(code),
        is_black: false,
        note_number: 1,
        solfege: "DO",
        octave_label,
        row,
    }
}

/// Builds key mappings for instruments with black and white keys.
pub fn build_chromatic_keys(rows: &[ChromaticRow]) -> Vec<KeyMapping> {
    let mut keys = Vec::new();

    for config in rows {
        let mut white = config.white_keys.iter();
        let mut black = config.black_keys.iter();

        for pitch_class in 0..12 {
            let is_black = IS_BLACK[pitch_class];
            let code = if is_black { black.next() } else { white.next() };
            let Some(code) = code else {
                continue;
            };

            keys.push(KeyMapping {
                note: format!("{}{}", NOTE_NAMES[pitch_class], config.octave),
                code: code.to_string(),
                display_label: code_to_label(code),
                is_black,
                note_number: NOTE_NUMBERS[pitch_class],
                solfege: SOLFEGE[pitch_class],
                octave_label: config.octave_label,
                row: config.row,
            });
        }

        if let Some(code) = config.next_c_key {
            keys.push(next_c(code, config.octave, config.octave_label, config.row));
        }
    }

    keys
}

/// Builds key mappings for instruments that only play natural notes.
pub fn build_diatonic_keys(rows: &[DiatonicRow]) -> Vec<KeyMapping> {
    let mut keys = Vec::new();

    for config in rows {
        for (code, (pitch_class, number)) in config.keys.iter().zip(NATURALS) {
            keys.push(KeyMapping {
                note: format!("{}{}", NOTE_NAMES[pitch_class], config.octave),
                code: code.to_string(),
                display_label: code_to_label(code),
                is_black: false,
                note_number: number,
                solfege: SOLFEGE[pitch_class],
                octave_label: config.octave_label,
                row: config.row,
            });
        }

        if let Some(code) = config.next_c_key {
            keys.push(next_c(code, config.octave, config.octave_label, config.row));
        }
    }

    keys
}

/// Ordered key mappings with lookup by key code.
#[derive(Debug, Clone)]
pub struct KeyMap {
    keys: Vec<KeyMapping>,
    by_code: HashMap<String, usize>,
}

impl KeyMap {
    /// Creates a key map. Later mappings win when two share a code.
    pub fn new(keys: Vec<KeyMapping>) -> KeyMap {
        let by_code = keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.code.clone(), i))
            .collect();
        KeyMap { keys, by_code }
    }

    /// Returns all mappings in layout order.
    pub fn keys(&self) -> &[KeyMapping] {
        &self.keys
    }

    /// Looks up a mapping by physical key code.
    pub fn by_code(&self, code: &str) -> Option<&KeyMapping> {
        self.by_code.get(code).map(|&i| &self.keys[i])
    }

    /// Looks up a mapping by code, then display label (case-insensitive), then note id.
    pub fn find(&self, token: &str) -> Option<&KeyMapping> {
        self.by_code(token)
            .or_else(|| {
                self.keys
                    .iter()
                    .find(|key| key.display_label.eq_ignore_ascii_case(token))
            })
            .or_else(|| self.keys.iter().find(|key| key.note == token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: ChromaticRow = ChromaticRow {
        octave: 4,
        white_keys: ["KeyZ", "KeyX", "KeyC", "KeyV", "KeyB", "KeyN", "KeyM"],
        black_keys: ["KeyS", "KeyD", "KeyG", "KeyH", "KeyJ"],
        next_c_key: Some("Comma"),
        octave_label: OctaveLabel::Middle,
        row: 1,
    };

    #[test]
    fn test_code_to_label() {
        assert_eq!(code_to_label("KeyQ"), "Q");
        assert_eq!(code_to_label("Digit7"), "7");
        assert_eq!(code_to_label("BracketLeft"), "[");
        assert_eq!(code_to_label("F13"), "F13");
    }

    #[test]
    fn test_chromatic_row() {
        let keys = build_chromatic_keys(&[ROW]);
        assert_eq!(keys.len(), 13);

        assert_eq!(keys[0].note, "C4");
        assert_eq!(keys[0].code, "KeyZ");
        assert_eq!(keys[1].note, "C#4");
        assert_eq!(keys[1].code, "KeyS");
        assert!(keys[1].is_black);
        assert_eq!(keys[1].solfege, "DO#");
        assert_eq!(keys[11].note, "B4");
        assert_eq!(keys[11].note_number, 7);

        let top = &keys[12];
        assert_eq!(top.note, "C5");
        assert_eq!(top.display_label, ",");
        assert_eq!(top.octave_label, OctaveLabel::Middle);
    }

    #[test]
    fn test_diatonic_row() {
        let keys = build_diatonic_keys(&[DiatonicRow {
            octave: 5,
            keys: ["KeyQ", "KeyW", "KeyE", "KeyR", "KeyT", "KeyY", "KeyU"],
            next_c_key: None,
            octave_label: OctaveLabel::Upper,
            row: 1,
        }]);
        let notes: Vec<&str> = keys.iter().map(|k| k.note.as_str()).collect();
        assert_eq!(notes, ["C5", "D5", "E5", "F5", "G5", "A5", "B5"]);
        assert!(keys.iter().all(|k| !k.is_black));
        assert_eq!(keys[4].solfege, "SOL");
        assert_eq!(keys[4].note_number, 5);
    }

    #[test]
    fn test_key_map_find() {
        let map = KeyMap::new(build_chromatic_keys(&[ROW]));
        assert_eq!(map.by_code("KeyX").unwrap().note, "D4");
        assert_eq!(map.find("x").unwrap().note, "D4");
        assert_eq!(map.find("KeyG").unwrap().note, "F#4");
        assert_eq!(map.find("A4").unwrap().code, "KeyN");
        assert!(map.find("KeyQ").is_none());
    }
}
