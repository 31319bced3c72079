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

//! Note identifiers.
//!
//! A note id is a pitch-class letter, optional accidentals and an octave, e.g.
//! `C4`, `C#4`, `Db4`. Sample files spell sharps with a lowercase `s` (`Cs4`),
//! so that spelling is accepted too.

use std::fmt;
use std::str::FromStr;

/// Chromatic pitch-class names, spelled with sharps.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// The octave whose C is semitone zero.
const REFERENCE_OCTAVE: i32 = 3;

/// Error produced when a note id cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoteError {
    #[error("empty note id")]
    Empty,

    #[error("unknown note letter in '{0}'")]
    Letter(String),

    #[error("missing or invalid octave in '{0}'")]
    Octave(String),
}

/// A musical pitch, stored as a semitone offset from C3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Note {
    semitone: i32,
}

impl Note {
    /// Creates a note from its semitone offset from C3.
    pub fn from_semitone(semitone: i32) -> Note {
        Note { semitone }
    }

    /// Returns the semitone offset from C3.
    pub fn semitone(&self) -> i32 {
        self.semitone
    }

    /// Returns the pitch class (0 = C, 11 = B).
    pub fn pitch_class(&self) -> usize {
        self.semitone.rem_euclid(12) as usize
    }

    /// Returns the octave number.
    pub fn octave(&self) -> i32 {
        self.semitone.div_euclid(12) + REFERENCE_OCTAVE
    }

    /// Returns true if this note sits on a black key.
    pub fn is_black(&self) -> bool {
        NOTE_NAMES[self.pitch_class()].ends_with('#')
    }

    /// Returns the sample file spelling of this note (`C#4` becomes `Cs4`).
    pub fn sample_name(&self) -> String {
        sample_name_for(&self.to_string())
    }
}

/// Rewrites sharps the way sample files are named on disk.
pub fn sample_name_for(note_id: &str) -> String {
    note_id.replace('#', "s")
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NOTE_NAMES[self.pitch_class()], self.octave())
    }
}

impl FromStr for Note {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars().peekable();
        let letter = chars.next().ok_or(NoteError::Empty)?;
        let base = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(NoteError::Letter(s.to_string())),
        };

        let mut accidental = 0;
        while let Some(&c) = chars.peek() {
            match c {
                '#' | 's' => accidental += 1,
                'b' => accidental -= 1,
                _ => break,
            }
            chars.next();
        }

        let octave_error = || NoteError::Octave(s.to_string());
        let octave: i32 = chars
            .collect::<String>()
            .parse()
            .map_err(|_| octave_error())?;

        let semitone = octave
            .checked_sub(REFERENCE_OCTAVE)
            .and_then(|octave| octave.checked_mul(12))
            .and_then(|semitone| semitone.checked_add(base + accidental))
            .ok_or_else(octave_error)?;

        Ok(Note { semitone })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        assert_eq!(Note::from_str("C3").unwrap().semitone(), 0);
        assert_eq!(Note::from_str("C4").unwrap().semitone(), 12);
        assert_eq!(Note::from_str("B2").unwrap().semitone(), -1);
        assert_eq!(Note::from_str("A4").unwrap().semitone(), 21);
    }

    #[test]
    fn test_accidental_spellings() {
        let sharp: Note = "C#4".parse().unwrap();
        let sample: Note = "Cs4".parse().unwrap();
        let flat: Note = "Db4".parse().unwrap();
        assert_eq!(sharp, sample);
        assert_eq!(sharp, flat);
        assert_eq!(sharp.semitone(), 13);

        // Accidentals can cross an octave boundary.
        assert_eq!("Cb4".parse::<Note>().unwrap(), "B3".parse::<Note>().unwrap());
        assert_eq!("B#3".parse::<Note>().unwrap(), "C4".parse::<Note>().unwrap());
    }

    #[test]
    fn test_display_and_sample_name() {
        let note = Note::from_semitone(13);
        assert_eq!(note.to_string(), "C#4");
        assert_eq!(note.sample_name(), "Cs4");
        assert!(note.is_black());
        assert_eq!(Note::from_semitone(-1).to_string(), "B2");
        assert_eq!(sample_name_for("F#5"), "Fs5");
    }

    #[test]
    fn test_invalid() {
        assert_eq!("".parse::<Note>(), Err(NoteError::Empty));
        assert_eq!("H4".parse::<Note>(), Err(NoteError::Letter("H4".into())));
        assert_eq!("C".parse::<Note>(), Err(NoteError::Octave("C".into())));
        assert_eq!("C#x".parse::<Note>(), Err(NoteError::Octave("C#x".into())));
    }

    #[test]
    fn test_octave_out_of_range() {
        for id in ["C2147483647", "C-2147483648", "B#178956973", "C99999999999"] {
            assert_eq!(id.parse::<Note>(), Err(NoteError::Octave(id.into())), "{}", id);
        }
        // The largest octave that still fits parses normally.
        assert_eq!(
            "C178956973".parse::<Note>().unwrap().semitone(),
            (178956973 - 3) * 12
        );
    }
}
