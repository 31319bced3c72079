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

//! Instrument descriptors.
//!
//! An instrument names the samples it needs and resolves any note id to one of
//! those samples plus a detune in cents (100 cents = one semitone).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::keymap::KeyMap;
use crate::note::{sample_name_for, Note, NoteError};

mod piano;
mod violin;

pub use piano::piano;
pub use violin::violin;

/// The sample to play for a note and the pitch correction to apply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleMapping {
    pub sample_name: String,
    pub detune_cents: i32,
}

/// How equidistant samples are chosen by nearest-neighbor resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// The first candidate in sample-list order wins.
    #[default]
    First,
    /// The lower sample wins (it gets pitched up).
    Lower,
    /// The higher sample wins (it gets pitched down).
    Higher,
}

/// Resolution rule from note id to sample.
#[derive(Debug, Clone)]
pub enum NoteResolver {
    /// One sample per note, named after the note (`C#4` plays `Cs4`).
    /// Unknown ids are used literally as the sample name.
    Direct,
    /// Sparse samples; the closest one by semitone distance is detuned to
    /// the target. Unparseable ids resolve to the first sample, undetuned.
    Nearest {
        samples: Vec<(String, i32)>,
        tie_break: TieBreak,
    },
}

impl NoteResolver {
    /// Builds a nearest-neighbor resolver over the given sample names, which
    /// must themselves be note ids.
    pub fn nearest<I, S>(samples: I, tie_break: TieBreak) -> Result<NoteResolver, NoteError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let samples = samples
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                name.parse::<Note>()
                    .map(|note| (name.to_string(), note.semitone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NoteResolver::Nearest { samples, tie_break })
    }

    /// Resolves a note id to a sample and detune.
    pub fn resolve(&self, note_id: &str) -> SampleMapping {
        match self {
            NoteResolver::Direct => SampleMapping {
                sample_name: sample_name_for(note_id),
                detune_cents: 0,
            },
            NoteResolver::Nearest { samples, tie_break } => {
                let fallback = || SampleMapping {
                    sample_name: samples
                        .first()
                        .map(|(name, _)| name.clone())
                        .unwrap_or_else(|| note_id.to_string()),
                    detune_cents: 0,
                };

                let Ok(target) = note_id.parse::<Note>() else {
                    return fallback();
                };
                let target = target.semitone();

                let distance_to = |semitone: i32| (i64::from(target) - i64::from(semitone)).abs();
                let mut best: Option<&(String, i32)> = None;
                for candidate in samples {
                    let distance = distance_to(candidate.1);
                    let better = match best {
                        None => true,
                        Some(current) => {
                            let current_distance = distance_to(current.1);
                            distance < current_distance
                                || (distance == current_distance
                                    && match tie_break {
                                        TieBreak::First => false,
                                        TieBreak::Lower => candidate.1 < current.1,
                                        TieBreak::Higher => candidate.1 > current.1,
                                    })
                        }
                    };
                    if better {
                        best = Some(candidate);
                    }
                }

                // Notes too far from every sample to express in cents fall back.
                let detune = best.and_then(|(name, semitone)| {
                    let cents = (i64::from(target) - i64::from(*semitone)) * 100;
                    i32::try_from(cents).ok().map(|cents| (name, cents))
                });
                match detune {
                    Some((name, detune_cents)) => SampleMapping {
                        sample_name: name.clone(),
                        detune_cents,
                    },
                    None => fallback(),
                }
            }
        }
    }
}

/// Describes one instrument's sample set and how notes map onto it.
pub struct Instrument {
    id: String,
    display_name: String,
    sample_dir: String,
    sample_extension: String,
    sample_list: Vec<String>,
    resolver: NoteResolver,
    keys: KeyMap,
}

impl Instrument {
    /// Creates a new instrument descriptor.
    pub fn new(
        id: &str,
        display_name: &str,
        sample_dir: &str,
        sample_extension: &str,
        sample_list: Vec<String>,
        resolver: NoteResolver,
        keys: KeyMap,
    ) -> Instrument {
        Instrument {
            id: id.to_string(),
            display_name: display_name.to_string(),
            sample_dir: sample_dir.to_string(),
            sample_extension: sample_extension.to_string(),
            sample_list,
            resolver,
            keys,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The samples that must be loaded before the instrument can play.
    pub fn sample_list(&self) -> &[String] {
        &self.sample_list
    }

    pub fn keys(&self) -> &KeyMap {
        &self.keys
    }

    /// Resolves a note id to the sample that plays it.
    pub fn note_to_sample(&self, note_id: &str) -> SampleMapping {
        self.resolver.resolve(note_id)
    }

    /// Returns the path of a sample relative to the sample base path.
    pub fn sample_path(&self, sample_name: &str) -> PathBuf {
        PathBuf::from(&self.sample_dir).join(format!("{}.{}", sample_name, self.sample_extension))
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, samples={}, keys={})",
            self.display_name,
            self.id,
            self.sample_list.len(),
            self.keys.keys().len()
        )
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrument")
            .field("id", &self.id)
            .field("sample_dir", &self.sample_dir)
            .field("samples", &self.sample_list.len())
            .finish()
    }
}

/// Returns every built-in instrument.
pub fn all() -> Vec<Arc<Instrument>> {
    vec![Arc::new(piano()), Arc::new(violin())]
}

/// Looks up a built-in instrument by id.
pub fn by_id(id: &str) -> Option<Arc<Instrument>> {
    all().into_iter().find(|instrument| instrument.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse(tie_break: TieBreak) -> NoteResolver {
        NoteResolver::nearest(["C4", "E4", "G4", "A4"], tie_break).unwrap()
    }

    #[test]
    fn test_direct_resolution() {
        let resolver = NoteResolver::Direct;
        assert_eq!(
            resolver.resolve("C#4"),
            SampleMapping {
                sample_name: "Cs4".into(),
                detune_cents: 0
            }
        );
        // Out-of-domain ids are used literally.
        assert_eq!(resolver.resolve("whatever").sample_name, "whatever");
    }

    #[test]
    fn test_nearest_exact_and_neighbor() {
        let resolver = sparse(TieBreak::First);
        assert_eq!(resolver.resolve("G4").sample_name, "G4");
        assert_eq!(resolver.resolve("G4").detune_cents, 0);

        let f = resolver.resolve("F4");
        assert_eq!(f.sample_name, "E4");
        assert_eq!(f.detune_cents, 100);

        let b = resolver.resolve("B4");
        assert_eq!(b.sample_name, "A4");
        assert_eq!(b.detune_cents, 200);
    }

    #[test]
    fn test_nearest_tie_breaks() {
        // D4 is two semitones from both C4 and E4.
        let first = sparse(TieBreak::First).resolve("D4");
        assert_eq!(first.sample_name, "C4");
        assert_eq!(first.detune_cents, 200);

        let lower = sparse(TieBreak::Lower).resolve("D4");
        assert_eq!(lower.sample_name, "C4");

        let higher = sparse(TieBreak::Higher).resolve("D4");
        assert_eq!(higher.sample_name, "E4");
        assert_eq!(higher.detune_cents, -200);
    }

    #[test]
    fn test_nearest_fallback() {
        let mapping = sparse(TieBreak::First).resolve("not-a-note");
        assert_eq!(mapping.sample_name, "C4");
        assert_eq!(mapping.detune_cents, 0);
    }

    #[test]
    fn test_nearest_far_out_of_range() {
        let resolver = sparse(TieBreak::First);
        for id in ["C2147483647", "C-2147483648", "C178956973", "Cb-178956967"] {
            let mapping = resolver.resolve(id);
            assert_eq!(mapping.sample_name, "C4", "{}", id);
            assert_eq!(mapping.detune_cents, 0, "{}", id);
        }
    }

    #[test]
    fn test_nearest_rejects_bad_sample_names() {
        assert!(NoteResolver::nearest(["C4", "kick"], TieBreak::First).is_err());
    }

    #[test]
    fn test_registry() {
        assert_eq!(by_id("piano").unwrap().display_name(), "Grand Piano");
        assert_eq!(by_id("violin").unwrap().display_name(), "Violin");
        assert!(by_id("theremin").is_none());
        assert_eq!(
            by_id("piano").unwrap().sample_path("Cs4"),
            PathBuf::from("piano").join("Cs4.mp3")
        );
    }
}
