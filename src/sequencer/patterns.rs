//! Pattern Library
//!
//! Fixed musical material for the night atmosphere: a six-chord cyclic
//! progression, seven candidate melody pitches and three drone roots.

use crate::engine::Pitch;

/// Chord progression, one chord per pad tick
pub const NIGHT_CHORDS: [&[Pitch]; 6] = [
    &["A3", "C4", "E4", "G4"],  // Am7
    &["F3", "A3", "C4", "E4"],  // Fmaj7
    &["C3", "E3", "G3", "B3"],  // Cmaj7
    &["G3", "B3", "D4", "F#4"], // G7
    &["D3", "F#3", "A3", "C4"], // Dm7
    &["E3", "G#3", "B3", "D4"], // E7
];

/// Chord symbols matching [`NIGHT_CHORDS`]
pub const CHORD_NAMES: [&str; 6] = ["Am7", "Fmaj7", "Cmaj7", "G7", "Dm7", "E7"];

/// Candidate pitches for the melody
pub const MELODY_NOTES: [Pitch; 7] = ["A4", "C5", "E5", "F5", "G5", "A5", "C6"];

/// Drone root progression, one root per drone tick
pub const DRONE_ROOTS: [Pitch; 3] = ["A1", "E2", "A2"];

/// Chord for a cursor position, wrapping around the progression
pub fn chord_at(cursor: usize) -> &'static [Pitch] {
    NIGHT_CHORDS[cursor % NIGHT_CHORDS.len()]
}

/// Chord symbol for a cursor position, for logs and listings
pub fn chord_name_at(cursor: usize) -> &'static str {
    CHORD_NAMES[cursor % CHORD_NAMES.len()]
}

/// Drone root for a cursor position, wrapping around the progression
pub fn drone_root_at(cursor: usize) -> Pitch {
    DRONE_ROOTS[cursor % DRONE_ROOTS.len()]
}
