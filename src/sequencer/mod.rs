//! Generative Sequencer
//!
//! Musical material, randomness and the per-layer loop processes that turn
//! them into note commands against the transport clock.

pub mod patterns;
pub mod random;
pub mod scheduler;

pub use patterns::{
    chord_at, chord_name_at, drone_root_at, CHORD_NAMES, DRONE_ROOTS, MELODY_NOTES, NIGHT_CHORDS,
};
pub use random::{seeded_factory, RandomFactory, RandomSource, ScriptedRandom, SeededRandom};
pub use scheduler::{DroneLoop, LayerScheduler, LoopContext, LoopProcess, MelodyLoop, PadLoop};
