//! Layer Model Module
//!
//! The four toggleable musical parts:
//! - pad: slow chord progression
//! - melody: sparse random notes
//! - drone: sustained root note
//! - fx: effects flag (stored, not wired)

mod layer;

pub use layer::{Layer, LayerFlags, LayerStates};
