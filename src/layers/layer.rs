//! Musical layers and their on/off flags
//!
//! A layer is an independently toggleable musical part. Flags are shared
//! between the session controller (which writes them on toggle commands) and
//! the loop processes (which read them on every tick), so they live behind
//! `Cell`s: the engine runs on one logical thread and a write is visible to
//! the next read.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NocturneError;

/// An independently toggleable musical part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Pad,
    Melody,
    Drone,
    Fx,
}

impl Layer {
    /// Every layer, in display order
    pub const ALL: [Layer; 4] = [Layer::Pad, Layer::Melody, Layer::Drone, Layer::Fx];

    /// Lowercase identifier used by the CLI and presets
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Pad => "pad",
            Layer::Melody => "melody",
            Layer::Drone => "drone",
            Layer::Fx => "fx",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Layer {
    type Err = NocturneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pad" => Ok(Layer::Pad),
            "melody" => Ok(Layer::Melody),
            "drone" => Ok(Layer::Drone),
            "fx" => Ok(Layer::Fx),
            _ => Err(NocturneError::UnknownLayer {
                name: s.to_string(),
            }),
        }
    }
}

/// Plain-data layer flags, used for configuration and snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerFlags {
    pub pad: bool,
    pub melody: bool,
    pub drone: bool,
    pub fx: bool,
}

impl Default for LayerFlags {
    /// Pad, drone and fx on; the melody starts silent
    fn default() -> Self {
        Self {
            pad: true,
            melody: false,
            drone: true,
            fx: true,
        }
    }
}

/// Live enabled flags for every layer
///
/// Created once per controller and never destroyed; sessions come and go
/// but the flags persist between them.
#[derive(Debug)]
pub struct LayerStates {
    pad: Cell<bool>,
    melody: Cell<bool>,
    drone: Cell<bool>,
    fx: Cell<bool>,
}

impl Default for LayerStates {
    fn default() -> Self {
        Self::from_flags(LayerFlags::default())
    }
}

impl LayerStates {
    /// Create layer states from a set of initial flags
    pub fn from_flags(flags: LayerFlags) -> Self {
        Self {
            pad: Cell::new(flags.pad),
            melody: Cell::new(flags.melody),
            drone: Cell::new(flags.drone),
            fx: Cell::new(flags.fx),
        }
    }

    fn cell(&self, layer: Layer) -> &Cell<bool> {
        match layer {
            Layer::Pad => &self.pad,
            Layer::Melody => &self.melody,
            Layer::Drone => &self.drone,
            Layer::Fx => &self.fx,
        }
    }

    /// Check whether a layer is enabled
    pub fn is_enabled(&self, layer: Layer) -> bool {
        self.cell(layer).get()
    }

    /// Set a layer's flag explicitly
    pub fn set_enabled(&self, layer: Layer, enabled: bool) {
        self.cell(layer).set(enabled);
    }

    /// Flip a layer's flag
    ///
    /// # Returns
    /// The new enabled state
    pub fn toggle(&self, layer: Layer) -> bool {
        let cell = self.cell(layer);
        let enabled = !cell.get();
        cell.set(enabled);
        enabled
    }

    /// Copy the current flags out
    pub fn flags(&self) -> LayerFlags {
        LayerFlags {
            pad: self.pad.get(),
            melody: self.melody.get(),
            drone: self.drone.get(),
            fx: self.fx.get(),
        }
    }

    /// Every layer with its flag, in display order
    pub fn snapshot(&self) -> Vec<(Layer, bool)> {
        Layer::ALL
            .iter()
            .map(|&layer| (layer, self.is_enabled(layer)))
            .collect()
    }
}
