//! Mood presets
//!
//! Static named bundles of the eight raw control values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::controls::ControlValues;
use crate::error::NocturneError;

/// A named mood preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Solitude,
    Mystery,
    Contemplation,
    Distant,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Solitude,
        Preset::Mystery,
        Preset::Contemplation,
        Preset::Distant,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Solitude => "solitude",
            Preset::Mystery => "mystery",
            Preset::Contemplation => "contemplation",
            Preset::Distant => "distant",
        }
    }

    /// Raw control values of this preset
    pub fn values(&self) -> ControlValues {
        match self {
            Preset::Solitude => ControlValues {
                pad_volume: 80,
                pad_filter: 30,
                melody_volume: 20,
                melody_density: 15,
                drone_volume: 70,
                drone_drift: 20,
                reverb_amount: 85,
                delay_amount: 25,
            },
            Preset::Mystery => ControlValues {
                pad_volume: 60,
                pad_filter: 60,
                melody_volume: 40,
                melody_density: 35,
                drone_volume: 50,
                drone_drift: 50,
                reverb_amount: 90,
                delay_amount: 60,
            },
            Preset::Contemplation => ControlValues {
                pad_volume: 90,
                pad_filter: 20,
                melody_volume: 30,
                melody_density: 20,
                drone_volume: 60,
                drone_drift: 15,
                reverb_amount: 75,
                delay_amount: 30,
            },
            Preset::Distant => ControlValues {
                pad_volume: 50,
                pad_filter: 70,
                melody_volume: 15,
                melody_density: 10,
                drone_volume: 80,
                drone_drift: 40,
                reverb_amount: 95,
                delay_amount: 50,
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Preset {
    type Err = NocturneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| NocturneError::UnknownPreset {
                name: s.to_string(),
            })
    }
}
