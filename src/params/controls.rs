//! Control Values
//!
//! The eight named raw controls of the mixing panel and the live bank that
//! holds their current values.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::mapper::{control_spec, MixParameters, CONTROL_TABLE};
use crate::error::NocturneError;

/// Identifier of a raw control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlId {
    PadVolume,
    PadFilter,
    MelodyVolume,
    MelodyDensity,
    DroneVolume,
    DroneDrift,
    ReverbAmount,
    DelayAmount,
}

impl ControlId {
    /// Every control, in panel order
    pub const ALL: [ControlId; 8] = [
        ControlId::PadVolume,
        ControlId::PadFilter,
        ControlId::MelodyVolume,
        ControlId::MelodyDensity,
        ControlId::DroneVolume,
        ControlId::DroneDrift,
        ControlId::ReverbAmount,
        ControlId::DelayAmount,
    ];

    /// Position in [`ControlId::ALL`] and the control table
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Kebab-case name, e.g. `pad-volume`
    pub fn name(&self) -> &'static str {
        match self {
            ControlId::PadVolume => "pad-volume",
            ControlId::PadFilter => "pad-filter",
            ControlId::MelodyVolume => "melody-volume",
            ControlId::MelodyDensity => "melody-density",
            ControlId::DroneVolume => "drone-volume",
            ControlId::DroneDrift => "drone-drift",
            ControlId::ReverbAmount => "reverb-amount",
            ControlId::DelayAmount => "delay-amount",
        }
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for ControlId {
    type Err = NocturneError;

    /// Accepts `pad-volume`, `pad_volume`, `padVolume` and the short panel
    /// ids (`padVol`, `padFilt`, `melodyDens`, `droneDrft`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let id = match key.as_str() {
            "padvolume" | "padvol" => ControlId::PadVolume,
            "padfilter" | "padfilt" => ControlId::PadFilter,
            "melodyvolume" | "melodyvol" => ControlId::MelodyVolume,
            "melodydensity" | "melodydens" => ControlId::MelodyDensity,
            "dronevolume" | "dronevol" => ControlId::DroneVolume,
            "dronedrift" | "dronedrft" => ControlId::DroneDrift,
            "reverbamount" | "reverbamt" => ControlId::ReverbAmount,
            "delayamount" | "delayamt" => ControlId::DelayAmount,
            _ => {
                return Err(NocturneError::UnknownControl {
                    name: s.to_string(),
                })
            }
        };
        Ok(id)
    }
}

/// A full set of raw control values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlValues {
    pub pad_volume: u8,
    pub pad_filter: u8,
    pub melody_volume: u8,
    pub melody_density: u8,
    pub drone_volume: u8,
    pub drone_drift: u8,
    pub reverb_amount: u8,
    pub delay_amount: u8,
}

impl Default for ControlValues {
    fn default() -> Self {
        let mut values = Self {
            pad_volume: 0,
            pad_filter: 0,
            melody_volume: 0,
            melody_density: 0,
            drone_volume: 0,
            drone_drift: 0,
            reverb_amount: 0,
            delay_amount: 0,
        };
        for spec in CONTROL_TABLE.iter() {
            values.set(spec.id, spec.default);
        }
        values
    }
}

impl ControlValues {
    /// Read one value
    pub fn get(&self, id: ControlId) -> u8 {
        match id {
            ControlId::PadVolume => self.pad_volume,
            ControlId::PadFilter => self.pad_filter,
            ControlId::MelodyVolume => self.melody_volume,
            ControlId::MelodyDensity => self.melody_density,
            ControlId::DroneVolume => self.drone_volume,
            ControlId::DroneDrift => self.drone_drift,
            ControlId::ReverbAmount => self.reverb_amount,
            ControlId::DelayAmount => self.delay_amount,
        }
    }

    /// Write one value (no clamping)
    pub fn set(&mut self, id: ControlId, raw: u8) {
        let slot = match id {
            ControlId::PadVolume => &mut self.pad_volume,
            ControlId::PadFilter => &mut self.pad_filter,
            ControlId::MelodyVolume => &mut self.melody_volume,
            ControlId::MelodyDensity => &mut self.melody_density,
            ControlId::DroneVolume => &mut self.drone_volume,
            ControlId::DroneDrift => &mut self.drone_drift,
            ControlId::ReverbAmount => &mut self.reverb_amount,
            ControlId::DelayAmount => &mut self.delay_amount,
        };
        *slot = raw;
    }

    /// Copy with every value clamped into its control's range
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for id in ControlId::ALL {
            out.set(id, control_spec(id).clamp(i64::from(self.get(id))));
        }
        out
    }
}

/// Live raw control values shared with the loop processes
///
/// Values are stored raw and mapped on read; nothing is cached or
/// interpolated here.
#[derive(Debug)]
pub struct ControlBank {
    values: [Cell<u8>; 8],
}

impl Default for ControlBank {
    fn default() -> Self {
        Self::new(ControlValues::default())
    }
}

impl ControlBank {
    /// Create a bank holding the given values (clamped)
    pub fn new(initial: ControlValues) -> Self {
        let initial = initial.clamped();
        Self {
            values: ControlId::ALL.map(|id| Cell::new(initial.get(id))),
        }
    }

    /// Current raw value of a control
    pub fn get(&self, id: ControlId) -> u8 {
        self.values[id.index()].get()
    }

    /// Store a raw value, clamping it into the control's range
    ///
    /// # Returns
    /// The value actually stored
    pub fn set(&self, id: ControlId, raw: i64) -> u8 {
        let stored = control_spec(id).clamp(raw);
        self.values[id.index()].set(stored);
        stored
    }

    /// Store every value of a snapshot in one batch
    pub fn load(&self, values: &ControlValues) {
        for id in ControlId::ALL {
            self.set(id, i64::from(values.get(id)));
        }
    }

    /// Copy the current values out
    pub fn snapshot(&self) -> ControlValues {
        let mut values = ControlValues::default();
        for id in ControlId::ALL {
            values.set(id, self.get(id));
        }
        values
    }

    /// Engine-unit value of a control, `None` if it is unwired
    pub fn mapped(&self, id: ControlId) -> Option<f64> {
        control_spec(id).map(self.get(id))
    }

    /// Live melody density in [0, 1]
    pub fn melody_density(&self) -> f64 {
        self.mapped(ControlId::MelodyDensity).unwrap_or(0.0)
    }

    /// Engine-unit values for the whole mix
    pub fn mix(&self) -> MixParameters {
        MixParameters::from_controls(&self.snapshot())
    }
}
