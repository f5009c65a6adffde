//! Engine configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! nocturnal defaults.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NocturneError, Result};
use crate::layers::LayerFlags;
use crate::params::ControlValues;
use crate::sequencer::scheduler::{DEFAULT_DRONE_RETRIGGER_OFFSET, DEFAULT_MELODY_PROBABILITY_CAP};

/// Default transport tempo
pub const DEFAULT_TEMPO_BPM: f64 = 40.0;

/// Default pause between stop and start when regenerating
pub const DEFAULT_REGENERATE_DELAY_MS: u64 = 100;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Transport tempo in beats per minute
    pub tempo_bpm: f64,
    /// Pause between stop and start when regenerating
    pub regenerate_delay_ms: u64,
    /// Seconds between a drone release and the next root's attack
    pub drone_retrigger_offset_secs: f64,
    /// Melody note chance per bar at full density
    pub melody_probability_cap: f64,
    /// Seed for melodic randomness; entropy when absent
    pub seed: Option<u64>,
    /// Initial raw control values
    pub controls: ControlValues,
    /// Initial layer flags
    pub layers: LayerFlags,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: DEFAULT_TEMPO_BPM,
            regenerate_delay_ms: DEFAULT_REGENERATE_DELAY_MS,
            drone_retrigger_offset_secs: DEFAULT_DRONE_RETRIGGER_OFFSET,
            melody_probability_cap: DEFAULT_MELODY_PROBABILITY_CAP,
            seed: None,
            controls: ControlValues::default(),
            layers: LayerFlags::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let config: EngineConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.tempo_bpm.is_finite() && self.tempo_bpm > 0.0) {
            return Err(NocturneError::InvalidConfig {
                reason: format!("tempo_bpm must be positive, got {}", self.tempo_bpm),
            });
        }
        if !(0.0..=1.0).contains(&self.melody_probability_cap) {
            return Err(NocturneError::InvalidConfig {
                reason: format!(
                    "melody_probability_cap must lie in [0, 1], got {}",
                    self.melody_probability_cap
                ),
            });
        }
        if !(self.drone_retrigger_offset_secs.is_finite() && self.drone_retrigger_offset_secs >= 0.0) {
            return Err(NocturneError::InvalidConfig {
                reason: format!(
                    "drone_retrigger_offset_secs must be non-negative, got {}",
                    self.drone_retrigger_offset_secs
                ),
            });
        }
        Ok(())
    }

    pub fn regenerate_delay(&self) -> Duration {
        Duration::from_millis(self.regenerate_delay_ms)
    }
}
