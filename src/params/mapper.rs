//! Parameter Mapper
//!
//! Pure translation from raw UI-range control values (integers 0-100) into
//! the engine's native units: decibels, hertz and wet-mix fractions.
//!
//! The mapping functions are total over `u8`; raw values are clamped to
//! 0-100 when they are stored in the [`ControlBank`](super::ControlBank),
//! so the functions here never see anything else in practice.

use serde::Serialize;

use super::controls::{ControlId, ControlValues};

/// Engine parameter a control is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineParam {
    PadVolume,
    MelodyVolume,
    DroneVolume,
    FilterFrequency,
    ReverbWet,
    DelayWet,
    MelodyDensity,
    /// Accepted and stored, but not wired to anything in the engine
    Unwired,
}

impl EngineParam {
    /// Unit of the mapped value
    pub fn unit(&self) -> &'static str {
        match self {
            EngineParam::PadVolume | EngineParam::MelodyVolume | EngineParam::DroneVolume => "dB",
            EngineParam::FilterFrequency => "Hz",
            EngineParam::ReverbWet | EngineParam::DelayWet => "wet",
            EngineParam::MelodyDensity => "probability",
            EngineParam::Unwired => "-",
        }
    }
}

// ============================================================================
// Mapping Functions
// ============================================================================

/// Pad volume: 0-100 → [-30, -10] dB
pub fn pad_volume_db(raw: u8) -> f64 {
    -30.0 + f64::from(raw) * 0.2
}

/// Melody volume: 0-100 → [-35, -10] dB
pub fn melody_volume_db(raw: u8) -> f64 {
    -35.0 + f64::from(raw) * 0.25
}

/// Drone volume: 0-100 → [-35, -15] dB
pub fn drone_volume_db(raw: u8) -> f64 {
    -35.0 + f64::from(raw) * 0.2
}

/// Pad filter cutoff: 0-100 → [200, 1700] Hz
pub fn filter_frequency_hz(raw: u8) -> f64 {
    200.0 + f64::from(raw) * 15.0
}

/// Reverb amount: 0-100 → [0, 0.8] wet
pub fn reverb_wet(raw: u8) -> f64 {
    (f64::from(raw) / 100.0) * 0.8
}

/// Delay amount: 0-100 → [0, 0.4] wet
pub fn delay_wet(raw: u8) -> f64 {
    (f64::from(raw) / 100.0) * 0.4
}

/// Melody density: 0-100 → [0, 1]
pub fn melody_density(raw: u8) -> f64 {
    f64::from(raw) / 100.0
}

// ============================================================================
// Control Table
// ============================================================================

/// Static description of one control
#[derive(Debug, Clone, Copy)]
pub struct ControlSpec {
    pub id: ControlId,
    pub min: u8,
    pub max: u8,
    pub default: u8,
    pub target: EngineParam,
    map: Option<fn(u8) -> f64>,
}

impl ControlSpec {
    /// Translate a raw value into engine units
    ///
    /// Returns `None` for controls with no engine binding.
    pub fn map(&self, raw: u8) -> Option<f64> {
        self.map.map(|f| f(raw))
    }

    /// Clamp an arbitrary input into this control's raw range
    pub fn clamp(&self, raw: i64) -> u8 {
        raw.clamp(i64::from(self.min), i64::from(self.max)) as u8
    }
}

const fn spec(
    id: ControlId,
    default: u8,
    target: EngineParam,
    map: Option<fn(u8) -> f64>,
) -> ControlSpec {
    ControlSpec {
        id,
        min: 0,
        max: 100,
        default,
        target,
        map,
    }
}

/// Every control, in panel order
pub static CONTROL_TABLE: [ControlSpec; 8] = [
    spec(ControlId::PadVolume, 75, EngineParam::PadVolume, Some(pad_volume_db)),
    spec(ControlId::PadFilter, 40, EngineParam::FilterFrequency, Some(filter_frequency_hz)),
    spec(ControlId::MelodyVolume, 60, EngineParam::MelodyVolume, Some(melody_volume_db)),
    spec(ControlId::MelodyDensity, 30, EngineParam::MelodyDensity, Some(melody_density)),
    spec(ControlId::DroneVolume, 85, EngineParam::DroneVolume, Some(drone_volume_db)),
    // Drift has never driven an engine parameter.
    spec(ControlId::DroneDrift, 25, EngineParam::Unwired, None),
    spec(ControlId::ReverbAmount, 70, EngineParam::ReverbWet, Some(reverb_wet)),
    spec(ControlId::DelayAmount, 50, EngineParam::DelayWet, Some(delay_wet)),
];

/// Look up the table entry for a control
pub fn control_spec(id: ControlId) -> &'static ControlSpec {
    &CONTROL_TABLE[id.index()]
}

// ============================================================================
// Full Mix Mapping
// ============================================================================

/// Engine-native values for every wired control
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MixParameters {
    pub pad_volume_db: f64,
    pub melody_volume_db: f64,
    pub drone_volume_db: f64,
    pub filter_frequency_hz: f64,
    pub reverb_wet: f64,
    pub delay_wet: f64,
    pub melody_density: f64,
}

impl MixParameters {
    /// Map a full set of raw control values
    pub fn from_controls(values: &ControlValues) -> Self {
        Self {
            pad_volume_db: pad_volume_db(values.pad_volume),
            melody_volume_db: melody_volume_db(values.melody_volume),
            drone_volume_db: drone_volume_db(values.drone_volume),
            filter_frequency_hz: filter_frequency_hz(values.pad_filter),
            reverb_wet: reverb_wet(values.reverb_amount),
            delay_wet: delay_wet(values.delay_amount),
            melody_density: melody_density(values.melody_density),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test]
    fn test_range_endpoints() {
        assert_relative_eq!(pad_volume_db(0), -30.0, epsilon = 1e-9);
        assert_relative_eq!(pad_volume_db(100), -10.0, epsilon = 1e-9);
        assert_relative_eq!(melody_volume_db(0), -35.0, epsilon = 1e-9);
        assert_relative_eq!(melody_volume_db(100), -10.0, epsilon = 1e-9);
        assert_relative_eq!(drone_volume_db(0), -35.0, epsilon = 1e-9);
        assert_relative_eq!(drone_volume_db(100), -15.0, epsilon = 1e-9);
        assert_relative_eq!(filter_frequency_hz(0), 200.0, epsilon = 1e-9);
        assert_relative_eq!(filter_frequency_hz(100), 1700.0, epsilon = 1e-9);
        assert_relative_eq!(reverb_wet(0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(reverb_wet(100), 0.8, epsilon = 1e-9);
        assert_relative_eq!(delay_wet(0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(delay_wet(100), 0.4, epsilon = 1e-9);
        assert_relative_eq!(melody_density(0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(melody_density(100), 1.0, epsilon = 1e-9);
    }

    #[test_case(ControlId::PadVolume, 75, -15.0 ; "pad volume default")]
    #[test_case(ControlId::PadFilter, 40, 800.0 ; "pad filter default")]
    #[test_case(ControlId::MelodyVolume, 60, -20.0 ; "melody volume default")]
    #[test_case(ControlId::DroneVolume, 85, -18.0 ; "drone volume default")]
    #[test_case(ControlId::ReverbAmount, 50, 0.4 ; "reverb half")]
    #[test_case(ControlId::MelodyDensity, 30, 0.3 ; "density default")]
    fn test_table_mapping(id: ControlId, raw: u8, expected: f64) {
        assert_relative_eq!(control_spec(id).map(raw).unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_mappings_are_monotonic() {
        for raw in 0..100u8 {
            assert!(pad_volume_db(raw) < pad_volume_db(raw + 1));
            assert!(filter_frequency_hz(raw) < filter_frequency_hz(raw + 1));
            assert!(delay_wet(raw) < delay_wet(raw + 1));
        }
    }

    #[test]
    fn test_table_is_indexed_by_id() {
        for (i, entry) in CONTROL_TABLE.iter().enumerate() {
            assert_eq!(entry.id.index(), i);
            assert_eq!(control_spec(entry.id).id, entry.id);
            assert!(entry.default <= entry.max);
        }
    }

    #[test]
    fn test_drift_is_unwired() {
        let drift = control_spec(ControlId::DroneDrift);
        assert_eq!(drift.target, EngineParam::Unwired);
        assert_eq!(drift.map(50), None);
    }

    #[test]
    fn test_defaults_reproduce_initial_voice_levels() {
        let mix = MixParameters::from_controls(&ControlValues::default());
        assert_relative_eq!(mix.pad_volume_db, -15.0, epsilon = 1e-9);
        assert_relative_eq!(mix.melody_volume_db, -20.0, epsilon = 1e-9);
        assert_relative_eq!(mix.drone_volume_db, -18.0, epsilon = 1e-9);
        assert_relative_eq!(mix.filter_frequency_hz, 800.0, epsilon = 1e-9);
    }

    #[test]
    fn test_clamp() {
        let spec = control_spec(ControlId::PadVolume);
        assert_eq!(spec.clamp(-5), 0);
        assert_eq!(spec.clamp(250), 100);
        assert_eq!(spec.clamp(42), 42);
    }
}
