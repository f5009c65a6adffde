//! Live Parameters
//!
//! Raw control values, their translation into engine units, and the mood
//! presets that set them in bulk.

mod controls;
pub mod mapper;
mod presets;

pub use controls::{ControlBank, ControlId, ControlValues};
pub use mapper::{control_spec, ControlSpec, EngineParam, MixParameters, CONTROL_TABLE};
pub use presets::Preset;
