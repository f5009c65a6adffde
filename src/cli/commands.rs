//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::time::Duration;

use tracing::{info, warn};

use super::PlayArgs;
use crate::config::EngineConfig;
use crate::engine::{bar_seconds, ManualTransport, RecordingBackend, VoiceEvent, VoiceKind};
use crate::error::{NocturneError, Result};
use crate::params::{control_spec, ControlId, MixParameters, Preset, CONTROL_TABLE};
use crate::sequencer::scheduler::DEFAULT_MELODY_PROBABILITY_CAP;
use crate::session::SessionController;

/// Split a `NAME=VALUE` control assignment.
pub fn parse_assignment(input: &str) -> Result<(ControlId, i64)> {
    let malformed = || NocturneError::MalformedAssignment {
        input: input.to_string(),
    };

    let (name, value) = input.split_once('=').ok_or_else(malformed)?;
    let id = name.trim().parse::<ControlId>()?;
    let value = value.trim().parse::<i64>().map_err(|_| malformed())?;
    Ok((id, value))
}

/// Run a session for a number of bars and print every voice command.
pub async fn play(mut config: EngineConfig, args: &PlayArgs) -> Result<()> {
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    // Reject bad input before anything sounds.
    let assignments = args
        .sets
        .iter()
        .map(|s| parse_assignment(s))
        .collect::<Result<Vec<_>>>()?;
    let preset = args
        .preset
        .as_deref()
        .map(str::parse::<Preset>)
        .transpose()?;

    let controller = SessionController::new(config, ManualTransport::new(), RecordingBackend::new());
    let tempo = controller.config().tempo_bpm;
    controller.start().await?;

    if let Some(preset) = preset {
        controller.load_preset(preset);
    }
    for layer in &args.toggles {
        if controller.toggle_layer_by_name(layer).is_none() {
            warn!(layer = %layer, "skipping unknown layer");
        }
    }
    for (id, value) in assignments {
        controller.set_control_value(id, value);
    }

    info!(bars = args.bars, bpm = tempo, "running session");
    let bar = Duration::from_secs_f64(bar_seconds(tempo));
    let log = controller.backend().log();
    let mut printed = 0;
    for _ in 0..args.bars {
        if args.realtime {
            tokio::time::sleep(bar).await;
        }
        controller.transport_mut().advance_bars(1.0);
        printed = print_events(&log.borrow()[printed..], args.json, printed)?;
    }
    controller.stop();
    print_events(&log.borrow()[printed..], args.json, printed)?;

    if !args.json {
        let backend = controller.backend();
        println!();
        println!("Session summary ({} bars at {} bpm):", args.bars, tempo);
        for kind in VoiceKind::ALL {
            println!("  {:<8} {} notes", kind, backend.notes(kind).len());
        }
    }
    Ok(())
}

fn print_events(events: &[VoiceEvent], json: bool, printed: usize) -> Result<usize> {
    for event in events {
        if json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            println!("{}", event);
        }
    }
    Ok(printed + events.len())
}

/// List every preset with raw and mapped control values.
pub fn list_presets() -> Result<()> {
    for preset in Preset::ALL {
        let values = preset.values();
        println!("{}", preset);
        for id in ControlId::ALL {
            let raw = values.get(id);
            match control_spec(id).map(raw) {
                Some(mapped) => println!(
                    "  {:<16} {:>3}  -> {:.2} {}",
                    id,
                    raw,
                    mapped,
                    control_spec(id).target.unit()
                ),
                None => println!("  {:<16} {:>3}  (unwired)", id, raw),
            }
        }
        let mix = MixParameters::from_controls(&values);
        println!(
            "  melody chance per bar: {:.0}%",
            mix.melody_density * DEFAULT_MELODY_PROBABILITY_CAP * 100.0
        );
        println!();
    }
    Ok(())
}

/// List the panel controls and their defaults.
pub fn list_controls() -> Result<()> {
    println!("{:<16} {:>7} {:>7}  {}", "CONTROL", "RANGE", "DEFAULT", "TARGET");
    for spec in CONTROL_TABLE.iter() {
        println!(
            "{:<16} {:>3}-{:<3} {:>7}  {:?}",
            spec.id, spec.min, spec.max, spec.default, spec.target
        );
    }
    Ok(())
}
