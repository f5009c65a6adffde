//! Integration Tests
//!
//! End-to-end session scenarios against the manual clock and the recording
//! backend.

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

use nocturne::config::EngineConfig;
use nocturne::engine::{ManualTransport, NoteLength, RecordingBackend, VoiceEvent, VoiceKind};
use nocturne::layers::Layer;
use nocturne::params::{mapper, ControlId, Preset};
use nocturne::sequencer::{RandomSource, ScriptedRandom, MELODY_NOTES, NIGHT_CHORDS};
use nocturne::session::{SessionController, SessionState};

type Controller = SessionController<ManualTransport, RecordingBackend>;

fn seeded_config(seed: u64) -> EngineConfig {
    EngineConfig {
        seed: Some(seed),
        regenerate_delay_ms: 0,
        ..EngineConfig::default()
    }
}

fn controller_with(config: EngineConfig) -> Controller {
    SessionController::new(
        config,
        ManualTransport::new(),
        RecordingBackend::new().with_activation_yield(),
    )
}

fn advance(controller: &Controller, bars: u32) {
    controller.transport_mut().advance_bars(f64::from(bars));
}

fn drone_attacks(backend: &RecordingBackend) -> Vec<(&'static str, f64)> {
    backend
        .notes(VoiceKind::Drone)
        .into_iter()
        .filter_map(|e| match e {
            VoiceEvent::Attack { pitch, time, .. } => Some((pitch, time)),
            _ => None,
        })
        .collect()
}

// === Lifecycle ===

#[tokio::test]
async fn test_repeated_start_keeps_one_session() {
    let controller = controller_with(seeded_config(1));

    controller.start().await.unwrap();
    controller.start().await.unwrap();

    assert_eq!(controller.state(), SessionState::Playing);
    assert_eq!(controller.sessions_started(), 1);
    assert_eq!(controller.backend().builds(), 1);
    assert_eq!(controller.transport().active_loop_count(), 3);
}

#[tokio::test]
async fn test_concurrent_start_builds_once() {
    let controller = controller_with(seeded_config(1));

    let (a, b) = tokio::join!(controller.start(), controller.start());
    assert!(a.is_ok());
    assert!(b.is_ok());

    assert_eq!(controller.backend().activations(), 1);
    assert_eq!(controller.backend().builds(), 1);
    assert_eq!(controller.transport().active_loop_count(), 3);
}

#[tokio::test]
async fn test_double_stop() {
    let controller = controller_with(seeded_config(1));
    controller.start().await.unwrap();

    controller.stop();
    let after_first = controller.backend().events().len();
    controller.stop();

    assert_eq!(controller.state(), SessionState::Stopped);
    assert_eq!(controller.backend().events().len(), after_first);
    assert_eq!(controller.transport().active_loop_count(), 0);
}

#[tokio::test]
async fn test_no_ticks_after_stop() {
    let controller = controller_with(seeded_config(1));
    controller.start().await.unwrap();
    advance(&controller, 4);
    controller.stop();

    let before = controller.backend().events().len();
    advance(&controller, 16);
    assert_eq!(controller.backend().events().len(), before);
}

#[tokio::test]
async fn test_regenerate_while_stopped_is_noop() {
    let controller = controller_with(seeded_config(1));
    controller.regenerate().await.unwrap();

    assert_eq!(controller.state(), SessionState::Stopped);
    assert_eq!(controller.backend().activations(), 0);
}

#[tokio::test]
async fn test_repeated_regenerate_keeps_three_loops() {
    let controller = controller_with(seeded_config(2));
    controller.start().await.unwrap();

    for _ in 0..50 {
        controller.regenerate().await.unwrap();
    }

    assert_eq!(controller.sessions_started(), 51);
    assert_eq!(controller.transport().registered_loop_count(), 3);
    assert_eq!(controller.transport().active_loop_count(), 3);
}

#[tokio::test]
async fn test_regenerate_restarts_cursors() {
    let controller = controller_with(seeded_config(3));
    controller.start().await.unwrap();
    let first = controller.info().unwrap();
    advance(&controller, 12);

    controller.regenerate().await.unwrap();
    let second = controller.info().unwrap();

    assert_eq!(controller.state(), SessionState::Playing);
    assert_eq!(controller.sessions_started(), 2);
    assert_ne!(first.id, second.id);
    assert_eq!(second.number, 2);
    assert_eq!(controller.transport().active_loop_count(), 3);
    assert_eq!(controller.transport().registered_loop_count(), 3);

    controller.backend().clear();
    advance(&controller, 1);
    let pads = controller.backend().notes(VoiceKind::Pad);
    assert_eq!(pads.len(), 1);
    match &pads[0] {
        VoiceEvent::AttackRelease { pitches, time, .. } => {
            assert_eq!(pitches.as_slice(), NIGHT_CHORDS[0]);
            assert_relative_eq!(*time, 0.0, epsilon = 1e-9);
        }
        other => panic!("unexpected pad event: {other:?}"),
    }
    assert_eq!(drone_attacks(controller.backend())[0].0, "A1");
}

// === Layers ===

#[tokio::test]
async fn test_toggle_twice_restores_flag() {
    let controller = controller_with(seeded_config(1));
    let before = controller.layers().is_enabled(Layer::Pad);

    assert_eq!(controller.toggle_layer(Layer::Pad), !before);
    assert_eq!(controller.toggle_layer(Layer::Pad), before);
}

#[tokio::test]
async fn test_disabled_pad_is_silent() {
    let controller = controller_with(seeded_config(1));
    controller.start().await.unwrap();
    controller.toggle_layer(Layer::Pad);

    advance(&controller, 16);
    assert!(controller.backend().notes(VoiceKind::Pad).is_empty());
}

#[tokio::test]
async fn test_drone_cycle_ignores_other_layers() {
    let controller = controller_with(seeded_config(5));
    controller.start().await.unwrap();

    advance(&controller, 9);
    controller.toggle_layer(Layer::Pad);
    controller.toggle_layer(Layer::Melody);
    advance(&controller, 16);
    controller.toggle_layer(Layer::Pad);

    // Skip the attack sounded by start() itself.
    let roots: Vec<_> = drone_attacks(controller.backend())
        .into_iter()
        .skip(1)
        .map(|(pitch, _)| pitch)
        .collect();
    assert_eq!(roots, vec!["A1", "E2", "A2", "A1"]);
}

#[tokio::test]
async fn test_drone_reattacks_after_release() {
    let controller = controller_with(seeded_config(5));
    controller.start().await.unwrap();
    advance(&controller, 9);

    let attacks = drone_attacks(controller.backend());
    // 40 bpm: one bar is six seconds.
    assert_relative_eq!(attacks[1].1, 0.1, epsilon = 1e-9);
    assert_relative_eq!(attacks[2].1, 48.1, epsilon = 1e-9);
}

// === Melody ===

#[tokio::test]
async fn test_melody_silent_at_zero_density() {
    let controller = controller_with(seeded_config(9));
    controller.start().await.unwrap();
    controller.toggle_layer(Layer::Melody);
    controller.set_control_value(ControlId::MelodyDensity, 0);

    advance(&controller, 200);
    assert!(controller.backend().notes(VoiceKind::Melody).is_empty());
}

#[tokio::test]
async fn test_melody_rate_at_full_density() {
    let controller = controller_with(seeded_config(9));
    controller.start().await.unwrap();
    controller.toggle_layer(Layer::Melody);
    controller.set_control_value(ControlId::MelodyDensity, 100);

    advance(&controller, 500);
    let notes = controller.backend().notes(VoiceKind::Melody);
    let rate = notes.len() as f64 / 500.0;
    assert!((0.3..0.5).contains(&rate), "rate {rate}");

    for note in notes {
        match note {
            VoiceEvent::AttackRelease { pitches, length, .. } => {
                assert!(MELODY_NOTES.contains(&pitches[0]));
                assert!(matches!(length, NoteLength::Quarter | NoteLength::Half));
            }
            other => panic!("unexpected melody event: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_melody_toggle_takes_effect_next_tick() {
    let controller = controller_with(seeded_config(1)).with_random_factory(Box::new(|_: u64| {
        Box::new(ScriptedRandom::constant(0.0)) as Box<dyn RandomSource>
    }));
    controller.set_control_value(ControlId::MelodyDensity, 100);
    controller.start().await.unwrap();

    advance(&controller, 1);
    assert!(controller.backend().notes(VoiceKind::Melody).is_empty());

    controller.toggle_layer(Layer::Melody);
    advance(&controller, 1);

    let notes = controller.backend().notes(VoiceKind::Melody);
    assert_eq!(
        notes,
        vec![VoiceEvent::AttackRelease {
            voice: VoiceKind::Melody,
            pitches: vec!["A4"],
            length: NoteLength::Quarter,
            time: 6.0,
        }]
    );
}

// === Controls ===

#[test]
fn test_mapper_endpoints() {
    assert_relative_eq!(mapper::pad_volume_db(0), -30.0, epsilon = 1e-9);
    assert_relative_eq!(mapper::pad_volume_db(100), -10.0, epsilon = 1e-9);
    assert_relative_eq!(mapper::filter_frequency_hz(0), 200.0, epsilon = 1e-9);
    assert_relative_eq!(mapper::filter_frequency_hz(100), 1700.0, epsilon = 1e-9);
    assert_relative_eq!(mapper::reverb_wet(100), 0.8, epsilon = 1e-9);
    assert_relative_eq!(mapper::delay_wet(100), 0.4, epsilon = 1e-9);
    assert_relative_eq!(mapper::melody_density(100), 1.0, epsilon = 1e-9);
}

#[tokio::test]
async fn test_solitude_preset_reaches_instruments() {
    let controller = controller_with(seeded_config(1));
    controller.start().await.unwrap();
    controller.load_preset(Preset::Solitude);

    assert_eq!(controller.control_value(ControlId::PadVolume), 80);
    assert_relative_eq!(controller.mapped_value(ControlId::PadVolume).unwrap(), -14.0, epsilon = 1e-9);
    assert_relative_eq!(controller.backend().volume_db(VoiceKind::Pad).unwrap(), -14.0, epsilon = 1e-9);
    assert_relative_eq!(controller.backend().filter_frequency().unwrap(), 650.0, epsilon = 1e-9);
}

#[tokio::test]
async fn test_out_of_range_control_is_clamped() {
    let controller = controller_with(seeded_config(1));
    controller.start().await.unwrap();

    assert_eq!(controller.set_control_value(ControlId::ReverbAmount, 250), 100);
    assert_relative_eq!(controller.backend().reverb_wet().unwrap(), 0.8, epsilon = 1e-9);
    assert_eq!(controller.set_control_value(ControlId::DelayAmount, -3), 0);
    assert_relative_eq!(controller.backend().delay_wet().unwrap(), 0.0, epsilon = 1e-9);
}

#[tokio::test]
async fn test_drift_is_stored_but_unwired() {
    let controller = controller_with(seeded_config(1));
    controller.start().await.unwrap();
    let before = controller.backend().events().len();

    controller.set_control_value(ControlId::DroneDrift, 90);
    assert_eq!(controller.control_value(ControlId::DroneDrift), 90);
    assert_eq!(controller.mapped_value(ControlId::DroneDrift), None);
    // The mix is re-applied but no drift-specific event exists.
    assert!(controller.backend().events()[before..]
        .iter()
        .all(|e| !e.is_note()));
}
