//! Layer Scheduler
//!
//! One recurring loop process per musical layer, registered against the
//! transport at offset zero so all layers share a fixed phase:
//!
//! | loop   | period  | on each tick (when its layer is enabled)            |
//! |--------|---------|-----------------------------------------------------|
//! | pad    | 4 bars  | play the next chord for 2 bars                      |
//! | melody | 1 bar   | maybe play one random note (density × cap chance)   |
//! | drone  | 8 bars  | release, then re-attack the next root slightly late |
//!
//! Toggling a layer only affects its next tick. Notes already sounding are
//! left to decay.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, trace};

use super::patterns::{chord_at, chord_name_at, drone_root_at, MELODY_NOTES};
use super::random::RandomSource;
use crate::engine::{LoopId, NoteLength, SharedVoice, Transport, VoiceKind};
use crate::layers::{Layer, LayerStates};
use crate::params::ControlBank;

/// Pad loop period in bars
pub const PAD_PERIOD_BARS: f64 = 4.0;
/// Melody loop period in bars
pub const MELODY_PERIOD_BARS: f64 = 1.0;
/// Drone loop period in bars
pub const DRONE_PERIOD_BARS: f64 = 8.0;
/// How long each pad chord sustains
pub const PAD_CHORD_LENGTH: NoteLength = NoteLength::Bars(2);
/// Highest per-tick chance of a melody note, reached at full density
pub const DEFAULT_MELODY_PROBABILITY_CAP: f64 = 0.4;
/// Gap between a drone release and the next attack, in seconds
pub const DEFAULT_DRONE_RETRIGGER_OFFSET: f64 = 0.1;

/// State every loop consults on each tick
#[derive(Debug, Clone)]
pub struct LoopContext {
    pub layers: Rc<LayerStates>,
    pub controls: Rc<ControlBank>,
    /// Cleared by the controller before teardown so late ticks stay silent
    pub live: Rc<Cell<bool>>,
}

impl LoopContext {
    fn should_play(&self, layer: Layer) -> bool {
        self.live.get() && self.layers.is_enabled(layer)
    }
}

/// A periodically recurring musical activity
pub trait LoopProcess {
    /// Voice this loop drives
    fn kind(&self) -> VoiceKind;

    /// Period in bars
    fn period_bars(&self) -> f64;

    /// Handle one tick at the given trigger time (seconds)
    fn tick(&mut self, time: f64);
}

// ============================================================================
// Pad
// ============================================================================

/// Chord progression loop
///
/// The cursor advances on every tick whether or not the pad is enabled, so
/// re-enabling the layer resumes the progression in step with the drone.
pub struct PadLoop {
    ctx: LoopContext,
    voice: SharedVoice,
    cursor: usize,
}

impl PadLoop {
    pub fn new(ctx: LoopContext, voice: SharedVoice) -> Self {
        Self {
            ctx,
            voice,
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl LoopProcess for PadLoop {
    fn kind(&self) -> VoiceKind {
        VoiceKind::Pad
    }

    fn period_bars(&self) -> f64 {
        PAD_PERIOD_BARS
    }

    fn tick(&mut self, time: f64) {
        if self.ctx.should_play(Layer::Pad) {
            let chord = chord_at(self.cursor);
            debug!(cursor = self.cursor, chord = chord_name_at(self.cursor), time, "pad tick");
            self.voice
                .borrow_mut()
                .trigger_attack_release(chord, PAD_CHORD_LENGTH, time);
        }
        self.cursor += 1;
    }
}

// ============================================================================
// Melody
// ============================================================================

/// Sparse random melody loop
///
/// Carries no state between ticks beyond its random source; the density is
/// read from the live control bank every time.
pub struct MelodyLoop {
    ctx: LoopContext,
    voice: SharedVoice,
    rng: Box<dyn RandomSource>,
    probability_cap: f64,
}

impl MelodyLoop {
    pub fn new(ctx: LoopContext, voice: SharedVoice, rng: Box<dyn RandomSource>) -> Self {
        Self {
            ctx,
            voice,
            rng,
            probability_cap: DEFAULT_MELODY_PROBABILITY_CAP,
        }
    }

    pub fn with_probability_cap(mut self, cap: f64) -> Self {
        self.probability_cap = cap;
        self
    }

    /// Chance of a note on the next tick at the current density
    pub fn note_probability(&self) -> f64 {
        self.ctx.controls.melody_density() * self.probability_cap
    }
}

impl LoopProcess for MelodyLoop {
    fn kind(&self) -> VoiceKind {
        VoiceKind::Melody
    }

    fn period_bars(&self) -> f64 {
        MELODY_PERIOD_BARS
    }

    fn tick(&mut self, time: f64) {
        if !self.ctx.should_play(Layer::Melody) {
            return;
        }

        let threshold = self.note_probability();
        let draw = self.rng.next_f64();
        if draw >= threshold {
            trace!(draw, threshold, time, "melody rest");
            return;
        }

        let index = ((self.rng.next_f64() * MELODY_NOTES.len() as f64) as usize)
            .min(MELODY_NOTES.len() - 1);
        let pitch = MELODY_NOTES[index];
        let length = if self.rng.next_f64() > 0.5 {
            NoteLength::Half
        } else {
            NoteLength::Quarter
        };

        debug!(pitch, %length, time, "melody note");
        self.voice
            .borrow_mut()
            .trigger_attack_release(&[pitch], length, time);
    }
}

// ============================================================================
// Drone
// ============================================================================

/// Sustained root loop
///
/// The next root is attacked a small offset after the release so the
/// envelope never retriggers on the same instant.
pub struct DroneLoop {
    ctx: LoopContext,
    voice: SharedVoice,
    cursor: usize,
    retrigger_offset: f64,
}

impl DroneLoop {
    pub fn new(ctx: LoopContext, voice: SharedVoice) -> Self {
        Self {
            ctx,
            voice,
            cursor: 0,
            retrigger_offset: DEFAULT_DRONE_RETRIGGER_OFFSET,
        }
    }

    pub fn with_retrigger_offset(mut self, seconds: f64) -> Self {
        self.retrigger_offset = seconds;
        self
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl LoopProcess for DroneLoop {
    fn kind(&self) -> VoiceKind {
        VoiceKind::Drone
    }

    fn period_bars(&self) -> f64 {
        DRONE_PERIOD_BARS
    }

    fn tick(&mut self, time: f64) {
        if !self.ctx.should_play(Layer::Drone) {
            return;
        }

        let root = drone_root_at(self.cursor);
        debug!(cursor = self.cursor, root, time, "drone tick");

        let mut voice = self.voice.borrow_mut();
        voice.trigger_release(time);
        voice.trigger_attack(root, time + self.retrigger_offset);
        self.cursor += 1;
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// The loop processes of one session, as registered on the transport
#[derive(Debug, Default)]
pub struct LayerScheduler {
    loops: Vec<(VoiceKind, LoopId)>,
}

impl LayerScheduler {
    /// Register the three layer loops and start them all at offset zero
    pub fn install<T: Transport + ?Sized>(
        transport: &mut T,
        pad: PadLoop,
        melody: MelodyLoop,
        drone: DroneLoop,
    ) -> Self {
        let mut scheduler = Self::default();
        scheduler.register(transport, pad);
        scheduler.register(transport, melody);
        scheduler.register(transport, drone);
        for (_, id) in &scheduler.loops {
            transport.start_loop(*id, 0.0);
        }
        scheduler
    }

    fn register<T, P>(&mut self, transport: &mut T, mut process: P)
    where
        T: Transport + ?Sized,
        P: LoopProcess + 'static,
    {
        let kind = process.kind();
        let id = transport.register_loop(
            process.period_bars(),
            Box::new(move |time: f64| process.tick(time)),
        );
        self.loops.push((kind, id));
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Stop every loop; calling it again is harmless
    pub fn stop_all<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        for (kind, id) in self.loops.drain(..) {
            transport.stop_loop(id);
            trace!(voice = %kind, "loop stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AudioBackend, Instruments, RecordingBackend, RigSpec, VoiceEvent};
    use crate::params::ControlId;
    use crate::sequencer::random::{ScriptedRandom, SeededRandom};
    use crate::sequencer::patterns::NIGHT_CHORDS;

    fn fixture() -> (RecordingBackend, Instruments, LoopContext) {
        let backend = RecordingBackend::new();
        let instruments = backend.build(&RigSpec::night()).unwrap();
        let ctx = LoopContext {
            layers: Rc::new(LayerStates::default()),
            controls: Rc::new(ControlBank::default()),
            live: Rc::new(Cell::new(true)),
        };
        (backend, instruments, ctx)
    }

    #[test]
    fn test_pad_walks_progression() {
        let (backend, instruments, ctx) = fixture();
        let mut pad = PadLoop::new(ctx, instruments.pad.clone());

        for i in 0..7 {
            pad.tick(i as f64 * 24.0);
        }

        let notes = backend.notes(VoiceKind::Pad);
        assert_eq!(notes.len(), 7);
        match &notes[6] {
            VoiceEvent::AttackRelease { pitches, length, time, .. } => {
                assert_eq!(pitches.as_slice(), NIGHT_CHORDS[0]);
                assert_eq!(*length, NoteLength::Bars(2));
                assert_eq!(*time, 144.0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_pad_cursor_advances_while_disabled() {
        let (backend, instruments, ctx) = fixture();
        let layers = ctx.layers.clone();
        let mut pad = PadLoop::new(ctx, instruments.pad.clone());

        pad.tick(0.0);
        layers.toggle(Layer::Pad);
        pad.tick(24.0);
        pad.tick(48.0);
        layers.toggle(Layer::Pad);
        pad.tick(72.0);

        assert_eq!(pad.cursor(), 4);
        let notes = backend.notes(VoiceKind::Pad);
        assert_eq!(notes.len(), 2);
        match &notes[1] {
            VoiceEvent::AttackRelease { pitches, .. } => {
                assert_eq!(pitches.as_slice(), NIGHT_CHORDS[3]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_melody_silent_at_zero_density() {
        let (backend, instruments, ctx) = fixture();
        ctx.layers.set_enabled(Layer::Melody, true);
        ctx.controls.set(ControlId::MelodyDensity, 0);
        let mut melody = MelodyLoop::new(ctx, instruments.melody.clone(), Box::new(ScriptedRandom::constant(0.0)));

        for bar in 0..200 {
            melody.tick(bar as f64 * 6.0);
        }
        assert!(backend.notes(VoiceKind::Melody).is_empty());
    }

    #[test]
    fn test_melody_probability_capped_at_full_density() {
        let (_backend, instruments, ctx) = fixture();
        ctx.controls.set(ControlId::MelodyDensity, 100);
        let melody = MelodyLoop::new(ctx, instruments.melody.clone(), Box::new(ScriptedRandom::constant(0.0)));
        assert!((melody.note_probability() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_melody_gate_threshold() {
        let (backend, instruments, ctx) = fixture();
        ctx.layers.set_enabled(Layer::Melody, true);
        ctx.controls.set(ControlId::MelodyDensity, 100);
        // draw 0.39 plays, draw 0.41 rests
        let script = ScriptedRandom::new(vec![0.39, 0.99, 0.9, 0.41]);
        let mut melody = MelodyLoop::new(ctx, instruments.melody.clone(), Box::new(script));

        melody.tick(0.0);
        melody.tick(6.0);

        let notes = backend.notes(VoiceKind::Melody);
        assert_eq!(
            notes,
            vec![VoiceEvent::AttackRelease {
                voice: VoiceKind::Melody,
                pitches: vec!["C6"],
                length: NoteLength::Half,
                time: 0.0,
            }]
        );
    }

    #[test]
    fn test_melody_rate_tracks_density() {
        let (backend, instruments, ctx) = fixture();
        ctx.layers.set_enabled(Layer::Melody, true);
        ctx.controls.set(ControlId::MelodyDensity, 100);
        let mut melody = MelodyLoop::new(ctx, instruments.melody.clone(), Box::new(SeededRandom::new(11)));

        let ticks = 5000;
        for bar in 0..ticks {
            melody.tick(bar as f64);
        }
        let rate = backend.notes(VoiceKind::Melody).len() as f64 / ticks as f64;
        assert!((rate - 0.4).abs() < 0.05, "rate {}", rate);
    }

    #[test]
    fn test_melody_disabled_draws_nothing() {
        let (backend, instruments, ctx) = fixture();
        ctx.controls.set(ControlId::MelodyDensity, 100);
        let mut melody = MelodyLoop::new(ctx, instruments.melody.clone(), Box::new(ScriptedRandom::constant(0.0)));
        melody.tick(0.0);
        assert!(backend.notes(VoiceKind::Melody).is_empty());
    }

    #[test]
    fn test_drone_cycles_roots_with_offset() {
        let (backend, instruments, ctx) = fixture();
        let mut drone = DroneLoop::new(ctx, instruments.drone.clone());

        let mut cursors = Vec::new();
        for i in 0..5 {
            cursors.push(drone.cursor() % 3);
            drone.tick(i as f64 * 48.0);
        }
        assert_eq!(cursors, vec![0, 1, 2, 0, 1]);

        let events = backend.events();
        assert_eq!(
            events[0],
            VoiceEvent::Release {
                voice: VoiceKind::Drone,
                time: 0.0
            }
        );
        assert_eq!(
            events[1],
            VoiceEvent::Attack {
                voice: VoiceKind::Drone,
                pitch: "A1",
                time: 0.1
            }
        );
        let roots: Vec<_> = backend
            .notes(VoiceKind::Drone)
            .into_iter()
            .filter_map(|e| match e {
                VoiceEvent::Attack { pitch, .. } => Some(pitch),
                _ => None,
            })
            .collect();
        assert_eq!(roots, vec!["A1", "E2", "A2", "A1", "E2"]);
    }

    #[test]
    fn test_ticks_silent_once_not_live() {
        let (backend, instruments, ctx) = fixture();
        let live = ctx.live.clone();
        let mut pad = PadLoop::new(ctx.clone(), instruments.pad.clone());
        let mut drone = DroneLoop::new(ctx, instruments.drone.clone());

        live.set(false);
        pad.tick(0.0);
        drone.tick(0.0);
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_install_and_stop() {
        use crate::engine::ManualTransport;

        let (backend, instruments, ctx) = fixture();
        let mut transport = ManualTransport::new();
        transport.set_tempo(40.0);

        let mut scheduler = LayerScheduler::install(
            &mut transport,
            PadLoop::new(ctx.clone(), instruments.pad.clone()),
            MelodyLoop::new(ctx.clone(), instruments.melody.clone(), Box::new(ScriptedRandom::constant(0.0))),
            DroneLoop::new(ctx, instruments.drone.clone()),
        );
        assert_eq!(scheduler.len(), 3);
        assert_eq!(transport.active_loop_count(), 3);

        transport.start();
        transport.advance_bars(8.0);
        assert_eq!(backend.notes(VoiceKind::Pad).len(), 2);
        assert_eq!(backend.notes(VoiceKind::Drone).len(), 1);

        scheduler.stop_all(&mut transport);
        scheduler.stop_all(&mut transport);
        assert!(scheduler.is_empty());
        assert_eq!(transport.active_loop_count(), 0);
    }
}
