//! Session Controller
//!
//! The start/stop/regenerate state machine. At most one session is ever
//! live; every command is idempotent.
//!
//! ```text
//!   Stopped ──start()──▶ Starting ──(activation ok)──▶ Playing
//!      ▲                    │                            │
//!      └──(activation err)──┘◀───────────stop()──────────┘
//! ```
//!
//! Teardown order on `stop()` is fixed: mark the session not live, stop the
//! transport, stop every loop, then release every note. A tick that slips
//! in after the first step produces nothing.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::engine::{AudioBackend, Instruments, RigSpec, Transport};
use crate::error::Result;
use crate::layers::{Layer, LayerStates};
use crate::params::{ControlBank, ControlId, ControlValues, Preset};
use crate::sequencer::{
    drone_root_at, seeded_factory, DroneLoop, LayerScheduler, LoopContext, MelodyLoop, PadLoop,
    RandomFactory,
};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SessionState {
    /// No session (initial state)
    #[default]
    Stopped,
    /// Waiting for the audio context to activate
    Starting,
    /// Loops registered and the transport running
    Playing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Stopped => write!(f, "Stopped"),
            SessionState::Starting => write!(f, "Starting"),
            SessionState::Playing => write!(f, "Playing"),
        }
    }
}

/// Summary of the live session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub tempo_bpm: f64,
    /// 1 for the first session this controller started
    pub number: u64,
}

struct Session {
    info: SessionInfo,
    instruments: Instruments,
    scheduler: LayerScheduler,
    live: Rc<Cell<bool>>,
}

/// Puts the state back to `Stopped` unless the start completed
///
/// Covers both a failed activation and a `start()` future dropped while
/// suspended.
struct StartingGuard<'a> {
    state: &'a Cell<SessionState>,
    committed: bool,
}

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.state.set(SessionState::Stopped);
        }
    }
}

/// Owner of the engine's session state
///
/// Commands take `&self`, so a presentation shell can share the controller
/// (e.g. in an `Rc`) between local tasks. Nothing here is `Send`; the whole
/// engine lives on one thread.
///
/// # Example
/// ```
/// use nocturne::config::EngineConfig;
/// use nocturne::engine::{ManualTransport, RecordingBackend};
/// use nocturne::session::{SessionController, SessionState};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let controller = SessionController::new(
///     EngineConfig::default(),
///     ManualTransport::new(),
///     RecordingBackend::new(),
/// );
/// controller.start().await.unwrap();
/// assert_eq!(controller.state(), SessionState::Playing);
/// controller.stop();
/// assert_eq!(controller.state(), SessionState::Stopped);
/// # });
/// ```
pub struct SessionController<T: Transport, B: AudioBackend> {
    config: EngineConfig,
    state: Cell<SessionState>,
    layers: Rc<LayerStates>,
    controls: Rc<ControlBank>,
    transport: RefCell<T>,
    backend: B,
    random: RefCell<RandomFactory>,
    session: RefCell<Option<Session>>,
    sessions_started: Cell<u64>,
}

impl<T: Transport, B: AudioBackend> SessionController<T, B> {
    /// Create a stopped controller
    pub fn new(config: EngineConfig, transport: T, backend: B) -> Self {
        let random = seeded_factory(config.seed);
        Self {
            layers: Rc::new(LayerStates::from_flags(config.layers)),
            controls: Rc::new(ControlBank::new(config.controls)),
            config,
            state: Cell::new(SessionState::Stopped),
            transport: RefCell::new(transport),
            backend,
            random: RefCell::new(random),
            session: RefCell::new(None),
            sessions_started: Cell::new(0),
        }
    }

    /// Replace the source of melodic randomness
    pub fn with_random_factory(self, factory: RandomFactory) -> Self {
        *self.random.borrow_mut() = factory;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn is_playing(&self) -> bool {
        self.state.get() == SessionState::Playing
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn layers(&self) -> &LayerStates {
        &self.layers
    }

    pub fn controls(&self) -> &ControlBank {
        &self.controls
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Borrow the transport
    ///
    /// Must not be held across another controller command.
    pub fn transport(&self) -> Ref<'_, T> {
        self.transport.borrow()
    }

    /// Mutably borrow the transport, e.g. to advance a manual clock
    ///
    /// Must not be held across another controller command.
    pub fn transport_mut(&self) -> RefMut<'_, T> {
        self.transport.borrow_mut()
    }

    /// Summary of the live session, `None` when none is playing
    pub fn info(&self) -> Option<SessionInfo> {
        self.session.borrow().as_ref().map(|s| s.info.clone())
    }

    /// Number of sessions started over the controller's lifetime
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started.get()
    }

    // ========================================================================
    // Session Commands
    // ========================================================================

    /// Start a session
    ///
    /// No-op while `Starting` or `Playing`. Activation of the audio context
    /// is the only suspension point; if it fails the error is returned and
    /// the controller is back in `Stopped`, ready for another attempt.
    pub async fn start(&self) -> Result<()> {
        if self.state.get() != SessionState::Stopped {
            debug!(state = %self.state.get(), "[SESSION] start ignored");
            return Ok(());
        }

        self.state.set(SessionState::Starting);
        let mut guard = StartingGuard {
            state: &self.state,
            committed: false,
        };

        if let Err(err) = self.backend.activate().await {
            warn!(error = %err, "[SESSION] audio context activation failed");
            return Err(err);
        }

        let instruments = self.backend.build(&RigSpec::night())?;
        let number = self.sessions_started.get() + 1;
        let live = Rc::new(Cell::new(false));
        let ctx = LoopContext {
            layers: self.layers.clone(),
            controls: self.controls.clone(),
            live: live.clone(),
        };
        let rng = {
            let mut factory = self.random.borrow_mut();
            (&mut *factory)(number)
        };

        let mut transport = self.transport.borrow_mut();
        let scheduler = LayerScheduler::install(
            &mut *transport,
            PadLoop::new(ctx.clone(), instruments.pad.clone()),
            MelodyLoop::new(ctx.clone(), instruments.melody.clone(), rng)
                .with_probability_cap(self.config.melody_probability_cap),
            DroneLoop::new(ctx, instruments.drone.clone())
                .with_retrigger_offset(self.config.drone_retrigger_offset_secs),
        );

        instruments.apply_mix(&self.controls.mix());

        transport.set_tempo(self.config.tempo_bpm);
        transport.start();
        live.set(true);
        self.state.set(SessionState::Playing);
        guard.committed = true;

        // Sound the drone now rather than after its first loop tick.
        if self.layers.is_enabled(Layer::Drone) {
            instruments
                .drone
                .borrow_mut()
                .trigger_attack(drone_root_at(0), transport.now());
        }
        drop(transport);

        let info = SessionInfo {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            tempo_bpm: self.config.tempo_bpm,
            number,
        };
        info!(session = %info.id, number, bpm = info.tempo_bpm, "[SESSION] playing");

        self.sessions_started.set(number);
        *self.session.borrow_mut() = Some(Session {
            info,
            instruments,
            scheduler,
            live,
        });
        Ok(())
    }

    /// Stop the session
    ///
    /// No-op unless `Playing`; never fails.
    pub fn stop(&self) {
        if self.state.get() != SessionState::Playing {
            debug!(state = %self.state.get(), "[SESSION] stop ignored");
            return;
        }
        self.state.set(SessionState::Stopped);

        let Some(mut session) = self.session.borrow_mut().take() else {
            return;
        };
        session.live.set(false);

        let mut transport = self.transport.borrow_mut();
        transport.stop();
        session.scheduler.stop_all(&mut *transport);
        drop(transport);

        session.instruments.release_all();
        info!(session = %session.info.id, "[SESSION] stopped");
    }

    /// Tear the session down and start a fresh one
    ///
    /// Waits the configured delay between the two so release envelopes can
    /// finish. New loops start with fresh cursors and a fresh random source.
    /// No-op unless `Playing`.
    pub async fn regenerate(&self) -> Result<()> {
        if !self.is_playing() {
            debug!(state = %self.state.get(), "[SESSION] regenerate ignored");
            return Ok(());
        }
        info!("[SESSION] regenerating");
        self.stop();
        tokio::time::sleep(self.config.regenerate_delay()).await;
        self.start().await
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Flip a layer's flag; takes effect on that layer's next tick
    ///
    /// # Returns
    /// The new enabled state
    pub fn toggle_layer(&self, layer: Layer) -> bool {
        let enabled = self.layers.toggle(layer);
        debug!(%layer, enabled, "[LAYER] toggled");
        enabled
    }

    /// Flip a layer's flag by name
    ///
    /// Unknown names are logged and ignored.
    pub fn toggle_layer_by_name(&self, name: &str) -> Option<bool> {
        match name.parse::<Layer>() {
            Ok(layer) => Some(self.toggle_layer(layer)),
            Err(err) => {
                warn!(error = %err, "[LAYER] toggle ignored");
                None
            }
        }
    }

    // ========================================================================
    // Controls
    // ========================================================================

    /// Store a raw control value and, while playing, push the mix
    ///
    /// # Returns
    /// The value stored after clamping to 0-100
    pub fn set_control_value(&self, id: ControlId, raw: i64) -> u8 {
        let stored = self.controls.set(id, raw);
        debug!(control = %id, raw, stored, "[CONTROL] set");
        self.apply_controls();
        stored
    }

    /// Store a raw control value by name
    pub fn set_control_by_name(&self, name: &str, raw: i64) -> Result<u8> {
        let id = name.parse::<ControlId>()?;
        Ok(self.set_control_value(id, raw))
    }

    /// Current raw value of a control
    pub fn control_value(&self, id: ControlId) -> u8 {
        self.controls.get(id)
    }

    /// Current engine-unit value of a control
    pub fn mapped_value(&self, id: ControlId) -> Option<f64> {
        self.controls.mapped(id)
    }

    /// Store a preset's values in one batch, then push the mix
    pub fn load_preset(&self, preset: Preset) {
        self.load_controls(&preset.values());
        info!(%preset, "[CONTROL] preset loaded");
    }

    /// Load a preset by name
    ///
    /// Unknown names are logged and ignored.
    pub fn load_preset_by_name(&self, name: &str) -> Option<Preset> {
        match name.parse::<Preset>() {
            Ok(preset) => {
                self.load_preset(preset);
                Some(preset)
            }
            Err(err) => {
                warn!(error = %err, "[CONTROL] preset ignored");
                None
            }
        }
    }

    /// Store a full set of control values, then push the mix
    pub fn load_controls(&self, values: &ControlValues) {
        self.controls.load(values);
        self.apply_controls();
    }

    /// Push every mapped control to the live instruments
    ///
    /// Values stored while stopped are applied by the next `start()`.
    fn apply_controls(&self) {
        if !self.is_playing() {
            return;
        }
        if let Some(session) = self.session.borrow().as_ref() {
            let mix = self.controls.mix();
            session.instruments.apply_mix(&mix);
            debug!(?mix, "[CONTROL] mix applied");
        }
    }
}

impl<T: Transport, B: AudioBackend> Drop for SessionController<T, B> {
    fn drop(&mut self) {
        self.stop();
    }
}
