//! Recording backend
//!
//! An [`AudioBackend`] that produces no sound and instead appends every
//! command it receives to a shared event log. The CLI prints that log, and
//! tests assert against it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use tracing::trace;

use super::transport::NoteLength;
use super::voice::{AudioBackend, Effects, Instruments, Pitch, RigSpec, Voice, VoiceKind};
use crate::error::{NocturneError, Result};

/// One command received by a recorded voice or effect
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VoiceEvent {
    AttackRelease {
        voice: VoiceKind,
        pitches: Vec<Pitch>,
        length: NoteLength,
        time: f64,
    },
    Attack {
        voice: VoiceKind,
        pitch: Pitch,
        time: f64,
    },
    Release {
        voice: VoiceKind,
        time: f64,
    },
    ReleaseAll {
        voice: VoiceKind,
    },
    Volume {
        voice: VoiceKind,
        db: f64,
    },
    FilterFrequency {
        hz: f64,
    },
    DelayWet {
        wet: f64,
    },
    ReverbWet {
        wet: f64,
    },
}

impl VoiceEvent {
    /// Voice the event was addressed to, `None` for effect writes
    pub fn voice(&self) -> Option<VoiceKind> {
        match self {
            VoiceEvent::AttackRelease { voice, .. }
            | VoiceEvent::Attack { voice, .. }
            | VoiceEvent::Release { voice, .. }
            | VoiceEvent::ReleaseAll { voice }
            | VoiceEvent::Volume { voice, .. } => Some(*voice),
            _ => None,
        }
    }

    /// Whether the event starts a note
    pub fn is_note(&self) -> bool {
        matches!(
            self,
            VoiceEvent::AttackRelease { .. } | VoiceEvent::Attack { .. }
        )
    }
}

impl fmt::Display for VoiceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceEvent::AttackRelease {
                voice,
                pitches,
                length,
                time,
            } => write!(f, "{:>8.2}s {:<6} play [{}] for {}", time, voice, pitches.join(" "), length),
            VoiceEvent::Attack { voice, pitch, time } => {
                write!(f, "{:>8.2}s {:<6} attack {}", time, voice, pitch)
            }
            VoiceEvent::Release { voice, time } => write!(f, "{:>8.2}s {:<6} release", time, voice),
            VoiceEvent::ReleaseAll { voice } => write!(f, "{:>9} {:<6} release all", "-", voice),
            VoiceEvent::Volume { voice, db } => write!(f, "{:>9} {:<6} volume {:.2} dB", "-", voice, db),
            VoiceEvent::FilterFrequency { hz } => write!(f, "{:>9} filter {:.0} Hz", "-", hz),
            VoiceEvent::DelayWet { wet } => write!(f, "{:>9} delay  wet {:.2}", "-", wet),
            VoiceEvent::ReverbWet { wet } => write!(f, "{:>9} reverb wet {:.2}", "-", wet),
        }
    }
}

/// Shared, append-only event log
pub type EventLog = Rc<RefCell<Vec<VoiceEvent>>>;

struct RecordedVoice {
    kind: VoiceKind,
    log: EventLog,
}

impl RecordedVoice {
    fn record(&self, event: VoiceEvent) {
        trace!(voice = %self.kind, ?event, "voice command");
        self.log.borrow_mut().push(event);
    }
}

impl Voice for RecordedVoice {
    fn trigger_attack_release(&mut self, pitches: &[Pitch], length: NoteLength, time: f64) {
        self.record(VoiceEvent::AttackRelease {
            voice: self.kind,
            pitches: pitches.to_vec(),
            length,
            time,
        });
    }

    fn trigger_attack(&mut self, pitch: Pitch, time: f64) {
        self.record(VoiceEvent::Attack {
            voice: self.kind,
            pitch,
            time,
        });
    }

    fn trigger_release(&mut self, time: f64) {
        self.record(VoiceEvent::Release {
            voice: self.kind,
            time,
        });
    }

    fn release_all(&mut self) {
        self.record(VoiceEvent::ReleaseAll { voice: self.kind });
    }

    fn set_volume_db(&mut self, db: f64) {
        self.record(VoiceEvent::Volume {
            voice: self.kind,
            db,
        });
    }
}

struct RecordedEffects {
    log: EventLog,
}

impl Effects for RecordedEffects {
    fn set_filter_frequency(&mut self, hz: f64) {
        self.log.borrow_mut().push(VoiceEvent::FilterFrequency { hz });
    }

    fn set_delay_wet(&mut self, wet: f64) {
        self.log.borrow_mut().push(VoiceEvent::DelayWet { wet });
    }

    fn set_reverb_wet(&mut self, wet: f64) {
        self.log.borrow_mut().push(VoiceEvent::ReverbWet { wet });
    }
}

/// Backend that records instead of playing
///
/// # Example
/// ```
/// use nocturne::engine::{AudioBackend, RecordingBackend, RigSpec, Voice, VoiceKind};
///
/// let backend = RecordingBackend::new();
/// let instruments = backend.build(&RigSpec::night()).unwrap();
/// instruments.pad.borrow_mut().set_volume_db(-14.0);
/// assert_eq!(backend.volume_db(VoiceKind::Pad), Some(-14.0));
/// ```
#[derive(Default)]
pub struct RecordingBackend {
    log: EventLog,
    activation_failure: RefCell<Option<String>>,
    yield_on_activate: bool,
    activations: Cell<usize>,
    builds: Cell<usize>,
    last_rig: RefCell<Option<RigSpec>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make activation suspend once before completing
    pub fn with_activation_yield(mut self) -> Self {
        self.yield_on_activate = true;
        self
    }

    /// Make the next activation fail with the given reason
    pub fn fail_next_activation(&self, reason: impl Into<String>) {
        *self.activation_failure.borrow_mut() = Some(reason.into());
    }

    /// Handle to the shared event log
    pub fn log(&self) -> EventLog {
        self.log.clone()
    }

    /// Copy of every recorded event
    pub fn events(&self) -> Vec<VoiceEvent> {
        self.log.borrow().clone()
    }

    /// Note-starting events addressed to one voice
    pub fn notes(&self, kind: VoiceKind) -> Vec<VoiceEvent> {
        self.log
            .borrow()
            .iter()
            .filter(|e| e.is_note() && e.voice() == Some(kind))
            .cloned()
            .collect()
    }

    /// Forget every recorded event
    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    /// Successful activations so far
    pub fn activations(&self) -> usize {
        self.activations.get()
    }

    /// Rigs built so far
    pub fn builds(&self) -> usize {
        self.builds.get()
    }

    /// Recipe of the most recently built rig
    pub fn last_rig(&self) -> Option<RigSpec> {
        self.last_rig.borrow().clone()
    }

    /// Last volume written to a voice
    pub fn volume_db(&self, kind: VoiceKind) -> Option<f64> {
        self.log.borrow().iter().rev().find_map(|e| match e {
            VoiceEvent::Volume { voice, db } if *voice == kind => Some(*db),
            _ => None,
        })
    }

    /// Last filter cutoff written
    pub fn filter_frequency(&self) -> Option<f64> {
        self.log.borrow().iter().rev().find_map(|e| match e {
            VoiceEvent::FilterFrequency { hz } => Some(*hz),
            _ => None,
        })
    }

    /// Last reverb wet fraction written
    pub fn reverb_wet(&self) -> Option<f64> {
        self.log.borrow().iter().rev().find_map(|e| match e {
            VoiceEvent::ReverbWet { wet } => Some(*wet),
            _ => None,
        })
    }

    /// Last delay wet fraction written
    pub fn delay_wet(&self) -> Option<f64> {
        self.log.borrow().iter().rev().find_map(|e| match e {
            VoiceEvent::DelayWet { wet } => Some(*wet),
            _ => None,
        })
    }

    fn voice(&self, kind: VoiceKind) -> Rc<RefCell<RecordedVoice>> {
        Rc::new(RefCell::new(RecordedVoice {
            kind,
            log: self.log.clone(),
        }))
    }
}

impl AudioBackend for RecordingBackend {
    async fn activate(&self) -> Result<()> {
        if self.yield_on_activate {
            tokio::task::yield_now().await;
        }
        if let Some(reason) = self.activation_failure.borrow_mut().take() {
            return Err(NocturneError::ActivationFailed { reason });
        }
        self.activations.set(self.activations.get() + 1);
        Ok(())
    }

    fn build(&self, rig: &RigSpec) -> Result<Instruments> {
        self.builds.set(self.builds.get() + 1);
        *self.last_rig.borrow_mut() = Some(rig.clone());
        Ok(Instruments {
            pad: self.voice(VoiceKind::Pad),
            melody: self.voice(VoiceKind::Melody),
            drone: self.voice(VoiceKind::Drone),
            effects: Rc::new(RefCell::new(RecordedEffects {
                log: self.log.clone(),
            })),
        })
    }
}
