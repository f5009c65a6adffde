//! Voice Bank and effects contract
//!
//! The engine does not synthesize audio. It talks to an [`AudioBackend`]
//! that activates the audio context and builds the instruments described
//! by a [`RigSpec`]; after that it only issues note commands and parameter
//! writes through the [`Voice`] and [`Effects`] traits.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use super::transport::NoteLength;
use crate::error::Result;
use crate::params::MixParameters;

/// Scientific pitch name, e.g. `"A3"` or `"F#4"`
pub type Pitch = &'static str;

/// The three sound-producing channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceKind {
    Pad,
    Melody,
    Drone,
}

impl VoiceKind {
    pub const ALL: [VoiceKind; 3] = [VoiceKind::Pad, VoiceKind::Melody, VoiceKind::Drone];

    pub fn name(&self) -> &'static str {
        match self {
            VoiceKind::Pad => "pad",
            VoiceKind::Melody => "melody",
            VoiceKind::Drone => "drone",
        }
    }
}

impl fmt::Display for VoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// One sound-producing channel
///
/// Times are transport seconds as handed to loop callbacks.
pub trait Voice {
    /// Play one or more simultaneous pitches for a fixed length
    fn trigger_attack_release(&mut self, pitches: &[Pitch], length: NoteLength, time: f64);

    /// Start a sustained note
    fn trigger_attack(&mut self, pitch: Pitch, time: f64);

    /// Release the currently sustained note
    fn trigger_release(&mut self, time: f64);

    /// Release every sounding note immediately
    fn release_all(&mut self);

    /// Write the output volume in decibels
    fn set_volume_db(&mut self, db: f64);
}

/// The shared effects chain
pub trait Effects {
    /// Lowpass filter cutoff in hertz
    fn set_filter_frequency(&mut self, hz: f64);

    /// Delay wet fraction
    fn set_delay_wet(&mut self, wet: f64);

    /// Reverb wet fraction
    fn set_reverb_wet(&mut self, wet: f64);
}

pub type SharedVoice = Rc<RefCell<dyn Voice>>;
pub type SharedEffects = Rc<RefCell<dyn Effects>>;

/// Live voices and effects of one session
#[derive(Clone)]
pub struct Instruments {
    pub pad: SharedVoice,
    pub melody: SharedVoice,
    pub drone: SharedVoice,
    pub effects: SharedEffects,
}

impl Instruments {
    /// Voice for a channel
    pub fn voice(&self, kind: VoiceKind) -> &SharedVoice {
        match kind {
            VoiceKind::Pad => &self.pad,
            VoiceKind::Melody => &self.melody,
            VoiceKind::Drone => &self.drone,
        }
    }

    /// Push mapped control values to the voices and effects
    ///
    /// Melody density is not written anywhere; the melody loop reads it
    /// live on every tick.
    pub fn apply_mix(&self, mix: &MixParameters) {
        self.pad.borrow_mut().set_volume_db(mix.pad_volume_db);
        self.melody.borrow_mut().set_volume_db(mix.melody_volume_db);
        self.drone.borrow_mut().set_volume_db(mix.drone_volume_db);

        let mut effects = self.effects.borrow_mut();
        effects.set_filter_frequency(mix.filter_frequency_hz);
        effects.set_reverb_wet(mix.reverb_wet);
        effects.set_delay_wet(mix.delay_wet);
    }

    /// Release every note on every voice
    pub fn release_all(&self) {
        for kind in VoiceKind::ALL {
            self.voice(kind).borrow_mut().release_all();
        }
    }
}

/// Audio output provider
#[allow(async_fn_in_trait)]
pub trait AudioBackend {
    /// Activate the shared audio context
    ///
    /// Must complete before any sound-producing call is valid. Platforms
    /// with autoplay restrictions refuse activation without a user gesture.
    async fn activate(&self) -> Result<()>;

    /// Construct the voices and effects chain described by `rig`
    fn build(&self, rig: &RigSpec) -> Result<Instruments>;
}

// ============================================================================
// Rig Recipe
// ============================================================================

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
}

/// ADSR envelope; times in seconds, sustain as a level in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

/// Position in the effects chain, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectSlot {
    Filter = 0,
    Delay = 1,
    Reverb = 2,
}

/// Construction parameters of one effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum EffectSpec {
    /// Lowpass filter
    Filter { frequency_hz: f64 },
    /// Ping-pong delay
    Delay { time: NoteLength, feedback: f64 },
    /// Reverb with a decay time in seconds
    Reverb { decay_secs: f64 },
}

impl EffectSpec {
    pub fn slot(&self) -> EffectSlot {
        match self {
            EffectSpec::Filter { .. } => EffectSlot::Filter,
            EffectSpec::Delay { .. } => EffectSlot::Delay,
            EffectSpec::Reverb { .. } => EffectSlot::Reverb,
        }
    }
}

/// Construction parameters of one voice
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSpec {
    pub kind: VoiceKind,
    pub waveform: Waveform,
    pub envelope: Envelope,
    pub polyphonic: bool,
    /// First effect the voice feeds; everything after it in the chain follows
    pub route: EffectSlot,
}

/// Everything a backend needs to build a session's instruments
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RigSpec {
    /// Effects in processing order, the last one feeding the output
    pub effects: Vec<EffectSpec>,
    pub voices: Vec<VoiceSpec>,
}

impl Default for RigSpec {
    fn default() -> Self {
        Self::night()
    }
}

impl RigSpec {
    /// The nocturnal rig: filter → delay → reverb, with a sawtooth pad, a
    /// sine melody straight into the reverb, and a triangle drone
    pub fn night() -> Self {
        Self {
            effects: vec![
                EffectSpec::Filter { frequency_hz: 800.0 },
                EffectSpec::Delay {
                    time: NoteLength::Eighth,
                    feedback: 0.2,
                },
                EffectSpec::Reverb { decay_secs: 6.0 },
            ],
            voices: vec![
                VoiceSpec {
                    kind: VoiceKind::Pad,
                    waveform: Waveform::Sawtooth,
                    envelope: Envelope {
                        attack: 8.0,
                        decay: 0.1,
                        sustain: 0.9,
                        release: 12.0,
                    },
                    polyphonic: true,
                    route: EffectSlot::Filter,
                },
                VoiceSpec {
                    kind: VoiceKind::Melody,
                    waveform: Waveform::Sine,
                    envelope: Envelope {
                        attack: 3.0,
                        decay: 2.0,
                        sustain: 0.3,
                        release: 8.0,
                    },
                    polyphonic: false,
                    route: EffectSlot::Reverb,
                },
                VoiceSpec {
                    kind: VoiceKind::Drone,
                    waveform: Waveform::Triangle,
                    envelope: Envelope {
                        attack: 12.0,
                        decay: 0.0,
                        sustain: 1.0,
                        release: 15.0,
                    },
                    polyphonic: false,
                    route: EffectSlot::Filter,
                },
            ],
        }
    }

    /// Effect slots in processing order
    pub fn chain_order(&self) -> Vec<EffectSlot> {
        self.effects.iter().map(EffectSpec::slot).collect()
    }

    /// Effects a voice passes through, in order
    pub fn signal_path(&self, kind: VoiceKind) -> Vec<EffectSlot> {
        let Some(voice) = self.voice(kind) else {
            return Vec::new();
        };
        self.chain_order()
            .into_iter()
            .filter(|slot| *slot >= voice.route)
            .collect()
    }

    pub fn voice(&self, kind: VoiceKind) -> Option<&VoiceSpec> {
        self.voices.iter().find(|v| v.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_order() {
        let rig = RigSpec::night();
        assert_eq!(
            rig.chain_order(),
            vec![EffectSlot::Filter, EffectSlot::Delay, EffectSlot::Reverb]
        );
        let mut sorted = rig.chain_order();
        sorted.sort();
        assert_eq!(sorted, rig.chain_order());
    }

    #[test]
    fn test_signal_paths() {
        let rig = RigSpec::night();
        assert_eq!(rig.signal_path(VoiceKind::Pad).len(), 3);
        assert_eq!(rig.signal_path(VoiceKind::Drone).len(), 3);
        assert_eq!(rig.signal_path(VoiceKind::Melody), vec![EffectSlot::Reverb]);
    }

    #[test]
    fn test_only_pad_is_polyphonic() {
        let rig = RigSpec::night();
        for voice in &rig.voices {
            assert_eq!(voice.polyphonic, voice.kind == VoiceKind::Pad);
        }
    }
}
