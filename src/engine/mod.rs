//! Audio Engine Module
//!
//! External collaborators of the sequencer, seen through narrow traits:
//! - Transport clock and loop registration
//! - Voice bank and effects chain
//! - A recording backend for offline runs and tests

pub mod recorder;
pub mod transport;
pub mod voice;

pub use recorder::{EventLog, RecordingBackend, VoiceEvent};
pub use transport::{
    bar_seconds, LoopId, ManualTransport, NoteLength, TickCallback, Transport, TransportState,
    BEATS_PER_BAR,
};
pub use voice::{
    AudioBackend, EffectSlot, EffectSpec, Effects, Envelope, Instruments, Pitch, RigSpec,
    SharedEffects, SharedVoice, Voice, VoiceKind, VoiceSpec, Waveform,
};
