//! Transport: the shared musical clock
//!
//! The engine never measures wall-clock time itself. Loop processes are
//! registered against a [`Transport`] with a period in bars, and the
//! transport invokes them with the exact trigger time (in seconds) of each
//! tick. [`ManualTransport`] is a deterministic implementation whose clock
//! only moves when it is told to, used by the CLI and by tests.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

/// Beats in one bar (4/4 time)
pub const BEATS_PER_BAR: f64 = 4.0;

/// Duration of one bar in seconds at the given tempo
pub fn bar_seconds(bpm: f64) -> f64 {
    BEATS_PER_BAR * 60.0 / bpm
}

/// Transport run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Clock halted at position zero (default state)
    #[default]
    Stopped,
    /// Clock running, loops fire
    Started,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Stopped => write!(f, "Stopped"),
            TransportState::Started => write!(f, "Started"),
        }
    }
}

/// Musical note length, resolved against the tempo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoteLength {
    /// Whole bars ("2m")
    Bars(u32),
    /// Half note ("2n")
    Half,
    /// Quarter note ("4n")
    Quarter,
    /// Eighth note ("8n")
    Eighth,
}

impl NoteLength {
    /// Length in beats
    pub fn beats(&self) -> f64 {
        match self {
            NoteLength::Bars(n) => f64::from(*n) * BEATS_PER_BAR,
            NoteLength::Half => 2.0,
            NoteLength::Quarter => 1.0,
            NoteLength::Eighth => 0.5,
        }
    }

    /// Length in seconds at the given tempo
    pub fn seconds(&self, bpm: f64) -> f64 {
        self.beats() * 60.0 / bpm
    }
}

impl fmt::Display for NoteLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteLength::Bars(n) => write!(f, "{}m", n),
            NoteLength::Half => write!(f, "2n"),
            NoteLength::Quarter => write!(f, "4n"),
            NoteLength::Eighth => write!(f, "8n"),
        }
    }
}

/// Handle to a registered loop; never reused by the same transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopId(u64);

/// Callback invoked once per tick with the tick's trigger time in seconds
pub type TickCallback = Box<dyn FnMut(f64)>;

/// Shared musical clock
///
/// Loop periods and offsets are in bars; trigger times handed to callbacks
/// and reported by [`Transport::now`] are in seconds.
pub trait Transport {
    /// Set the tempo in beats per minute
    fn set_tempo(&mut self, bpm: f64);

    /// Current tempo in beats per minute
    fn tempo(&self) -> f64;

    /// Start the clock
    fn start(&mut self);

    /// Stop the clock and rewind to zero
    fn stop(&mut self);

    /// Current run state
    fn state(&self) -> TransportState;

    /// Current clock position in seconds
    fn now(&self) -> f64;

    /// Register a recurring callback with a period in bars
    ///
    /// The loop stays silent until [`Transport::start_loop`] is called.
    fn register_loop(&mut self, period_bars: f64, callback: TickCallback) -> LoopId;

    /// Start a registered loop, first firing at `offset_bars`
    fn start_loop(&mut self, id: LoopId, offset_bars: f64);

    /// Stop a loop; it never fires again
    fn stop_loop(&mut self, id: LoopId);
}

struct LoopEntry {
    id: LoopId,
    period_bars: f64,
    offset_bars: f64,
    next_fire_bars: Option<f64>,
    callback: TickCallback,
}

impl LoopEntry {
    fn is_active(&self) -> bool {
        self.next_fire_bars.is_some()
    }
}

/// Deterministic transport whose clock is advanced explicitly
///
/// Ticks due in the half-open window `[now, now + delta)` fire in time
/// order when the clock is advanced; ties fire in registration order.
///
/// # Example
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use nocturne::engine::{ManualTransport, Transport};
///
/// let mut transport = ManualTransport::new();
/// let ticks = Rc::new(Cell::new(0));
/// let counter = ticks.clone();
/// let id = transport.register_loop(1.0, Box::new(move |_| counter.set(counter.get() + 1)));
/// transport.start_loop(id, 0.0);
/// transport.start();
/// transport.advance_bars(4.0);
/// assert_eq!(ticks.get(), 4);
/// ```
pub struct ManualTransport {
    state: TransportState,
    tempo_bpm: f64,
    position_bars: f64,
    /// Live loops in registration order
    loops: Vec<LoopEntry>,
    next_loop_id: u64,
}

impl Default for ManualTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTransport")
            .field("state", &self.state)
            .field("tempo_bpm", &self.tempo_bpm)
            .field("position_bars", &self.position_bars)
            .field("active_loops", &self.active_loop_count())
            .finish()
    }
}

impl ManualTransport {
    /// Create a stopped transport at 120 BPM
    pub fn new() -> Self {
        Self {
            state: TransportState::Stopped,
            tempo_bpm: 120.0,
            position_bars: 0.0,
            loops: Vec::new(),
            next_loop_id: 0,
        }
    }

    /// Current position in bars
    pub fn position_bars(&self) -> f64 {
        self.position_bars
    }

    /// Number of loops that are started and not yet stopped
    pub fn active_loop_count(&self) -> usize {
        self.loops.iter().filter(|l| l.is_active()).count()
    }

    /// Number of loops registered and not yet stopped
    pub fn registered_loop_count(&self) -> usize {
        self.loops.len()
    }

    /// Advance the clock by a number of seconds
    pub fn advance_seconds(&mut self, seconds: f64) -> usize {
        self.advance_bars(seconds / bar_seconds(self.tempo_bpm))
    }

    /// Advance the clock by a number of bars, firing every due tick
    ///
    /// # Returns
    /// The number of ticks fired
    pub fn advance_bars(&mut self, bars: f64) -> usize {
        let end = self.position_bars + bars.max(0.0);
        let mut fired = 0;

        if self.state == TransportState::Started {
            while let Some((index, at)) = self.next_due(end) {
                let trigger_time = at * bar_seconds(self.tempo_bpm);
                let entry = &mut self.loops[index];
                entry.next_fire_bars = Some(at + entry.period_bars);
                (entry.callback)(trigger_time);
                fired += 1;
            }
        }

        self.position_bars = end;
        fired
    }

    fn next_due(&self, end: f64) -> Option<(usize, f64)> {
        self.loops
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.next_fire_bars.map(|at| (index, at)))
            .filter(|(_, at)| *at < end)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
    }

    fn index_of(&self, id: LoopId) -> Option<usize> {
        self.loops.iter().position(|entry| entry.id == id)
    }

    /// First firing position at or after the current position
    fn align(&self, offset_bars: f64, period_bars: f64) -> f64 {
        if offset_bars >= self.position_bars {
            return offset_bars;
        }
        let periods = ((self.position_bars - offset_bars) / period_bars).ceil();
        offset_bars + periods * period_bars
    }
}

impl Transport for ManualTransport {
    fn set_tempo(&mut self, bpm: f64) {
        if bpm > 0.0 {
            self.tempo_bpm = bpm;
        } else {
            warn!(bpm, "[TRANSPORT] Ignoring non-positive tempo");
        }
    }

    fn tempo(&self) -> f64 {
        self.tempo_bpm
    }

    fn start(&mut self) {
        match self.state {
            TransportState::Stopped => {
                self.state = TransportState::Started;
                debug!(bpm = self.tempo_bpm, "[TRANSPORT] Started");
            }
            TransportState::Started => {
                debug!("[TRANSPORT] Already started");
            }
        }
    }

    fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.position_bars = 0.0;
        for entry in self.loops.iter_mut().filter(|l| l.is_active()) {
            entry.next_fire_bars = Some(entry.offset_bars);
        }
        debug!("[TRANSPORT] Stopped, position reset");
    }

    fn state(&self) -> TransportState {
        self.state
    }

    fn now(&self) -> f64 {
        self.position_bars * bar_seconds(self.tempo_bpm)
    }

    fn register_loop(&mut self, period_bars: f64, callback: TickCallback) -> LoopId {
        let id = LoopId(self.next_loop_id);
        self.next_loop_id += 1;
        if period_bars <= 0.0 {
            warn!(period_bars, "[TRANSPORT] Loop with non-positive period will never fire");
        }
        self.loops.push(LoopEntry {
            id,
            period_bars,
            offset_bars: 0.0,
            next_fire_bars: None,
            callback,
        });
        id
    }

    fn start_loop(&mut self, id: LoopId, offset_bars: f64) {
        let Some(index) = self.index_of(id) else {
            warn!(?id, "[TRANSPORT] Unknown loop");
            return;
        };
        let period_bars = self.loops[index].period_bars;
        if period_bars <= 0.0 {
            return;
        }
        let first = self.align(offset_bars, period_bars);
        let entry = &mut self.loops[index];
        entry.offset_bars = offset_bars;
        entry.next_fire_bars = Some(first);
    }

    fn stop_loop(&mut self, id: LoopId) {
        // Removing the entry drops the callback and whatever it captured.
        match self.index_of(id) {
            Some(index) => {
                self.loops.remove(index);
            }
            None => debug!(?id, "[TRANSPORT] Loop already stopped"),
        }
    }
}
