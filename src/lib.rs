//! Nocturne - Generative Ambient Music Engine
//!
//! Nocturne schedules looping musical layers over a shared musical clock and
//! lets a listener reshape the mix in real time.
//!
//! # Architecture
//!
//! - Sequencer: pad, melody and drone loops, each with its own period,
//!   gated by layer flags and (for the melody) a live density control
//! - Parameters: pure mapping from 0-100 panel controls to decibels,
//!   hertz and wet fractions, plus mood presets
//! - Session: the start/stop/regenerate state machine that owns one live
//!   set of instruments and loops at a time
//!
//! Sound synthesis and the clock itself sit behind the `engine` traits.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod layers;
pub mod params;
pub mod sequencer;
pub mod session;

pub use error::{NocturneError, Result};
