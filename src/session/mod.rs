//! Session Module
//!
//! The single live instance of the engine and the controller that creates
//! and tears it down.

mod controller;

pub use controller::{SessionController, SessionInfo, SessionState};
