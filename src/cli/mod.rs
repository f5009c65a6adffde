//! CLI Module
//!
//! Command-line interface for the Nocturne engine.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Nocturne - generative ambient music engine
#[derive(Parser, Debug)]
#[command(name = "nocturne")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a session against the manual clock and print what it played
    #[command(name = "play")]
    Play(PlayArgs),

    /// List the mood presets with raw and mapped values
    #[command(name = "presets")]
    Presets,

    /// List the panel controls
    #[command(name = "controls")]
    Controls,
}

#[derive(clap::Args, Debug)]
pub struct PlayArgs {
    /// Mood preset to load after starting
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Number of bars to run
    #[arg(short, long, default_value_t = 32)]
    pub bars: u32,

    /// Seed for the melody (overrides the config file)
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Pace the clock in wall time, one bar per bar
    #[arg(long)]
    pub realtime: bool,

    /// Flip a layer after starting (repeatable)
    #[arg(short, long = "toggle", value_name = "LAYER")]
    pub toggles: Vec<String>,

    /// Set a control after starting, e.g. melody-density=80 (repeatable)
    #[arg(long = "set", value_name = "CONTROL=VALUE")]
    pub sets: Vec<String>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}
