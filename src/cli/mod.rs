//! CLI module for Gesture Gateway
//!
//! - `serve`: run the translation and training server
//! - `lessons`: print lesson model metadata from disk

pub mod lessons;
pub mod serve;

use clap::{Parser, Subcommand};

/// Gesture Gateway - real-time gesture recognition with live training
#[derive(Parser)]
#[command(name = "gesture-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the server (default)
    Serve,

    /// List trained lesson models without starting the server
    Lessons(lessons::LessonsArgs),
}
