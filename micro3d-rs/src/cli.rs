//! Root CLI structure for micro3d-rs

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "micro3d-rs")]
#[command(about = "Command-line tools for MascotCapsule micro3D v3 file formats", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// MBAC figure model operations
    Figure {
        #[command(subcommand)]
        command: crate::commands::figure::FigureCommands,
    },

    /// MTRA action table operations
    Action {
        #[command(subcommand)]
        command: crate::commands::action::ActionCommands,
    },
}
