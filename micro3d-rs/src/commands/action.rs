//! MTRA action table command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};

use mc3_figure::{MotionChannel, decode_actions};

#[derive(Subcommand)]
pub enum ActionCommands {
    /// Display information about an MTRA action table file
    Info {
        /// Path to the MTRA file
        file: PathBuf,

        /// Show detailed information
        #[arg(short, long)]
        detailed: bool,
    },
}

pub fn execute(command: ActionCommands) -> Result<()> {
    match command {
        ActionCommands::Info { file, detailed } => info(&file, detailed),
    }
}

fn motion_name(channel: &MotionChannel) -> &'static str {
    match channel {
        MotionChannel::Explicit(_) => "explicit matrix",
        MotionChannel::Identity => "identity",
        MotionChannel::Full { .. } => "translate+scale+rotate+roll",
        MotionChannel::PivotRotate { .. } => "rotate about pivot",
        MotionChannel::RotateRoll { .. } => "rotate+roll",
        MotionChannel::Rotate(_) => "rotate",
        MotionChannel::TranslateRotateRoll { .. } => "translate+rotate+roll",
    }
}

fn info(file: &Path, detailed: bool) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let actions = decode_actions(&bytes).with_context(|| format!("decoding {}", file.display()))?;

    println!("MTRA action table: {}", file.display());
    println!("  Actions: {}", actions.len());
    for (i, action) in actions.iter().enumerate() {
        println!(
            "  [{i:3}] {} frame(s), {} bone channel(s), {} pattern key(s)",
            action.frame_count,
            action.channels.len(),
            action.pattern_keys.len()
        );
        if detailed {
            for (bone, channel) in action.channels.iter().enumerate() {
                println!("        bone {bone:3}: {}", motion_name(channel));
            }
        }
    }

    Ok(())
}
