pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::paths::CONFIG_FILE;

/// Grow the root partition and filesystem to fill the disk
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// Treat this directory as / for flag files, fstab and the swap file
    #[arg(long, global = true)]
    pub sysroot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run whichever resize phase is pending (default)
    Run {
        /// Print the actions instead of performing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the resize state and the resolved root device
    Status,
    /// Request a resize on the next boot
    Schedule {
        /// Also create a swap file of this many megabytes
        #[arg(short, long, value_name = "MB")]
        swap_size: Option<u64>,
        /// Print the actions instead of performing them
        #[arg(long)]
        dry_run: bool,
    },
}
