mod cli;
mod config;
mod device;
mod error;
mod executor;
mod flags;
mod guard;
mod logging;
mod partition;
mod paths;
mod phase;
mod state;
mod swap;
mod tools;

#[cfg(test)]
mod testing;

use clap::Parser;
use tracing::{error, info};

use crate::cli::Cli;
use crate::config::ResizeConfig;
use crate::error::ResizeError;

fn main() {
    let cli = Cli::parse();

    let mut config = match ResizeConfig::load_from_path(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("rootfs-resize: {:#}", e);
            std::process::exit(1);
        }
    };
    if let Some(sysroot) = cli.sysroot.clone() {
        config.sysroot = sysroot;
    }

    let log_guard = logging::init(cli.debug, config.log_file.as_deref());

    if let Err(e) = cli::commands::handle_command(cli.command, &config) {
        match &e {
            ResizeError::BlockedByPolicy(reason) => info!("not resizing: {}", reason),
            ResizeError::Unexpected(inner) => error!("{:#}", inner),
            other => error!("{}", other),
        }
        // exit() skips destructors
        drop(log_guard);
        std::process::exit(e.exit_code());
    }
}
