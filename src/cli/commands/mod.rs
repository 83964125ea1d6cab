mod run;
mod schedule;
mod status;

use crate::cli::Commands;
use crate::config::ResizeConfig;
use crate::error::ResizeError;
use crate::paths;

use self::run::handle_run_command;
use self::schedule::handle_schedule_command;
use self::status::handle_status_command;

pub fn handle_command(
    command: Option<Commands>,
    config: &ResizeConfig,
) -> Result<(), ResizeError> {
    match command.unwrap_or(Commands::Run { dry_run: false }) {
        Commands::Run { dry_run } => handle_run_command(config, effective_dry_run(config, dry_run)),
        Commands::Status => handle_status_command(config),
        Commands::Schedule { swap_size, dry_run } => {
            handle_schedule_command(config, swap_size, effective_dry_run(config, dry_run))
        }
    }
}

/// Dry-run is forced on while the marker file exists.
fn effective_dry_run(config: &ResizeConfig, requested: bool) -> bool {
    if config.system_path(paths::DRY_RUN_FLAG).exists() {
        if !requested {
            tracing::info!("{} exists, forcing dry-run mode", paths::DRY_RUN_FLAG);
        }
        return true;
    }
    requested
}
