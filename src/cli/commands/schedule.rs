use tracing::{info, warn};

use crate::config::ResizeConfig;
use crate::error::ResizeError;
use crate::flags::{Flag, FlagFileStore, FsFlagStore};
use crate::state::ResizeState;

pub(super) fn handle_schedule_command(
    config: &ResizeConfig,
    swap_size: Option<u64>,
    dry_run: bool,
) -> Result<(), ResizeError> {
    let flags = FsFlagStore::new(&config.sysroot, dry_run);
    schedule(&flags, swap_size)?;
    info!("resize scheduled for the next boot");
    Ok(())
}

fn schedule(flags: &dyn FlagFileStore, swap_size: Option<u64>) -> anyhow::Result<()> {
    let state = ResizeState::detect(flags);
    if state != ResizeState::Idle {
        warn!("a resize is already in progress ({})", state.describe());
    }

    if let Some(size) = swap_size.filter(|size| *size > 0) {
        flags.write(Flag::SwapSize, &size.to_string())?;
    }
    if state == ResizeState::Idle {
        flags.create(Flag::RepartitionPending)?;
    }
    Ok(())
}
