//! Phase 2: grow the filesystem and provision the requested swap file.

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::ResizeConfig;
use crate::flags::{Flag, FlagFileStore};
use crate::swap;
use crate::tools::SystemTools;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    NotRequested,
    /// Request present but zero or unparsable; left in place
    Ignored(String),
    Created { size_mb: u64 },
    AlreadyPresent,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeReport {
    pub filesystem_grown: bool,
    pub swap: SwapOutcome,
    pub fstab_updated: bool,
}

pub fn run(
    node: &str,
    config: &ResizeConfig,
    flags: &dyn FlagFileStore,
    tools: &dyn SystemTools,
    dry_run: bool,
) -> Result<FinalizeReport> {
    let filesystem_grown = tools.grow_filesystem(node);
    if !filesystem_grown {
        warn!(device = %node, "filesystem resize did not succeed");
    }

    let (swap, fstab_updated) = provision_swap(config, flags, tools, dry_run)?;

    flags.remove(Flag::ResizePending)?;
    info!("resize complete");

    Ok(FinalizeReport {
        filesystem_grown,
        swap,
        fstab_updated,
    })
}

fn provision_swap(
    config: &ResizeConfig,
    flags: &dyn FlagFileStore,
    tools: &dyn SystemTools,
    dry_run: bool,
) -> Result<(SwapOutcome, bool)> {
    let Some(request) = flags.read_first_line(Flag::SwapSize)? else {
        return Ok((SwapOutcome::NotRequested, false));
    };

    let size_mb = swap::parse_swap_size(&request);
    if size_mb == 0 {
        info!("ignoring swap request '{}'", request.trim());
        return Ok((SwapOutcome::Ignored(request), false));
    }

    let swap_path = config.swap_file_path();
    let outcome = if swap_path.exists() {
        info!("{} already exists", swap_path.display());
        SwapOutcome::AlreadyPresent
    } else {
        match swap::create_swap_file(&swap_path, size_mb, tools, dry_run) {
            Ok(()) => SwapOutcome::Created { size_mb },
            Err(e) => {
                // nothing runs phase 2 again, so a kept request would never be read
                error!("swap file creation failed: {:#}", e);
                flags.remove(Flag::SwapSize)?;
                return Ok((SwapOutcome::Failed(format!("{:#}", e)), false));
            }
        }
    };

    // fstab holds the path as the running system sees it
    let fstab_updated = swap::ensure_fstab_entry(&config.fstab_path(), &config.swap_file, dry_run)?;
    tools.activate_swap();
    flags.remove(Flag::SwapSize)?;

    Ok((outcome, fstab_updated))
}
