use tracing::info;

use crate::config::ResizeConfig;
use crate::device::{DevNodes, ProcMountTable};
use crate::error::ResizeError;
use crate::executor::CommandExecutor;
use crate::flags::FsFlagStore;
use crate::guard;
use crate::partition::SfdiskService;
use crate::paths;
use crate::state::{self, Environment, RunOutcome};
use crate::tools::{CommandTools, SystemReboot};

pub(super) fn handle_run_command(config: &ResizeConfig, dry_run: bool) -> Result<(), ResizeError> {
    if dry_run {
        info!("*** DRY RUN MODE ENABLED - No changes will be made ***");
    }

    let executor = CommandExecutor::new(dry_run);
    let cmdline = guard::read_cmdline(&config.cmdline_path);
    let flags = FsFlagStore::new(&config.sysroot, dry_run);
    let mounts = ProcMountTable::new(&config.mountinfo_path);
    let nodes = DevNodes::default();
    let partitions = SfdiskService::new(&executor, &config.tools, paths::SYS_BLOCK);
    let tools = CommandTools::new(&executor, &config.tools);
    let rebooter = SystemReboot::new(&executor, &config.tools);

    let env = Environment {
        config,
        cmdline: &cmdline,
        flags: &flags,
        mounts: &mounts,
        nodes: &nodes,
        partitions: &partitions,
        tools: &tools,
        rebooter: &rebooter,
        dry_run,
    };

    match state::run(&env)? {
        RunOutcome::Idle => info!("nothing to do"),
        RunOutcome::Repartitioned(outcome) => info!("repartition phase finished: {:?}", outcome),
        RunOutcome::Finalized(report) => info!(
            filesystem_grown = report.filesystem_grown,
            fstab_updated = report.fstab_updated,
            "finalize phase finished, swap: {:?}",
            report.swap
        ),
    }
    Ok(())
}
