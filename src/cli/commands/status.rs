use colored::Colorize;

use crate::config::ResizeConfig;
use crate::device::{DevNodes, ProcMountTable, resolve_root};
use crate::error::ResizeError;
use crate::flags::{Flag, FlagFileStore, FsFlagStore};
use crate::guard;
use crate::state::ResizeState;
use crate::swap;

pub(super) fn handle_status_command(config: &ResizeConfig) -> Result<(), ResizeError> {
    let flags = FsFlagStore::new(&config.sysroot, true);
    let cmdline = guard::read_cmdline(&config.cmdline_path);

    println!("{}", "Root filesystem resize".bold());

    let policy = match guard::check(&cmdline, &flags) {
        Ok(()) => "allowed".green(),
        Err(e) => e.to_string().yellow(),
    };
    println!("  {:<12} {}", "Policy:", policy);

    let state = ResizeState::detect(&flags);
    let state_text = match state {
        ResizeState::Idle => state.describe().green(),
        ResizeState::Inconsistent => state.describe().red(),
        _ => state.describe().cyan(),
    };
    println!("  {:<12} {}", "State:", state_text);

    let swap_text = match flags.read_first_line(Flag::SwapSize)? {
        None => "none".normal(),
        Some(line) => match swap::parse_swap_size(&line) {
            0 => format!("ignored ('{}')", line.trim()).yellow(),
            size => format!("{} MiB", size).cyan(),
        },
    };
    println!("  {:<12} {}", "Swap:", swap_text);

    let mounts = ProcMountTable::new(&config.mountinfo_path);
    match resolve_root(&mounts, &DevNodes::default()) {
        Ok(root) => {
            println!(
                "  {:<12} {} (#{}, {})",
                "Partition:", root.node, root.partition_number, root.device
            );
            println!("  {:<12} {}", "Disk:", root.disk);
        }
        Err(e) => println!("  {:<12} {}", "Root:", e.to_string().red()),
    }

    Ok(())
}
