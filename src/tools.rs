//! External programs the phases delegate to.

use anyhow::Result;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use crate::config::ToolsConfig;
use crate::executor::CommandExecutor;

/// Best-effort class, lowest priority level.
const IONICE_ARGS: [&str; 4] = ["-c", "2", "-n", "7"];

pub trait SystemTools {
    /// Grow the filesystem on `node` to fill its partition. Failure is logged.
    fn grow_filesystem(&self, node: &str) -> bool;

    /// Move this process to the lowest best-effort I/O priority.
    fn lower_io_priority(&self);

    fn format_swap(&self, path: &Path) -> Result<()>;

    /// Enable every swap area listed in fstab. Failure is logged.
    fn activate_swap(&self) -> bool;
}

pub trait Rebooter {
    fn reboot(&self) -> Result<()>;
}

pub struct CommandTools<'a> {
    executor: &'a CommandExecutor,
    tools: &'a ToolsConfig,
}

impl<'a> CommandTools<'a> {
    pub fn new(executor: &'a CommandExecutor, tools: &'a ToolsConfig) -> Self {
        Self { executor, tools }
    }

    fn available(&self, program: &str) -> bool {
        let found = which::which(program).is_ok();
        if !found {
            debug!("{} not found", program);
        }
        found
    }
}

impl SystemTools for CommandTools<'_> {
    fn grow_filesystem(&self, node: &str) -> bool {
        info!(device = %node, "growing filesystem");
        let mut command = if self.available(&self.tools.ionice) {
            let mut command = Command::new(&self.tools.ionice);
            command.args(IONICE_ARGS).arg(&self.tools.resize_tool);
            command
        } else {
            Command::new(&self.tools.resize_tool)
        };
        command.arg(node);
        self.executor.run_best_effort(&mut command)
    }

    fn lower_io_priority(&self) {
        if !self.available(&self.tools.ionice) {
            return;
        }
        let pid = std::process::id().to_string();
        self.executor.run_best_effort(
            Command::new(&self.tools.ionice)
                .args(IONICE_ARGS)
                .arg("-p")
                .arg(pid),
        );
    }

    fn format_swap(&self, path: &Path) -> Result<()> {
        self.executor
            .run(Command::new(&self.tools.mkswap).arg(path))
    }

    fn activate_swap(&self) -> bool {
        if !self.available(&self.tools.swapon) {
            return false;
        }
        self.executor
            .run_best_effort(Command::new(&self.tools.swapon).arg("-a"))
    }
}

/// Flushes filesystems and restarts the machine immediately.
pub struct SystemReboot<'a> {
    executor: &'a CommandExecutor,
    command: &'a [String],
}

impl<'a> SystemReboot<'a> {
    pub fn new(executor: &'a CommandExecutor, tools: &'a ToolsConfig) -> Self {
        Self {
            executor,
            command: &tools.reboot,
        }
    }
}

impl Rebooter for SystemReboot<'_> {
    fn reboot(&self) -> Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("no reboot command configured"))?;

        if !self.executor.dry_run {
            // a forced reboot skips the usual unmount, so flush flag files first
            nix::unistd::sync();
        }
        info!("rebooting");
        self.executor.run(Command::new(program).args(args))
    }
}
