//! Boot-to-boot state machine, encoded only by which flag files exist.

use tracing::{info, warn};

use crate::config::ResizeConfig;
use crate::device::{DeviceNodeEnumerator, MountTableReader, resolve_root};
use crate::error::ResizeError;
use crate::flags::{Flag, FlagFileStore};
use crate::guard;
use crate::partition::PartitionTableService;
use crate::phase::{self, ExtendOutcome, FinalizeReport};
use crate::tools::{Rebooter, SystemTools};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeState {
    Idle,
    RepartitionPending,
    ResizePending,
    /// Both phase flags exist: phase 1 finished but crashed before removing
    /// its own flag.
    Inconsistent,
}

impl ResizeState {
    pub fn detect(flags: &dyn FlagFileStore) -> Self {
        match (
            flags.exists(Flag::RepartitionPending),
            flags.exists(Flag::ResizePending),
        ) {
            (false, false) => ResizeState::Idle,
            (true, false) => ResizeState::RepartitionPending,
            (false, true) => ResizeState::ResizePending,
            (true, true) => ResizeState::Inconsistent,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ResizeState::Idle => "idle",
            ResizeState::RepartitionPending => "repartition pending",
            ResizeState::ResizePending => "resize pending",
            ResizeState::Inconsistent => "inconsistent (both phase flags present)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Idle,
    Repartitioned(ExtendOutcome),
    Finalized(FinalizeReport),
}

/// Everything the controller touches outside its own process.
pub struct Environment<'a> {
    pub config: &'a ResizeConfig,
    pub cmdline: &'a str,
    pub flags: &'a dyn FlagFileStore,
    pub mounts: &'a dyn MountTableReader,
    pub nodes: &'a dyn DeviceNodeEnumerator,
    pub partitions: &'a dyn PartitionTableService,
    pub tools: &'a dyn SystemTools,
    pub rebooter: &'a dyn Rebooter,
    pub dry_run: bool,
}

/// One boot-time invocation: check policy, then run whichever phase is due.
pub fn run(env: &Environment<'_>) -> Result<RunOutcome, ResizeError> {
    guard::check(env.cmdline, env.flags)?;

    let state = ResizeState::detect(env.flags);
    info!("state: {}", state.describe());

    match state {
        ResizeState::Idle => Ok(RunOutcome::Idle),
        ResizeState::RepartitionPending => {
            let root = resolve_root(env.mounts, env.nodes)?;
            let outcome = phase::extend::run(&root, env.partitions, env.flags, env.rebooter)?;
            Ok(RunOutcome::Repartitioned(outcome))
        }
        ResizeState::ResizePending | ResizeState::Inconsistent => {
            if state == ResizeState::Inconsistent {
                warn!(
                    "both {} and {} exist; finishing the resize",
                    Flag::RepartitionPending.path(),
                    Flag::ResizePending.path()
                );
            }
            let root = resolve_root(env.mounts, env.nodes)?;
            if state == ResizeState::Inconsistent {
                // phase 1 already ran; clear its flag before phase 2 clears its own
                env.flags.remove(Flag::RepartitionPending)?;
            }
            let report =
                phase::finalize::run(&root.node, env.config, env.flags, env.tools, env.dry_run)?;
            Ok(RunOutcome::Finalized(report))
        }
    }
}
