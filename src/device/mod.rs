//! Root device resolution: mount table -> partition node -> disk.

pub mod mounts;
pub mod nodes;
pub mod resolver;

pub use mounts::{MountTableReader, ProcMountTable};
pub use nodes::{DevNodes, DeviceNodeEnumerator};
pub use resolver::{RootDevice, resolve_root};
