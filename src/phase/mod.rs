//! The two reboot-separated phases of a resize.

pub mod extend;
pub mod finalize;

pub use extend::ExtendOutcome;
pub use finalize::FinalizeReport;
