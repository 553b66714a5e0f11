//! susfs_fixup
//!
//! Repairs the textual leftovers of a partially failed SUSFS / KernelSU patch
//! pass in a Linux kernel source tree: rejected hunks that must be applied by
//! hand, and hunks that landed at the wrong offset and must be removed.
//!
//! The system is organized into functional modules:
//! - **error**: Infrastructure error type
//! - **models**: Fix outcomes, targets and reports
//! - **kernel**: Block excision, fix engine and fix catalogue
//! - **log_collector**: Console/file logger for the `log` crate

pub mod error;
pub mod models;

// Block excision, fix engine and catalogue
pub mod kernel;

pub mod log_collector;

// Re-export the log crate for macro usage
pub use log;

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{PatchError, PatchResult};

pub use models::{
    FileReport, FileStatus, FixOutcome, FixRecord, FixTarget, Requirement, RunReport,
};

pub use kernel::excise::{remove_ifdef_block, BlockRemoval};
pub use kernel::patcher::{KernelPatcher, PatchOptions};

pub use log_collector::{LogCollector, LogLine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
