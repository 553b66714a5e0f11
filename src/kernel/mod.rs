//! Kernel Source Repair Module
//!
//! Handles the textual repairs applied to a Linux kernel source tree after a
//! partially failed SUSFS patch pass:
//! - Conditional block excision (nested `#ifdef ... #endif` removal)
//! - The fix engine and the per-file fix catalogue

pub mod excise;
pub mod patcher;
