//! Core data structures shared by the fix engine, the reporting layer and the CLI.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{PatchError, PatchResult};

/// Whether a failed fix fails the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Required,
    Optional,
}

/// Outcome of a single fix attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FixOutcome {
    Applied { detail: String },
    Skipped { reason: String },
    Failed { reason: String },
}

impl FixOutcome {
    pub fn applied(detail: impl Into<String>) -> Self {
        FixOutcome::Applied { detail: detail.into() }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        FixOutcome::Skipped { reason: reason.into() }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        FixOutcome::Failed { reason: reason.into() }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, FixOutcome::Applied { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FixOutcome::Failed { .. })
    }
}

/// Kernel file a group of fixes targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FixTarget {
    Mount,
    ProcNamespace,
    Cmdline,
    Namei,
    Kallsyms,
    TaskMmu,
}

impl FixTarget {
    /// Processing order of a full pass.
    pub const ALL: [FixTarget; 6] = [
        FixTarget::Mount,
        FixTarget::ProcNamespace,
        FixTarget::Cmdline,
        FixTarget::Namei,
        FixTarget::Kallsyms,
        FixTarget::TaskMmu,
    ];

    /// Path relative to the kernel root.
    pub fn rel_path(&self) -> &'static str {
        match self {
            FixTarget::Mount => "include/linux/mount.h",
            FixTarget::ProcNamespace => "fs/proc_namespace.c",
            FixTarget::Cmdline => "fs/proc/cmdline.c",
            FixTarget::Namei => "fs/namei.c",
            FixTarget::Kallsyms => "kernel/kallsyms.c",
            FixTarget::TaskMmu => "fs/proc/task_mmu.c",
        }
    }
}

impl fmt::Display for FixTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rel_path())
    }
}

/// One fix attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixRecord {
    pub label: String,            // Label
    pub requirement: Requirement, // Required?
    pub outcome: FixOutcome,      // Result
}

impl FixRecord {
    /// Required fix that did not apply.
    pub fn is_blocking(&self) -> bool {
        self.requirement == Requirement::Required && self.outcome.is_failed()
    }
}

/// What happened to a file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    Missing,
    Unchanged,
    Written,
    WouldWrite,
    /// Could not be read, backed up or written; see [`FileReport::error`]
    Error,
}

/// Per-file report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub target: FixTarget,       // Target
    pub path: PathBuf,           // Absolute path
    pub status: FileStatus,      // Disk state
    pub fixes: Vec<FixRecord>,   // Attempts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,   // I/O failure
}

impl FileReport {
    pub fn applied_count(&self) -> usize {
        self.fixes.iter().filter(|f| f.outcome.is_applied()).count()
    }

    pub fn has_blocking_failure(&self) -> bool {
        self.status == FileStatus::Error || self.fixes.iter().any(FixRecord::is_blocking)
    }
}

/// Whole-run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub kernel_root: PathBuf,    // Root
    pub dry_run: bool,           // Dry?
    pub started_at: DateTime<Local>, // TS
    pub files: Vec<FileReport>,  // Files
}

impl RunReport {
    pub fn new(kernel_root: PathBuf, dry_run: bool) -> Self {
        RunReport {
            kernel_root,
            dry_run,
            started_at: Local::now(),
            files: Vec::new(),
        }
    }

    /// True iff no required fix failed and every file could be processed.
    pub fn success(&self) -> bool {
        !self.files.iter().any(FileReport::has_blocking_failure)
    }

    pub fn applied_count(&self) -> usize {
        self.files.iter().map(FileReport::applied_count).sum()
    }

    pub fn failed_required(&self) -> impl Iterator<Item = (&FileReport, &FixRecord)> + '_ {
        self.files
            .iter()
            .flat_map(|file| file.fixes.iter().map(move |fix| (file, fix)))
            .filter(|(_, fix)| fix.is_blocking())
    }

    /// Files the pass could not read or write.
    pub fn failed_files(&self) -> impl Iterator<Item = &FileReport> + '_ {
        self.files.iter().filter(|f| f.status == FileStatus::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.files
            .iter()
            .flat_map(|f| f.fixes.iter())
            .filter(|f| f.requirement == Requirement::Optional && f.outcome.is_failed())
            .count()
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> PatchResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| PatchError::Report {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| PatchError::Report {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
