//! Fix engine: per-file read, transform and conditional write.
//!
//! Every target file is read once, run through its list of [`Fix`]es in
//! order, and written back only if the final text differs from what was read.
//! A missing file is not an error: the file is presumed not to be part of
//! this kernel build.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PatchError, PatchResult};
use crate::kernel::excise::{remove_ifdef_block, BlockRemoval};
use crate::models::{FileReport, FileStatus, FixOutcome, FixRecord, FixTarget, Requirement, RunReport};

pub mod namei;
pub mod reject;
pub mod task_mmu;


/// Directory (under the kernel root) that receives `--backup` copies
pub const BACKUP_DIR_NAME: &str = ".susfs_fixup_backup";

/// Length of the anchor excerpt printed when a required fix fails
const SNIPPET_LEN: usize = 80;

/// Where an [`Insert`](FixAction::Insert) block goes relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

/// Insertion point candidate.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub text: &'static str,
    pub placement: Placement,
}

/// Signature of a hand-written fix: returns the outcome and, when applied,
/// the new text.
pub type CustomFix = fn(&str) -> (FixOutcome, Option<String>);

/// The textual operation a fix performs.
#[derive(Debug, Clone)]
pub enum FixAction {
    /// Replace the first `anchor` with `replacement`. Already applied when
    /// `marker` (or `replacement` if unset) is present.
    Replace {
        anchor: &'static str,
        replacement: &'static str,
        marker: Option<&'static str>,
    },
    /// Replace every `wrong` with `correct`. Absence of both is not a failure.
    Correct {
        wrong: &'static str,
        correct: &'static str,
    },
    /// Insert `block` next to the first anchor that is present.
    Insert {
        marker: &'static str,
        block: &'static str,
        anchors: Vec<Anchor>,
    },
    /// Remove the conditional block opened by `signature`.
    Excise { signature: &'static str },
    Custom(CustomFix),
}

/// A single labelled fix.
#[derive(Debug, Clone)]
pub struct Fix {
    pub label: &'static str,
    pub requirement: Requirement,
    pub action: FixAction,
}

impl Fix {
    pub fn required(label: &'static str, action: FixAction) -> Self {
        Fix {
            label,
            requirement: Requirement::Required,
            action,
        }
    }

    pub fn optional(label: &'static str, action: FixAction) -> Self {
        Fix {
            label,
            requirement: Requirement::Optional,
            action,
        }
    }

    /// Run the fix against `text`, replacing the buffer when it applies.
    pub fn apply(&self, text: &mut String) -> FixOutcome {
        match &self.action {
            FixAction::Replace {
                anchor,
                replacement,
                marker,
            } => {
                // Marker first: a replacement may contain its own anchor.
                if text.contains(marker.unwrap_or(*replacement)) {
                    return FixOutcome::skipped("already applied");
                }
                if text.contains(anchor) {
                    *text = text.replacen(anchor, replacement, 1);
                    return FixOutcome::applied(self.label);
                }
                FixOutcome::failed(format!(
                    "context not found, manual fix needed (expected: {:?})",
                    snippet(anchor)
                ))
            }
            FixAction::Correct { wrong, correct } => {
                if text.contains(wrong) {
                    let count = text.matches(wrong).count();
                    *text = text.replace(wrong, correct);
                    FixOutcome::applied(format!("{} ({} occurrence(s))", self.label, count))
                } else if text.contains(correct) {
                    FixOutcome::skipped("already correct")
                } else {
                    FixOutcome::skipped("not present")
                }
            }
            FixAction::Insert {
                marker,
                block,
                anchors,
            } => {
                if text.contains(marker) {
                    return FixOutcome::skipped("already present");
                }
                let Some(anchor) = anchors.iter().find(|a| text.contains(a.text)) else {
                    return FixOutcome::failed("could not find an insertion anchor");
                };
                let with_block = match anchor.placement {
                    Placement::Before => format!("{}\n{}", block, anchor.text),
                    Placement::After => format!("{}\n{}", anchor.text, block),
                };
                *text = text.replacen(anchor.text, &with_block, 1);
                FixOutcome::applied(format!("{} (anchor: {})", self.label, anchor.text))
            }
            FixAction::Excise { signature } => match remove_ifdef_block(text, signature) {
                BlockRemoval::Removed(updated) => {
                    *text = updated;
                    FixOutcome::applied(self.label)
                }
                BlockRemoval::NotFound => FixOutcome::skipped("not present"),
                BlockRemoval::Unbalanced => {
                    FixOutcome::failed("found signature but could not remove block")
                }
            },
            FixAction::Custom(run) => {
                let (outcome, updated) = run(text);
                if let Some(updated) = updated {
                    *text = updated;
                }
                outcome
            }
        }
    }
}

/// First characters of an anchor, for diagnostics.
fn snippet(anchor: &str) -> String {
    anchor.trim().chars().take(SNIPPET_LEN).collect()
}

/// Runtime switches for a fix pass.
#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    /// Run every fix in memory but never write
    pub dry_run: bool,
    /// Save the original contents before writing
    pub backup: bool,
    /// Restrict the pass to these targets (empty = all)
    pub only: Vec<FixTarget>,
}

/// Fixes for one target, in application order.
pub fn fixes_for(target: FixTarget) -> Vec<Fix> {
    match target {
        FixTarget::Mount => reject::mount_fixes(),
        FixTarget::ProcNamespace => reject::proc_namespace_fixes(),
        FixTarget::Cmdline => reject::cmdline_fixes(),
        // The reject hunks first, then the repairs of misapplied hunks.
        FixTarget::Namei => {
            let mut fixes = reject::namei_fixes();
            fixes.extend(namei::fixes());
            fixes
        }
        FixTarget::Kallsyms => reject::kallsyms_fixes(),
        FixTarget::TaskMmu => task_mmu::fixes(),
    }
}

/// Kernel source tree patcher
///
/// Owns the kernel root and applies the fix catalogue to it.
pub struct KernelPatcher {
    /// Root of the kernel source tree
    src_dir: PathBuf,
    /// Backup directory for original files
    backup_dir: PathBuf,
    options: PatchOptions,
}

impl KernelPatcher {
    /// Create a patcher for an existing kernel source directory
    pub fn new(src_dir: PathBuf, options: PatchOptions) -> PatchResult<Self> {
        if !src_dir.is_dir() {
            return Err(PatchError::RootNotFound(src_dir));
        }
        let backup_dir = src_dir.join(BACKUP_DIR_NAME);
        Ok(KernelPatcher {
            src_dir,
            backup_dir,
            options,
        })
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Targets selected by the options, in processing order
    pub fn selected_targets(&self) -> Vec<FixTarget> {
        FixTarget::ALL
            .into_iter()
            .filter(|t| self.options.only.is_empty() || self.options.only.contains(t))
            .collect()
    }

    /// Run the whole (selected) fix pass.
    ///
    /// An I/O failure on one file is recorded on its [`FileReport`] and the
    /// pass moves on to the next target.
    pub fn run(&self) -> RunReport {
        let mut report = RunReport::new(self.src_dir.clone(), self.options.dry_run);
        let targets = self.selected_targets();

        for (idx, target) in targets.iter().enumerate() {
            log::info!("[{}/{}] {}", idx + 1, targets.len(), target.rel_path());
            let file_report = match self.apply_fixes(*target, &fixes_for(*target)) {
                Ok(file_report) => file_report,
                Err(e) => FileReport {
                    target: *target,
                    path: self.src_dir.join(target.rel_path()),
                    status: FileStatus::Error,
                    fixes: Vec::new(),
                    error: Some(e.user_message()),
                },
            };
            log_file_report(&file_report);
            report.files.push(file_report);
        }

        report
    }

    /// Apply `fixes` to one target file.
    pub fn apply_fixes(&self, target: FixTarget, fixes: &[Fix]) -> PatchResult<FileReport> {
        let path = self.src_dir.join(target.rel_path());

        if !path.is_file() {
            log::info!("  [SKIP] {}: not found", target.rel_path());
            return Ok(FileReport {
                target,
                path,
                status: FileStatus::Missing,
                fixes: Vec::new(),
                error: None,
            });
        }

        let original = fs::read_to_string(&path).map_err(|source| PatchError::Read {
            path: path.clone(),
            source,
        })?;

        let mut text = original.clone();
        let records: Vec<FixRecord> = fixes
            .iter()
            .map(|fix| {
                let outcome = fix.apply(&mut text);
                log::debug!("{}: {} -> {:?}", target.rel_path(), fix.label, outcome);
                FixRecord {
                    label: fix.label.to_string(),
                    requirement: fix.requirement,
                    outcome,
                }
            })
            .collect();

        let status = if text == original {
            FileStatus::Unchanged
        } else if self.options.dry_run {
            FileStatus::WouldWrite
        } else {
            if self.options.backup {
                self.backup(target, &original)?;
            }
            fs::write(&path, &text).map_err(|source| PatchError::Write {
                path: path.clone(),
                source,
            })?;
            FileStatus::Written
        };

        Ok(FileReport {
            target,
            path,
            status,
            fixes: records,
            error: None,
        })
    }

    /// Save `content` as the backup of `target`.
    fn backup(&self, target: FixTarget, content: &str) -> PatchResult<PathBuf> {
        let backup_path = self
            .backup_dir
            .join(format!("{}.bak", target.rel_path().replace('/', "_")));

        fs::create_dir_all(&self.backup_dir).map_err(|source| PatchError::Backup {
            path: self.backup_dir.clone(),
            source,
        })?;
        fs::write(&backup_path, content).map_err(|source| PatchError::Backup {
            path: backup_path.clone(),
            source,
        })?;

        log::debug!("Backed up {} to {}", target.rel_path(), backup_path.display());
        Ok(backup_path)
    }
}

/// Emit the status lines of one file.
pub fn log_file_report(report: &FileReport) {
    let rel = report.target.rel_path();

    for fix in &report.fixes {
        match (&fix.outcome, fix.requirement) {
            (FixOutcome::Applied { detail }, _) => log::info!("  [OK]   {}: {}", rel, detail),
            (FixOutcome::Skipped { reason }, _) => {
                log::info!("  [SKIP] {}: {}  ({})", rel, fix.label, reason)
            }
            (FixOutcome::Failed { reason }, Requirement::Optional) => {
                log::warn!("  [WARN] {}: {}  (optional, {})", rel, fix.label, reason)
            }
            (FixOutcome::Failed { reason }, Requirement::Required) => {
                log::error!("  [FAIL] {}: {}  ({})", rel, fix.label, reason)
            }
        }
    }

    match report.status {
        FileStatus::Missing => {}
        FileStatus::Error => log::error!(
            "  [FAIL] {}: {}",
            rel,
            report.error.as_deref().unwrap_or("I/O error")
        ),
        FileStatus::Unchanged => log::info!("  [INFO] {}: no changes needed", rel),
        FileStatus::Written => {
            log::info!("  [INFO] {}: applied {} fix(es)", rel, report.applied_count())
        }
        FileStatus::WouldWrite => log::info!(
            "  [INFO] {}: would apply {} fix(es) (dry run)",
            rel,
            report.applied_count()
        ),
    }
}
