use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;

use susfs_fixup::error::PatchError;
use susfs_fixup::kernel::patcher::{KernelPatcher, PatchOptions};
use susfs_fixup::log_collector::{level_from_verbosity, LogCollector};
use susfs_fixup::models::{FixTarget, RunReport};
use susfs_fixup::VERSION;

/// susfs_fixup - repair SUSFS patch leftovers in a kernel source tree
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Root of the kernel source tree
    kernel_root: PathBuf,

    /// Only process these files (repeatable)
    #[arg(long, value_enum)]
    only: Vec<FixTarget>,

    /// Run every fix in memory but do not write any file
    #[arg(long)]
    dry_run: bool,

    /// Save original files under <KERNEL_ROOT>/.susfs_fixup_backup before writing
    #[arg(long)]
    backup: bool,

    /// Write a JSON report of every fix attempt
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Also append log lines to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn print_summary(report: &RunReport) {
    let failed: Vec<_> = report.failed_required().collect();
    let unreadable: Vec<_> = report.failed_files().collect();

    if failed.is_empty() && unreadable.is_empty() {
        log::info!(
            "Done: {} fix(es) applied across {} file(s), {} warning(s){}",
            report.applied_count(),
            report.files.len(),
            report.warning_count(),
            if report.dry_run { " (dry run)" } else { "" }
        );
        return;
    }

    if !failed.is_empty() {
        log::error!("{} required fix(es) failed, manual fix needed:", failed.len());
        for (file, fix) in failed {
            log::error!("  - {}: {}", file.target.rel_path(), fix.label);
        }
    }
    if !unreadable.is_empty() {
        log::error!("{} file(s) could not be processed:", unreadable.len());
        for file in unreadable {
            log::error!(
                "  - {}: {}",
                file.target.rel_path(),
                file.error.as_deref().unwrap_or("I/O error")
            );
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let options = PatchOptions {
        dry_run: args.dry_run,
        backup: args.backup,
        only: args.only,
    };

    let patcher = KernelPatcher::new(args.kernel_root.clone(), options)
        .with_context(|| format!("Open kernel tree {}", args.kernel_root.display()))?;

    log::debug!("susfs_fixup {}", VERSION);
    log::info!(
        "[susfs fixup] Repairing SUSFS leftovers in {}",
        patcher.src_dir().display()
    );
    if args.backup && !args.dry_run {
        log::info!("Backing up changed files to {}", patcher.backup_dir().display());
    }

    let report = patcher.run();

    if let Some(path) = &args.report {
        report.write_json(path).context("Write JSON report")?;
        log::debug!("Report written to {}", path.display());
    }

    print_summary(&report);
    Ok(report.success())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = level_from_verbosity(args.verbose, args.quiet);
    let installed = LogCollector::new(level, args.log_file.as_deref()).and_then(LogCollector::install);
    if let Err(e) = installed {
        eprintln!("[Main] WARNING: {}", e);
    }

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            match e.downcast_ref::<PatchError>() {
                Some(patch_error) => {
                    log::error!("Error: {}", patch_error.user_message());
                    log::debug!("{:#}", e);
                }
                None => log::error!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
