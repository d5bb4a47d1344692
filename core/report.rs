use crate::processor::{Outcome, RunSummary};
use crate::rewriter::{BACKUP_DIR_NAME, Encoding, FileTask};
use console::style;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

/// Prints a loss-of-data message. Shown at every verbosity.
pub fn critical(message: impl std::fmt::Display) {
    eprintln!("{} {}", style("CRITICAL:").red().bold(), style(message).red().bold());
}

/// `backup` relative to `root` when it lies inside it.
fn shown_backup<'a>(backup: &'a Path, root: &Path) -> &'a Path {
    backup.strip_prefix(root).unwrap_or(backup)
}

/// Why the walker left an entry alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ExcludedDir,
    ExcludedFile,
    NotAllowed,
}

impl SkipReason {
    fn describe(self) -> &'static str {
        match self {
            SkipReason::ExcludedDir => "in excluded dir",
            SkipReason::ExcludedFile => "excluded file",
            SkipReason::NotAllowed => "extension not specified",
        }
    }
}

/// Prints progress to stdout and problems to stderr, gated by verbosity.
///
/// Errors and critical failures are printed at every verbosity.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    verbosity: Verbosity,
}

impl Reporter {
    pub fn new(verbosity: Verbosity) -> Self {
        Reporter { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    fn normal(&self) -> bool {
        self.verbosity >= Verbosity::Normal
    }

    fn verbose(&self) -> bool {
        self.verbosity >= Verbosity::Verbose
    }

    pub fn skipped(&self, relative: &Path, reason: SkipReason) {
        if self.verbose() {
            println!(
                "{}",
                style(format!("Skipped ({}): {}", reason.describe(), relative.display())).dim()
            );
        }
    }

    pub fn encoding_fallback(&self, task: &FileTask, encoding: Encoding) {
        if self.verbose() {
            eprintln!(
                "  Info: Used fallback encoding '{}' for {}",
                encoding.name(),
                task.relative_path.display()
            );
        }
    }

    pub fn backed_up(&self, task: &FileTask, backup: &Path, root: &Path) {
        if self.verbose() {
            println!(
                "  Backed up: {} -> {}",
                task.relative_path.display(),
                style(shown_backup(backup, root).display()).dim()
            );
        }
    }

    pub fn backup_skipped_unsafe(&self, task: &FileTask) {
        eprintln!(
            "  {} Proceeding without a backup for {} (--force-unsafe)",
            style("Warning:").yellow(),
            task.relative_path.display()
        );
    }

    pub fn warn(&self, message: impl std::fmt::Display) {
        eprintln!("{} {}", style("Warning:").yellow(), message);
    }

    pub fn outcome(&self, task: &FileTask, outcome: &Outcome) {
        let relative = task.relative_path.display();
        match outcome {
            Outcome::Modified { chars_removed, .. } => {
                if self.normal() {
                    println!(
                        "{}: {} ({} chars removed)",
                        style("Sanitized").green(),
                        relative,
                        chars_removed
                    );
                }
            }
            Outcome::DryRun { chars_removed } => {
                if self.normal() {
                    println!(
                        "{} Would modify: {} ({} chars removed)",
                        style("[DRY RUN]").cyan(),
                        relative,
                        chars_removed
                    );
                }
            }
            Outcome::Unmodified => {
                if self.verbose() {
                    println!(
                        "{}",
                        style(format!("Skipped (no comments found): {}", relative)).dim()
                    );
                }
            }
            Outcome::SkippedNoTokenizer => {
                if self.verbose() {
                    println!(
                        "{}",
                        style(format!("Skipped (no tokenizer found): {}", relative)).dim()
                    );
                }
            }
            Outcome::Failed(err) => {
                eprintln!("{} {}", style("Error:").red(), err);
                if matches!(err, crate::rewriter::FileError::Backup { .. }) {
                    eprintln!(
                        "  Aborting modification due to backup failure. Use --force-unsafe to proceed."
                    );
                }
                if let crate::rewriter::FileError::WriteRestored { backup, .. } = err {
                    eprintln!(
                        "  Restored original file from backup due to write error: {} (from {})",
                        relative,
                        backup.display()
                    );
                }
            }
            Outcome::CriticalFailure(err) => {
                critical(err);
                eprintln!(
                    "{}",
                    style(format!(
                        "  The contents of {} may be lost or truncated. Check it by hand.",
                        relative
                    ))
                    .red()
                );
            }
        }
    }

    pub fn banner(&self, root: &Path, allow: Option<&[String]>, dry_run: bool, backup: bool) {
        if !self.normal() {
            return;
        }
        println!("Starting comment removal in: {}", style(root.display()).cyan());
        match allow {
            None => println!("Processing every file with a known tokenizer."),
            Some(entries) => println!("Processing specific extensions: {}", entries.join(" ")),
        }
        if dry_run {
            println!("{}", style("--- DRY RUN MODE ---").cyan());
        }
        if backup {
            println!(
                "--- Backup enabled (files in {}) ---",
                root.join(BACKUP_DIR_NAME).display()
            );
        }
    }

    pub fn summary(&self, summary: &RunSummary, dry_run: bool) {
        let c = &summary.counters;
        if summary.aborted {
            eprintln!(
                "{}",
                style("Interrupted: stopped before the remaining files.").yellow()
            );
        }
        if c.critical > 0 {
            eprintln!(
                "{}",
                style(format!(
                    "CRITICAL: {} file(s) failed to write AND failed to restore from backup.",
                    c.critical
                ))
                .red()
                .bold()
            );
        }
        if !self.normal() {
            return;
        }
        println!("\n--- Summary ---");
        println!("Processing Time: {:.2} seconds", summary.elapsed.as_secs_f64());
        println!("Files Scanned (matching criteria): {}", c.processed);
        if dry_run {
            println!("Files that WOULD be modified: {}", style(c.modified).green());
        } else {
            println!("Files Modified: {}", style(c.modified).green());
        }
        println!("Files Skipped (no tokenizer found): {}", c.skipped_no_tokenizer);
        println!(
            "Files Skipped (excluded/extension mismatch): {}",
            c.skipped_policy
        );
        if c.errors > 0 {
            println!("Errors Encountered: {}", style(c.errors).red());
        }
        println!("------ Done ------");

        if c.modified > 0 && !dry_run {
            println!(
                "\nReview the changes (git status, git diff) and check backups in '{}' if enabled.",
                BACKUP_DIR_NAME
            );
        } else if !dry_run && c.modified == 0 && c.processed > 0 {
            println!("\nNo removable comments were found in the processed files.");
        } else if c.processed == 0 {
            println!("\nNo files were processed. Check the criteria or pass extensions with -e.");
        }
    }
}
