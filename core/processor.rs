use crate::CoreError;
use crate::file_finder::{Policy, find_files};
use crate::report::Reporter;
use crate::rewriter::{self, FileError, FileTask, RewriteOptions, RewriteOutcome};
use crate::stripper::strip_source;
use crate::tokenizer;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// What happened to one dispatched file.
#[derive(Debug)]
pub enum Outcome {
    Modified {
        chars_removed: i64,
        backup: Option<PathBuf>,
    },
    DryRun {
        chars_removed: i64,
    },
    Unmodified,
    SkippedNoTokenizer,
    Failed(FileError),
    /// The write failed and the original could not be put back.
    CriticalFailure(FileError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub processed: usize,
    pub modified: usize,
    pub skipped_no_tokenizer: usize,
    pub skipped_policy: usize,
    pub errors: usize,
    pub critical: usize,
}

impl RunCounters {
    pub fn record(&mut self, outcome: &Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Modified { .. } | Outcome::DryRun { .. } => self.modified += 1,
            Outcome::Unmodified => {}
            Outcome::SkippedNoTokenizer => self.skipped_no_tokenizer += 1,
            Outcome::Failed(_) => self.errors += 1,
            Outcome::CriticalFailure(_) => {
                self.errors += 1;
                self.critical += 1;
            }
        }
    }

    pub fn merge(self, other: RunCounters) -> RunCounters {
        RunCounters {
            processed: self.processed + other.processed,
            modified: self.modified + other.modified,
            skipped_no_tokenizer: self.skipped_no_tokenizer + other.skipped_no_tokenizer,
            skipped_policy: self.skipped_policy + other.skipped_policy,
            errors: self.errors + other.errors,
            critical: self.critical + other.critical,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub counters: RunCounters,
    pub elapsed: Duration,
    /// Set when the abort flag stopped the run before every file was dispatched.
    pub aborted: bool,
}

/// Resolved, validated settings for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: PathBuf,
    pub policy: Policy,
    pub rewrite: RewriteOptions,
    pub parallel: bool,
}

/// Runs the whole read, strip, backup, write and rollback sequence for a single file.
pub fn process_file(task: &FileTask, options: &RewriteOptions, reporter: &Reporter) -> Outcome {
    let Some(grammar) = tokenizer::lookup(&task.relative_path) else {
        return Outcome::SkippedNoTokenizer;
    };

    let source = match rewriter::read_source(task, reporter) {
        Ok(source) => source,
        Err(err) => return Outcome::Failed(err),
    };

    let result = match strip_source(&source.text, &grammar) {
        Ok(result) => result,
        Err(source) => {
            return Outcome::Failed(FileError::Tokenize {
                path: task.relative_path.clone(),
                source,
            });
        }
    };

    match rewriter::rewrite(task, &source, &result, options, reporter) {
        RewriteOutcome::Modified { backup } => Outcome::Modified {
            chars_removed: result.chars_removed,
            backup,
        },
        RewriteOutcome::DryRun => Outcome::DryRun {
            chars_removed: result.chars_removed,
        },
        RewriteOutcome::Unmodified => Outcome::Unmodified,
        RewriteOutcome::Failed(err) => Outcome::Failed(err),
        RewriteOutcome::CriticalFailure(err) => Outcome::CriticalFailure(err),
    }
}

fn dispatch(task: &FileTask, options: &RunOptions, reporter: &Reporter) -> RunCounters {
    let outcome = process_file(task, &options.rewrite, reporter);
    reporter.outcome(task, &outcome);
    let mut counters = RunCounters::default();
    counters.record(&outcome);
    counters
}

/// Walks `options.root` and sanitizes every file the policy admits.
///
/// `abort` is checked before each file starts; a file already in flight always finishes.
pub fn run(
    options: &RunOptions,
    reporter: &Reporter,
    abort: &AtomicBool,
) -> Result<RunSummary, CoreError> {
    let start = Instant::now();
    if !options.root.is_dir() {
        return Err(CoreError::RootNotFound(options.root.clone()));
    }

    let walk = find_files(&options.root, &options.policy, reporter);
    let mut counters = RunCounters {
        skipped_policy: walk.skipped_policy,
        errors: walk.walk_errors,
        ..RunCounters::default()
    };

    let files = if options.parallel {
        walk.tasks
            .par_iter()
            .map(|task| {
                if abort.load(Ordering::Relaxed) {
                    RunCounters::default()
                } else {
                    dispatch(task, options, reporter)
                }
            })
            .reduce(RunCounters::default, RunCounters::merge)
    } else {
        let mut acc = RunCounters::default();
        for task in &walk.tasks {
            if abort.load(Ordering::Relaxed) {
                break;
            }
            acc = acc.merge(dispatch(task, options, reporter));
        }
        acc
    };
    counters = counters.merge(files);

    Ok(RunSummary {
        counters,
        elapsed: start.elapsed(),
        aborted: counters.processed < walk.tasks.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Verbosity;
    use crate::rewriter::BACKUP_DIR_NAME;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn options(root: &Path) -> RunOptions {
        RunOptions {
            root: root.to_path_buf(),
            policy: Policy::default(),
            rewrite: RewriteOptions {
                scan_root: root.to_path_buf(),
                ..RewriteOptions::default()
            },
            parallel: false,
        }
    }

    fn quiet() -> Reporter {
        Reporter::new(Verbosity::Quiet)
    }

    fn tree(root: &Path) {
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        fs::write(root.join("src/app.py"), "header = 1\n# one\n# two\n\ncode = 2\n").unwrap();
        fs::write(root.join("src/lib.rs"), "/// doc\nfn f() {}\n").unwrap();
        fs::write(root.join("src/broken.c"), "int x; /* never closed").unwrap();
        fs::write(root.join("README.txt"), "# not code\n").unwrap();
        fs::write(root.join("node_modules/dep/index.js"), "// vendored\n").unwrap();
    }

    #[test]
    fn end_to_end_example() {
        let dir = tempdir().unwrap();
        tree(dir.path());
        let summary = run(&options(dir.path()), &quiet(), &AtomicBool::new(false)).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("src/app.py")).unwrap(),
            "header = 1\n\ncode = 2\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("src/lib.rs")).unwrap(),
            "/// doc\nfn f() {}\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("src/broken.c")).unwrap(),
            "int x; /* never closed"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("node_modules/dep/index.js")).unwrap(),
            "// vendored\n"
        );

        let c = summary.counters;
        assert_eq!(c.processed, 4);
        assert_eq!(c.modified, 1);
        assert_eq!(c.skipped_no_tokenizer, 1);
        assert_eq!(c.skipped_policy, 1);
        assert_eq!(c.errors, 1);
        assert_eq!(c.critical, 0);
        assert!(!summary.aborted);
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let dir = tempdir().unwrap();
        tree(dir.path());
        let mut opts = options(dir.path());
        opts.rewrite.dry_run = true;
        opts.rewrite.backup_root = Some(dir.path().join(BACKUP_DIR_NAME));

        let task = FileTask::new(dir.path(), dir.path().join("src/app.py"));
        match process_file(&task, &opts.rewrite, &quiet()) {
            Outcome::DryRun { chars_removed } => assert_eq!(chars_removed, 12),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let summary = run(&opts, &quiet(), &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.counters.modified, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("src/app.py")).unwrap(),
            "header = 1\n# one\n# two\n\ncode = 2\n"
        );
        assert!(!dir.path().join(BACKUP_DIR_NAME).exists());
    }

    #[test]
    fn parallel_run_matches_sequential_counts() {
        let sequential = tempdir().unwrap();
        let parallel = tempdir().unwrap();
        tree(sequential.path());
        tree(parallel.path());

        let seq = run(&options(sequential.path()), &quiet(), &AtomicBool::new(false)).unwrap();
        let mut opts = options(parallel.path());
        opts.parallel = true;
        let par = run(&opts, &quiet(), &AtomicBool::new(false)).unwrap();

        assert_eq!(seq.counters, par.counters);
    }

    #[test]
    fn backups_are_written_and_not_rescanned() {
        let dir = tempdir().unwrap();
        tree(dir.path());
        let mut opts = options(dir.path());
        opts.rewrite.backup_root = Some(dir.path().join(BACKUP_DIR_NAME));

        run(&opts, &quiet(), &AtomicBool::new(false)).unwrap();
        let backup = dir.path().join(BACKUP_DIR_NAME).join("src/app.py.bak");
        assert_eq!(
            fs::read_to_string(backup).unwrap(),
            "header = 1\n# one\n# two\n\ncode = 2\n"
        );

        let second = run(&opts, &quiet(), &AtomicBool::new(false)).unwrap();
        assert_eq!(second.counters.modified, 0);
        assert_eq!(second.counters.skipped_policy, 2);
    }

    #[test]
    fn abort_flag_stops_before_first_file() {
        let dir = tempdir().unwrap();
        tree(dir.path());
        let summary = run(&options(dir.path()), &quiet(), &AtomicBool::new(true)).unwrap();
        assert!(summary.aborted);
        assert_eq!(summary.counters.processed, 0);
        assert_eq!(
            fs::read_to_string(dir.path().join("src/app.py")).unwrap(),
            "header = 1\n# one\n# two\n\ncode = 2\n"
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let result = run(
            &options(&dir.path().join("nope")),
            &quiet(),
            &AtomicBool::new(false),
        );
        assert!(matches!(result, Err(CoreError::RootNotFound(_))));
    }
}
