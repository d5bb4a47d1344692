use crate::CoreError;
use crate::processor::RunOptions;
use crate::report::{Reporter, SkipReason, Verbosity};
use crate::rewriter::{BACKUP_DIR_NAME, FileTask, RewriteOptions};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".git",
    ".svn",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    "build",
    "dist",
    "target",
    "out",
    BACKUP_DIR_NAME,
];

fn default_exclude_dirs() -> Vec<String> {
    DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    about = "Remove comments from source files (main arguments)",
    long_about = "These are the main arguments for comment removal."
)]
pub struct SanitizeArgs {
    #[clap(help = "Root directory to process", default_value = ".")]
    pub path: PathBuf,

    #[clap(
        short = 'e',
        long,
        value_name = "EXT",
        num_args = 1..,
        help = "Only process these extensions (e.g. .py .js) or exact file names"
    )]
    pub extensions: Vec<String>,

    #[clap(
        long,
        value_name = "DIR",
        num_args = 1..,
        default_values_t = default_exclude_dirs(),
        help = "Directory names to exclude (case-sensitive)"
    )]
    pub exclude_dirs: Vec<String>,

    #[clap(
        long,
        value_name = "NAME",
        num_args = 1..,
        help = "File names to exclude (case-sensitive)"
    )]
    pub exclude_files: Vec<String>,

    #[clap(long, help = "Report what would change without writing anything")]
    pub dry_run: bool,

    #[clap(
        long,
        help = "Copy each file into .sanitize_backups/ before modifying it"
    )]
    pub backup: bool,

    #[clap(
        long,
        requires = "backup",
        help = "Modify files even when their backup could not be created"
    )]
    pub force_unsafe: bool,

    #[clap(short, long, help = "Print skipped files and backup details")]
    pub verbose: bool,

    #[clap(short, long, help = "Only print errors")]
    pub quiet: bool,

    #[clap(short = 'y', long, help = "Skip the confirmation prompt")]
    pub yes: bool,

    #[clap(long, help = "Process files on all cores")]
    pub parallel: bool,
}

impl Default for SanitizeArgs {
    fn default() -> Self {
        SanitizeArgs {
            path: PathBuf::from("."),
            extensions: Vec::new(),
            exclude_dirs: default_exclude_dirs(),
            exclude_files: Vec::new(),
            dry_run: false,
            backup: false,
            force_unsafe: false,
            verbose: false,
            quiet: false,
            yes: false,
            parallel: false,
        }
    }
}

impl SanitizeArgs {
    /// Quiet wins over verbose.
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    pub fn run_options(&self) -> Result<RunOptions, CoreError> {
        let root = fs::canonicalize(&self.path)
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| CoreError::RootNotFound(self.path.clone()))?;

        let allow = if self.extensions.is_empty() {
            None
        } else {
            Some(AllowList::new(&self.extensions))
        };

        Ok(RunOptions {
            policy: Policy {
                exclude_dirs: self.exclude_dirs.iter().cloned().collect(),
                exclude_files: self.exclude_files.iter().cloned().collect(),
                allow,
            },
            rewrite: RewriteOptions {
                dry_run: self.dry_run,
                scan_root: root.clone(),
                backup_root: self.backup.then(|| root.join(BACKUP_DIR_NAME)),
                force_unsafe: self.force_unsafe,
            },
            parallel: self.parallel,
            root,
        })
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    #[clap(about = "Generate shell completion scripts")]
    Completion(CompletionArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct CompletionArgs {
    #[clap(value_parser = clap::value_parser!(clap_complete::Shell))]
    pub shell: clap_complete::Shell,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    name = "sanitize",
    version = "0.1.0",
    about = "Remove comments from source files",
    long_about = "Walks a directory tree and removes comments from every file with a known grammar.\nShebang lines and documentation comments are kept; runs of blank lines left behind are collapsed.",
    propagate_version = true
)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub command: Option<Command>,

    #[clap(flatten)]
    pub main_opts: SanitizeArgs,
}

/// `-e` entries: exact file names, and lowercased `.ext` suffixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    names: HashSet<String>,
    suffixes: HashSet<String>,
}

impl AllowList {
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Self {
        let names = entries.iter().map(|e| e.as_ref().to_string()).collect();
        let suffixes = entries
            .iter()
            .map(|e| format!(".{}", e.as_ref().trim_start_matches('.').to_lowercase()))
            .collect();
        AllowList { names, suffixes }
    }

    pub fn allows(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy();
        if self.names.contains(name.as_ref()) {
            return true;
        }
        path.extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .is_some_and(|suffix| self.suffixes.contains(&suffix))
    }

    /// Sorted, for display.
    pub fn entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self.suffixes.iter().cloned().collect();
        entries.sort();
        entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub exclude_dirs: HashSet<String>,
    pub exclude_files: HashSet<String>,
    pub allow: Option<AllowList>,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            exclude_dirs: default_exclude_dirs().into_iter().collect(),
            exclude_files: HashSet::new(),
            allow: None,
        }
    }
}

impl Policy {
    fn excludes_dir(&self, name: &str) -> bool {
        self.exclude_dirs.contains(name)
    }

    /// Decides a regular file, given its path relative to the root.
    pub fn check_file(&self, relative: &Path) -> Result<(), SkipReason> {
        let in_excluded_dir = relative
            .iter()
            .any(|segment| self.excludes_dir(&segment.to_string_lossy()));
        if in_excluded_dir {
            return Err(SkipReason::ExcludedDir);
        }
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if self.exclude_files.contains(name.as_ref()) {
            return Err(SkipReason::ExcludedFile);
        }
        match &self.allow {
            Some(allow) if !allow.allows(relative) => Err(SkipReason::NotAllowed),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct Walk {
    pub tasks: Vec<FileTask>,
    /// Excluded directories count once each, not per file inside them.
    pub skipped_policy: usize,
    pub walk_errors: usize,
}

/// Collects the regular files under `root` that `policy` admits, in file-name order.
///
/// Excluded directories are not descended into. Symlinks are never followed or returned.
pub fn find_files(root: &Path, policy: &Policy, reporter: &Reporter) -> Walk {
    let mut walk = Walk::default();
    let mut entries = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                reporter.warn(format_args!("could not read directory entry: {}", err));
                walk.walk_errors += 1;
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if policy.excludes_dir(&entry.file_name().to_string_lossy()) {
                reporter.skipped(relative, SkipReason::ExcludedDir);
                walk.skipped_policy += 1;
                entries.skip_current_dir();
            }
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        match policy.check_file(relative) {
            Ok(()) => walk
                .tasks
                .push(FileTask::new(root, entry.path().to_path_buf())),
            Err(reason) => {
                reporter.skipped(relative, reason);
                walk.skipped_policy += 1;
            }
        }
    }
    walk
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn quiet() -> Reporter {
        Reporter::new(Verbosity::Quiet)
    }

    fn relative_paths(walk: &Walk) -> Vec<String> {
        walk.tasks
            .iter()
            .map(|t| t.relative_path.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x\n").unwrap();
    }

    #[test]
    fn allow_list_matches_names_and_case_insensitive_suffixes() {
        let allow = AllowList::new(&["py", ".JS", "Makefile"]);
        assert!(allow.allows(Path::new("a/b.py")));
        assert!(allow.allows(Path::new("a/b.Js")));
        assert!(allow.allows(Path::new("Makefile")));
        assert!(!allow.allows(Path::new("makefile")));
        assert!(!allow.allows(Path::new("b.rs")));
        assert_eq!(allow.entries(), vec![".js", ".makefile", ".py"]);
    }

    #[test]
    fn policy_checks_every_segment() {
        let policy = Policy {
            exclude_files: ["secret.py".to_string()].into_iter().collect(),
            ..Policy::default()
        };
        assert_eq!(
            policy.check_file(Path::new("src/target/gen.rs")),
            Err(SkipReason::ExcludedDir)
        );
        assert_eq!(
            policy.check_file(Path::new("src/secret.py")),
            Err(SkipReason::ExcludedFile)
        );
        assert_eq!(policy.check_file(Path::new("src/main.rs")), Ok(()));
    }

    #[test]
    fn walk_prunes_excluded_dirs_and_filters() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "a.py");
        touch(root, "b.rs");
        touch(root, "sub/c.py");
        touch(root, "sub/skip.py");
        touch(root, "node_modules/x/y.js");
        touch(root, "node_modules/z.js");
        touch(root, ".git/config");

        let policy = Policy {
            exclude_files: ["skip.py".to_string()].into_iter().collect(),
            allow: Some(AllowList::new(&[".py"])),
            ..Policy::default()
        };
        let walk = find_files(root, &policy, &quiet());
        assert_eq!(relative_paths(&walk), vec!["a.py", "sub/c.py"]);
        // .git, node_modules, b.rs, skip.py
        assert_eq!(walk.skipped_policy, 4);
        assert_eq!(walk.walk_errors, 0);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        touch(outside.path(), "far.py");
        touch(dir.path(), "near.py");
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("near.py"), dir.path().join("alias.py"))
            .unwrap();

        let walk = find_files(dir.path(), &Policy::default(), &quiet());
        assert_eq!(relative_paths(&walk), vec!["near.py"]);
    }

    #[test]
    fn run_options_resolve_root_and_backup() {
        let dir = tempdir().unwrap();
        let args = SanitizeArgs {
            path: dir.path().to_path_buf(),
            backup: true,
            extensions: vec!["rs".to_string()],
            ..SanitizeArgs::default()
        };
        let options = args.run_options().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        assert_eq!(options.rewrite.backup_root, Some(root.join(BACKUP_DIR_NAME)));
        assert_eq!(options.rewrite.scan_root, root);
        assert_eq!(options.root, root);
        assert!(options.policy.allow.is_some());
        assert!(options.policy.exclude_dirs.contains(BACKUP_DIR_NAME));

        let missing = SanitizeArgs {
            path: dir.path().join("missing"),
            ..SanitizeArgs::default()
        };
        assert!(matches!(missing.run_options(), Err(CoreError::RootNotFound(_))));
    }

    #[test]
    fn cli_parses_flags_and_defaults() {
        let cli = CliArgs::parse_from(["sanitize", "src", "-e", ".py", ".js", "--dry-run", "-q", "-v"]);
        let args = cli.main_opts;
        assert_eq!(args.path, PathBuf::from("src"));
        assert_eq!(args.extensions, vec![".py", ".js"]);
        assert!(args.dry_run);
        assert_eq!(args.verbosity(), Verbosity::Quiet);
        assert_eq!(args.exclude_dirs, default_exclude_dirs());

        let cli = CliArgs::parse_from(["sanitize", "--exclude-dirs", "vendor"]);
        assert_eq!(cli.main_opts.exclude_dirs, vec!["vendor"]);
        assert_eq!(cli.main_opts.path, PathBuf::from("."));

        assert!(CliArgs::try_parse_from(["sanitize", "--force-unsafe"]).is_err());
    }
}
