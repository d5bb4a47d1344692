use crate::report::{self, Reporter};
use crate::stripper::StripResult;
use crate::tokenizer::TokenizeError;
use std::borrow::Cow;
use std::fs::{self, FileTimes};
use std::io;
use std::path::{Path, PathBuf};

pub const BACKUP_DIR_NAME: &str = ".sanitize_backups";
pub const BACKUP_SUFFIX: &str = ".bak";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    /// One byte per character. Decoding never fails, so any file can be read.
    Latin1,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin-1",
        }
    }

    pub fn decode(bytes: Vec<u8>) -> SourceText {
        match String::from_utf8(bytes) {
            Ok(text) => SourceText {
                text,
                encoding: Encoding::Utf8,
            },
            Err(err) => SourceText {
                text: err.into_bytes().into_iter().map(char::from).collect(),
                encoding: Encoding::Latin1,
            },
        }
    }

    pub fn encode(self, text: &str) -> io::Result<Cow<'_, [u8]>> {
        match self {
            Encoding::Utf8 => Ok(Cow::Borrowed(text.as_bytes())),
            Encoding::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("character {:?} cannot be written as latin-1", c),
                        )
                    })
                })
                .collect::<io::Result<Vec<u8>>>()
                .map(Cow::Owned),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub text: String,
    pub encoding: Encoding,
}

/// One candidate file, addressed both absolutely and relative to the scanned root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub absolute_path: PathBuf,
    pub relative_path: PathBuf,
}

impl FileTask {
    pub fn new(root: &Path, absolute_path: PathBuf) -> Self {
        let relative_path = absolute_path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| absolute_path.clone());
        FileTask {
            absolute_path,
            relative_path,
        }
    }

    /// `<backup_root>/<relative dirs>/<file name>.bak`
    pub fn backup_path(&self, backup_root: &Path) -> PathBuf {
        let mut name = self
            .relative_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(BACKUP_SUFFIX);
        backup_root.join(&self.relative_path).with_file_name(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to tokenize {}: {source}", path.display())]
    Tokenize {
        path: PathBuf,
        #[source]
        source: TokenizeError,
    },

    #[error("failed to back up {} to {}: {source}", path.display(), backup.display())]
    Backup {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {} (original restored from backup): {source}", path.display())]
    WriteRestored {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "failed to write {} ({write_error}) AND failed to restore it from {}: {source}",
        path.display(),
        backup.display()
    )]
    Rollback {
        path: PathBuf,
        backup: PathBuf,
        write_error: io::Error,
        #[source]
        source: io::Error,
    },
}

/// How committed changes are applied.
#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    pub dry_run: bool,
    /// The scanned directory; backup paths are reported relative to it.
    pub scan_root: PathBuf,
    /// Where backups are mirrored; `None` disables backups.
    pub backup_root: Option<PathBuf>,
    /// Write even when the backup could not be made.
    pub force_unsafe: bool,
}

/// Result of the rewrite step for one file.
#[derive(Debug)]
pub enum RewriteOutcome {
    Modified { backup: Option<PathBuf> },
    DryRun,
    Unmodified,
    Failed(FileError),
    CriticalFailure(FileError),
}

/// Holds a pre-mutation copy of a file while it is rewritten.
///
/// Dropping an uncommitted guard copies the backup back over the original.
#[derive(Debug)]
pub struct BackupGuard {
    original: PathBuf,
    backup: PathBuf,
    armed: bool,
}

impl BackupGuard {
    pub fn create(original: &Path, backup: PathBuf) -> io::Result<Self> {
        if let Some(parent) = backup.parent() {
            fs::create_dir_all(parent)?;
        }
        copy_with_metadata(original, &backup)?;
        Ok(BackupGuard {
            original: original.to_path_buf(),
            backup,
            armed: true,
        })
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// The write went through; the backup stays on disk as a permanent artifact.
    pub fn commit(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.backup)
    }

    /// Puts the pre-mutation content back. The backup copy is kept.
    pub fn restore(mut self) -> io::Result<()> {
        self.armed = false;
        copy_with_metadata(&self.backup, &self.original)
    }
}

impl Drop for BackupGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = copy_with_metadata(&self.backup, &self.original) {
                report::critical(format_args!(
                    "could not restore {} from {}: {}",
                    self.original.display(),
                    self.backup.display(),
                    err
                ));
            }
        }
    }
}

fn copy_with_metadata(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    let metadata = fs::metadata(from)?;
    let mut times = FileTimes::new();
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    // Timestamps are best effort; content and permissions are what matter.
    if let Ok(file) = fs::File::open(to) {
        let _ = file.set_times(times);
    }
    Ok(())
}

/// Reads a file and decodes it, falling back to latin-1 for non-UTF-8 bytes.
pub fn read_source(task: &FileTask, reporter: &Reporter) -> Result<SourceText, FileError> {
    let bytes = fs::read(&task.absolute_path).map_err(|source| FileError::Read {
        path: task.relative_path.clone(),
        source,
    })?;
    let source = Encoding::decode(bytes);
    if source.encoding != Encoding::Utf8 {
        reporter.encoding_fallback(task, source.encoding);
    }
    Ok(source)
}

/// Commits a strip result to disk: backup, write, and roll back if the write fails.
pub fn rewrite(
    task: &FileTask,
    source: &SourceText,
    result: &StripResult,
    options: &RewriteOptions,
    reporter: &Reporter,
) -> RewriteOutcome {
    rewrite_with(task, source, result, options, reporter, |path, bytes| {
        fs::write(path, bytes)
    })
}

/// [`rewrite`] with the final write supplied by the caller.
pub fn rewrite_with<W>(
    task: &FileTask,
    source: &SourceText,
    result: &StripResult,
    options: &RewriteOptions,
    reporter: &Reporter,
    write: W,
) -> RewriteOutcome
where
    W: FnOnce(&Path, &[u8]) -> io::Result<()>,
{
    if !result.was_modified {
        return RewriteOutcome::Unmodified;
    }
    if options.dry_run {
        return RewriteOutcome::DryRun;
    }

    let guard = match &options.backup_root {
        None => None,
        Some(backup_root) => {
            let backup = task.backup_path(backup_root);
            match BackupGuard::create(&task.absolute_path, backup.clone()) {
                Ok(guard) => {
                    reporter.backed_up(task, guard.backup_path(), &options.scan_root);
                    Some(guard)
                }
                Err(source) => {
                    let err = FileError::Backup {
                        path: task.relative_path.clone(),
                        backup,
                        source,
                    };
                    if !options.force_unsafe {
                        return RewriteOutcome::Failed(err);
                    }
                    reporter.warn(&err);
                    reporter.backup_skipped_unsafe(task);
                    None
                }
            }
        }
    };

    let written = source
        .encoding
        .encode(&result.residual)
        .and_then(|bytes| write(&task.absolute_path, &bytes));

    match (written, guard) {
        (Ok(()), guard) => RewriteOutcome::Modified {
            backup: guard.map(BackupGuard::commit),
        },
        (Err(source), None) => RewriteOutcome::Failed(FileError::Write {
            path: task.relative_path.clone(),
            source,
        }),
        (Err(write_error), Some(guard)) => {
            let backup = guard.backup_path().to_path_buf();
            match guard.restore() {
                Ok(()) => RewriteOutcome::Failed(FileError::WriteRestored {
                    path: task.relative_path.clone(),
                    backup,
                    source: write_error,
                }),
                Err(source) => RewriteOutcome::CriticalFailure(FileError::Rollback {
                    path: task.relative_path.clone(),
                    backup,
                    write_error,
                    source,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Verbosity;
    use std::io::Write as _;
    use tempfile::tempdir;

    const ORIGINAL: &str = "x = 1  # set\n";

    fn modified() -> StripResult {
        StripResult {
            residual: "x = 1  \n".to_string(),
            was_modified: true,
            chars_removed: 5,
        }
    }

    fn quiet() -> Reporter {
        Reporter::new(Verbosity::Quiet)
    }

    fn setup(root: &Path) -> (FileTask, SourceText) {
        let path = root.join("pkg").join("mod.py");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, ORIGINAL).unwrap();
        let task = FileTask::new(root, path);
        let source = read_source(&task, &quiet()).unwrap();
        (task, source)
    }

    fn with_backup(root: &Path) -> RewriteOptions {
        RewriteOptions {
            scan_root: root.to_path_buf(),
            backup_root: Some(root.join(BACKUP_DIR_NAME)),
            ..RewriteOptions::default()
        }
    }

    #[test]
    fn backup_path_mirrors_relative_path() {
        let task = FileTask::new(Path::new("/r"), PathBuf::from("/r/a/b/c.py"));
        assert_eq!(task.relative_path, PathBuf::from("a/b/c.py"));
        assert_eq!(
            task.backup_path(Path::new("/r/.sanitize_backups")),
            PathBuf::from("/r/.sanitize_backups/a/b/c.py.bak")
        );
        let dotfile = FileTask::new(Path::new("/r"), PathBuf::from("/r/.bashrc"));
        assert_eq!(
            dotfile.backup_path(Path::new("/b")),
            PathBuf::from("/b/.bashrc.bak")
        );
    }

    #[test]
    fn latin1_fallback_round_trips_bytes() {
        let bytes = vec![b'a', 0xE9, b'#', 0xFF, b'\n'];
        let source = Encoding::decode(bytes.clone());
        assert_eq!(source.encoding, Encoding::Latin1);
        assert_eq!(source.text.chars().count(), 5);
        assert_eq!(source.encoding.encode(&source.text).unwrap().as_ref(), &bytes[..]);
    }

    #[test]
    fn latin1_refuses_wide_characters() {
        assert!(Encoding::Latin1.encode("€").is_err());
    }

    #[test]
    fn writes_residual_and_keeps_backup() {
        let dir = tempdir().unwrap();
        let (task, source) = setup(dir.path());
        let outcome = rewrite(&task, &source, &modified(), &with_backup(dir.path()), &quiet());

        let backup = dir.path().join(".sanitize_backups/pkg/mod.py.bak");
        match outcome {
            RewriteOutcome::Modified { backup: Some(path) } => assert_eq!(path, backup),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(fs::read_to_string(&task.absolute_path).unwrap(), "x = 1  \n");
        assert_eq!(fs::read_to_string(&backup).unwrap(), ORIGINAL);
    }

    #[test]
    fn write_failure_restores_original_from_backup() {
        let dir = tempdir().unwrap();
        let (task, source) = setup(dir.path());
        let outcome = rewrite_with(
            &task,
            &source,
            &modified(),
            &with_backup(dir.path()),
            &quiet(),
            |path, bytes| {
                let mut file = fs::File::create(path)?;
                file.write_all(&bytes[..2])?;
                Err(io::Error::other("disk full"))
            },
        );

        assert!(matches!(
            outcome,
            RewriteOutcome::Failed(FileError::WriteRestored { .. })
        ));
        assert_eq!(fs::read_to_string(&task.absolute_path).unwrap(), ORIGINAL);
        let backup = dir.path().join(".sanitize_backups/pkg/mod.py.bak");
        assert_eq!(fs::read_to_string(backup).unwrap(), ORIGINAL);
    }

    #[test]
    fn failed_restore_is_critical() {
        let dir = tempdir().unwrap();
        let (task, source) = setup(dir.path());
        let backup = dir.path().join(".sanitize_backups/pkg/mod.py.bak");
        let outcome = rewrite_with(
            &task,
            &source,
            &modified(),
            &with_backup(dir.path()),
            &quiet(),
            |path, _| {
                fs::write(path, "")?;
                fs::remove_file(&backup)?;
                Err(io::Error::other("interrupted"))
            },
        );
        assert!(matches!(
            outcome,
            RewriteOutcome::CriticalFailure(FileError::Rollback { .. })
        ));
    }

    #[test]
    fn write_failure_without_backup_is_plain_failure() {
        let dir = tempdir().unwrap();
        let (task, source) = setup(dir.path());
        let outcome = rewrite_with(
            &task,
            &source,
            &modified(),
            &RewriteOptions::default(),
            &quiet(),
            |_, _| Err(io::Error::other("read-only")),
        );
        assert!(matches!(outcome, RewriteOutcome::Failed(FileError::Write { .. })));
    }

    #[test]
    fn backup_failure_aborts_unless_forced() {
        let dir = tempdir().unwrap();
        let (task, source) = setup(dir.path());
        // A regular file where the backup root directory should be.
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let mut options = RewriteOptions {
            backup_root: Some(blocker),
            ..RewriteOptions::default()
        };

        let outcome = rewrite(&task, &source, &modified(), &options, &quiet());
        assert!(matches!(outcome, RewriteOutcome::Failed(FileError::Backup { .. })));
        assert_eq!(fs::read_to_string(&task.absolute_path).unwrap(), ORIGINAL);

        options.force_unsafe = true;
        let outcome = rewrite(&task, &source, &modified(), &options, &quiet());
        assert!(matches!(outcome, RewriteOutcome::Modified { backup: None }));
        assert_eq!(fs::read_to_string(&task.absolute_path).unwrap(), "x = 1  \n");
    }

    #[test]
    fn dry_run_and_unmodified_touch_nothing() {
        let dir = tempdir().unwrap();
        let (task, source) = setup(dir.path());
        let options = RewriteOptions {
            dry_run: true,
            ..with_backup(dir.path())
        };
        assert!(matches!(
            rewrite(&task, &source, &modified(), &options, &quiet()),
            RewriteOutcome::DryRun
        ));

        let unchanged = StripResult {
            residual: ORIGINAL.to_string(),
            was_modified: false,
            chars_removed: 0,
        };
        assert!(matches!(
            rewrite(&task, &source, &unchanged, &with_backup(dir.path()), &quiet()),
            RewriteOutcome::Unmodified
        ));
        assert_eq!(fs::read_to_string(&task.absolute_path).unwrap(), ORIGINAL);
        assert!(!dir.path().join(BACKUP_DIR_NAME).exists());
    }

    #[test]
    fn latin1_files_are_written_back_as_latin1() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("old.sh");
        fs::write(&path, b"echo caf\xE9 # note\n").unwrap();
        let task = FileTask::new(dir.path(), path.clone());
        let source = read_source(&task, &quiet()).unwrap();
        assert_eq!(source.encoding, Encoding::Latin1);

        let result = StripResult {
            residual: "echo caf\u{e9} \n".to_string(),
            was_modified: true,
            chars_removed: 6,
        };
        let outcome = rewrite(&task, &source, &result, &RewriteOptions::default(), &quiet());
        assert!(matches!(outcome, RewriteOutcome::Modified { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"echo caf\xE9 \n");
    }

    #[test]
    fn dropped_guard_restores_original() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("f.rs");
        fs::write(&original, "keep").unwrap();
        {
            let _guard = BackupGuard::create(&original, dir.path().join("b/f.rs.bak")).unwrap();
            fs::write(&original, "clobbered").unwrap();
        }
        assert_eq!(fs::read_to_string(&original).unwrap(), "keep");
    }

    #[test]
    fn backup_root_may_sit_anywhere() {
        let dir = tempdir().unwrap();
        let (task, source) = setup(dir.path());
        let options = RewriteOptions {
            scan_root: dir.path().to_path_buf(),
            backup_root: Some(dir.path().join("var/cache/backups")),
            ..RewriteOptions::default()
        };
        let outcome = rewrite(&task, &source, &modified(), &options, &quiet());
        let expected = dir.path().join("var/cache/backups/pkg/mod.py.bak");
        match outcome {
            RewriteOutcome::Modified { backup: Some(path) } => assert_eq!(path, expected),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(fs::read_to_string(expected).unwrap(), ORIGINAL);
    }

    #[test]
    fn dropped_guard_with_missing_backup_leaves_file_alone() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("f.rs");
        fs::write(&original, "keep").unwrap();
        {
            let guard = BackupGuard::create(&original, dir.path().join("f.rs.bak")).unwrap();
            fs::remove_file(guard.backup_path()).unwrap();
            fs::write(&original, "partial").unwrap();
        }
        assert_eq!(fs::read_to_string(&original).unwrap(), "partial");
    }
}
