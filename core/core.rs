pub mod file_finder;
pub mod processor;
pub mod report;
pub mod rewriter;
pub mod stripper;
pub mod tokenizer;

use std::path::PathBuf;

pub use file_finder::{
    AllowList, CliArgs, Command, CompletionArgs, DEFAULT_EXCLUDE_DIRS, Policy, SanitizeArgs, Walk,
    find_files,
};
pub use processor::{Outcome, RunCounters, RunOptions, RunSummary, process_file, run};
pub use report::{Reporter, SkipReason, Verbosity};
pub use rewriter::{
    BACKUP_DIR_NAME, BackupGuard, Encoding, FileError, FileTask, RewriteOptions, SourceText,
};
pub use stripper::{StripResult, strip, strip_source};
pub use tokenizer::{CommentKind, Grammar, Token, TokenKind, TokenizeError, Tokenizer, lookup};

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("Directory not found: {}", .0.display())]
    RootNotFound(PathBuf),
}
