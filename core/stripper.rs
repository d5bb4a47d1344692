use crate::tokenizer::{Token, TokenizeError, Tokenizer};

/// The outcome of stripping one file's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripResult {
    pub residual: String,
    pub was_modified: bool,
    /// Characters (not bytes) removed; the trailing-newline fixup can cancel a tiny removal out.
    pub chars_removed: i64,
}

impl StripResult {
    fn unchanged(original: &str) -> Self {
        StripResult {
            residual: original.to_string(),
            was_modified: false,
            chars_removed: 0,
        }
    }
}

/// Drops comment tokens, keeping a leading shebang, and reflows the rest.
pub fn strip(original: &str, tokens: &[Token<'_>]) -> StripResult {
    let mut kept = String::with_capacity(original.len());
    let mut dropped_any = false;

    for (index, token) in tokens.iter().enumerate() {
        let is_shebang = index == 0 && token.kind.is_preproc() && token.text.starts_with("#!");
        if token.kind.is_comment() && !is_shebang {
            dropped_any = true;
            continue;
        }
        kept.push_str(token.text);
    }

    if !dropped_any {
        return StripResult::unchanged(original);
    }

    let residual = normalize_trailing_newline(collapse_blank_lines(&kept));
    let chars_removed = original.chars().count() as i64 - residual.chars().count() as i64;
    if chars_removed == 0 {
        return StripResult::unchanged(original);
    }
    StripResult {
        residual,
        was_modified: true,
        chars_removed,
    }
}

/// Tokenizes `original` and strips it. A tokenizer failure leaves the caller with the original text.
pub fn strip_source<T: Tokenizer + ?Sized>(
    original: &str,
    tokenizer: &T,
) -> Result<StripResult, TokenizeError> {
    let tokens = tokenizer.tokenize(original)?;
    Ok(strip(original, &tokens))
}

fn collapse_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut consecutive_blank_lines = 0;

    for line in text.lines() {
        if line.trim().is_empty() {
            consecutive_blank_lines += 1;
            if consecutive_blank_lines > 1 {
                continue;
            }
        } else {
            consecutive_blank_lines = 0;
        }
        lines.push(line);
    }

    lines.join("\n")
}

fn normalize_trailing_newline(mut text: String) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
