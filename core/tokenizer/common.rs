use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
    /// Interpreter lines and other directives lexed in comment position.
    Preproc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Code,
    /// Documentation the language keeps as part of the program (rustdoc).
    Doc,
    Comment(CommentKind),
}

impl TokenKind {
    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::Comment(_))
    }

    pub fn is_preproc(self) -> bool {
        matches!(self, TokenKind::Comment(CommentKind::Preproc))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("unterminated {what} starting at byte {offset}")]
    Unterminated { what: &'static str, offset: usize },

    #[error("span {from}..{to} is out of bounds or splits a character (input is {len} bytes)")]
    InvalidSpan { from: usize, to: usize, len: usize },

    #[error("span starting at byte {from} overlaps the previous span ending at byte {last_to}")]
    Overlap { from: usize, last_to: usize },

    #[error("tokens do not reproduce the input (diverged at byte {offset})")]
    NotLossless { offset: usize },
}

/// A classified byte range produced by a grammar scan. Gaps between spans are code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub from: usize,
    pub to: usize,
    pub kind: TokenKind,
}

impl Span {
    pub fn line(from: usize, to: usize) -> Self {
        Span {
            from,
            to,
            kind: TokenKind::Comment(CommentKind::Line),
        }
    }

    pub fn block(from: usize, to: usize) -> Self {
        Span {
            from,
            to,
            kind: TokenKind::Comment(CommentKind::Block),
        }
    }
}

pub trait Start: Sized {
    fn start() -> Self;
}

/// Drives a character-level state machine over `input`.
///
/// `transition` maps the current parse state and the next character (`None`
/// once at end of input) to the next state and an action. `act` applies the
/// action to the comment tracking state, given the byte position of the
/// character (or `input.len()` at end of input), and records finished spans.
pub(crate) fn scan<P, A, C, T, D>(input: &str, transition: T, act: D) -> Result<Vec<Span>, TokenizeError>
where
    P: Start,
    C: Start + Copy,
    T: Fn(P, Option<char>) -> (P, A),
    D: Fn(A, C, usize, &mut Vec<Span>) -> Result<C, TokenizeError>,
{
    let mut spans = Vec::new();
    let mut parse_state = P::start();
    let mut comment_state = C::start();

    for (position, c) in input.char_indices() {
        let (next_parse_state, action) = transition(parse_state, Some(c));
        comment_state = act(action, comment_state, position, &mut spans)?;
        parse_state = next_parse_state;
    }

    let (_, final_action) = transition(parse_state, None);
    act(final_action, comment_state, input.len(), &mut spans)?;
    Ok(spans)
}

/// Reclassifies a comment span at offset zero that opens with `#!` as a preproc token.
pub(crate) fn mark_shebang(input: &str, spans: &mut [Span]) {
    if !input.starts_with("#!") {
        return;
    }
    if let Some(first) = spans.first_mut() {
        if first.from == 0 && first.kind.is_comment() {
            first.kind = TokenKind::Comment(CommentKind::Preproc);
        }
    }
}

/// Turns classified spans into a gap-free token sequence over `input`.
pub(crate) fn assemble(input: &str, mut spans: Vec<Span>) -> Result<Vec<Token<'_>>, TokenizeError> {
    check_span_bounds(input, &spans)?;
    spans.sort_by_key(|s| s.from);
    check_sorted_spans_overlap(&spans)?;

    let mut tokens = Vec::with_capacity(spans.len() * 2 + 1);
    let mut cursor = 0;
    for span in spans.into_iter().filter(|s| s.from < s.to) {
        if span.from > cursor {
            tokens.push(Token {
                kind: TokenKind::Code,
                text: &input[cursor..span.from],
            });
        }
        tokens.push(Token {
            kind: span.kind,
            text: &input[span.from..span.to],
        });
        cursor = span.to;
    }
    if cursor < input.len() {
        tokens.push(Token {
            kind: TokenKind::Code,
            text: &input[cursor..],
        });
    }
    Ok(tokens)
}

/// Confirms that the token texts, concatenated in order, are exactly `input`.
pub(crate) fn verify_lossless(input: &str, tokens: &[Token<'_>]) -> Result<(), TokenizeError> {
    let mut offset = 0;
    for token in tokens {
        if !input[offset..].starts_with(token.text) {
            return Err(TokenizeError::NotLossless { offset });
        }
        offset += token.text.len();
    }
    if offset != input.len() {
        return Err(TokenizeError::NotLossless { offset });
    }
    Ok(())
}

fn check_span_bounds(input: &str, spans: &[Span]) -> Result<(), TokenizeError> {
    let len = input.len();
    for s in spans {
        if s.from > s.to || input.get(s.from..s.to).is_none() {
            return Err(TokenizeError::InvalidSpan {
                from: s.from,
                to: s.to,
                len,
            });
        }
    }
    Ok(())
}

fn check_sorted_spans_overlap(spans: &[Span]) -> Result<(), TokenizeError> {
    let mut last_to = 0;
    for s in spans {
        if s.from < last_to {
            return Err(TokenizeError::Overlap {
                from: s.from,
                last_to,
            });
        }
        last_to = s.to;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_fills_gaps_with_code() {
        let input = "a #x\nb";
        let tokens = assemble(input, vec![Span::line(2, 4)]).unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["a ", "#x", "\nb"]);
        assert_eq!(tokens[0].kind, TokenKind::Code);
        assert!(tokens[1].kind.is_comment());
        verify_lossless(input, &tokens).unwrap();
    }

    #[test]
    fn assemble_rejects_overlapping_spans() {
        let err = assemble("abcdef", vec![Span::line(0, 3), Span::block(2, 5)]).unwrap_err();
        assert_eq!(err, TokenizeError::Overlap { from: 2, last_to: 3 });
    }

    #[test]
    fn assemble_rejects_spans_inside_a_character() {
        let err = assemble("é", vec![Span::line(1, 2)]).unwrap_err();
        assert!(matches!(err, TokenizeError::InvalidSpan { .. }));
    }

    #[test]
    fn shebang_only_marked_at_offset_zero() {
        let mut spans = vec![Span::line(0, 9)];
        mark_shebang("#!/bin/sh\n", &mut spans);
        assert!(spans[0].kind.is_preproc());

        let mut spans = vec![Span::line(2, 5)];
        mark_shebang("#!x\n#y", &mut spans);
        assert!(!spans[0].kind.is_preproc());
    }

    #[test]
    fn verify_lossless_detects_missing_tail() {
        let tokens = vec![Token {
            kind: TokenKind::Code,
            text: "ab",
        }];
        assert_eq!(
            verify_lossless("abc", &tokens),
            Err(TokenizeError::NotLossless { offset: 2 })
        );
    }
}
