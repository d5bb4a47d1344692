use super::common::{Span, Start, TokenKind, TokenizeError, scan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RustParseState {
    Normal,
    FirstSlash,
    /// Saw `//`.
    LineOpen,
    /// Saw `///`; a fourth slash demotes it to a plain comment.
    LineOpenSlash,
    LineBody,
    /// Saw `/*` at depth one.
    BlockOpen,
    /// Saw `/**`.
    BlockOpenStar,
    Block(usize),
    BlockSawStar(usize),
    BlockSawSlash(usize),
    StringDoubleQuotes,
    StringDoubleQuotesEscaped,
    Ident,
    /// `b` or `c` at the start of an identifier, which may prefix a literal.
    BytePrefix,
    /// `r` at the start of an identifier, or after `b`/`c`.
    RawPrefix,
    RawHashes(usize),
    /// Inside a raw string opened with this many `#`s; no escapes.
    RawString(usize),
    /// Saw `"` plus `.1` of the `.0` closing `#`s.
    RawStringClosing(usize, usize),
    Quote,
    QuoteEscaped,
    QuoteChar,
    CharBody,
}
impl Start for RustParseState {
    fn start() -> Self {
        RustParseState::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RustParseAction {
    Nothing,
    CommentMightStart,
    DismissPotential,
    ConfirmComment,
    MarkDoc,
    ClearDoc,
    LineEnd,
    BlockEnd,
    Unterminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RustCommentTrackState {
    potential_start_pos: Option<usize>,
    start_pos: Option<usize>,
    doc: bool,
}
impl Start for RustCommentTrackState {
    fn start() -> Self {
        RustCommentTrackState {
            potential_start_pos: None,
            start_pos: None,
            doc: false,
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn rust_state_transition(
    from: RustParseState,
    current_char: Option<char>,
) -> (RustParseState, RustParseAction) {
    use RustParseAction as A;
    use RustParseState as S;

    let Some(c) = current_char else {
        return match from {
            S::LineOpen | S::LineOpenSlash | S::LineBody => (S::Normal, A::LineEnd),
            S::BlockOpen
            | S::BlockOpenStar
            | S::Block(_)
            | S::BlockSawStar(_)
            | S::BlockSawSlash(_) => (S::Normal, A::Unterminated),
            S::FirstSlash => (S::Normal, A::DismissPotential),
            _ => (S::Normal, A::Nothing),
        };
    };

    match from {
        S::Normal => match c {
            '/' => (S::FirstSlash, A::CommentMightStart),
            '"' => (S::StringDoubleQuotes, A::Nothing),
            '\'' => (S::Quote, A::Nothing),
            'r' => (S::RawPrefix, A::Nothing),
            'b' | 'c' => (S::BytePrefix, A::Nothing),
            _ if is_ident_char(c) => (S::Ident, A::Nothing),
            _ => (S::Normal, A::Nothing),
        },
        S::Ident => match c {
            _ if is_ident_char(c) => (S::Ident, A::Nothing),
            _ => rust_state_transition(S::Normal, Some(c)),
        },
        S::BytePrefix => match c {
            'r' => (S::RawPrefix, A::Nothing),
            _ => rust_state_transition(S::Ident, Some(c)),
        },
        S::RawPrefix => match c {
            '"' => (S::RawString(0), A::Nothing),
            '#' => (S::RawHashes(1), A::Nothing),
            _ => rust_state_transition(S::Ident, Some(c)),
        },
        // `r#ident` is a raw identifier rather than a string.
        S::RawHashes(hashes) => match c {
            '#' => (S::RawHashes(hashes + 1), A::Nothing),
            '"' => (S::RawString(hashes), A::Nothing),
            _ => rust_state_transition(S::Normal, Some(c)),
        },
        S::RawString(hashes) => match c {
            '"' if hashes == 0 => (S::Normal, A::Nothing),
            '"' => (S::RawStringClosing(hashes, 0), A::Nothing),
            _ => (S::RawString(hashes), A::Nothing),
        },
        S::RawStringClosing(hashes, seen) => match c {
            '#' if seen + 1 == hashes => (S::Normal, A::Nothing),
            '#' => (S::RawStringClosing(hashes, seen + 1), A::Nothing),
            '"' => (S::RawStringClosing(hashes, 0), A::Nothing),
            _ => (S::RawString(hashes), A::Nothing),
        },
        S::FirstSlash => match c {
            '/' => (S::LineOpen, A::ConfirmComment),
            '*' => (S::BlockOpen, A::ConfirmComment),
            _ => match rust_state_transition(S::Normal, Some(c)) {
                (next, A::Nothing) => (next, A::DismissPotential),
                other => other,
            },
        },

        S::LineOpen => match c {
            '/' => (S::LineOpenSlash, A::MarkDoc),
            '!' => (S::LineBody, A::MarkDoc),
            '\n' => (S::Normal, A::LineEnd),
            _ => (S::LineBody, A::Nothing),
        },
        S::LineOpenSlash => match c {
            '/' => (S::LineBody, A::ClearDoc),
            '\n' => (S::Normal, A::LineEnd),
            _ => (S::LineBody, A::Nothing),
        },
        S::LineBody => match c {
            '\n' => (S::Normal, A::LineEnd),
            _ => (S::LineBody, A::Nothing),
        },

        S::BlockOpen => match c {
            '*' => (S::BlockOpenStar, A::Nothing),
            '!' => (S::Block(1), A::MarkDoc),
            _ => rust_state_transition(S::Block(1), Some(c)),
        },
        S::BlockOpenStar => match c {
            // `/**/` is an empty plain comment and `/***` is not doc either.
            '/' => (S::Normal, A::BlockEnd),
            '*' => (S::BlockSawStar(1), A::Nothing),
            _ => (rust_state_transition(S::Block(1), Some(c)).0, A::MarkDoc),
        },
        S::Block(depth) => match c {
            '*' => (S::BlockSawStar(depth), A::Nothing),
            '/' => (S::BlockSawSlash(depth), A::Nothing),
            _ => (S::Block(depth), A::Nothing),
        },
        S::BlockSawStar(depth) => match c {
            '/' if depth == 1 => (S::Normal, A::BlockEnd),
            '/' => (S::Block(depth - 1), A::Nothing),
            '*' => (S::BlockSawStar(depth), A::Nothing),
            _ => (S::Block(depth), A::Nothing),
        },
        S::BlockSawSlash(depth) => match c {
            '*' => (S::Block(depth + 1), A::Nothing),
            '/' => (S::BlockSawSlash(depth), A::Nothing),
            _ => (S::Block(depth), A::Nothing),
        },

        S::StringDoubleQuotes => match c {
            '"' => (S::Normal, A::Nothing),
            '\\' => (S::StringDoubleQuotesEscaped, A::Nothing),
            _ => (S::StringDoubleQuotes, A::Nothing),
        },
        S::StringDoubleQuotesEscaped => (S::StringDoubleQuotes, A::Nothing),

        S::Quote => match c {
            '\\' => (S::QuoteEscaped, A::Nothing),
            '\'' | '\n' => (S::Normal, A::Nothing),
            _ => (S::QuoteChar, A::Nothing),
        },
        S::QuoteEscaped => (S::CharBody, A::Nothing),
        S::CharBody => match c {
            '\'' | '\n' => (S::Normal, A::Nothing),
            _ => (S::CharBody, A::Nothing),
        },
        // `'x'` closes a char literal; anything else after `'x` means it was a lifetime.
        S::QuoteChar => match c {
            '\'' => (S::Normal, A::Nothing),
            _ => rust_state_transition(S::Normal, Some(c)),
        },
    }
}

fn rust_do_action(
    action: RustParseAction,
    mut state: RustCommentTrackState,
    position: usize,
    spans: &mut Vec<Span>,
) -> Result<RustCommentTrackState, TokenizeError> {
    match action {
        RustParseAction::Nothing => {}
        RustParseAction::CommentMightStart => state.potential_start_pos = Some(position),
        RustParseAction::DismissPotential => state.potential_start_pos = None,
        RustParseAction::ConfirmComment => {
            state.start_pos = state.potential_start_pos.take();
            state.doc = false;
        }
        RustParseAction::MarkDoc => state.doc = true,
        RustParseAction::ClearDoc => state.doc = false,
        RustParseAction::LineEnd | RustParseAction::BlockEnd => {
            if let Some(from) = state.start_pos {
                let span = if action == RustParseAction::LineEnd {
                    Span::line(from, position)
                } else {
                    Span::block(from, position + 1)
                };
                spans.push(if state.doc {
                    Span {
                        kind: TokenKind::Doc,
                        ..span
                    }
                } else {
                    span
                });
            }
            state = RustCommentTrackState::start();
        }
        RustParseAction::Unterminated => {
            return Err(TokenizeError::Unterminated {
                what: "block comment",
                offset: state.start_pos.unwrap_or(position),
            });
        }
    }
    Ok(state)
}

/// Finds Rust comments. Outer and inner doc comments are reported as [`TokenKind::Doc`].
pub fn find_comments(input: &str) -> Result<Vec<Span>, TokenizeError> {
    scan(input, rust_state_transition, rust_do_action)
}
