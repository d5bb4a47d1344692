use super::common::{Span, Start, TokenizeError, scan};
use std::collections::VecDeque;

/// Rules for languages whose only comment form is `#` to end of line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashFlavor {
    /// Shells, Perl, Make and friends: `#` opens a comment only at the start of a word.
    Shell,
    /// YAML: `#` needs preceding whitespace and quotes only open at the start of a scalar.
    Yaml,
    /// Ruby and Crystal: `#` anywhere outside a string, `\'` escapes in single quotes.
    Ruby,
    /// TOML, Nix, ignore files: `#` anywhere outside a string, single quotes are literal.
    Plain,
}

impl HashFlavor {
    fn hash_needs_boundary(self) -> bool {
        matches!(self, HashFlavor::Shell | HashFlavor::Yaml)
    }

    fn quote_needs_boundary(self) -> bool {
        self == HashFlavor::Yaml
    }

    fn single_quote_escapes(self) -> bool {
        self == HashFlavor::Ruby
    }

    fn has_heredocs(self) -> bool {
        matches!(self, HashFlavor::Shell | HashFlavor::Ruby)
    }

    /// Leading characters an indented heredoc terminator may carry.
    fn strips_before_terminator(self, c: char) -> bool {
        match self {
            HashFlavor::Shell => c == '\t',
            _ => c == ' ' || c == '\t',
        }
    }

    fn is_separator(self, c: char) -> bool {
        c.is_whitespace() || (self == HashFlavor::Shell && matches!(c, ';' | '|' | '&' | '(' | ')'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    /// Start of line or just after a separator.
    Boundary,
    Word,
    SawHash,
    StringDbl,
    StringDblEsc,
    StringSgl,
    StringSglEsc,
    SawLt,
    SawLtLt,
    /// After `<<-`, `<<~` or a shell `\`.
    HeredocFlag,
    HeredocWord,
    HeredocQuoted(char),
    /// YAML `|` or `>` plus chomping and indentation indicators.
    ScalarHeader,
    /// Blanks after a block scalar header; only a comment may follow.
    ScalarHeaderEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Heredoc {
    terminator: String,
    indented: bool,
}

/// Multi-line literal text that must be kept as is, `#` lines included.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Literal {
    /// `matched` is how much of the current line equals the terminator; `None` once it cannot.
    Heredoc { doc: Heredoc, matched: Option<usize> },
    /// Lines indented deeper than `parent`, or blank.
    Scalar {
        parent: usize,
        column: usize,
        content: bool,
    },
}

impl Literal {
    fn heredoc(doc: Heredoc) -> Self {
        Literal::Heredoc {
            doc,
            matched: Some(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParseState {
    lex: Lex,
    /// Leading spaces on the current line.
    indent: usize,
    at_line_start: bool,
    /// Heredoc whose terminator is still being read.
    opening: Option<Heredoc>,
    /// Heredocs opened on this line; their bodies follow in order after the newline.
    pending: VecDeque<Heredoc>,
    scalar_pending: bool,
    literal: Option<Literal>,
}
impl Start for ParseState {
    fn start() -> Self {
        ParseState {
            lex: Lex::Boundary,
            indent: 0,
            at_line_start: true,
            opening: None,
            pending: VecDeque::new(),
            scalar_pending: false,
            literal: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseAction {
    Nothing,
    CommentStart,
    CommentEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentTrackState {
    NotInComment,
    InComment(usize),
}
impl Start for CommentTrackState {
    fn start() -> Self {
        CommentTrackState::NotInComment
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn state_transition(
    flavor: HashFlavor,
    mut state: ParseState,
    current_char: Option<char>,
) -> (ParseState, ParseAction) {
    let Some(c) = current_char else {
        let action = match state.lex {
            Lex::SawHash if state.literal.is_none() => ParseAction::CommentEnd,
            _ => ParseAction::Nothing,
        };
        return (ParseState::start(), action);
    };

    if let Some(literal) = state.literal.take() {
        match step_literal(flavor, literal, c) {
            LiteralStep::Within(literal) => {
                state.literal = Some(literal);
                return (state, ParseAction::Nothing);
            }
            LiteralStep::Closed => {
                state.literal = state.pending.pop_front().map(Literal::heredoc);
                state.lex = Lex::Boundary;
                state.indent = 0;
                state.at_line_start = true;
                return (state, ParseAction::Nothing);
            }
            LiteralStep::Left { column } => {
                state.lex = Lex::Boundary;
                state.indent = column;
                state.at_line_start = true;
            }
        }
    }

    let (lex, action) = lex_transition(flavor, &mut state, c);
    state.lex = lex;

    if c == '\n' {
        let parent = state.indent;
        state.indent = 0;
        state.at_line_start = true;
        if lex == Lex::Boundary {
            if let Some(doc) = state.pending.pop_front() {
                state.literal = Some(Literal::heredoc(doc));
            } else if std::mem::take(&mut state.scalar_pending) {
                state.literal = Some(Literal::Scalar {
                    parent,
                    column: 0,
                    content: false,
                });
            }
        }
    } else if state.at_line_start {
        if c == ' ' {
            state.indent += 1;
        } else {
            state.at_line_start = false;
        }
    }
    (state, action)
}

enum LiteralStep {
    Within(Literal),
    /// The heredoc terminator line, newline included, was consumed.
    Closed,
    /// A block scalar ended at a line indented `column` spaces; the current char is code.
    Left { column: usize },
}

fn step_literal(flavor: HashFlavor, literal: Literal, c: char) -> LiteralStep {
    match literal {
        Literal::Heredoc { doc, matched } => {
            if c == '\n' {
                return if matched == Some(doc.terminator.len()) {
                    LiteralStep::Closed
                } else {
                    LiteralStep::Within(Literal::heredoc(doc))
                };
            }
            let matched = match matched {
                Some(0) if doc.indented && flavor.strips_before_terminator(c) => Some(0),
                Some(k) if doc.terminator[k..].starts_with(c) => Some(k + c.len_utf8()),
                _ => None,
            };
            LiteralStep::Within(Literal::Heredoc { doc, matched })
        }
        Literal::Scalar {
            parent,
            column,
            content,
        } => {
            let next = |column, content| {
                LiteralStep::Within(Literal::Scalar {
                    parent,
                    column,
                    content,
                })
            };
            match c {
                '\n' => next(0, false),
                _ if content => next(column, true),
                ' ' => next(column + 1, false),
                _ if column > parent => next(column, true),
                _ => LiteralStep::Left { column },
            }
        }
    }
}

fn reprocess(flavor: HashFlavor, state: &mut ParseState, lex: Lex, c: char) -> (Lex, ParseAction) {
    state.lex = lex;
    lex_transition(flavor, state, c)
}

fn begin_terminator(flavor: HashFlavor, state: &mut ParseState, c: char) -> (Lex, ParseAction) {
    let indented = state.opening.as_ref().is_some_and(|doc| doc.indented);
    // `a <<b` in Ruby is a shift unless the name looks like a constant.
    let bare_allowed = flavor != HashFlavor::Ruby || indented || c.is_uppercase();
    match c {
        '\'' | '"' => (Lex::HeredocQuoted(c), ParseAction::Nothing),
        '\\' if flavor == HashFlavor::Shell => (Lex::HeredocFlag, ParseAction::Nothing),
        _ if is_word_char(c) && bare_allowed => {
            if let Some(doc) = state.opening.as_mut() {
                doc.terminator.push(c);
            }
            (Lex::HeredocWord, ParseAction::Nothing)
        }
        _ => {
            state.opening = None;
            reprocess(flavor, state, Lex::Boundary, c)
        }
    }
}

fn finish_opening(state: &mut ParseState) {
    if let Some(doc) = state.opening.take() {
        if !doc.terminator.is_empty() {
            state.pending.push_back(doc);
        }
    }
}

fn lex_transition(flavor: HashFlavor, state: &mut ParseState, c: char) -> (Lex, ParseAction) {
    let lex = state.lex;
    match lex {
        Lex::Boundary | Lex::Word => {
            let at_boundary = lex == Lex::Boundary;
            match c {
                '#' if at_boundary || !flavor.hash_needs_boundary() => {
                    (Lex::SawHash, ParseAction::CommentStart)
                }
                '"' if at_boundary || !flavor.quote_needs_boundary() => {
                    (Lex::StringDbl, ParseAction::Nothing)
                }
                '\'' if at_boundary || !flavor.quote_needs_boundary() => {
                    (Lex::StringSgl, ParseAction::Nothing)
                }
                '<' if flavor.has_heredocs() => (Lex::SawLt, ParseAction::Nothing),
                '|' | '>' if at_boundary && flavor == HashFlavor::Yaml => {
                    (Lex::ScalarHeader, ParseAction::Nothing)
                }
                _ if flavor.is_separator(c) => (Lex::Boundary, ParseAction::Nothing),
                _ => (Lex::Word, ParseAction::Nothing),
            }
        }
        Lex::SawHash => match c {
            '\n' => (Lex::Boundary, ParseAction::CommentEnd),
            _ => (Lex::SawHash, ParseAction::Nothing),
        },
        Lex::StringDbl => match c {
            '"' => (Lex::Word, ParseAction::Nothing),
            '\\' => (Lex::StringDblEsc, ParseAction::Nothing),
            _ => (Lex::StringDbl, ParseAction::Nothing),
        },
        Lex::StringDblEsc => (Lex::StringDbl, ParseAction::Nothing),
        Lex::StringSgl => match c {
            '\'' => (Lex::Word, ParseAction::Nothing),
            '\\' if flavor.single_quote_escapes() => (Lex::StringSglEsc, ParseAction::Nothing),
            _ => (Lex::StringSgl, ParseAction::Nothing),
        },
        Lex::StringSglEsc => (Lex::StringSgl, ParseAction::Nothing),

        Lex::SawLt => match c {
            '<' => (Lex::SawLtLt, ParseAction::Nothing),
            _ => reprocess(flavor, state, Lex::Boundary, c),
        },
        Lex::SawLtLt => match c {
            // Here-string.
            '<' => (Lex::Boundary, ParseAction::Nothing),
            '-' | '~' if c == '-' || flavor == HashFlavor::Ruby => {
                state.opening = Some(Heredoc {
                    terminator: String::new(),
                    indented: true,
                });
                (Lex::HeredocFlag, ParseAction::Nothing)
            }
            ' ' | '\t' if flavor == HashFlavor::Shell => (Lex::SawLtLt, ParseAction::Nothing),
            _ => {
                state.opening = Some(Heredoc {
                    terminator: String::new(),
                    indented: false,
                });
                begin_terminator(flavor, state, c)
            }
        },
        Lex::HeredocFlag => match c {
            ' ' | '\t' if flavor == HashFlavor::Shell => (Lex::HeredocFlag, ParseAction::Nothing),
            _ => begin_terminator(flavor, state, c),
        },
        Lex::HeredocWord => {
            if is_word_char(c) {
                if let Some(doc) = state.opening.as_mut() {
                    doc.terminator.push(c);
                }
                (Lex::HeredocWord, ParseAction::Nothing)
            } else {
                finish_opening(state);
                reprocess(flavor, state, Lex::Word, c)
            }
        }
        Lex::HeredocQuoted(quote) => {
            if c == quote {
                finish_opening(state);
                (Lex::Word, ParseAction::Nothing)
            } else if c == '\n' {
                state.opening = None;
                (Lex::Boundary, ParseAction::Nothing)
            } else {
                if let Some(doc) = state.opening.as_mut() {
                    doc.terminator.push(c);
                }
                (Lex::HeredocQuoted(quote), ParseAction::Nothing)
            }
        }

        Lex::ScalarHeader => match c {
            '-' | '+' | '0'..='9' => (Lex::ScalarHeader, ParseAction::Nothing),
            ' ' | '\t' => (Lex::ScalarHeaderEnd, ParseAction::Nothing),
            '\n' => {
                state.scalar_pending = true;
                (Lex::Boundary, ParseAction::Nothing)
            }
            _ => reprocess(flavor, state, Lex::Word, c),
        },
        Lex::ScalarHeaderEnd => match c {
            ' ' | '\t' => (Lex::ScalarHeaderEnd, ParseAction::Nothing),
            '#' => {
                state.scalar_pending = true;
                (Lex::SawHash, ParseAction::CommentStart)
            }
            '\n' => {
                state.scalar_pending = true;
                (Lex::Boundary, ParseAction::Nothing)
            }
            _ => reprocess(flavor, state, Lex::Word, c),
        },
    }
}

fn do_action(
    action: ParseAction,
    comment_state: CommentTrackState,
    position: usize,
    spans: &mut Vec<Span>,
) -> Result<CommentTrackState, TokenizeError> {
    Ok(match (action, comment_state) {
        (ParseAction::CommentStart, CommentTrackState::NotInComment) => {
            CommentTrackState::InComment(position)
        }
        (ParseAction::CommentEnd, CommentTrackState::InComment(from)) => {
            spans.push(Span::line(from, position));
            CommentTrackState::NotInComment
        }
        _ => comment_state,
    })
}

/// Finds `#` comments. Shell and Ruby heredoc bodies and YAML block scalars are literal text.
pub fn find_comments(input: &str, flavor: HashFlavor) -> Result<Vec<Span>, TokenizeError> {
    scan(
        input,
        |state: ParseState, c| state_transition(flavor, state, c),
        do_action,
    )
}
