use super::common::{Span, Start, TokenizeError, scan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Single,
    Double,
}

impl Quote {
    fn of(c: char) -> Option<Self> {
        match c {
            '\'' => Some(Quote::Single),
            '"' => Some(Quote::Double),
            _ => None,
        }
    }

    fn is(self, c: char) -> bool {
        Quote::of(c) == Some(self)
    }
}

// String prefixes (r, b, f, u) need no states of their own: a backslash always
// keeps the next quote inside the literal, raw or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Normal,
    SawHash,
    Open1(Quote),
    Open2(Quote),
    Short(Quote),
    ShortEsc(Quote),
    Triple(Quote),
    TripleEsc(Quote),
    TripleClose1(Quote),
    TripleClose2(Quote),
}

impl Start for ParseState {
    fn start() -> Self {
        ParseState::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PyParseAction {
    Nothing,
    CommentStart,
    CommentEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PyCommentState {
    NotInComment,
    InComment(usize),
}
impl Start for PyCommentState {
    fn start() -> Self {
        PyCommentState::NotInComment
    }
}

fn state_transition(from: ParseState, current_char: Option<char>) -> (ParseState, PyParseAction) {
    let Some(c) = current_char else {
        return match from {
            ParseState::SawHash => (ParseState::Normal, PyParseAction::CommentEnd),
            _ => (ParseState::Normal, PyParseAction::Nothing),
        };
    };

    let next = match from {
        ParseState::Normal => match c {
            '#' => return (ParseState::SawHash, PyParseAction::CommentStart),
            _ => match Quote::of(c) {
                Some(q) => ParseState::Open1(q),
                None => ParseState::Normal,
            },
        },
        ParseState::SawHash => match c {
            '\n' => return (ParseState::Normal, PyParseAction::CommentEnd),
            _ => ParseState::SawHash,
        },

        ParseState::Open1(q) => match c {
            _ if q.is(c) => ParseState::Open2(q),
            '\\' => ParseState::ShortEsc(q),
            '\n' => ParseState::Normal,
            _ => ParseState::Short(q),
        },
        // Two quotes and no third: an empty string has already closed.
        ParseState::Open2(q) => match c {
            _ if q.is(c) => ParseState::Triple(q),
            _ => return state_transition(ParseState::Normal, Some(c)),
        },
        ParseState::Short(q) => match c {
            _ if q.is(c) => ParseState::Normal,
            '\\' => ParseState::ShortEsc(q),
            '\n' => ParseState::Normal,
            _ => ParseState::Short(q),
        },
        ParseState::ShortEsc(q) => ParseState::Short(q),

        ParseState::Triple(q) => match c {
            _ if q.is(c) => ParseState::TripleClose1(q),
            '\\' => ParseState::TripleEsc(q),
            _ => ParseState::Triple(q),
        },
        ParseState::TripleEsc(q) => ParseState::Triple(q),
        ParseState::TripleClose1(q) => match c {
            _ if q.is(c) => ParseState::TripleClose2(q),
            '\\' => ParseState::TripleEsc(q),
            _ => ParseState::Triple(q),
        },
        ParseState::TripleClose2(q) => match c {
            _ if q.is(c) => ParseState::Normal,
            '\\' => ParseState::TripleEsc(q),
            _ => ParseState::Triple(q),
        },
    };
    (next, PyParseAction::Nothing)
}

fn do_action(
    action: PyParseAction,
    comment_state: PyCommentState,
    position: usize,
    spans: &mut Vec<Span>,
) -> Result<PyCommentState, TokenizeError> {
    Ok(match (action, comment_state) {
        (PyParseAction::CommentStart, PyCommentState::NotInComment) => {
            PyCommentState::InComment(position)
        }
        (PyParseAction::CommentEnd, PyCommentState::InComment(from)) => {
            spans.push(Span::line(from, position));
            PyCommentState::NotInComment
        }
        _ => comment_state,
    })
}

/// Finds `#` comments. Docstrings are string literals and stay code.
pub fn find_comments(input: &str) -> Result<Vec<Span>, TokenizeError> {
    scan(input, state_transition, do_action)
}
