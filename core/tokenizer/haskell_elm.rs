use super::common::{Span, Start, TokenizeError, scan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Normal,
    SawDash,
    /// Saw two or more dashes; a following symbol makes it an operator such as `-->`.
    SawDashes,
    LineComment,
    SawBrace,
    /// Saw `{-`; a `#` here opens a pragma, which is code.
    SawBraceDash,
    Block(usize),
    BlockSawDash(usize),
    BlockSawBrace(usize),
    StringDbl,
    StringDblEsc,
    Quote,
    QuoteEsc,
    QuoteChar,
    CharBody,
}
impl Start for ParseState {
    fn start() -> Self {
        ParseState::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseAction {
    Nothing,
    PotentialComment,
    ResetPotential,
    CommentStart,
    LineCommentEnd,
    BlockCommentEnd,
    Unterminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentTrackState {
    NotInComment,
    MaybeComment(usize),
    InComment(usize),
}
impl Start for CommentTrackState {
    fn start() -> Self {
        CommentTrackState::NotInComment
    }
}

fn is_symbol(c: char) -> bool {
    matches!(
        c,
        '!' | '#' | '$' | '%' | '&' | '*' | '+' | '.' | '/' | '<' | '=' | '>' | '?' | '@' | '\\'
            | '^' | '|' | '~' | ':'
    )
}

fn reprocess_dismissed(c: char) -> (ParseState, ParseAction) {
    match state_transition(ParseState::Normal, Some(c)) {
        (next, ParseAction::Nothing) => (next, ParseAction::ResetPotential),
        other => other,
    }
}

fn state_transition(from: ParseState, current_char: Option<char>) -> (ParseState, ParseAction) {
    let Some(c) = current_char else {
        return match from {
            ParseState::SawDashes | ParseState::LineComment => {
                (ParseState::Normal, ParseAction::LineCommentEnd)
            }
            ParseState::Block(_) | ParseState::BlockSawDash(_) | ParseState::BlockSawBrace(_) => {
                (ParseState::Normal, ParseAction::Unterminated)
            }
            ParseState::SawBraceDash => (ParseState::Normal, ParseAction::Unterminated),
            ParseState::SawDash | ParseState::SawBrace => {
                (ParseState::Normal, ParseAction::ResetPotential)
            }
            _ => (ParseState::Normal, ParseAction::Nothing),
        };
    };

    match from {
        ParseState::Normal => match c {
            '-' => (ParseState::SawDash, ParseAction::PotentialComment),
            '{' => (ParseState::SawBrace, ParseAction::PotentialComment),
            '"' => (ParseState::StringDbl, ParseAction::Nothing),
            '\'' => (ParseState::Quote, ParseAction::Nothing),
            _ => (ParseState::Normal, ParseAction::Nothing),
        },

        ParseState::SawDash => match c {
            '-' => (ParseState::SawDashes, ParseAction::Nothing),
            _ => reprocess_dismissed(c),
        },
        ParseState::SawDashes => match c {
            '-' => (ParseState::SawDashes, ParseAction::Nothing),
            '\n' => (ParseState::Normal, ParseAction::LineCommentEnd),
            _ if is_symbol(c) => reprocess_dismissed(c),
            _ => (ParseState::LineComment, ParseAction::CommentStart),
        },
        ParseState::LineComment => match c {
            '\n' => (ParseState::Normal, ParseAction::LineCommentEnd),
            _ => (ParseState::LineComment, ParseAction::Nothing),
        },

        ParseState::SawBrace => match c {
            '-' => (ParseState::SawBraceDash, ParseAction::Nothing),
            _ => reprocess_dismissed(c),
        },
        ParseState::SawBraceDash => match c {
            '#' => (ParseState::Normal, ParseAction::ResetPotential),
            _ => (
                state_transition(ParseState::Block(1), Some(c)).0,
                ParseAction::CommentStart,
            ),
        },
        ParseState::Block(depth) => match c {
            '-' => (ParseState::BlockSawDash(depth), ParseAction::Nothing),
            '{' => (ParseState::BlockSawBrace(depth), ParseAction::Nothing),
            _ => (ParseState::Block(depth), ParseAction::Nothing),
        },
        ParseState::BlockSawDash(depth) => match c {
            '}' if depth == 1 => (ParseState::Normal, ParseAction::BlockCommentEnd),
            '}' => (ParseState::Block(depth - 1), ParseAction::Nothing),
            '-' => (ParseState::BlockSawDash(depth), ParseAction::Nothing),
            '{' => (ParseState::BlockSawBrace(depth), ParseAction::Nothing),
            _ => (ParseState::Block(depth), ParseAction::Nothing),
        },
        ParseState::BlockSawBrace(depth) => match c {
            '-' => (ParseState::Block(depth + 1), ParseAction::Nothing),
            '{' => (ParseState::BlockSawBrace(depth), ParseAction::Nothing),
            _ => (ParseState::Block(depth), ParseAction::Nothing),
        },

        ParseState::StringDbl => match c {
            '"' => (ParseState::Normal, ParseAction::Nothing),
            '\\' => (ParseState::StringDblEsc, ParseAction::Nothing),
            _ => (ParseState::StringDbl, ParseAction::Nothing),
        },
        ParseState::StringDblEsc => (ParseState::StringDbl, ParseAction::Nothing),

        // Primes are legal in identifiers (`x'`), so only `'c'` is a char literal.
        ParseState::Quote => match c {
            '\\' => (ParseState::QuoteEsc, ParseAction::Nothing),
            '\n' => (ParseState::Normal, ParseAction::Nothing),
            _ => (ParseState::QuoteChar, ParseAction::Nothing),
        },
        ParseState::QuoteEsc => (ParseState::CharBody, ParseAction::Nothing),
        ParseState::CharBody => match c {
            '\'' | '\n' => (ParseState::Normal, ParseAction::Nothing),
            _ => (ParseState::CharBody, ParseAction::Nothing),
        },
        ParseState::QuoteChar => match c {
            '\'' => (ParseState::Normal, ParseAction::Nothing),
            _ => state_transition(ParseState::Normal, Some(c)),
        },
    }
}

fn do_action(
    action: ParseAction,
    comment_state: CommentTrackState,
    position: usize,
    spans: &mut Vec<Span>,
) -> Result<CommentTrackState, TokenizeError> {
    Ok(match action {
        ParseAction::Nothing => comment_state,
        ParseAction::PotentialComment => CommentTrackState::MaybeComment(position),
        ParseAction::ResetPotential => CommentTrackState::NotInComment,
        ParseAction::CommentStart => match comment_state {
            CommentTrackState::MaybeComment(from) => CommentTrackState::InComment(from),
            other => other,
        },
        // A bare `--` line ends while the comment is still only potential.
        ParseAction::LineCommentEnd => {
            if let CommentTrackState::InComment(from) | CommentTrackState::MaybeComment(from) =
                comment_state
            {
                spans.push(Span::line(from, position));
            }
            CommentTrackState::NotInComment
        }
        ParseAction::BlockCommentEnd => {
            if let CommentTrackState::InComment(from) = comment_state {
                spans.push(Span::block(from, position + 1));
            }
            CommentTrackState::NotInComment
        }
        ParseAction::Unterminated => {
            let offset = match comment_state {
                CommentTrackState::InComment(from) | CommentTrackState::MaybeComment(from) => from,
                CommentTrackState::NotInComment => position,
            };
            return Err(TokenizeError::Unterminated {
                what: "block comment",
                offset,
            });
        }
    })
}

/// Finds `--` line comments and nested `{- -}` block comments. `{-# ... #-}` pragmas stay code.
pub fn find_comments(input: &str) -> Result<Vec<Span>, TokenizeError> {
    scan(input, state_transition, do_action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comments(input: &str) -> Vec<&str> {
        find_comments(input)
            .unwrap()
            .iter()
            .map(|s| &input[s.from..s.to])
            .collect()
    }

    #[test]
    fn line_and_nested_block_comments() {
        let src = "main = pure () -- run\n{- outer {- inner -} -}\nx = 1\n";
        assert_eq!(comments(src), vec!["-- run", "{- outer {- inner -} -}"]);
    }

    #[test]
    fn pragmas_are_kept() {
        let src = "{-# LANGUAGE GADTs #-}\nmodule M where -- m\n";
        assert_eq!(comments(src), vec!["-- m"]);
    }

    #[test]
    fn dash_operators_are_code() {
        let src = "a --> b\nc = d - e\n";
        assert!(comments(src).is_empty());
    }

    #[test]
    fn primes_and_char_literals() {
        let src = "f x' = x' -- prime\ng = '\"' -- quote char\nh = '-'\n";
        assert_eq!(comments(src), vec!["-- prime", "-- quote char"]);
    }

    #[test]
    fn bare_dashes_line() {
        let src = "x = 1\n--\ny = 2\n";
        assert_eq!(comments(src), vec!["--"]);
    }

    #[test]
    fn record_braces_are_code() {
        assert!(comments("p = P { name = \"--\" }\n").is_empty());
    }
}
