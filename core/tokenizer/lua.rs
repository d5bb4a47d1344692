use super::common::{Span, Start, TokenizeError, scan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Normal,
    SawDash1,
    /// Saw `--`; a following `[`, `=`* and `[` makes a long comment.
    SawDash2,
    MaybeBlockCommentOpen(usize),
    LineComment,
    InBlockComment(usize),
    /// Inside a long comment after `]` and `n` equals signs.
    InBlockCommentSawClose(usize, usize),
    MaybeLongStringOpen(usize),
    InLongString(usize),
    InLongStringSawClose(usize, usize),
    StringSgl,
    StringSglEsc,
    StringDbl,
    StringDblEsc,
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

fn state_transition(from: ParseState, current_char: Option<char>) -> (ParseState, ParseAction) {
    let Some(c) = current_char else {
        return match from {
            ParseState::SawDash2 | ParseState::MaybeBlockCommentOpen(_) | ParseState::LineComment => {
                (ParseState::Normal, ParseAction::LineCommentEnd)
            }
            ParseState::InBlockComment(_) | ParseState::InBlockCommentSawClose(..) => {
                (ParseState::Normal, ParseAction::Unterminated)
            }
            ParseState::SawDash1 => (ParseState::Normal, ParseAction::ResetPotential),
            _ => (ParseState::Normal, ParseAction::Nothing),
        };
    };

    match from {
        ParseState::Normal => match c {
            '-' => (ParseState::SawDash1, ParseAction::PotentialComment),
            '[' => (ParseState::MaybeLongStringOpen(0), ParseAction::Nothing),
            '\'' => (ParseState::StringSgl, ParseAction::Nothing),
            '"' => (ParseState::StringDbl, ParseAction::Nothing),
            _ => (ParseState::Normal, ParseAction::Nothing),
        },
        ParseState::SawDash1 => match c {
            '-' => (ParseState::SawDash2, ParseAction::CommentStart),
            _ => match state_transition(ParseState::Normal, Some(c)) {
                (next, ParseAction::Nothing) => (next, ParseAction::ResetPotential),
                other => other,
            },
        },
        ParseState::SawDash2 => match c {
            '[' => (ParseState::MaybeBlockCommentOpen(0), ParseAction::Nothing),
            '\n' => (ParseState::Normal, ParseAction::LineCommentEnd),
            _ => (ParseState::LineComment, ParseAction::Nothing),
        },
        ParseState::MaybeBlockCommentOpen(level) => match c {
            '=' => (ParseState::MaybeBlockCommentOpen(level + 1), ParseAction::Nothing),
            '[' => (ParseState::InBlockComment(level), ParseAction::Nothing),
            '\n' => (ParseState::Normal, ParseAction::LineCommentEnd),
            _ => (ParseState::LineComment, ParseAction::Nothing),
        },
        ParseState::LineComment => match c {
            '\n' => (ParseState::Normal, ParseAction::LineCommentEnd),
            _ => (ParseState::LineComment, ParseAction::Nothing),
        },
        ParseState::InBlockComment(level) => match c {
            ']' => (ParseState::InBlockCommentSawClose(level, 0), ParseAction::Nothing),
            _ => (ParseState::InBlockComment(level), ParseAction::Nothing),
        },
        ParseState::InBlockCommentSawClose(level, seen) => match c {
            '=' => (
                ParseState::InBlockCommentSawClose(level, seen + 1),
                ParseAction::Nothing,
            ),
            ']' if seen == level => (ParseState::Normal, ParseAction::BlockCommentEnd),
            ']' => (ParseState::InBlockCommentSawClose(level, 0), ParseAction::Nothing),
            _ => (ParseState::InBlockComment(level), ParseAction::Nothing),
        },

        ParseState::MaybeLongStringOpen(level) => match c {
            '=' => (ParseState::MaybeLongStringOpen(level + 1), ParseAction::Nothing),
            '[' => (ParseState::InLongString(level), ParseAction::Nothing),
            _ => state_transition(ParseState::Normal, Some(c)),
        },
        ParseState::InLongString(level) => match c {
            ']' => (ParseState::InLongStringSawClose(level, 0), ParseAction::Nothing),
            _ => (ParseState::InLongString(level), ParseAction::Nothing),
        },
        ParseState::InLongStringSawClose(level, seen) => match c {
            '=' => (
                ParseState::InLongStringSawClose(level, seen + 1),
                ParseAction::Nothing,
            ),
            ']' if seen == level => (ParseState::Normal, ParseAction::Nothing),
            ']' => (ParseState::InLongStringSawClose(level, 0), ParseAction::Nothing),
            _ => (ParseState::InLongString(level), ParseAction::Nothing),
        },

        ParseState::StringSgl => match c {
            '\'' | '\n' => (ParseState::Normal, ParseAction::Nothing),
            '\\' => (ParseState::StringSglEsc, ParseAction::Nothing),
            _ => (ParseState::StringSgl, ParseAction::Nothing),
        },
        ParseState::StringSglEsc => (ParseState::StringSgl, ParseAction::Nothing),
        ParseState::StringDbl => match c {
            '"' | '\n' => (ParseState::Normal, ParseAction::Nothing),
            '\\' => (ParseState::StringDblEsc, ParseAction::Nothing),
            _ => (ParseState::StringDbl, ParseAction::Nothing),
        },
        ParseState::StringDblEsc => (ParseState::StringDbl, ParseAction::Nothing),
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
        ParseAction::LineCommentEnd => {
            if let CommentTrackState::InComment(from) = comment_state {
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
                CommentTrackState::InComment(from) => from,
                _ => position,
            };
            return Err(TokenizeError::Unterminated {
                what: "long comment",
                offset,
            });
        }
    })
}

/// Finds `--` line comments and `--[[ ]]` / `--[==[ ]==]` long comments.
pub fn find_comments(input: &str) -> Result<Vec<Span>, TokenizeError> {
    scan(input, state_transition, do_action)
}
