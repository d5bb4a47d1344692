use super::common::{Span, Start, TokenizeError, scan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Normal,
    SawDash,
    SawSlash,
    LineComment,
    BlockComment,
    BlockCommentSawStar,
    // Doubled quotes ('' and "") close and reopen, which needs no extra state.
    StringSgl,
    QuotedIdent,
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
    ConfirmComment,
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
            ParseState::LineComment => (ParseState::Normal, ParseAction::LineCommentEnd),
            ParseState::BlockComment | ParseState::BlockCommentSawStar => {
                (ParseState::Normal, ParseAction::Unterminated)
            }
            ParseState::SawDash | ParseState::SawSlash => {
                (ParseState::Normal, ParseAction::ResetPotential)
            }
            _ => (ParseState::Normal, ParseAction::Nothing),
        };
    };

    match from {
        ParseState::Normal => match c {
            '-' => (ParseState::SawDash, ParseAction::PotentialComment),
            '/' => (ParseState::SawSlash, ParseAction::PotentialComment),
            '\'' => (ParseState::StringSgl, ParseAction::Nothing),
            '"' => (ParseState::QuotedIdent, ParseAction::Nothing),
            _ => (ParseState::Normal, ParseAction::Nothing),
        },
        ParseState::SawDash | ParseState::SawSlash => match (from, c) {
            (ParseState::SawDash, '-') => (ParseState::LineComment, ParseAction::ConfirmComment),
            (ParseState::SawSlash, '*') => (ParseState::BlockComment, ParseAction::ConfirmComment),
            _ => match state_transition(ParseState::Normal, Some(c)) {
                (next, ParseAction::Nothing) => (next, ParseAction::ResetPotential),
                other => other,
            },
        },
        ParseState::LineComment => match c {
            '\n' => (ParseState::Normal, ParseAction::LineCommentEnd),
            _ => (ParseState::LineComment, ParseAction::Nothing),
        },
        ParseState::BlockComment => match c {
            '*' => (ParseState::BlockCommentSawStar, ParseAction::Nothing),
            _ => (ParseState::BlockComment, ParseAction::Nothing),
        },
        ParseState::BlockCommentSawStar => match c {
            '/' => (ParseState::Normal, ParseAction::BlockCommentEnd),
            '*' => (ParseState::BlockCommentSawStar, ParseAction::Nothing),
            _ => (ParseState::BlockComment, ParseAction::Nothing),
        },
        ParseState::StringSgl => match c {
            '\'' => (ParseState::Normal, ParseAction::Nothing),
            _ => (ParseState::StringSgl, ParseAction::Nothing),
        },
        ParseState::QuotedIdent => match c {
            '"' => (ParseState::Normal, ParseAction::Nothing),
            _ => (ParseState::QuotedIdent, ParseAction::Nothing),
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
        ParseAction::ConfirmComment => match comment_state {
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
                what: "block comment",
                offset,
            });
        }
    })
}

pub fn find_comments(input: &str) -> Result<Vec<Span>, TokenizeError> {
    scan(input, state_transition, do_action)
}
