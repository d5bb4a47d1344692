use super::common::{Span, Start, TokenizeError, scan};

// Quotes are not tracked: text nodes are full of apostrophes, and `<!--` inside
// an attribute value is not something markup in the wild does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Normal,
    SawOpenBracket,
    SawOpenBracketBang,
    SawOpenBracketBangDash,
    InComment,
    InCommentSawDash1,
    InCommentSawDash2,
}
impl Start for ParseState {
    fn start() -> Self {
        ParseState::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseAction {
    Nothing,
    MaybeCommentStart,
    ResetPotential,
    CommentStart,
    CommentEnd,
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
            ParseState::InComment | ParseState::InCommentSawDash1 | ParseState::InCommentSawDash2 => {
                (ParseState::Normal, ParseAction::Unterminated)
            }
            _ => (ParseState::Normal, ParseAction::ResetPotential),
        };
    };

    let dismissed = || match state_transition(ParseState::Normal, Some(c)) {
        (next, ParseAction::Nothing) => (next, ParseAction::ResetPotential),
        other => other,
    };

    match from {
        ParseState::Normal => match c {
            '<' => (ParseState::SawOpenBracket, ParseAction::MaybeCommentStart),
            _ => (ParseState::Normal, ParseAction::Nothing),
        },
        ParseState::SawOpenBracket => match c {
            '!' => (ParseState::SawOpenBracketBang, ParseAction::Nothing),
            _ => dismissed(),
        },
        ParseState::SawOpenBracketBang => match c {
            '-' => (ParseState::SawOpenBracketBangDash, ParseAction::Nothing),
            _ => dismissed(),
        },
        ParseState::SawOpenBracketBangDash => match c {
            '-' => (ParseState::InComment, ParseAction::CommentStart),
            _ => dismissed(),
        },
        ParseState::InComment => match c {
            '-' => (ParseState::InCommentSawDash1, ParseAction::Nothing),
            _ => (ParseState::InComment, ParseAction::Nothing),
        },
        ParseState::InCommentSawDash1 => match c {
            '-' => (ParseState::InCommentSawDash2, ParseAction::Nothing),
            _ => (ParseState::InComment, ParseAction::Nothing),
        },
        ParseState::InCommentSawDash2 => match c {
            '>' => (ParseState::Normal, ParseAction::CommentEnd),
            '-' => (ParseState::InCommentSawDash2, ParseAction::Nothing),
            _ => (ParseState::InComment, ParseAction::Nothing),
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
        ParseAction::MaybeCommentStart => CommentTrackState::MaybeComment(position),
        ParseAction::ResetPotential => CommentTrackState::NotInComment,
        ParseAction::CommentStart => match comment_state {
            CommentTrackState::MaybeComment(from) => CommentTrackState::InComment(from),
            other => other,
        },
        ParseAction::CommentEnd => {
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
                what: "markup comment",
                offset,
            });
        }
    })
}

/// Finds `<!-- -->` comments in HTML, XML and Markdown.
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
    fn html_comments() {
        let src = "<!DOCTYPE html>\n<p>don't</p><!-- a -- b --><br/><!---->\n";
        assert_eq!(comments(src), vec!["<!-- a -- b -->", "<!---->"]);
    }

    #[test]
    fn tag_like_text_is_code() {
        assert!(comments("a <b> c <! d <!- e\n").is_empty());
    }

    #[test]
    fn unterminated_markup_comment() {
        assert!(matches!(
            find_comments("<p>x</p><!-- open"),
            Err(TokenizeError::Unterminated { offset: 8, .. })
        ));
    }
}
