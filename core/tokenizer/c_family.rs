use super::common::{Span, Start, TokenizeError, scan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Double,
    Single,
    Backtick,
}

impl Quote {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '"' => Some(Quote::Double),
            '\'' => Some(Quote::Single),
            '`' => Some(Quote::Backtick),
            _ => None,
        }
    }

    fn closes_with(self, c: char) -> bool {
        matches!(
            (self, c),
            (Quote::Double, '"') | (Quote::Single, '\'') | (Quote::Backtick, '`')
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    C,
    /// JavaScript and TypeScript: `/` in expression position opens a regex literal.
    Script,
    /// Block comments only.
    Stylesheet,
}

impl Syntax {
    fn line_comments(self) -> bool {
        self != Syntax::Stylesheet
    }

    fn regex_literals(self) -> bool {
        self == Syntax::Script
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Normal,
    /// Line start, or after a token that an operand may follow.
    ExprStart,
    FirstSlash { regex: bool },
    Regex,
    RegexEscaped,
    RegexClass,
    RegexClassEscaped,
    LineComment,
    BlockComment,
    BlockCommentSawStar,
    Str(Quote),
    StrEscaped(Quote),
}
impl Start for ParseState {
    fn start() -> Self {
        ParseState::ExprStart
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CParseAction {
    Nothing,
    CommentMightStart,
    ConfirmLineComment,
    ConfirmBlockComment,
    DismissPotential,
    LineCommentEnd,
    BlockCommentEnd,
    Unterminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NotIn,
    SawFirstSlash { slash_idx: usize },
    InLine { start_idx: usize },
    InBlock { start_idx: usize },
}
impl Start for State {
    fn start() -> Self {
        State::NotIn
    }
}

fn opens_expression(c: char) -> bool {
    matches!(
        c,
        '(' | ',' | '=' | ':' | '[' | '!' | '&' | '|' | '?' | '{' | '}' | ';'
    )
}

fn c_state_transition(
    syntax: Syntax,
    from: ParseState,
    current_char: Option<char>,
) -> (ParseState, CParseAction) {
    let Some(c) = current_char else {
        return match from {
            ParseState::LineComment => (ParseState::Normal, CParseAction::LineCommentEnd),
            ParseState::BlockComment | ParseState::BlockCommentSawStar => {
                (ParseState::Normal, CParseAction::Unterminated)
            }
            ParseState::FirstSlash { .. } => (ParseState::Normal, CParseAction::DismissPotential),
            _ => (ParseState::Normal, CParseAction::Nothing),
        };
    };

    match from {
        ParseState::Normal | ParseState::ExprStart => match c {
            '/' => (
                ParseState::FirstSlash {
                    regex: from == ParseState::ExprStart && syntax.regex_literals(),
                },
                CParseAction::CommentMightStart,
            ),
            '\n' => (ParseState::ExprStart, CParseAction::Nothing),
            _ if c.is_whitespace() => (from, CParseAction::Nothing),
            _ if opens_expression(c) => (ParseState::ExprStart, CParseAction::Nothing),
            _ => match Quote::from_char(c) {
                Some(q) => (ParseState::Str(q), CParseAction::Nothing),
                None => (ParseState::Normal, CParseAction::Nothing),
            },
        },
        ParseState::FirstSlash { regex } => match c {
            '/' if syntax.line_comments() => {
                (ParseState::LineComment, CParseAction::ConfirmLineComment)
            }
            '*' => (ParseState::BlockComment, CParseAction::ConfirmBlockComment),
            _ if regex => (
                c_state_transition(syntax, ParseState::Regex, Some(c)).0,
                CParseAction::DismissPotential,
            ),
            // After a division sign an operand follows.
            _ => match c_state_transition(syntax, ParseState::ExprStart, Some(c)) {
                (next, CParseAction::Nothing) => (next, CParseAction::DismissPotential),
                other => other,
            },
        },
        // A regex never spans lines; a newline means the slash was division after all.
        ParseState::Regex => match c {
            '/' => (ParseState::Normal, CParseAction::Nothing),
            '\\' => (ParseState::RegexEscaped, CParseAction::Nothing),
            '[' => (ParseState::RegexClass, CParseAction::Nothing),
            '\n' => (ParseState::ExprStart, CParseAction::Nothing),
            _ => (ParseState::Regex, CParseAction::Nothing),
        },
        ParseState::RegexEscaped => match c {
            '\n' => (ParseState::ExprStart, CParseAction::Nothing),
            _ => (ParseState::Regex, CParseAction::Nothing),
        },
        ParseState::RegexClass => match c {
            ']' => (ParseState::Regex, CParseAction::Nothing),
            '\\' => (ParseState::RegexClassEscaped, CParseAction::Nothing),
            '\n' => (ParseState::ExprStart, CParseAction::Nothing),
            _ => (ParseState::RegexClass, CParseAction::Nothing),
        },
        ParseState::RegexClassEscaped => match c {
            '\n' => (ParseState::ExprStart, CParseAction::Nothing),
            _ => (ParseState::RegexClass, CParseAction::Nothing),
        },
        ParseState::LineComment => match c {
            '\n' => (ParseState::ExprStart, CParseAction::LineCommentEnd),
            _ => (ParseState::LineComment, CParseAction::Nothing),
        },
        ParseState::BlockComment => match c {
            '*' => (ParseState::BlockCommentSawStar, CParseAction::Nothing),
            _ => (ParseState::BlockComment, CParseAction::Nothing),
        },
        ParseState::BlockCommentSawStar => match c {
            '/' => (ParseState::Normal, CParseAction::BlockCommentEnd),
            '*' => (ParseState::BlockCommentSawStar, CParseAction::Nothing),
            _ => (ParseState::BlockComment, CParseAction::Nothing),
        },
        ParseState::Str(q) => match c {
            '\\' => (ParseState::StrEscaped(q), CParseAction::Nothing),
            _ if q.closes_with(c) => (ParseState::Normal, CParseAction::Nothing),
            // A stray apostrophe in a directive or macro must not swallow the rest of the file.
            '\n' if q != Quote::Backtick => (ParseState::ExprStart, CParseAction::Nothing),
            _ => (ParseState::Str(q), CParseAction::Nothing),
        },
        ParseState::StrEscaped(q) => (ParseState::Str(q), CParseAction::Nothing),
    }
}

fn c_do_action(
    action: CParseAction,
    comment_state: State,
    position: usize,
    spans: &mut Vec<Span>,
) -> Result<State, TokenizeError> {
    let next = match action {
        CParseAction::Nothing => comment_state,
        CParseAction::CommentMightStart => State::SawFirstSlash {
            slash_idx: position,
        },
        CParseAction::ConfirmLineComment => match comment_state {
            State::SawFirstSlash { slash_idx } => State::InLine {
                start_idx: slash_idx,
            },
            _ => State::NotIn,
        },
        CParseAction::ConfirmBlockComment => match comment_state {
            State::SawFirstSlash { slash_idx } => State::InBlock {
                start_idx: slash_idx,
            },
            _ => State::NotIn,
        },
        CParseAction::DismissPotential => State::NotIn,
        CParseAction::LineCommentEnd => {
            if let State::InLine { start_idx } = comment_state {
                spans.push(Span::line(start_idx, position));
            }
            State::NotIn
        }
        CParseAction::BlockCommentEnd => {
            if let State::InBlock { start_idx } = comment_state {
                spans.push(Span::block(start_idx, position + 1));
            }
            State::NotIn
        }
        CParseAction::Unterminated => {
            let offset = match comment_state {
                State::InBlock { start_idx } => start_idx,
                _ => position,
            };
            return Err(TokenizeError::Unterminated {
                what: "block comment",
                offset,
            });
        }
    };
    Ok(next)
}

fn find_with(input: &str, syntax: Syntax) -> Result<Vec<Span>, TokenizeError> {
    scan(
        input,
        |state: ParseState, c| c_state_transition(syntax, state, c),
        c_do_action,
    )
}

/// Finds `//` and `/* */` comments, skipping quoted and backtick strings.
pub fn find_comments(input: &str) -> Result<Vec<Span>, TokenizeError> {
    find_with(input, Syntax::C)
}

/// Like [`find_comments`], also skipping regex literals.
pub fn find_script_comments(input: &str) -> Result<Vec<Span>, TokenizeError> {
    find_with(input, Syntax::Script)
}

/// Stylesheets only know block comments; `//` appears in unquoted URLs.
pub fn find_block_comments(input: &str) -> Result<Vec<Span>, TokenizeError> {
    find_with(input, Syntax::Stylesheet)
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
    fn line_and_block_comments() {
        let src = "int a = 1; // one\n/* two\n lines */ int b;\n";
        assert_eq!(comments(src), vec!["// one", "/* two\n lines */"]);
    }

    #[test]
    fn comment_markers_inside_strings_are_code() {
        let src = "let url = \"http://example.com\"; // real\nlet c = '/';\n";
        assert_eq!(comments(src), vec!["// real"]);
    }

    #[test]
    fn template_literal_spans_lines() {
        let src = "const s = `a\n// not a comment\n`; /* yes */";
        assert_eq!(comments(src), vec!["/* yes */"]);
    }

    #[test]
    fn escaped_quote_does_not_end_string() {
        let src = r#"printf("say \"//hi\"\n"); // tail"#;
        assert_eq!(comments(src), vec!["// tail"]);
    }

    #[test]
    fn division_is_not_a_comment() {
        assert!(comments("x = a / b / c;\n").is_empty());
    }

    #[test]
    fn star_runs_close_block() {
        assert_eq!(comments("a /***/ b /** x **/"), vec!["/***/", "/** x **/"]);
    }

    #[test]
    fn apostrophe_in_directive_recovers_at_newline() {
        let src = "#error don't do this\nint x; // c\n";
        assert_eq!(comments(src), vec!["// c"]);
    }

    #[test]
    fn line_comment_at_end_of_input() {
        assert_eq!(comments("x; // end"), vec!["// end"]);
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let err = find_comments("a /* never closed").unwrap_err();
        assert_eq!(
            err,
            TokenizeError::Unterminated {
                what: "block comment",
                offset: 2
            }
        );
    }

    #[test]
    fn stylesheets_keep_double_slashes() {
        let src = "a { background: url(http://x/y.png); } /* note */\n";
        let spans = find_block_comments(src).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(&src[spans[0].from..spans[0].to], "/* note */");
    }

    #[test]
    fn slash_before_block_open() {
        assert_eq!(comments("a //* c */\nb"), vec!["//* c */"]);
        let src = "a / /* c */";
        assert_eq!(comments(src), vec!["/* c */"]);
    }

    fn script_comments(input: &str) -> Vec<&str> {
        find_script_comments(input)
            .unwrap()
            .iter()
            .map(|s| &input[s.from..s.to])
            .collect()
    }

    #[test]
    fn regex_literal_with_escaped_slashes() {
        let src = "const re = /https?:\\/\\//; go(); // call\n";
        assert_eq!(script_comments(src), vec!["// call"]);
    }

    #[test]
    fn regex_classes_and_quotes_stay_inside_the_literal() {
        let src = "if (/[/'\"]+/.test(s)) { x = s.split(/\\s*,\\s*/g); } /* done */\n";
        assert_eq!(script_comments(src), vec!["/* done */"]);
    }

    #[test]
    fn comments_in_expression_position_are_still_comments() {
        let src = "const a = // why\n  1;\nf(/* arg */ 2);\n";
        assert_eq!(script_comments(src), vec!["// why", "/* arg */"]);
    }

    #[test]
    fn division_after_operand_is_not_a_regex() {
        let src = "const r = (a) / b / c; // ratio\n";
        assert_eq!(script_comments(src), vec!["// ratio"]);
    }

    #[test]
    fn division_opening_a_line_reads_as_regex_and_keeps_comments() {
        let src = "x = y\n  / 2; // half\n";
        assert!(script_comments(src).is_empty());
    }

    #[test]
    fn c_sources_never_read_regexes() {
        let src = "x = y\n  / 2; // half\n";
        assert_eq!(comments(src), vec!["// half"]);
    }
}
