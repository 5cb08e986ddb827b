/// Recursive descent parser for filter/search rules.
///
/// The keyword table lives here, in one place: the lexer hands over bare
/// words and the functions below classify them into criteria, match modes
/// and actions. All parse state is local; nothing is shared across calls.
use thiserror::Error;

use crate::matcher::ast::{
    ConditionList, Criterion, FilterAction, FilterRule, MatchCondition, Operand, ScoringRule,
};
use crate::matcher::command;
use crate::matcher::lexer::{tokenize, LexError, Span, Token};
use crate::model::{BoolOp, MatchMode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("empty condition list")]
    EmptyConditionList,
    #[error("mixed '&' and '|' in one condition list")]
    InconsistentBooleanOperator,
    #[error("unknown criterion '{0}'")]
    UnknownCriterion(String),
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("expected 'match' or 'regexp', found '{0}'")]
    ExpectedMatchMode(String),
    #[error("'{keyword}' expects {expected}")]
    OperandTypeMismatch {
        keyword: String,
        expected: &'static str,
    },
    #[error("'%' is only valid before a string criterion or a match keyword")]
    StrayCaseMarker,
    #[error("color index {0} out of range 0..=7")]
    ColorOutOfRange(i64),
    #[error("invalid command placeholder '{0}'")]
    InvalidPlaceholder(String),
    #[error("unexpected token at offset {offset}")]
    UnexpectedToken { offset: usize },
    #[error("unexpected end of rule")]
    UnexpectedEnd,
}

/// Parse a full line of conditions; trailing tokens are an error.
pub fn parse_condition_list(input: &str) -> Result<ConditionList, ParseError> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let list = parse_conditions(&tokens, &mut pos)?;
    expect_end(&tokens, pos)?;
    Ok(list)
}

/// Parse a full line of actions; trailing tokens are an error.
pub fn parse_action_list(input: &str) -> Result<Vec<FilterAction>, ParseError> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let actions = parse_actions(&tokens, &mut pos)?;
    expect_end(&tokens, pos)?;
    Ok(actions)
}

/// Parse a whole filtering rule line: conditions followed by actions.
pub fn parse_filter_rule(input: &str) -> Result<FilterRule, ParseError> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let matchers = parse_conditions(&tokens, &mut pos)?;
    let actions = parse_actions(&tokens, &mut pos)?;
    expect_end(&tokens, pos)?;
    Ok(FilterRule { matchers, actions })
}

/// Parse a whole scoring rule line: conditions, `score`, integer.
pub fn parse_scoring_rule(input: &str) -> Result<ScoringRule, ParseError> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let matchers = parse_conditions(&tokens, &mut pos)?;
    match tokens.get(pos) {
        Some(Span {
            token: Token::Keyword(kw),
            ..
        }) if kw == "score" => pos += 1,
        Some(span) => return Err(ParseError::UnexpectedToken { offset: span.offset }),
        None => return Err(ParseError::UnexpectedEnd),
    }
    let score = expect_i32(&tokens, &mut pos, "score", "an integer score")?;
    expect_end(&tokens, pos)?;
    Ok(ScoringRule { matchers, score })
}

fn parse_conditions(tokens: &[Span], pos: &mut usize) -> Result<ConditionList, ParseError> {
    if tokens.get(*pos).is_none() {
        return Err(ParseError::EmptyConditionList);
    }

    let mut matchers = vec![parse_condition(tokens, pos)?];
    let mut op: Option<BoolOp> = None;

    // Conditions end at the first token that is not a boolean operator.
    loop {
        let next = match tokens.get(*pos).map(|s| &s.token) {
            Some(Token::And) => BoolOp::And,
            Some(Token::Or) => BoolOp::Or,
            _ => break,
        };
        if op.is_some_and(|prev| prev != next) {
            return Err(ParseError::InconsistentBooleanOperator);
        }
        op = Some(next);
        *pos += 1;
        matchers.push(parse_condition(tokens, pos)?);
    }

    if matchers.len() > 1 && matchers.iter().any(|m| m.criterion == Criterion::All) {
        tracing::warn!("'all' combined with other conditions matches trivially");
    }

    Ok(ConditionList {
        matchers,
        op: op.unwrap_or(BoolOp::And),
    })
}

fn parse_condition(tokens: &[Span], pos: &mut usize) -> Result<MatchCondition, ParseError> {
    let negate = matches!(tokens.get(*pos).map(|s| &s.token), Some(Token::Not));
    if negate {
        *pos += 1;
    }
    // `%subject match "x"` is tolerated; `subject %match "x"` is canonical.
    let case_marker = matches!(tokens.get(*pos).map(|s| &s.token), Some(Token::CaseMark));
    if case_marker {
        *pos += 1;
    }

    let kw = expect_keyword(tokens, pos)?.to_string();

    if let Some(criterion) = flag_criterion(&kw) {
        if case_marker {
            return Err(ParseError::StrayCaseMarker);
        }
        let mut cond = MatchCondition::flag(criterion);
        cond.negate = negate;
        return Ok(cond);
    }

    if let Some(criterion) = numeric_criterion(&kw) {
        if case_marker {
            return Err(ParseError::StrayCaseMarker);
        }
        let value = expect_int(tokens, pos, &kw, "an integer operand")?;
        let mut cond = MatchCondition::number(criterion, value);
        cond.negate = negate;
        return Ok(cond);
    }

    if let Some(criterion) = string_criterion(&kw) {
        let (match_mode, expr) = parse_match_spec(tokens, pos, case_marker, &kw)?;
        let mut cond = MatchCondition::string(criterion, match_mode, expr);
        cond.negate = negate;
        return Ok(cond);
    }

    match kw.as_str() {
        "header" => {
            let name = expect_str(tokens, pos, &kw, "a quoted header name")?;
            let (match_mode, expr) = parse_match_spec(tokens, pos, case_marker, &kw)?;
            let mut cond = MatchCondition::string(Criterion::Header(name), match_mode, expr);
            cond.negate = negate;
            return Ok(cond);
        }
        "test" => {
            if case_marker {
                return Err(ParseError::StrayCaseMarker);
            }
            let cmd = expect_str(tokens, pos, &kw, "a quoted command")?;
            command::validate_command(&cmd)?;
            return Ok(MatchCondition {
                criterion: Criterion::Test,
                negate,
                match_mode: MatchMode::default(),
                operand: Operand::Text(cmd),
            });
        }
        "found_in_addressbook" => {
            if case_marker {
                return Err(ParseError::StrayCaseMarker);
            }
            let header = expect_str(tokens, pos, &kw, "a quoted header name")?;
            let book = expect_str(tokens, pos, &kw, "a quoted book path")?;
            let mut cond = MatchCondition::flag(Criterion::FoundInAddressbook { header, book });
            cond.negate = negate;
            return Ok(cond);
        }
        _ => {}
    }

    Err(ParseError::UnknownCriterion(kw))
}

/// `["%"] ("match" | "regexp") quoted-string` following a string criterion.
fn parse_match_spec(
    tokens: &[Span],
    pos: &mut usize,
    leading_case: bool,
    criterion_kw: &str,
) -> Result<(MatchMode, String), ParseError> {
    let mut case_sensitive = leading_case;
    if matches!(tokens.get(*pos).map(|s| &s.token), Some(Token::CaseMark)) {
        if case_sensitive {
            return Err(ParseError::StrayCaseMarker);
        }
        *pos += 1;
        case_sensitive = true;
    }

    let kw = match tokens.get(*pos) {
        Some(Span {
            token: Token::Keyword(kw),
            ..
        }) => {
            *pos += 1;
            kw.as_str()
        }
        Some(_) => {
            return Err(ParseError::OperandTypeMismatch {
                keyword: criterion_kw.to_string(),
                expected: "a match specification",
            })
        }
        None => return Err(ParseError::UnexpectedEnd),
    };

    let mode = MatchMode::from_keyword(kw, case_sensitive)
        .ok_or_else(|| ParseError::ExpectedMatchMode(kw.to_string()))?;
    let expr = expect_str(tokens, pos, kw, "a quoted string")?;
    Ok((mode, expr))
}

fn parse_actions(tokens: &[Span], pos: &mut usize) -> Result<Vec<FilterAction>, ParseError> {
    let mut actions = Vec::new();

    while let Some(span) = tokens.get(*pos) {
        // Actions are space-separated in the canonical form; a '&' between
        // actions is accepted on input.
        if span.token == Token::And && !actions.is_empty() {
            *pos += 1;
            continue;
        }
        actions.push(parse_action(tokens, pos)?);
    }

    if actions.is_empty() {
        return Err(ParseError::UnexpectedEnd);
    }
    Ok(actions)
}

fn parse_action(tokens: &[Span], pos: &mut usize) -> Result<FilterAction, ParseError> {
    let kw = expect_keyword(tokens, pos)?.to_string();

    let action = match kw.as_str() {
        "move" => FilterAction::Move(expect_str(tokens, pos, &kw, "a quoted folder path")?),
        "copy" => FilterAction::Copy(expect_str(tokens, pos, &kw, "a quoted folder path")?),
        "delete" => FilterAction::Delete,
        "mark" => FilterAction::Mark,
        "unmark" => FilterAction::Unmark,
        "lock" => FilterAction::Lock,
        "unlock" => FilterAction::Unlock,
        "mark_as_read" => FilterAction::MarkRead,
        "mark_as_unread" => FilterAction::MarkUnread,
        "forward" | "forward_as_attachment" | "redirect" => {
            let account = expect_i32(tokens, pos, &kw, "an account id")?;
            let address = expect_str(tokens, pos, &kw, "a quoted address")?;
            match kw.as_str() {
                "forward" => FilterAction::Forward { account, address },
                "forward_as_attachment" => FilterAction::ForwardAsAttachment { account, address },
                _ => FilterAction::Redirect { account, address },
            }
        }
        "execute" => {
            let cmd = expect_str(tokens, pos, &kw, "a quoted command")?;
            command::validate_command(&cmd)?;
            FilterAction::Execute(cmd)
        }
        "color" => {
            let index = expect_int(tokens, pos, &kw, "a color index")?;
            if !(0..=7).contains(&index) {
                return Err(ParseError::ColorOutOfRange(index));
            }
            FilterAction::Color(index as u8)
        }
        "change_score" => FilterAction::ChangeScore(expect_i32(tokens, pos, &kw, "a score delta")?),
        "set_score" => FilterAction::SetScore(expect_i32(tokens, pos, &kw, "a score value")?),
        "stop" => FilterAction::Stop,
        "hide" => FilterAction::Hide,
        "ignore" => FilterAction::Ignore,
        _ => return Err(ParseError::UnknownAction(kw)),
    };

    Ok(action)
}

// ---- keyword table ----

fn flag_criterion(kw: &str) -> Option<Criterion> {
    Some(match kw {
        "all" => Criterion::All,
        "unread" => Criterion::Unread,
        "new" => Criterion::New,
        "marked" => Criterion::Marked,
        "deleted" => Criterion::Deleted,
        "replied" => Criterion::Replied,
        "forwarded" => Criterion::Forwarded,
        "locked" => Criterion::Locked,
        "spam" => Criterion::Spam,
        "ignore_thread" => Criterion::IgnoreThread,
        _ => return None,
    })
}

fn string_criterion(kw: &str) -> Option<Criterion> {
    Some(match kw {
        "subject" => Criterion::Subject,
        "from" => Criterion::From,
        "to" => Criterion::To,
        "cc" => Criterion::Cc,
        "to_or_cc" => Criterion::ToOrCc,
        "newsgroups" => Criterion::Newsgroups,
        "inreplyto" => Criterion::InReplyTo,
        "references" => Criterion::References,
        "headers_part" => Criterion::HeadersPart,
        "body_part" => Criterion::BodyPart,
        "message" => Criterion::Message,
        _ => return None,
    })
}

fn numeric_criterion(kw: &str) -> Option<Criterion> {
    Some(match kw {
        "age_greater" => Criterion::AgeGreater,
        "age_lower" => Criterion::AgeLower,
        "score_greater" => Criterion::ScoreGreater,
        "score_lower" => Criterion::ScoreLower,
        "score_equal" => Criterion::ScoreEqual,
        "size_greater" => Criterion::SizeGreater,
        "size_smaller" => Criterion::SizeSmaller,
        "size_equal" => Criterion::SizeEqual,
        "colorlabel" => Criterion::ColorLabel,
        _ => return None,
    })
}

// ---- token expectations ----

fn expect_keyword<'a>(tokens: &'a [Span], pos: &mut usize) -> Result<&'a str, ParseError> {
    match tokens.get(*pos) {
        Some(Span {
            token: Token::Keyword(kw),
            ..
        }) => {
            *pos += 1;
            Ok(kw)
        }
        Some(span) => Err(ParseError::UnexpectedToken { offset: span.offset }),
        None => Err(ParseError::UnexpectedEnd),
    }
}

fn expect_str(
    tokens: &[Span],
    pos: &mut usize,
    keyword: &str,
    expected: &'static str,
) -> Result<String, ParseError> {
    match tokens.get(*pos) {
        Some(Span {
            token: Token::Str(s),
            ..
        }) => {
            *pos += 1;
            Ok(s.clone())
        }
        Some(_) => Err(ParseError::OperandTypeMismatch {
            keyword: keyword.to_string(),
            expected,
        }),
        None => Err(ParseError::UnexpectedEnd),
    }
}

fn expect_int(
    tokens: &[Span],
    pos: &mut usize,
    keyword: &str,
    expected: &'static str,
) -> Result<i64, ParseError> {
    match tokens.get(*pos) {
        Some(Span {
            token: Token::Int(n),
            ..
        }) => {
            *pos += 1;
            Ok(*n)
        }
        Some(_) => Err(ParseError::OperandTypeMismatch {
            keyword: keyword.to_string(),
            expected,
        }),
        None => Err(ParseError::UnexpectedEnd),
    }
}

fn expect_i32(
    tokens: &[Span],
    pos: &mut usize,
    keyword: &str,
    expected: &'static str,
) -> Result<i32, ParseError> {
    let value = expect_int(tokens, pos, keyword, expected)?;
    i32::try_from(value).map_err(|_| ParseError::OperandTypeMismatch {
        keyword: keyword.to_string(),
        expected,
    })
}

fn expect_end(tokens: &[Span], pos: usize) -> Result<(), ParseError> {
    match tokens.get(pos) {
        Some(span) => Err(ParseError::UnexpectedToken { offset: span.offset }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_flag() {
        let list = parse_condition_list("unread").unwrap();
        assert_eq!(list.matchers.len(), 1);
        assert_eq!(list.matchers[0].criterion, Criterion::Unread);
        assert!(!list.matchers[0].negate);
        assert_eq!(list.op, BoolOp::And);
    }

    #[test]
    fn test_parse_negation() {
        for input in ["~unread", "!unread"] {
            let list = parse_condition_list(input).unwrap();
            assert!(list.matchers[0].negate, "{input}");
        }
    }

    #[test]
    fn test_parse_string_condition() {
        let list = parse_condition_list("subject match \"invoice\"").unwrap();
        let cond = &list.matchers[0];
        assert_eq!(cond.criterion, Criterion::Subject);
        assert_eq!(cond.match_mode, MatchMode::LiteralNoCase);
        assert_eq!(cond.operand, Operand::Text("invoice".to_string()));
    }

    #[test]
    fn test_case_marker_positions() {
        let canonical = parse_condition_list("subject %match \"Foo\"").unwrap();
        let tolerated = parse_condition_list("%subject match \"Foo\"").unwrap();
        assert_eq!(canonical, tolerated);
        assert_eq!(canonical.matchers[0].match_mode, MatchMode::LiteralCase);
    }

    #[test]
    fn test_double_case_marker_rejected() {
        assert_eq!(
            parse_condition_list("%subject %match \"Foo\""),
            Err(ParseError::StrayCaseMarker)
        );
    }

    #[test]
    fn test_case_marker_on_flag_rejected() {
        assert_eq!(parse_condition_list("%unread"), Err(ParseError::StrayCaseMarker));
        assert_eq!(
            parse_condition_list("%age_greater 3"),
            Err(ParseError::StrayCaseMarker)
        );
    }

    #[test]
    fn test_parse_regex_condition() {
        let list = parse_condition_list("from %regexp \"^billing@\"").unwrap();
        assert_eq!(list.matchers[0].match_mode, MatchMode::RegexCase);
    }

    #[test]
    fn test_parse_numeric_conditions() {
        let list = parse_condition_list("age_greater 30 & size_smaller 2048").unwrap();
        assert_eq!(list.matchers[0].operand, Operand::Number(30));
        assert_eq!(list.matchers[1].criterion, Criterion::SizeSmaller);
        assert_eq!(list.op, BoolOp::And);
    }

    #[test]
    fn test_parse_header_condition() {
        let list = parse_condition_list("header \"X-Mailing-List\" match \"rust\"").unwrap();
        let cond = &list.matchers[0];
        assert_eq!(cond.criterion, Criterion::Header("X-Mailing-List".to_string()));
        assert_eq!(cond.operand, Operand::Text("rust".to_string()));
    }

    #[test]
    fn test_parse_test_condition() {
        let list = parse_condition_list("test \"grep -q spam %F\"").unwrap();
        assert_eq!(list.matchers[0].criterion, Criterion::Test);
        assert_eq!(list.matchers[0].operand, Operand::Text("grep -q spam %F".to_string()));
    }

    #[test]
    fn test_parse_test_condition_bad_placeholder() {
        assert_eq!(
            parse_condition_list("test \"echo %z\""),
            Err(ParseError::InvalidPlaceholder("%z".to_string()))
        );
    }

    #[test]
    fn test_parse_found_in_addressbook() {
        let list = parse_condition_list("found_in_addressbook \"From\" \"Personal\"").unwrap();
        assert_eq!(
            list.matchers[0].criterion,
            Criterion::FoundInAddressbook {
                header: "From".to_string(),
                book: "Personal".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_or_list() {
        let list = parse_condition_list("unread | marked | new").unwrap();
        assert_eq!(list.op, BoolOp::Or);
        assert_eq!(list.matchers.len(), 3);
    }

    #[test]
    fn test_mixed_operators_rejected() {
        assert_eq!(
            parse_condition_list("unread & marked | new"),
            Err(ParseError::InconsistentBooleanOperator)
        );
    }

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(parse_condition_list(""), Err(ParseError::EmptyConditionList));
        assert_eq!(parse_condition_list("   "), Err(ParseError::EmptyConditionList));
    }

    #[test]
    fn test_unknown_criterion() {
        assert_eq!(
            parse_condition_list("frobnicate"),
            Err(ParseError::UnknownCriterion("frobnicate".to_string()))
        );
    }

    #[test]
    fn test_operand_type_mismatch() {
        assert_eq!(
            parse_condition_list("age_greater \"ten\""),
            Err(ParseError::OperandTypeMismatch {
                keyword: "age_greater".to_string(),
                expected: "an integer operand",
            })
        );
        assert_eq!(
            parse_condition_list("subject match 5"),
            Err(ParseError::OperandTypeMismatch {
                keyword: "match".to_string(),
                expected: "a quoted string",
            })
        );
    }

    #[test]
    fn test_missing_match_mode() {
        assert_eq!(
            parse_condition_list("subject contains \"x\""),
            Err(ParseError::ExpectedMatchMode("contains".to_string()))
        );
    }

    #[test]
    fn test_all_combined_is_permitted() {
        // Confusing but legal; the parser only warns.
        let list = parse_condition_list("all | unread").unwrap();
        assert_eq!(list.matchers.len(), 2);
    }

    #[test]
    fn test_parse_action_list_arities() {
        let actions = parse_action_list(
            "copy \"backup\" mark_as_read forward 2 \"me@example.org\" color 5 stop",
        )
        .unwrap();
        assert_eq!(
            actions,
            vec![
                FilterAction::Copy("backup".to_string()),
                FilterAction::MarkRead,
                FilterAction::Forward {
                    account: 2,
                    address: "me@example.org".to_string(),
                },
                FilterAction::Color(5),
                FilterAction::Stop,
            ]
        );
    }

    #[test]
    fn test_parse_action_separator() {
        let spaced = parse_action_list("mark stop").unwrap();
        let amp = parse_action_list("mark & stop").unwrap();
        assert_eq!(spaced, amp);
    }

    #[test]
    fn test_color_out_of_range() {
        assert_eq!(parse_action_list("color 8"), Err(ParseError::ColorOutOfRange(8)));
        assert_eq!(parse_action_list("color -1"), Err(ParseError::ColorOutOfRange(-1)));
    }

    #[test]
    fn test_unknown_action() {
        assert_eq!(
            parse_action_list("shred"),
            Err(ParseError::UnknownAction("shred".to_string()))
        );
    }

    #[test]
    fn test_execute_placeholders_validated() {
        assert!(parse_action_list("execute \"mailanalyze %s %f 100%%\"").is_ok());
        assert_eq!(
            parse_action_list("execute \"echo %q\""),
            Err(ParseError::InvalidPlaceholder("%q".to_string()))
        );
        assert_eq!(
            parse_action_list("execute \"truncated %\""),
            Err(ParseError::InvalidPlaceholder("%".to_string()))
        );
    }

    #[test]
    fn test_parse_filter_rule() {
        let rule =
            parse_filter_rule("subject match \"lottery\" & from match \"@spam.example\" move \"Junk\" stop")
                .unwrap();
        assert_eq!(rule.matchers.matchers.len(), 2);
        assert_eq!(
            rule.actions,
            vec![FilterAction::Move("Junk".to_string()), FilterAction::Stop]
        );
    }

    #[test]
    fn test_parse_scoring_rule() {
        let rule = parse_scoring_rule("from match \"boss@\" score 100").unwrap();
        assert_eq!(rule.score, 100);
        assert_eq!(rule.matchers.matchers[0].criterion, Criterion::From);

        let rule = parse_scoring_rule("subject match \"spam\" score -9999").unwrap();
        assert_eq!(rule.score, -9999);
    }

    #[test]
    fn test_filter_rule_without_actions() {
        assert_eq!(
            parse_filter_rule("subject match \"x\""),
            Err(ParseError::UnexpectedEnd)
        );
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert_eq!(
            parse_condition_list("unread move \"inbox\""),
            Err(ParseError::UnexpectedToken { offset: 7 })
        );
    }

    #[test]
    fn test_lex_error_propagates() {
        assert_eq!(
            parse_condition_list("subject match \"open"),
            Err(ParseError::Lex(LexError::UnterminatedString { offset: 14 }))
        );
    }
}
