/// AST node types for filter/search rules.
///
/// A rule line is a [`ConditionList`] followed either by actions
/// ([`FilterRule`]) or by a score ([`ScoringRule`]). Nodes are built by one
/// parse call and never mutated afterwards; parsing is the only write path.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{BoolOp, MatchMode};

/// The kind of test a single condition performs.
///
/// Operand payloads that belong to the criterion itself (a header name, an
/// address book path) live on the variant; the tested value lives in
/// [`MatchCondition::operand`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    /// Trivially true for every message.
    All,
    Unread,
    New,
    Marked,
    Deleted,
    Replied,
    Forwarded,
    Locked,
    Spam,
    IgnoreThread,

    Subject,
    From,
    To,
    Cc,
    /// OR of the `to` and `cc` tests with the same match spec.
    ToOrCc,
    Newsgroups,
    InReplyTo,
    References,
    /// Any raw `Name: value` header line.
    HeadersPart,
    /// Any body line.
    BodyPart,
    /// Any header line or body line.
    Message,

    AgeGreater,
    AgeLower,
    ScoreGreater,
    ScoreLower,
    ScoreEqual,
    SizeGreater,
    SizeSmaller,
    SizeEqual,
    ColorLabel,

    /// Named header, looked up case-insensitively.
    Header(String),
    /// External command; operand holds the command with `%`-placeholders.
    Test,
    /// Address book lookup of the named header's value.
    FoundInAddressbook { header: String, book: String },
}

impl Criterion {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Unread => "unread",
            Self::New => "new",
            Self::Marked => "marked",
            Self::Deleted => "deleted",
            Self::Replied => "replied",
            Self::Forwarded => "forwarded",
            Self::Locked => "locked",
            Self::Spam => "spam",
            Self::IgnoreThread => "ignore_thread",
            Self::Subject => "subject",
            Self::From => "from",
            Self::To => "to",
            Self::Cc => "cc",
            Self::ToOrCc => "to_or_cc",
            Self::Newsgroups => "newsgroups",
            Self::InReplyTo => "inreplyto",
            Self::References => "references",
            Self::HeadersPart => "headers_part",
            Self::BodyPart => "body_part",
            Self::Message => "message",
            Self::AgeGreater => "age_greater",
            Self::AgeLower => "age_lower",
            Self::ScoreGreater => "score_greater",
            Self::ScoreLower => "score_lower",
            Self::ScoreEqual => "score_equal",
            Self::SizeGreater => "size_greater",
            Self::SizeSmaller => "size_smaller",
            Self::SizeEqual => "size_equal",
            Self::ColorLabel => "colorlabel",
            Self::Header(_) => "header",
            Self::Test => "test",
            Self::FoundInAddressbook { .. } => "found_in_addressbook",
        }
    }

    /// True for criteria whose operand is a string tested under a
    /// [`MatchMode`].
    pub fn is_string_test(&self) -> bool {
        matches!(
            self,
            Self::Subject
                | Self::From
                | Self::To
                | Self::Cc
                | Self::ToOrCc
                | Self::Newsgroups
                | Self::InReplyTo
                | Self::References
                | Self::HeadersPart
                | Self::BodyPart
                | Self::Message
                | Self::Header(_)
        )
    }
}

/// Operand of a single condition. Exactly one shape is valid per
/// criterion; the parser rejects mismatches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    None,
    Text(String),
    Number(i64),
}

impl Operand {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// A single testable predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCondition {
    pub criterion: Criterion,
    /// Written with a leading `~` or `!`; inverts this condition's own
    /// result before the list combination.
    pub negate: bool,
    /// Only meaningful when `criterion.is_string_test()`.
    pub match_mode: MatchMode,
    pub operand: Operand,
}

impl MatchCondition {
    /// Flag criterion without operand.
    pub fn flag(criterion: Criterion) -> Self {
        Self {
            criterion,
            negate: false,
            match_mode: MatchMode::default(),
            operand: Operand::None,
        }
    }

    /// String criterion with a match spec.
    pub fn string(criterion: Criterion, match_mode: MatchMode, expr: impl Into<String>) -> Self {
        Self {
            criterion,
            negate: false,
            match_mode,
            operand: Operand::Text(expr.into()),
        }
    }

    /// Numeric criterion.
    pub fn number(criterion: Criterion, value: i64) -> Self {
        Self {
            criterion,
            negate: false,
            match_mode: MatchMode::default(),
            operand: Operand::Number(value),
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }
}

impl fmt::Display for MatchCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::emitter::condition_to_string(self))
    }
}

/// Ordered conditions combined with one uniform boolean operator.
/// Never empty; the parser rejects an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionList {
    pub matchers: Vec<MatchCondition>,
    pub op: BoolOp,
}

impl fmt::Display for ConditionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::emitter::condition_list_to_string(self))
    }
}

/// An operation queued for execution when a condition list matches.
/// Owns its payload; applied by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterAction {
    Move(String),
    Copy(String),
    Delete,
    Mark,
    Unmark,
    Lock,
    Unlock,
    MarkRead,
    MarkUnread,
    Forward { account: i32, address: String },
    ForwardAsAttachment { account: i32, address: String },
    Redirect { account: i32, address: String },
    /// Command with `%`-placeholders, expanded at invocation time.
    Execute(String),
    /// Color label index, 0–7.
    Color(u8),
    ChangeScore(i32),
    SetScore(i32),
    Stop,
    Hide,
    Ignore,
}

impl FilterAction {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Move(_) => "move",
            Self::Copy(_) => "copy",
            Self::Delete => "delete",
            Self::Mark => "mark",
            Self::Unmark => "unmark",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::MarkRead => "mark_as_read",
            Self::MarkUnread => "mark_as_unread",
            Self::Forward { .. } => "forward",
            Self::ForwardAsAttachment { .. } => "forward_as_attachment",
            Self::Redirect { .. } => "redirect",
            Self::Execute(_) => "execute",
            Self::Color(_) => "color",
            Self::ChangeScore(_) => "change_score",
            Self::SetScore(_) => "set_score",
            Self::Stop => "stop",
            Self::Hide => "hide",
            Self::Ignore => "ignore",
        }
    }
}

impl fmt::Display for FilterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::emitter::action_to_string(self))
    }
}

/// A whole filtering rule line: conditions plus the actions to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub matchers: ConditionList,
    pub actions: Vec<FilterAction>,
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::emitter::filter_rule_to_string(self))
    }
}

/// A whole scoring rule line: conditions plus the score they contribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub matchers: ConditionList,
    pub score: i32,
}

impl fmt::Display for ScoringRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::emitter::scoring_rule_to_string(self))
    }
}
