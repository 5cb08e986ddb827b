//! Filter/search rule language for mail messages.
//!
//! A rule is one line of text: a list of conditions over a message's
//! headers, flags, size, age and content, combined with a single `&` or
//! `|`, followed either by filter actions or by a score. This crate
//! parses rule text into an AST, evaluates condition lists against
//! [`MessageRecord`]s, applies ordered scoring rule sets with sentinel
//! short-circuiting, and serializes ASTs back to canonical rule text.

pub mod eval;
pub mod matcher;
pub mod model;

pub use eval::scoring::{score, score_folder, CancelToken, ScoreOutcome, MAX_SCORE, MIN_SCORE};
pub use eval::{matches, AddressBook, CommandRunner, Evaluator, SystemCommandRunner};
pub use matcher::ast::{
    ConditionList, Criterion, FilterAction, FilterRule, MatchCondition, Operand, ScoringRule,
};
pub use matcher::command::expand_command;
pub use matcher::emitter::{
    actions_to_string, condition_list_to_string, condition_to_string, filter_rule_to_string,
    scoring_rule_to_string,
};
pub use matcher::lexer::{tokenize, LexError, Span, Token};
pub use matcher::parser::{
    parse_action_list, parse_condition_list, parse_filter_rule, parse_scoring_rule, ParseError,
};
pub use model::{BoolOp, MatchMode, MessageFlags, MessageRecord};
