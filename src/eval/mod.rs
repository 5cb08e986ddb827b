/// Condition evaluation against a message record.
///
/// Evaluation never fails: a bad regex, a missing field or a broken
/// collaborator degrades that single condition to a non-match, logged via
/// `tracing`. One broken rule must not stop a whole mailbox pass.
use std::cell::RefCell;
use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::matcher::ast::{ConditionList, Criterion, MatchCondition};
use crate::matcher::command::expand_command;
use crate::model::{BoolOp, MessageRecord};

pub mod scoring;

/// Spawns the external process behind a `test` condition. Exit status 0
/// means the condition matches. Enforcing a bounded timeout is this
/// collaborator's responsibility, not the evaluator's.
pub trait CommandRunner {
    fn run(&self, command: &str) -> std::io::Result<bool>;
}

/// Default runner shelling out via `sh -c`.
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, command: &str) -> std::io::Result<bool> {
        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()?;
        Ok(status.success())
    }
}

/// Address book lookup behind `found_in_addressbook`.
pub trait AddressBook {
    /// Whether the header value names an address present in the given book.
    fn contains(&self, value: &str, book: &str) -> bool;
}

/// Evaluates condition lists against message records.
///
/// Collaborators are optional; without them `test` and
/// `found_in_addressbook` conditions never match. Compiled regexes are
/// cached per (pattern, case-sensitivity), and a pattern that fails to
/// compile stays a non-match for the evaluator's lifetime.
#[derive(Default)]
pub struct Evaluator<'a> {
    runner: Option<&'a dyn CommandRunner>,
    address_book: Option<&'a dyn AddressBook>,
    regex_cache: RefCell<HashMap<(String, bool), Option<Regex>>>,
}

/// Evaluate without collaborators.
pub fn matches(list: &ConditionList, msg: &MessageRecord) -> bool {
    Evaluator::new().matches(list, msg)
}

impl<'a> Evaluator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runner(mut self, runner: &'a dyn CommandRunner) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn with_address_book(mut self, address_book: &'a dyn AddressBook) -> Self {
        self.address_book = Some(address_book);
        self
    }

    pub fn matches(&self, list: &ConditionList, msg: &MessageRecord) -> bool {
        match list.op {
            BoolOp::And => list.matchers.iter().all(|m| self.match_condition(m, msg)),
            BoolOp::Or => list.matchers.iter().any(|m| self.match_condition(m, msg)),
        }
    }

    /// One condition, with its own negation applied.
    pub fn match_condition(&self, cond: &MatchCondition, msg: &MessageRecord) -> bool {
        self.eval_criterion(cond, msg) != cond.negate
    }

    fn eval_criterion(&self, cond: &MatchCondition, msg: &MessageRecord) -> bool {
        match &cond.criterion {
            Criterion::All => true,
            Criterion::Unread => msg.flags.unread,
            Criterion::New => msg.flags.new,
            Criterion::Marked => msg.flags.marked,
            Criterion::Deleted => msg.flags.deleted,
            Criterion::Replied => msg.flags.replied,
            Criterion::Forwarded => msg.flags.forwarded,
            Criterion::Locked => msg.flags.locked,
            Criterion::Spam => msg.flags.spam,
            Criterion::IgnoreThread => msg.flags.ignore_thread,

            Criterion::Subject => self.field_match(cond, msg.subject.as_deref()),
            Criterion::From => self.field_match(cond, msg.from.as_deref()),
            Criterion::To => self.field_match(cond, msg.to.as_deref()),
            Criterion::Cc => self.field_match(cond, msg.cc.as_deref()),
            Criterion::ToOrCc => {
                self.field_match(cond, msg.to.as_deref()) || self.field_match(cond, msg.cc.as_deref())
            }
            Criterion::Newsgroups => self.field_match(cond, msg.newsgroups.as_deref()),
            Criterion::InReplyTo => self.field_match(cond, msg.inreplyto.as_deref()),
            Criterion::References => self.field_match(cond, msg.references.as_deref()),

            Criterion::HeadersPart => msg.header_lines().any(|line| self.string_match(cond, &line)),
            Criterion::BodyPart => self.body_match(cond, msg),
            Criterion::Message => {
                msg.header_lines().any(|line| self.string_match(cond, &line))
                    || self.body_match(cond, msg)
            }

            Criterion::AgeGreater => cond.operand.number().is_some_and(|n| msg.age_days >= n),
            Criterion::AgeLower => cond.operand.number().is_some_and(|n| msg.age_days <= n),
            Criterion::ScoreGreater => {
                cond.operand.number().is_some_and(|n| i64::from(msg.score) > n)
            }
            Criterion::ScoreLower => {
                cond.operand.number().is_some_and(|n| i64::from(msg.score) < n)
            }
            Criterion::ScoreEqual => {
                cond.operand.number().is_some_and(|n| i64::from(msg.score) == n)
            }
            Criterion::SizeGreater => cond.operand.number().is_some_and(|n| msg.size > n),
            Criterion::SizeSmaller => cond.operand.number().is_some_and(|n| msg.size < n),
            Criterion::SizeEqual => cond.operand.number().is_some_and(|n| msg.size == n),
            Criterion::ColorLabel => {
                cond.operand.number().is_some_and(|n| i64::from(msg.color_label) == n)
            }

            Criterion::Header(name) => msg
                .header(name)
                .is_some_and(|value| self.string_match(cond, value)),
            Criterion::Test => self.run_test_command(cond, msg),
            Criterion::FoundInAddressbook { header, book } => {
                self.lookup_addressbook(header, book, msg)
            }
        }
    }

    fn body_match(&self, cond: &MatchCondition, msg: &MessageRecord) -> bool {
        msg.body_text()
            .is_some_and(|body| body.lines().any(|line| self.string_match(cond, line)))
    }

    fn field_match(&self, cond: &MatchCondition, value: Option<&str>) -> bool {
        value.is_some_and(|v| self.string_match(cond, v))
    }

    fn string_match(&self, cond: &MatchCondition, value: &str) -> bool {
        let Some(pattern) = cond.operand.text() else {
            return false;
        };
        if cond.match_mode.is_regex() {
            self.regex_match(pattern, cond.match_mode.is_case_sensitive(), value)
        } else if cond.match_mode.is_case_sensitive() {
            value.contains(pattern)
        } else {
            value.to_lowercase().contains(&pattern.to_lowercase())
        }
    }

    fn regex_match(&self, pattern: &str, case_sensitive: bool, value: &str) -> bool {
        let mut cache = self.regex_cache.borrow_mut();
        let compiled = cache
            .entry((pattern.to_string(), case_sensitive))
            .or_insert_with(|| {
                RegexBuilder::new(pattern)
                    .case_insensitive(!case_sensitive)
                    .build()
                    .map_err(|err| {
                        tracing::warn!(pattern, %err, "regex failed to compile; condition will not match");
                    })
                    .ok()
            });
        compiled.as_ref().is_some_and(|re| re.is_match(value))
    }

    fn run_test_command(&self, cond: &MatchCondition, msg: &MessageRecord) -> bool {
        let Some(command) = cond.operand.text() else {
            return false;
        };
        let Some(runner) = self.runner else {
            tracing::debug!(command, "no command runner configured; 'test' does not match");
            return false;
        };
        let expanded = expand_command(command, msg);
        match runner.run(&expanded) {
            Ok(matched) => matched,
            Err(err) => {
                tracing::warn!(command = %expanded, %err, "test command failed to run");
                false
            }
        }
    }

    fn lookup_addressbook(&self, header: &str, book: &str, msg: &MessageRecord) -> bool {
        let Some(address_book) = self.address_book else {
            tracing::debug!(book, "no address book configured; lookup does not match");
            return false;
        };
        match msg.header(header) {
            Some(value) => address_book.contains(value, book),
            None => false,
        }
    }
}
