/// Scoring: apply an ordered rule set to a message, summing contributions.
///
/// The two sentinel values are an escape hatch: a matching rule carrying
/// `MAX_SCORE` or `MIN_SCORE` ends the pass immediately and its value
/// replaces the running total.
use std::sync::atomic::{AtomicBool, Ordering};

use crate::eval::Evaluator;
use crate::matcher::ast::ScoringRule;
use crate::model::MessageRecord;

pub const MAX_SCORE: i32 = 9999;
pub const MIN_SCORE: i32 = -9999;

/// Outcome of one scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutcome {
    /// A matching rule carried a sentinel; the pass stopped there.
    Sentinel(i32),
    Accumulated(i32),
}

impl ScoreOutcome {
    pub fn value(self) -> i32 {
        match self {
            Self::Sentinel(v) | Self::Accumulated(v) => v,
        }
    }
}

impl Evaluator<'_> {
    pub fn score(&self, rules: &[ScoringRule], msg: &MessageRecord) -> i32 {
        self.score_outcome(rules, msg).value()
    }

    /// Each rule is evaluated at most once, in order; a non-matching rule
    /// contributes zero.
    pub fn score_outcome(&self, rules: &[ScoringRule], msg: &MessageRecord) -> ScoreOutcome {
        let mut total: i32 = 0;
        for rule in rules {
            if !self.matches(&rule.matchers, msg) {
                continue;
            }
            if rule.score == MAX_SCORE || rule.score == MIN_SCORE {
                return ScoreOutcome::Sentinel(rule.score);
            }
            total = total.saturating_add(rule.score);
        }
        ScoreOutcome::Accumulated(total)
    }
}

/// Score without collaborators.
pub fn score(rules: &[ScoringRule], msg: &MessageRecord) -> i32 {
    Evaluator::new().score(rules, msg)
}

/// Cooperative cancellation flag for long scoring passes. Safe to share
/// across threads; checked between messages, never mid-rule-set.
#[derive(Debug, Default)]
pub struct CancelToken(AtomicBool);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Score every message in a folder snapshot. Stops early when cancelled;
/// the returned vector then holds one entry per message scored so far.
pub fn score_folder(
    rules: &[ScoringRule],
    msgs: &[MessageRecord],
    evaluator: &Evaluator<'_>,
    cancel: &CancelToken,
) -> Vec<i32> {
    let mut scores = Vec::with_capacity(msgs.len());
    for msg in msgs {
        if cancel.is_cancelled() {
            break;
        }
        scores.push(evaluator.score(rules, msg));
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::parser::parse_scoring_rule;
    use crate::model::MessageFlags;

    fn rules(lines: &[&str]) -> Vec<ScoringRule> {
        lines.iter().map(|l| parse_scoring_rule(l).unwrap()).collect()
    }

    fn unread_message() -> MessageRecord {
        MessageRecord {
            subject: Some("weekly report".to_string()),
            from: Some("boss@corp.example".to_string()),
            flags: MessageFlags {
                unread: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_accumulates_matching_rules() {
        let rules = rules(&[
            "unread score 10",
            "subject match \"report\" score 5",
            "marked score 100",
        ]);
        assert_eq!(score(&rules, &unread_message()), 15);
    }

    #[test]
    fn test_only_second_rule_matches() {
        let rules = rules(&[
            "subject match \"spam\" score -50",
            "from match \"boss@\" score 100",
        ]);
        assert_eq!(score(&rules, &unread_message()), 100);
    }

    #[test]
    fn test_sentinel_replaces_total_and_stops() {
        let rules = rules(&[
            "all score 10",
            "all score -9999",
            "all score 5",
        ]);
        let msg = MessageRecord::default();
        assert_eq!(
            Evaluator::new().score_outcome(&rules, &msg),
            ScoreOutcome::Sentinel(MIN_SCORE)
        );
        assert_eq!(score(&rules, &msg), MIN_SCORE);
    }

    #[test]
    fn test_max_sentinel() {
        let rules = rules(&["unread score 9999", "all score -3"]);
        assert_eq!(score(&rules, &unread_message()), MAX_SCORE);
        // Not unread: the sentinel rule does not match, the other does.
        assert_eq!(score(&rules, &MessageRecord::default()), -3);
    }

    #[test]
    fn test_non_sentinel_rules_keep_accumulating() {
        let rules = rules(&["all score -50", "all score 60"]);
        assert_eq!(
            Evaluator::new().score_outcome(&rules, &MessageRecord::default()),
            ScoreOutcome::Accumulated(10)
        );
    }

    #[test]
    fn test_empty_rule_set_scores_zero() {
        assert_eq!(score(&[], &MessageRecord::default()), 0);
    }

    #[test]
    fn test_score_folder_with_cancellation() {
        let rules = rules(&["all score 1"]);
        let msgs = vec![MessageRecord::default(); 3];
        let evaluator = Evaluator::new();

        let cancel = CancelToken::new();
        assert_eq!(score_folder(&rules, &msgs, &evaluator, &cancel), vec![1, 1, 1]);

        cancel.cancel();
        assert!(score_folder(&rules, &msgs, &evaluator, &cancel).is_empty());
    }
}
