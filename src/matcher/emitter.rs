/// Render AST nodes back to canonical rule text.
///
/// Round-trip contract: parsing the emitted text yields a structurally
/// equal AST. Output is normalized (`%` sits before the match-mode
/// keyword, actions are space-separated), so text that came in through a
/// tolerated spelling may serialize differently than it was written.
use crate::matcher::ast::{
    ConditionList, Criterion, FilterAction, FilterRule, MatchCondition, ScoringRule,
};

pub fn condition_to_string(cond: &MatchCondition) -> String {
    let mut out = String::new();
    if cond.negate {
        out.push('~');
    }
    out.push_str(cond.criterion.keyword());

    match &cond.criterion {
        Criterion::Header(name) => {
            out.push(' ');
            push_quoted(&mut out, name);
            push_match_spec(&mut out, cond);
        }
        Criterion::Test => {
            out.push(' ');
            push_quoted(&mut out, cond.operand.text().unwrap_or(""));
        }
        Criterion::FoundInAddressbook { header, book } => {
            out.push(' ');
            push_quoted(&mut out, header);
            out.push(' ');
            push_quoted(&mut out, book);
        }
        c if c.is_string_test() => push_match_spec(&mut out, cond),
        _ => {
            if let Some(n) = cond.operand.number() {
                out.push(' ');
                out.push_str(&n.to_string());
            }
        }
    }

    out
}

pub fn condition_list_to_string(list: &ConditionList) -> String {
    let sep = format!(" {} ", list.op.as_str());
    list.matchers
        .iter()
        .map(condition_to_string)
        .collect::<Vec<_>>()
        .join(&sep)
}

pub fn action_to_string(action: &FilterAction) -> String {
    let mut out = String::from(action.keyword());

    match action {
        FilterAction::Move(path) | FilterAction::Copy(path) => {
            out.push(' ');
            push_quoted(&mut out, path);
        }
        FilterAction::Forward { account, address }
        | FilterAction::ForwardAsAttachment { account, address }
        | FilterAction::Redirect { account, address } => {
            out.push(' ');
            out.push_str(&account.to_string());
            out.push(' ');
            push_quoted(&mut out, address);
        }
        FilterAction::Execute(cmd) => {
            out.push(' ');
            push_quoted(&mut out, cmd);
        }
        FilterAction::Color(index) => {
            out.push(' ');
            out.push_str(&index.to_string());
        }
        FilterAction::ChangeScore(n) | FilterAction::SetScore(n) => {
            out.push(' ');
            out.push_str(&n.to_string());
        }
        _ => {}
    }

    out
}

pub fn actions_to_string(actions: &[FilterAction]) -> String {
    actions
        .iter()
        .map(action_to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn filter_rule_to_string(rule: &FilterRule) -> String {
    format!(
        "{} {}",
        condition_list_to_string(&rule.matchers),
        actions_to_string(&rule.actions)
    )
}

pub fn scoring_rule_to_string(rule: &ScoringRule) -> String {
    format!(
        "{} score {}",
        condition_list_to_string(&rule.matchers),
        rule.score
    )
}

fn push_match_spec(out: &mut String, cond: &MatchCondition) {
    out.push(' ');
    out.push_str(&cond.match_mode.to_string());
    out.push(' ');
    push_quoted(out, cond.operand.text().unwrap_or(""));
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('"');
    out.push_str(&escape(s));
    out.push('"');
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}
