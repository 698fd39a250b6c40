//! Navigation resolution: what happens after a question is answered.

use crate::model::{AnswerMap, Question};
use crate::rules::{evaluate_condition, NavigationAction, NavigationRule};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of checking the navigation rules for a just-answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum NavigationOutcome {
    /// No rule matched: continue to the next visible question.
    Continue,
    /// Jump to the target question, even if it is currently invisible.
    Jump { target: String },
    /// Terminate the session.
    End,
}

/// Resolve the next step after answering `from`.
///
/// Rules whose `from` matches are evaluated in ascending (order, id); the
/// first one whose condition holds decides. Rules with dangling references
/// or a missing jump target are skipped with a warning, never a fault.
pub fn resolve_navigation(
    from: &str,
    rules: &[NavigationRule],
    answers: &AnswerMap,
    questions: &[Question],
) -> NavigationOutcome {
    let known: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();

    let mut applicable: Vec<&NavigationRule> = rules
        .iter()
        .filter(|r| r.from == from)
        .filter(|r| applies(r, &known))
        .collect();
    applicable.sort_by(|a, b| (a.order, &a.id).cmp(&(b.order, &b.id)));

    for rule in applicable {
        let answer = answers.get(&rule.depends_on);
        if !evaluate_condition(answer, rule.operator, &rule.value) {
            continue;
        }
        return match rule.action {
            NavigationAction::End => NavigationOutcome::End,
            NavigationAction::GoTo | NavigationAction::SkipTo => NavigationOutcome::Jump {
                // applies() guarantees presence.
                target: rule.target.clone().unwrap_or_default(),
            },
        };
    }

    NavigationOutcome::Continue
}

fn applies(rule: &NavigationRule, known: &HashSet<&str>) -> bool {
    if !known.contains(rule.depends_on.as_str()) {
        log::warn!(
            "navigation rule {} references deleted trigger question {}; ignoring",
            rule.id,
            rule.depends_on
        );
        return false;
    }
    match rule.action {
        NavigationAction::End => true,
        NavigationAction::GoTo | NavigationAction::SkipTo => match &rule.target {
            Some(target) if known.contains(target.as_str()) => true,
            Some(target) => {
                log::warn!(
                    "navigation rule {} targets deleted question {}; ignoring",
                    rule.id,
                    target
                );
                false
            }
            None => {
                log::warn!("navigation rule {} has no jump target; ignoring", rule.id);
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerValue, QuestionType};
    use crate::rules::ConditionOperator;

    fn question(id: &str, order: i64) -> Question {
        Question {
            id: id.into(),
            title: id.into(),
            question_type: QuestionType::Text,
            required: false,
            order,
            choices: Vec::new(),
            rating: None,
        }
    }

    fn rule(
        id: &str,
        from: &str,
        value: &str,
        action: NavigationAction,
        target: Option<&str>,
        order: i64,
    ) -> NavigationRule {
        NavigationRule {
            id: id.into(),
            depends_on: from.into(),
            operator: ConditionOperator::Equals,
            value: value.into(),
            from: from.into(),
            action,
            target: target.map(Into::into),
            order,
        }
    }

    #[test]
    fn no_rules_continues() {
        let qs = vec![question("q1", 1)];
        let out = resolve_navigation("q1", &[], &AnswerMap::new(), &qs);
        assert_eq!(out, NavigationOutcome::Continue);
    }

    #[test]
    fn end_rule_matches() {
        let qs = vec![question("q1", 1), question("q2", 2)];
        let rules = vec![rule("r1", "q1", "No", NavigationAction::End, None, 1)];
        let mut answers = AnswerMap::new();
        answers.insert("q1".into(), AnswerValue::text("No"));
        let out = resolve_navigation("q1", &rules, &answers, &qs);
        assert_eq!(out, NavigationOutcome::End);
    }

    #[test]
    fn first_matching_rule_by_order_wins() {
        let qs = vec![question("q1", 1), question("q2", 2), question("q3", 3)];
        let rules = vec![
            rule("r2", "q1", "x", NavigationAction::End, None, 2),
            rule(
                "r1",
                "q1",
                "x",
                NavigationAction::GoTo,
                Some("q3"),
                1,
            ),
        ];
        let mut answers = AnswerMap::new();
        answers.insert("q1".into(), AnswerValue::text("x"));
        let out = resolve_navigation("q1", &rules, &answers, &qs);
        assert_eq!(
            out,
            NavigationOutcome::Jump {
                target: "q3".into()
            }
        );
    }

    #[test]
    fn unanswered_trigger_does_not_match() {
        let qs = vec![question("q1", 1), question("q2", 2)];
        // Condition inspects q2, which has no answer yet.
        let mut r = rule("r1", "q1", "x", NavigationAction::End, None, 1);
        r.depends_on = "q2".into();
        let out = resolve_navigation("q1", &[r], &AnswerMap::new(), &qs);
        assert_eq!(out, NavigationOutcome::Continue);
    }

    #[test]
    fn jump_without_target_is_ignored() {
        let qs = vec![question("q1", 1), question("q2", 2)];
        let rules = vec![rule("r1", "q1", "x", NavigationAction::GoTo, None, 1)];
        let mut answers = AnswerMap::new();
        answers.insert("q1".into(), AnswerValue::text("x"));
        let out = resolve_navigation("q1", &rules, &answers, &qs);
        assert_eq!(out, NavigationOutcome::Continue);
    }

    #[test]
    fn dangling_target_is_ignored() {
        let qs = vec![question("q1", 1)];
        let rules = vec![rule(
            "r1",
            "q1",
            "x",
            NavigationAction::SkipTo,
            Some("gone"),
            1,
        )];
        let mut answers = AnswerMap::new();
        answers.insert("q1".into(), AnswerValue::text("x"));
        let out = resolve_navigation("q1", &rules, &answers, &qs);
        assert_eq!(out, NavigationOutcome::Continue);
    }
}
