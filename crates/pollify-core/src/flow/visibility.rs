//! Visibility resolution: which questions are currently shown.
//!
//! Resolution is a pure function of (question list, rule list, answer map).
//! Rules for the same subject are ordered by (order, id) so repeated calls
//! with identical input always produce the same result.

use crate::model::{AnswerMap, Question};
use crate::rules::{evaluate_condition, VisibilityRule};

use std::collections::HashSet;

/// Compute the ordered subset of `questions` currently visible.
///
/// A question with no applicable rule is always visible. A question that is
/// the subject of one or more rules is visible iff the first rule (by
/// ascending order, id) whose trigger has an answer evaluates to that rule's
/// `show_when_matched` polarity; before any trigger is answered, the
/// lowest-order rule's polarity is the default.
///
/// Rules referencing a deleted trigger or subject are skipped with a warning.
pub fn resolve_visible<'a>(
    questions: &'a [Question],
    rules: &[VisibilityRule],
    answers: &AnswerMap,
) -> Vec<&'a Question> {
    let known: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();

    let mut ordered: Vec<&Question> = questions.iter().collect();
    ordered.sort_by_key(|q| q.order);

    ordered
        .into_iter()
        .filter(|q| is_visible(q, rules, answers, &known))
        .collect()
}

fn is_visible(
    question: &Question,
    rules: &[VisibilityRule],
    answers: &AnswerMap,
    known: &HashSet<&str>,
) -> bool {
    let mut applicable: Vec<&VisibilityRule> = rules
        .iter()
        .filter(|r| r.subject == question.id)
        .filter(|r| applies(r, known))
        .collect();

    if applicable.is_empty() {
        return true;
    }
    applicable.sort_by(|a, b| (a.order, &a.id).cmp(&(b.order, &b.id)));

    for rule in &applicable {
        if let Some(answer) = answers.get(&rule.depends_on) {
            let matched = evaluate_condition(Some(answer), rule.operator, &rule.value);
            return matched == rule.show_when_matched;
        }
    }

    // No trigger answered yet: default to the declared intent of the
    // lowest-order rule.
    applicable[0].show_when_matched
}

fn applies(rule: &VisibilityRule, known: &HashSet<&str>) -> bool {
    if rule.subject == rule.depends_on {
        log::warn!(
            "visibility rule {} is self-referential (subject == depends_on); ignoring",
            rule.id
        );
        return false;
    }
    if !known.contains(rule.depends_on.as_str()) {
        log::warn!(
            "visibility rule {} references deleted trigger question {}; ignoring",
            rule.id,
            rule.depends_on
        );
        return false;
    }
    true
}

/// First visible question strictly after `current_id` in display order.
///
/// Used by the session when no navigation rule matched. `current_id` itself
/// need not be visible (it may have been reached through a jump).
pub fn next_visible_after<'a>(
    questions: &'a [Question],
    rules: &[VisibilityRule],
    answers: &AnswerMap,
    current_id: &str,
) -> Option<&'a Question> {
    let current_order = questions.iter().find(|q| q.id == current_id)?.order;
    resolve_visible(questions, rules, answers)
        .into_iter()
        .find(|q| q.order > current_order)
}
