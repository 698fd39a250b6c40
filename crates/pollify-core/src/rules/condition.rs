//! Condition evaluation: one comparison between a stored answer and a
//! rule's literal value.

use crate::model::AnswerValue;

use super::ConditionOperator;

/// Evaluate `answer <operator> literal`.
///
/// An absent answer is false for every operator; the "default before the
/// dependency is known" fallback belongs to the visibility resolver, not
/// here. Numeric operators parse both sides as f64 and are false when
/// either side fails to parse. Never panics.
pub fn evaluate_condition(
    answer: Option<&AnswerValue>,
    operator: ConditionOperator,
    literal: &str,
) -> bool {
    let Some(answer) = answer else {
        return false;
    };

    match operator {
        ConditionOperator::Equals => answer.canonical_text() == literal,
        ConditionOperator::NotEquals => answer.canonical_text() != literal,
        ConditionOperator::Contains => answer.canonical_text().contains(literal),
        ConditionOperator::GreaterThan => match (answer.as_number(), literal.trim().parse::<f64>())
        {
            (Some(lhs), Ok(rhs)) => lhs > rhs,
            _ => false,
        },
        ConditionOperator::LessThan => match (answer.as_number(), literal.trim().parse::<f64>()) {
            (Some(lhs), Ok(rhs)) => lhs < rhs,
            _ => false,
        },
    }
}
