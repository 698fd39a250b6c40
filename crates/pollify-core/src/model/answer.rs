use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A respondent's answer to one question.
///
/// Tagged by the owning question's type so the condition evaluator's
/// coercions stay exhaustive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AnswerValue {
    Text { text: String },
    /// A selected choice. Both the identity and the canonical value are
    /// captured at answer time so rule evaluation does not need to chase
    /// the choice back through the form.
    Choice { choice_id: String, value: String },
    Rating { value: i64 },
}

impl AnswerValue {
    pub fn text(s: impl Into<String>) -> Self {
        AnswerValue::Text { text: s.into() }
    }

    pub fn choice(choice_id: impl Into<String>, value: impl Into<String>) -> Self {
        AnswerValue::Choice {
            choice_id: choice_id.into(),
            value: value.into(),
        }
    }

    pub fn rating(value: i64) -> Self {
        AnswerValue::Rating { value }
    }

    /// Canonical string form used by string-comparing operators.
    pub fn canonical_text(&self) -> String {
        match self {
            AnswerValue::Text { text } => text.clone(),
            AnswerValue::Choice { value, .. } => value.clone(),
            AnswerValue::Rating { value } => value.to_string(),
        }
    }

    /// Numeric form used by ordering operators, if one exists.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AnswerValue::Rating { value } => Some(*value as f64),
            AnswerValue::Text { text } => text.trim().parse().ok(),
            AnswerValue::Choice { value, .. } => value.trim().parse().ok(),
        }
    }

    /// Type-specific "has the respondent actually answered" test:
    /// non-blank text, a selected choice, a present rating.
    pub fn is_substantive(&self) -> bool {
        match self {
            AnswerValue::Text { text } => !text.trim().is_empty(),
            AnswerValue::Choice { .. } => true,
            AnswerValue::Rating { .. } => true,
        }
    }
}

/// Question id -> answer, owned by the fill session.
pub type AnswerMap = HashMap<String, AnswerValue>;
