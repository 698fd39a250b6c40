//! Rule model: immutable value types describing visibility and navigation
//! rules, plus the condition evaluator they share.
//!
//! Rules are authored by the form owner at design time. The engine treats
//! them as read-only; a rule referencing a deleted question is skipped at
//! evaluation time (never a fault).

pub mod condition;

pub use condition::evaluate_condition;

use serde::{Deserialize, Serialize};

/// Comparison operator between a stored answer and a rule's literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

/// Controls whether a question is shown, based on another question's answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityRule {
    pub id: String,
    /// The trigger question whose answer the condition inspects.
    pub depends_on: String,
    pub operator: ConditionOperator,
    /// Literal comparison value, always authored as a string.
    pub value: String,
    /// The question whose visibility this rule controls. Must differ from
    /// `depends_on`.
    pub subject: String,
    /// Polarity: show the subject when the condition matches (true) or
    /// hide it when the condition matches (false). Also the default before
    /// the trigger has an answer.
    pub show_when_matched: bool,
    /// Evaluation order among rules for the same subject; ties broken by id.
    pub order: i64,
}

/// What a matched [`NavigationRule`] does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationAction {
    GoTo,
    SkipTo,
    End,
}

/// Controls branching/skipping/termination after a question is answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationRule {
    pub id: String,
    /// The trigger question whose answer the condition inspects.
    pub depends_on: String,
    pub operator: ConditionOperator,
    pub value: String,
    /// The question after which this rule is checked.
    pub from: String,
    pub action: NavigationAction,
    /// Jump destination; required for GoTo/SkipTo, absent for End.
    #[serde(default)]
    pub target: Option<String>,
    pub order: i64,
}
