//! # Pollify Core Library
//!
//! This library provides the core business logic for the Pollify survey
//! builder: the adaptive flow engine that decides which questions a
//! respondent sees and what comes next, and the behavioral metrics
//! aggregation over submitted responses. The HTTP layer is a thin shell
//! over this crate; the CLI binary drives the same code paths.
//!
//! ## Architecture
//!
//! - **Flow resolvers**: pure functions computing the visible question
//!   subset and the next-step decision from (questions, rules, answers)
//! - **Session engine**: a wall-clock-based state machine owned by the
//!   caller, combining the resolvers with answer storage, per-question
//!   timing, and change tracking
//! - **Metrics**: batch aggregation of responses into per-question
//!   statistics
//! - **Storage**: SQLite-based form/rule/response storage behind store
//!   traits, and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: one respondent's traversal of a form
//! - [`FlowEngine`]: boundary facade over the stores
//! - [`MetricsAggregator`]: response-set statistics
//! - [`Database`]: form and response persistence

pub mod error;
pub mod flow;
pub mod metrics;
pub mod model;
pub mod rules;
pub mod session;
pub mod storage;

pub use error::{CoreError, DatabaseError, NotFoundError, ValidationError};
pub use flow::{FlowEngine, NavigationOutcome, NextStep};
pub use metrics::{MetricsAggregator, QuestionMetrics, TimeDistribution};
pub use model::{
    AnswerMap, AnswerValue, Choice, Form, Question, QuestionType, RatingScale, Response,
    ResponseItem,
};
pub use rules::{ConditionOperator, NavigationAction, NavigationRule, VisibilityRule};
pub use session::{AdvanceOutcome, SessionEngine, SessionState};
pub use storage::{Config, Database, FormStore, FormSummary, ResponseStore};
