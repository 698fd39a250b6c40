//! Core error types for pollify-core.
//!
//! This module defines the error hierarchy using thiserror. The split
//! mirrors how callers need to react: validation failures are rejected
//! operations the caller relays to the user, not-found is a distinct "bad
//! input" condition, and database errors are infrastructure faults.
//!
//! Owner-side configuration problems (dangling rule references, a jump rule
//! without a target) never become error values: such rules are skipped with
//! a warning log, so a respondent-facing fill session cannot hard-fail on a
//! misconfigured form.

use thiserror::Error;

/// Core error type for pollify-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Rejected operations (required question unanswered, double submit, ...)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An identity looked up in the store does not exist
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: std::path::PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A uniqueness constraint rejected the write.
    ///
    /// The responses table carries UNIQUE(form_id, identity) -- the
    /// authoritative duplicate-submission guard -- and the questions
    /// table carries UNIQUE(form_id, ord) for display order.
    #[error("Uniqueness constraint violated")]
    Duplicate,

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Rejected operations on a fill session or submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Advance was attempted while a required question has no answer.
    #[error("Question '{title}' requires an answer before advancing")]
    RequiredUnanswered { question_id: String, title: String },

    /// The submitted value's type does not match the question's type.
    #[error("Answer type mismatch for question {question_id}: expected {expected}")]
    AnswerTypeMismatch {
        question_id: String,
        expected: String,
    },

    /// A choice answer named a choice the question does not have.
    #[error("Question {question_id} has no choice {choice_id}")]
    UnknownChoice {
        question_id: String,
        choice_id: String,
    },

    /// A rating answer fell outside the question's scale.
    #[error("Rating {value} out of range {min}..={max} for question {question_id}")]
    RatingOutOfRange {
        question_id: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// An operation requiring an in-progress session found it closed.
    #[error("Session is no longer in progress")]
    SessionClosed,

    /// Submit was called on a session that is not in the Completed state.
    #[error("Session is not completed; cannot submit")]
    NotCompleted,

    /// Submit was called a second time on the same session.
    #[error("Session already submitted")]
    AlreadySubmitted,

    /// This identity has already responded to this form.
    #[error("A response for this form and identity already exists")]
    AlreadyResponded,

    /// The session has no answerable questions at all.
    #[error("Form has no visible questions")]
    EmptyForm,
}

/// Identity lookups that came back empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Form not found: {0}")]
    Form(String),

    #[error("Question not found: {0}")]
    Question(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => match e.code {
                rusqlite::ErrorCode::ConstraintViolation => DatabaseError::Duplicate,
                rusqlite::ErrorCode::DatabaseLocked => DatabaseError::Locked,
                _ => DatabaseError::QueryFailed(e.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
