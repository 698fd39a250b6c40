//! Persistence seams and the SQLite implementation.
//!
//! The engine consumes two abstract collaborators: a read side for the
//! form/rule graph and an append-only response store. [`Database`] backs
//! both with SQLite; tests use `Database::open_memory()`.

mod config;
pub mod database;

pub use config::Config;
pub use database::{Database, FormSummary};

use std::path::PathBuf;

use crate::error::DatabaseError;
use crate::model::{Form, Response};
use crate::rules::{NavigationRule, VisibilityRule};

/// Read access to the form/question/rule graph.
pub trait FormStore {
    /// Full form with its questions and choices; None when absent.
    fn form(&self, form_id: &str) -> Result<Option<Form>, DatabaseError>;

    fn visibility_rules(&self, form_id: &str) -> Result<Vec<VisibilityRule>, DatabaseError>;

    fn navigation_rules(&self, form_id: &str) -> Result<Vec<NavigationRule>, DatabaseError>;
}

/// Append-only response persistence.
pub trait ResponseStore {
    /// Persist a response with its items.
    ///
    /// The store enforces UNIQUE(form, identity); a violation returns
    /// [`DatabaseError::Duplicate`] and is the authoritative duplicate
    /// guard -- any in-engine existence check is only a fast path.
    fn append_response(&self, response: &Response) -> Result<(), DatabaseError>;

    fn response_exists(&self, form_id: &str, identity: &str) -> Result<bool, DatabaseError>;

    fn responses_for_form(&self, form_id: &str) -> Result<Vec<Response>, DatabaseError>;
}

/// Returns `~/.config/pollify[-dev]/` based on POLLIFY_ENV.
///
/// Set POLLIFY_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POLLIFY_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pollify-dev")
    } else {
        base_dir.join("pollify")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
