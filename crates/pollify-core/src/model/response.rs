use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AnswerValue;

/// One answered question within a [`Response`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseItem {
    pub question_id: String,
    pub value: AnswerValue,
    /// Seconds the respondent spent on this question, summed across visits.
    pub time_spent_secs: u64,
    /// How many times the value was overwritten before moving on.
    pub change_count: u32,
}

/// The persisted record of one completed fill session.
///
/// Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub form_id: String,
    /// Completion-identity key: client address or authenticated-user id.
    /// Opaque to the engine; used for duplicate detection.
    pub identity: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub total_secs: u64,
    pub submitted_at: DateTime<Utc>,
    /// Items in the form's display order.
    pub items: Vec<ResponseItem>,
}

impl Response {
    pub fn item(&self, question_id: &str) -> Option<&ResponseItem> {
        self.items.iter().find(|i| i.question_id == question_id)
    }
}
