//! Fill session state machine.
//!
//! A session is a wall-clock-based state machine. It has no internal
//! threads and performs no I/O -- the caller (HTTP session, CLI loop)
//! owns the value and drives it with `answer`/`advance`/`retreat`, then
//! calls `submit` once the session reaches `Completed`.
//!
//! ## State Transitions
//!
//! ```text
//! InProgress -> (Completed | Terminated)
//! ```
//!
//! The session owns a snapshot of the form and its rules taken at start.
//! Owner edits made mid-session only ever surface as dangling rule
//! references, which the resolvers skip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, NotFoundError, Result, ValidationError};
use crate::flow::{next_visible_after, resolve_navigation, resolve_visible, NavigationOutcome};
use crate::model::{AnswerMap, AnswerValue, Form, Question, QuestionType, Response, ResponseItem};
use crate::rules::{NavigationRule, VisibilityRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    InProgress,
    Completed,
    /// Ended early by a navigation rule with the End action.
    Terminated,
}

/// Result of a successful `advance()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step")]
pub enum AdvanceOutcome {
    /// Moved to another question (next visible or a jump target).
    Next { question_id: String },
    /// No visible questions remain; the session can be submitted.
    Completed,
    /// An End rule fired; the session cannot be submitted.
    Terminated,
}

/// Timing and change bookkeeping for one question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct QuestionProgress {
    /// Accumulated milliseconds spent on the question, across visits.
    elapsed_ms: u64,
    /// Epoch ms when the question last became current; None while not current.
    #[serde(default)]
    entered_epoch_ms: Option<u64>,
    /// Times the answer was overwritten before the respondent moved on.
    changes: u32,
}

impl QuestionProgress {
    fn enter(&mut self) {
        if self.entered_epoch_ms.is_none() {
            self.entered_epoch_ms = Some(now_ms());
        }
    }

    fn freeze(&mut self) {
        if let Some(entered) = self.entered_epoch_ms.take() {
            self.elapsed_ms += now_ms().saturating_sub(entered);
        }
    }
}

/// One respondent's traversal of a form.
///
/// Strictly sequential: exactly one in-flight interaction drives a session
/// at a time, so there is no internal locking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEngine {
    form: Form,
    visibility_rules: Vec<VisibilityRule>,
    navigation_rules: Vec<NavigationRule>,
    /// Opaque completion-identity key (client address or user id).
    identity: String,
    #[serde(default)]
    user_agent: Option<String>,
    state: SessionState,
    /// Current question id; None once Completed/Terminated.
    current: Option<String>,
    answers: AnswerMap,
    progress: HashMap<String, QuestionProgress>,
    /// Questions actually visited, for retreat. A stack, not form order,
    /// since navigation rules can skip.
    history: Vec<String>,
    started_at: DateTime<Utc>,
    submitted: bool,
}

impl SessionEngine {
    /// Start a session at the first visible question.
    ///
    /// # Errors
    /// `ValidationError::EmptyForm` if no question is initially visible.
    pub fn new(
        form: Form,
        visibility_rules: Vec<VisibilityRule>,
        navigation_rules: Vec<NavigationRule>,
        identity: impl Into<String>,
    ) -> Result<Self> {
        let first = resolve_visible(&form.questions, &visibility_rules, &AnswerMap::new())
            .first()
            .map(|q| q.id.clone())
            .ok_or(ValidationError::EmptyForm)?;

        let mut session = Self {
            form,
            visibility_rules,
            navigation_rules,
            identity: identity.into(),
            user_agent: None,
            state: SessionState::InProgress,
            current: Some(first.clone()),
            answers: AnswerMap::new(),
            progress: HashMap::new(),
            history: Vec::new(),
            started_at: Utc::now(),
            submitted: false,
        };
        session.progress.entry(first).or_default().enter();
        Ok(session)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn current_question(&self) -> Option<&Question> {
        let id = self.current.as_deref()?;
        self.form.question(id)
    }

    /// The ordered question list currently shown, given the answers so far.
    pub fn visible_questions(&self) -> Vec<&Question> {
        resolve_visible(&self.form.questions, &self.visibility_rules, &self.answers)
    }

    /// Change count recorded so far for a question.
    pub fn change_count(&self, question_id: &str) -> u32 {
        self.progress
            .get(question_id)
            .map(|p| p.changes)
            .unwrap_or(0)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Record (or overwrite) the answer for a question.
    ///
    /// Overwriting increments the question's change counter. The elapsed
    /// timer is untouched: time accumulates from when the question became
    /// current until the respondent advances away.
    pub fn answer(&mut self, question_id: &str, value: AnswerValue) -> Result<()> {
        if self.state != SessionState::InProgress {
            return Err(ValidationError::SessionClosed.into());
        }
        let question = self
            .form
            .question(question_id)
            .ok_or_else(|| NotFoundError::Question(question_id.to_string()))?;
        check_answer_type(question, &value)?;

        let progress = self.progress.entry(question_id.to_string()).or_default();
        if self.answers.contains_key(question_id) {
            progress.changes += 1;
        }
        self.answers.insert(question_id.to_string(), value);
        Ok(())
    }

    /// Move past the current question.
    ///
    /// Rejected while the current question is required and has no
    /// substantive answer. Otherwise the navigation rules decide: jump,
    /// end, or continue to the next visible question (Completed if none).
    pub fn advance(&mut self) -> Result<AdvanceOutcome> {
        if self.state != SessionState::InProgress {
            return Err(ValidationError::SessionClosed.into());
        }
        let current_id = match self.current.clone() {
            Some(id) => id,
            None => return Err(ValidationError::SessionClosed.into()),
        };

        if let Some(question) = self.form.question(&current_id) {
            let answered = self
                .answers
                .get(&current_id)
                .map(AnswerValue::is_substantive)
                .unwrap_or(false);
            if question.required && !answered {
                return Err(CoreError::Validation(ValidationError::RequiredUnanswered {
                    question_id: question.id.clone(),
                    title: question.title.clone(),
                }));
            }
        }

        if let Some(p) = self.progress.get_mut(&current_id) {
            p.freeze();
        }

        let outcome = resolve_navigation(
            &current_id,
            &self.navigation_rules,
            &self.answers,
            &self.form.questions,
        );
        match outcome {
            NavigationOutcome::End => {
                self.state = SessionState::Terminated;
                self.current = None;
                Ok(AdvanceOutcome::Terminated)
            }
            NavigationOutcome::Jump { target } => {
                self.move_to(current_id, target.clone());
                Ok(AdvanceOutcome::Next {
                    question_id: target,
                })
            }
            NavigationOutcome::Continue => {
                let next = next_visible_after(
                    &self.form.questions,
                    &self.visibility_rules,
                    &self.answers,
                    &current_id,
                )
                .map(|q| q.id.clone());
                match next {
                    Some(id) => {
                        self.move_to(current_id, id.clone());
                        Ok(AdvanceOutcome::Next { question_id: id })
                    }
                    None => {
                        self.state = SessionState::Completed;
                        self.current = None;
                        Ok(AdvanceOutcome::Completed)
                    }
                }
            }
        }
    }

    /// Step back to the previously visited question.
    ///
    /// Its answer and change count are preserved and its timer resumes
    /// accumulating. Returns the re-entered question id, or None at the
    /// start of the history.
    pub fn retreat(&mut self) -> Option<String> {
        if self.state != SessionState::InProgress {
            return None;
        }
        let previous = self.history.pop()?;
        if let Some(id) = self.current.take() {
            if let Some(p) = self.progress.get_mut(&id) {
                p.freeze();
            }
        }
        self.progress.entry(previous.clone()).or_default().enter();
        self.current = Some(previous.clone());
        Some(previous)
    }

    /// Package the session into a [`Response`] and latch the one-shot
    /// submit flag. Only from `Completed`.
    ///
    /// # Errors
    /// `AlreadySubmitted` on a second call; `NotCompleted` from any other
    /// state (including `Terminated`).
    pub fn submit(&mut self) -> Result<Response> {
        let response = self.build_response()?;
        self.mark_submitted();
        Ok(response)
    }

    /// Package the session into a [`Response`] without latching.
    ///
    /// For callers that persist the response themselves: call this, write
    /// the payload to the store, and call [`mark_submitted`] only once the
    /// store accepted it. A failed write leaves the session retryable.
    ///
    /// [`mark_submitted`]: Self::mark_submitted
    pub fn build_response(&mut self) -> Result<Response> {
        if self.submitted {
            return Err(ValidationError::AlreadySubmitted.into());
        }
        if self.state != SessionState::Completed {
            return Err(ValidationError::NotCompleted.into());
        }

        for p in self.progress.values_mut() {
            p.freeze();
        }

        let items = self
            .form
            .ordered_questions()
            .into_iter()
            .filter_map(|q| {
                let value = self.answers.get(&q.id)?.clone();
                let progress = self.progress.get(&q.id);
                Some(ResponseItem {
                    question_id: q.id.clone(),
                    value,
                    time_spent_secs: progress.map(|p| p.elapsed_ms / 1000).unwrap_or(0),
                    change_count: progress.map(|p| p.changes).unwrap_or(0),
                })
            })
            .collect();

        let now = Utc::now();
        let total_secs = (now - self.started_at).num_seconds().max(0) as u64;

        Ok(Response {
            id: uuid::Uuid::new_v4().to_string(),
            form_id: self.form.id.clone(),
            identity: self.identity.clone(),
            user_agent: self.user_agent.clone(),
            total_secs,
            submitted_at: now,
            items,
        })
    }

    /// Latch the one-shot submit flag. Call after the store accepted the
    /// response built by [`build_response`].
    ///
    /// [`build_response`]: Self::build_response
    pub fn mark_submitted(&mut self) {
        self.submitted = true;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn move_to(&mut self, from: String, to: String) {
        self.history.push(from);
        self.progress.entry(to.clone()).or_default().enter();
        self.current = Some(to);
    }
}

fn check_answer_type(question: &Question, value: &AnswerValue) -> Result<()> {
    match (question.question_type, value) {
        (QuestionType::Text, AnswerValue::Text { .. }) => Ok(()),
        (QuestionType::SingleChoice, AnswerValue::Choice { choice_id, .. }) => {
            if question.choice(choice_id).is_some() {
                Ok(())
            } else {
                Err(CoreError::Validation(ValidationError::UnknownChoice {
                    question_id: question.id.clone(),
                    choice_id: choice_id.clone(),
                }))
            }
        }
        (QuestionType::Rating, AnswerValue::Rating { value }) => {
            let scale = question.rating.clone().unwrap_or_default();
            if scale.contains(*value) {
                Ok(())
            } else {
                Err(CoreError::Validation(ValidationError::RatingOutOfRange {
                    question_id: question.id.clone(),
                    value: *value,
                    min: scale.min,
                    max: scale.max,
                }))
            }
        }
        _ => Err(CoreError::Validation(ValidationError::AnswerTypeMismatch {
            question_id: question.id.clone(),
            expected: question.question_type.as_str().to_string(),
        })),
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
