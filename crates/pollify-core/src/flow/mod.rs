//! Flow resolution: visibility, navigation, and the boundary facade the
//! rest of the system calls.

pub mod navigation;
pub mod visibility;

pub use navigation::{resolve_navigation, NavigationOutcome};
pub use visibility::{next_visible_after, resolve_visible};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{NotFoundError, Result, ValidationError};
use crate::metrics::{MetricsAggregator, QuestionMetrics};
use crate::model::{AnswerMap, Form, Question, Response};
use crate::session::SessionEngine;
use crate::storage::{FormStore, ResponseStore};

/// Concrete next-step decision for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step")]
pub enum NextStep {
    /// Present this question next.
    Question(Question),
    /// No visible questions remain.
    Completed,
    /// An End rule fired.
    Ended,
}

/// Boundary facade over the stores.
///
/// Each call loads a fresh snapshot of the form/rule graph, so owner edits
/// are picked up between calls but never observed mid-computation.
pub struct FlowEngine<'a, S> {
    store: &'a S,
}

impl<'a, S: FormStore + ResponseStore> FlowEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn load_form(&self, form_id: &str) -> Result<Form> {
        self.store
            .form(form_id)?
            .ok_or_else(|| NotFoundError::Form(form_id.to_string()).into())
    }

    /// Ordered visible question list for rendering.
    pub fn visible_questions(
        &self,
        form_id: &str,
        answers: &AnswerMap,
    ) -> Result<Vec<Question>> {
        let form = self.load_form(form_id)?;
        let rules = self.store.visibility_rules(form_id)?;
        Ok(resolve_visible(&form.questions, &rules, answers)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Next-step decision after answering `from`.
    pub fn next_step(
        &self,
        form_id: &str,
        from: &str,
        answers: &AnswerMap,
    ) -> Result<NextStep> {
        let form = self.load_form(form_id)?;
        if form.question(from).is_none() {
            return Err(NotFoundError::Question(from.to_string()).into());
        }
        let nav_rules = self.store.navigation_rules(form_id)?;
        let vis_rules = self.store.visibility_rules(form_id)?;

        match resolve_navigation(from, &nav_rules, answers, &form.questions) {
            NavigationOutcome::End => Ok(NextStep::Ended),
            NavigationOutcome::Jump { target } => match form.question(&target) {
                Some(q) => Ok(NextStep::Question(q.clone())),
                // Target validated in resolve_navigation; if it raced
                // away, fall through to completion.
                None => Ok(NextStep::Completed),
            },
            NavigationOutcome::Continue => {
                Ok(
                    match next_visible_after(&form.questions, &vis_rules, answers, from) {
                        Some(q) => NextStep::Question(q.clone()),
                        None => NextStep::Completed,
                    },
                )
            }
        }
    }

    /// Start a fill session against a snapshot of the form and rules.
    ///
    /// Non-public forms are indistinguishable from absent ones. The
    /// already-responded check here is a fast path; the store's uniqueness
    /// constraint remains authoritative at submit time.
    pub fn start_session(&self, form_id: &str, identity: &str) -> Result<SessionEngine> {
        let form = self.load_form(form_id)?;
        if !form.is_public {
            return Err(NotFoundError::Form(form_id.to_string()).into());
        }
        if self.store.response_exists(form_id, identity)? {
            return Err(ValidationError::AlreadyResponded.into());
        }
        let vis_rules = self.store.visibility_rules(form_id)?;
        let nav_rules = self.store.navigation_rules(form_id)?;
        SessionEngine::new(form, vis_rules, nav_rules, identity)
    }

    /// Submit a completed session, persisting the response.
    ///
    /// The session's one-shot latch is set only once the store accepted
    /// the write (or rejected it as a duplicate), so a transient store
    /// failure leaves the session retryable.
    pub fn submit_session(&self, session: &mut SessionEngine) -> Result<Response> {
        let response = session.build_response()?;
        match self.store.append_response(&response) {
            Ok(()) => {
                session.mark_submitted();
                Ok(response)
            }
            Err(crate::error::DatabaseError::Duplicate) => {
                session.mark_submitted();
                Err(ValidationError::AlreadyResponded.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Per-question behavioral metrics over all responses of a form.
    pub fn metrics(&self, form_id: &str) -> Result<HashMap<String, QuestionMetrics>> {
        let form = self.load_form(form_id)?;
        let responses = self.store.responses_for_form(form_id)?;
        Ok(MetricsAggregator::new().aggregate(&form.questions, &responses))
    }
}
