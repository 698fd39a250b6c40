//! Integration tests for the full fill-and-aggregate workflow.
//!
//! Exercises FlowEngine + SessionEngine + Database end to end: conditional
//! visibility, early termination, duplicate guarding, and metrics.

use std::cell::Cell;

use pollify_core::{
    AnswerValue, Choice, ConditionOperator, CoreError, Database, DatabaseError, FlowEngine, Form,
    FormStore, NavigationAction, NavigationRule, NextStep, Question, QuestionType, RatingScale,
    Response, ResponseStore, SessionState, ValidationError, VisibilityRule,
};

fn csat_form() -> Form {
    Form {
        id: "csat".into(),
        title: "Customer Satisfaction Survey".into(),
        description: Some("Quick CSAT survey".into()),
        is_public: true,
        questions: vec![
            Question {
                id: "q-satisfied".into(),
                title: "Are you satisfied?".into(),
                question_type: QuestionType::SingleChoice,
                required: true,
                order: 1,
                choices: vec![
                    Choice {
                        id: "c-yes".into(),
                        label: "Yes".into(),
                        value: "Yes".into(),
                        order: 1,
                    },
                    Choice {
                        id: "c-no".into(),
                        label: "No".into(),
                        value: "No".into(),
                        order: 2,
                    },
                ],
                rating: None,
            },
            Question {
                id: "q-why".into(),
                title: "What went wrong?".into(),
                question_type: QuestionType::Text,
                required: false,
                order: 2,
                choices: Vec::new(),
                rating: None,
            },
            Question {
                id: "q-score".into(),
                title: "Overall score".into(),
                question_type: QuestionType::Rating,
                required: false,
                order: 3,
                choices: Vec::new(),
                rating: Some(RatingScale {
                    min: 1,
                    max: 5,
                    labels: Vec::new(),
                }),
            },
        ],
    }
}

fn setup() -> Database {
    let db = Database::open_memory().unwrap();
    db.insert_form(&csat_form()).unwrap();
    // "What went wrong?" only shows after a "No".
    db.insert_visibility_rule(
        "csat",
        &VisibilityRule {
            id: "v-why".into(),
            depends_on: "q-satisfied".into(),
            operator: ConditionOperator::Equals,
            value: "No".into(),
            subject: "q-why".into(),
            show_when_matched: true,
            order: 1,
        },
    )
    .unwrap();
    db
}

#[test]
fn satisfied_path_skips_the_why_question() {
    let db = setup();
    let engine = FlowEngine::new(&db);

    let mut session = engine.start_session("csat", "respondent-1").unwrap();
    assert_eq!(session.current_question().unwrap().id, "q-satisfied");
    // Before the trigger is answered, the rule's polarity hides nothing:
    // show_when_matched=true means "shown by default".
    assert_eq!(session.visible_questions().len(), 3);

    session
        .answer("q-satisfied", AnswerValue::choice("c-yes", "Yes"))
        .unwrap();
    let visible: Vec<_> = session
        .visible_questions()
        .iter()
        .map(|q| q.id.clone())
        .collect();
    assert_eq!(visible, vec!["q-satisfied", "q-score"]);

    session.advance().unwrap();
    assert_eq!(session.current_question().unwrap().id, "q-score");
    session.answer("q-score", AnswerValue::rating(5)).unwrap();
    session.advance().unwrap();
    assert_eq!(session.state(), SessionState::Completed);

    let response = engine.submit_session(&mut session).unwrap();
    assert_eq!(response.items.len(), 2);
    assert!(db.response_exists("csat", "respondent-1").unwrap());
}

#[test]
fn unsatisfied_path_includes_the_why_question() {
    let db = setup();
    let engine = FlowEngine::new(&db);

    let mut session = engine.start_session("csat", "respondent-2").unwrap();
    session
        .answer("q-satisfied", AnswerValue::choice("c-no", "No"))
        .unwrap();
    session.advance().unwrap();
    assert_eq!(session.current_question().unwrap().id, "q-why");
}

#[test]
fn end_rule_terminates_before_completion() {
    let db = setup();
    db.insert_navigation_rule(
        "csat",
        &NavigationRule {
            id: "n-end".into(),
            depends_on: "q-satisfied".into(),
            operator: ConditionOperator::Equals,
            value: "No".into(),
            from: "q-satisfied".into(),
            action: NavigationAction::End,
            target: None,
            order: 1,
        },
    )
    .unwrap();
    let engine = FlowEngine::new(&db);

    let mut session = engine.start_session("csat", "respondent-3").unwrap();
    session
        .answer("q-satisfied", AnswerValue::choice("c-no", "No"))
        .unwrap();
    session.advance().unwrap();
    assert_eq!(session.state(), SessionState::Terminated);

    // Terminated sessions never reach Completed, so submit is rejected.
    let err = engine.submit_session(&mut session);
    assert!(matches!(
        err,
        Err(CoreError::Validation(ValidationError::NotCompleted))
    ));
    assert!(!db.response_exists("csat", "respondent-3").unwrap());
}

#[test]
fn next_step_boundary_matches_session_behavior() {
    let db = setup();
    let engine = FlowEngine::new(&db);

    let mut answers = pollify_core::AnswerMap::new();
    answers.insert("q-satisfied".into(), AnswerValue::choice("c-yes", "Yes"));
    match engine.next_step("csat", "q-satisfied", &answers).unwrap() {
        NextStep::Question(q) => assert_eq!(q.id, "q-score"),
        other => panic!("expected a question, got {other:?}"),
    }

    answers.insert("q-score".into(), AnswerValue::rating(4));
    assert_eq!(
        engine.next_step("csat", "q-score", &answers).unwrap(),
        NextStep::Completed
    );

    assert!(matches!(
        engine.next_step("missing", "q-satisfied", &answers),
        Err(CoreError::NotFound(_))
    ));
}

#[test]
fn duplicate_identity_is_rejected_at_start_and_at_submit() {
    let db = setup();
    let engine = FlowEngine::new(&db);

    let mut first = engine.start_session("csat", "dup").unwrap();
    first
        .answer("q-satisfied", AnswerValue::choice("c-yes", "Yes"))
        .unwrap();
    first.advance().unwrap();
    first.advance().unwrap();
    engine.submit_session(&mut first).unwrap();

    // Fast path: a new session for the same identity is refused.
    assert!(matches!(
        engine.start_session("csat", "dup"),
        Err(CoreError::Validation(ValidationError::AlreadyResponded))
    ));

    // Authoritative path: a racing session that slipped past the fast path
    // still hits the store's uniqueness constraint.
    let mut racing =
        pollify_core::SessionEngine::new(csat_form(), Vec::new(), Vec::new(), "dup").unwrap();
    racing
        .answer("q-satisfied", AnswerValue::choice("c-yes", "Yes"))
        .unwrap();
    racing.advance().unwrap();
    racing.advance().unwrap();
    racing.advance().unwrap();
    assert!(matches!(
        engine.submit_session(&mut racing),
        Err(CoreError::Validation(ValidationError::AlreadyResponded))
    ));
}

/// Database wrapper whose next `append_response` fails with Locked.
struct FlakyStore {
    inner: Database,
    fail_next_append: Cell<bool>,
}

impl FormStore for FlakyStore {
    fn form(&self, form_id: &str) -> Result<Option<Form>, DatabaseError> {
        self.inner.form(form_id)
    }

    fn visibility_rules(&self, form_id: &str) -> Result<Vec<VisibilityRule>, DatabaseError> {
        self.inner.visibility_rules(form_id)
    }

    fn navigation_rules(&self, form_id: &str) -> Result<Vec<NavigationRule>, DatabaseError> {
        self.inner.navigation_rules(form_id)
    }
}

impl ResponseStore for FlakyStore {
    fn append_response(&self, response: &Response) -> Result<(), DatabaseError> {
        if self.fail_next_append.take() {
            return Err(DatabaseError::Locked);
        }
        self.inner.append_response(response)
    }

    fn response_exists(&self, form_id: &str, identity: &str) -> Result<bool, DatabaseError> {
        self.inner.response_exists(form_id, identity)
    }

    fn responses_for_form(&self, form_id: &str) -> Result<Vec<Response>, DatabaseError> {
        self.inner.responses_for_form(form_id)
    }
}

#[test]
fn transient_store_failure_leaves_session_retryable() {
    let store = FlakyStore {
        inner: setup(),
        fail_next_append: Cell::new(true),
    };
    let engine = FlowEngine::new(&store);

    let mut session = engine.start_session("csat", "retrier").unwrap();
    session
        .answer("q-satisfied", AnswerValue::choice("c-yes", "Yes"))
        .unwrap();
    session.advance().unwrap();
    session.advance().unwrap();
    assert_eq!(session.state(), SessionState::Completed);

    // The failed write surfaces and nothing is persisted.
    assert!(matches!(
        engine.submit_session(&mut session),
        Err(CoreError::Database(DatabaseError::Locked))
    ));
    assert!(!store.inner.response_exists("csat", "retrier").unwrap());

    // The session was not consumed; a retry persists the response.
    let response = engine.submit_session(&mut session).unwrap();
    assert_eq!(response.identity, "retrier");
    assert!(store.inner.response_exists("csat", "retrier").unwrap());

    // The one-shot rule still holds after the successful write.
    assert!(matches!(
        engine.submit_session(&mut session),
        Err(CoreError::Validation(ValidationError::AlreadySubmitted))
    ));
}

#[test]
fn non_public_form_reads_as_not_found() {
    let db = Database::open_memory().unwrap();
    let mut form = csat_form();
    form.is_public = false;
    db.insert_form(&form).unwrap();

    let engine = FlowEngine::new(&db);
    assert!(matches!(
        engine.start_session("csat", "someone"),
        Err(CoreError::NotFound(_))
    ));
}

#[test]
fn metrics_over_submitted_responses() {
    let db = setup();
    let engine = FlowEngine::new(&db);

    for (identity, choice, score) in [
        ("a", ("c-yes", "Yes"), Some(5)),
        ("b", ("c-yes", "Yes"), Some(3)),
        ("c", ("c-yes", "Yes"), None),
    ] {
        let mut session = engine.start_session("csat", identity).unwrap();
        session
            .answer("q-satisfied", AnswerValue::choice(choice.0, choice.1))
            .unwrap();
        session.advance().unwrap();
        if let Some(score) = score {
            session.answer("q-score", AnswerValue::rating(score)).unwrap();
        }
        session.advance().unwrap();
        engine.submit_session(&mut session).unwrap();
    }

    let metrics = engine.metrics("csat").unwrap();
    assert_eq!(metrics.len(), 3);

    let satisfied = &metrics["q-satisfied"];
    assert_eq!(satisfied.answer_count, 3);
    assert_eq!(satisfied.completion_rate_pct, 100.0);

    let score = &metrics["q-score"];
    assert_eq!(score.answer_count, 2);
    assert!((score.completion_rate_pct - 200.0 / 3.0).abs() < 1e-9);

    // Nobody saw the "why" question.
    let why = &metrics["q-why"];
    assert_eq!(why.answer_count, 0);
    assert_eq!(why.completion_rate_pct, 0.0);
    assert_eq!(why.avg_time_secs, 0.0);
}

#[test]
fn owner_deleting_a_question_mid_flight_degrades_gracefully() {
    let db = setup();
    let engine = FlowEngine::new(&db);

    // The session snapshot still holds q-why and its rule.
    let mut session = engine.start_session("csat", "survivor").unwrap();

    // Owner deletes the trigger question; the stored rule now dangles.
    db.delete_question("q-satisfied").unwrap();

    // A fresh read of the graph ignores the dangling rule: q-why is simply
    // visible for everyone.
    let visible = engine
        .visible_questions("csat", &pollify_core::AnswerMap::new())
        .unwrap();
    let ids: Vec<_> = visible.iter().map(|q| q.id.clone()).collect();
    assert_eq!(ids, vec!["q-why", "q-score"]);

    // The in-flight session is unaffected by the edit.
    session
        .answer("q-satisfied", AnswerValue::choice("c-yes", "Yes"))
        .unwrap();
    session.advance().unwrap();
    assert_eq!(session.state(), SessionState::InProgress);
}
