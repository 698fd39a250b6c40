//! SQLite-backed form and response storage.
//!
//! Owner-side CRUD for forms/questions/choices/rules plus the append-only
//! response store. Deleting a question cascades its choices and response
//! items. Rules carry no foreign key to questions: owner deletes leave
//! dangling rule rows, which the resolvers skip.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::DatabaseError;
use crate::model::{Choice, Form, Question, QuestionType, RatingScale, Response, ResponseItem};
use crate::rules::{ConditionOperator, NavigationAction, NavigationRule, VisibilityRule};

use super::{FormStore, ResponseStore};

/// One row of `list_forms`: form header plus its response count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub response_count: u64,
}

/// SQLite database for forms, rules, and responses.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at the default location (`<data_dir>/pollify.db`).
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_default() -> Result<Self, DatabaseError> {
        let path = super::data_dir()
            .map_err(|e| DatabaseError::QueryFailed(format!("data dir: {e}")))?
            .join("pollify.db");
        Self::open(&path)
    }

    /// Open the database at `path`, creating the schema if needed.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database. For tests.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                r#"
                PRAGMA foreign_keys = ON;

                CREATE TABLE IF NOT EXISTS forms (
                    id          TEXT PRIMARY KEY,
                    title       TEXT NOT NULL,
                    description TEXT,
                    is_public   INTEGER NOT NULL DEFAULT 1
                );

                CREATE TABLE IF NOT EXISTS questions (
                    id            TEXT PRIMARY KEY,
                    form_id       TEXT NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
                    title         TEXT NOT NULL,
                    question_type TEXT NOT NULL,
                    required      INTEGER NOT NULL DEFAULT 0,
                    ord           INTEGER NOT NULL,
                    rating_min    INTEGER,
                    rating_max    INTEGER,
                    rating_labels TEXT,
                    UNIQUE(form_id, ord)
                );

                CREATE TABLE IF NOT EXISTS choices (
                    id          TEXT PRIMARY KEY,
                    question_id TEXT NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
                    label       TEXT NOT NULL,
                    value       TEXT NOT NULL,
                    ord         INTEGER NOT NULL
                );

                -- depends_on/subject/target have no FK: deleting a question
                -- leaves dangling rules, which the resolvers treat as
                -- non-matching.
                CREATE TABLE IF NOT EXISTS visibility_rules (
                    id                TEXT PRIMARY KEY,
                    form_id           TEXT NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
                    depends_on        TEXT NOT NULL,
                    operator          TEXT NOT NULL,
                    value             TEXT NOT NULL,
                    subject           TEXT NOT NULL,
                    show_when_matched INTEGER NOT NULL,
                    ord               INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS navigation_rules (
                    id            TEXT PRIMARY KEY,
                    form_id       TEXT NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
                    depends_on    TEXT NOT NULL,
                    operator      TEXT NOT NULL,
                    value         TEXT NOT NULL,
                    from_question TEXT NOT NULL,
                    action        TEXT NOT NULL,
                    target        TEXT,
                    ord           INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS responses (
                    id           TEXT PRIMARY KEY,
                    form_id      TEXT NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
                    identity     TEXT NOT NULL,
                    user_agent   TEXT,
                    total_secs   INTEGER NOT NULL,
                    submitted_at TEXT NOT NULL,
                    UNIQUE(form_id, identity)
                );

                CREATE TABLE IF NOT EXISTS response_items (
                    id              INTEGER PRIMARY KEY AUTOINCREMENT,
                    response_id     TEXT NOT NULL REFERENCES responses(id) ON DELETE CASCADE,
                    question_id     TEXT NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
                    value_json      TEXT NOT NULL,
                    time_spent_secs INTEGER NOT NULL,
                    change_count    INTEGER NOT NULL
                );
                "#,
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    // ── Owner-side CRUD ──────────────────────────────────────────────

    /// Insert a form with its questions and choices.
    pub fn insert_form(&self, form: &Form) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO forms (id, title, description, is_public) VALUES (?1, ?2, ?3, ?4)",
            params![form.id, form.title, form.description, form.is_public],
        )?;
        for question in &form.questions {
            insert_question_tx(&tx, &form.id, question)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Delete a form; cascades questions, choices, rules, and responses.
    pub fn delete_form(&self, form_id: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM forms WHERE id = ?1", params![form_id])?;
        Ok(())
    }

    pub fn insert_question(&self, form_id: &str, question: &Question) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        insert_question_tx(&tx, form_id, question)?;
        tx.commit()?;
        Ok(())
    }

    /// Delete a question; cascades choices and response items. Rules that
    /// referenced it stay behind as dangling rows.
    pub fn delete_question(&self, question_id: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM questions WHERE id = ?1", params![question_id])?;
        Ok(())
    }

    pub fn insert_choice(&self, question_id: &str, choice: &Choice) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO choices (id, question_id, label, value, ord)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![choice.id, question_id, choice.label, choice.value, choice.order],
        )?;
        Ok(())
    }

    pub fn delete_choice(&self, choice_id: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM choices WHERE id = ?1", params![choice_id])?;
        Ok(())
    }

    pub fn insert_visibility_rule(
        &self,
        form_id: &str,
        rule: &VisibilityRule,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO visibility_rules
             (id, form_id, depends_on, operator, value, subject, show_when_matched, ord)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                rule.id,
                form_id,
                rule.depends_on,
                operator_str(rule.operator),
                rule.value,
                rule.subject,
                rule.show_when_matched,
                rule.order
            ],
        )?;
        Ok(())
    }

    pub fn delete_visibility_rule(&self, rule_id: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "DELETE FROM visibility_rules WHERE id = ?1",
            params![rule_id],
        )?;
        Ok(())
    }

    pub fn insert_navigation_rule(
        &self,
        form_id: &str,
        rule: &NavigationRule,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO navigation_rules
             (id, form_id, depends_on, operator, value, from_question, action, target, ord)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                rule.id,
                form_id,
                rule.depends_on,
                operator_str(rule.operator),
                rule.value,
                rule.from,
                action_str(rule.action),
                rule.target,
                rule.order
            ],
        )?;
        Ok(())
    }

    pub fn delete_navigation_rule(&self, rule_id: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "DELETE FROM navigation_rules WHERE id = ?1",
            params![rule_id],
        )?;
        Ok(())
    }

    /// All forms with their response counts, newest insert last.
    pub fn list_forms(&self) -> Result<Vec<FormSummary>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT f.id, f.title, f.description, f.is_public,
                    (SELECT COUNT(*) FROM responses r WHERE r.form_id = f.id)
             FROM forms f",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FormSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                is_public: row.get(3)?,
                response_count: row.get(4)?,
            })
        })?;
        let mut forms = Vec::new();
        for row in rows {
            forms.push(row?);
        }
        Ok(forms)
    }
}

fn insert_question_tx(
    tx: &rusqlite::Transaction<'_>,
    form_id: &str,
    question: &Question,
) -> Result<(), DatabaseError> {
    let (rating_min, rating_max, rating_labels) = match &question.rating {
        Some(scale) => (
            Some(scale.min),
            Some(scale.max),
            Some(
                serde_json::to_string(&scale.labels)
                    .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?,
            ),
        ),
        None => (None, None, None),
    };
    tx.execute(
        "INSERT INTO questions
         (id, form_id, title, question_type, required, ord, rating_min, rating_max, rating_labels)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            question.id,
            form_id,
            question.title,
            question.question_type.as_str(),
            question.required,
            question.order,
            rating_min,
            rating_max,
            rating_labels
        ],
    )?;
    for choice in &question.choices {
        tx.execute(
            "INSERT INTO choices (id, question_id, label, value, ord)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![choice.id, question.id, choice.label, choice.value, choice.order],
        )?;
    }
    Ok(())
}

impl FormStore for Database {
    fn form(&self, form_id: &str) -> Result<Option<Form>, DatabaseError> {
        let header = self
            .conn
            .query_row(
                "SELECT id, title, description, is_public FROM forms WHERE id = ?1",
                params![form_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, bool>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, title, description, is_public)) = header else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, title, question_type, required, ord, rating_min, rating_max, rating_labels
             FROM questions WHERE form_id = ?1 ORDER BY ord ASC",
        )?;
        let rows = stmt.query_map(params![form_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<i64>>(5)?,
                row.get::<_, Option<i64>>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut questions = Vec::new();
        for row in rows {
            let (qid, qtitle, qtype, required, order, rating_min, rating_max, rating_labels) =
                row?;
            let rating = match (rating_min, rating_max) {
                (Some(min), Some(max)) => Some(RatingScale {
                    min,
                    max,
                    labels: rating_labels
                        .as_deref()
                        .and_then(|raw| serde_json::from_str(raw).ok())
                        .unwrap_or_default(),
                }),
                _ => None,
            };
            questions.push(Question {
                id: qid,
                title: qtitle,
                question_type: parse_question_type(&qtype)?,
                required,
                order,
                choices: Vec::new(),
                rating,
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.question_id, c.label, c.value, c.ord
             FROM choices c JOIN questions q ON q.id = c.question_id
             WHERE q.form_id = ?1 ORDER BY c.ord ASC",
        )?;
        let rows = stmt.query_map(params![form_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        for row in rows {
            let (cid, question_id, label, value, order) = row?;
            if let Some(q) = questions.iter_mut().find(|q| q.id == question_id) {
                q.choices.push(Choice {
                    id: cid,
                    label,
                    value,
                    order,
                });
            }
        }

        Ok(Some(Form {
            id,
            title,
            description,
            is_public,
            questions,
        }))
    }

    fn visibility_rules(&self, form_id: &str) -> Result<Vec<VisibilityRule>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, depends_on, operator, value, subject, show_when_matched, ord
             FROM visibility_rules WHERE form_id = ?1 ORDER BY ord ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![form_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;
        let mut rules = Vec::new();
        for row in rows {
            let (id, depends_on, operator, value, subject, show_when_matched, order) = row?;
            rules.push(VisibilityRule {
                id,
                depends_on,
                operator: parse_operator(&operator)?,
                value,
                subject,
                show_when_matched,
                order,
            });
        }
        Ok(rules)
    }

    fn navigation_rules(&self, form_id: &str) -> Result<Vec<NavigationRule>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, depends_on, operator, value, from_question, action, target, ord
             FROM navigation_rules WHERE form_id = ?1 ORDER BY ord ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![form_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?;
        let mut rules = Vec::new();
        for row in rows {
            let (id, depends_on, operator, value, from, action, target, order) = row?;
            rules.push(NavigationRule {
                id,
                depends_on,
                operator: parse_operator(&operator)?,
                value,
                from,
                action: parse_action(&action)?,
                target,
                order,
            });
        }
        Ok(rules)
    }
}

impl ResponseStore for Database {
    fn append_response(&self, response: &Response) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO responses (id, form_id, identity, user_agent, total_secs, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                response.id,
                response.form_id,
                response.identity,
                response.user_agent,
                response.total_secs,
                response.submitted_at.to_rfc3339()
            ],
        )?;
        for item in &response.items {
            let value_json = serde_json::to_string(&item.value)
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            tx.execute(
                "INSERT INTO response_items
                 (response_id, question_id, value_json, time_spent_secs, change_count)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    response.id,
                    item.question_id,
                    value_json,
                    item.time_spent_secs,
                    item.change_count
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn response_exists(&self, form_id: &str, identity: &str) -> Result<bool, DatabaseError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM responses WHERE form_id = ?1 AND identity = ?2",
            params![form_id, identity],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn responses_for_form(&self, form_id: &str) -> Result<Vec<Response>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, identity, user_agent, total_secs, submitted_at
             FROM responses WHERE form_id = ?1 ORDER BY submitted_at ASC",
        )?;
        let rows = stmt.query_map(params![form_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut responses = Vec::new();
        for row in rows {
            let (id, identity, user_agent, total_secs, submitted_at) = row?;
            let submitted_at = DateTime::parse_from_rfc3339(&submitted_at)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            responses.push(Response {
                id,
                form_id: form_id.to_string(),
                identity,
                user_agent,
                total_secs,
                submitted_at,
                items: Vec::new(),
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT i.response_id, i.question_id, i.value_json, i.time_spent_secs, i.change_count
             FROM response_items i JOIN responses r ON r.id = i.response_id
             WHERE r.form_id = ?1 ORDER BY i.id ASC",
        )?;
        let rows = stmt.query_map(params![form_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, u32>(4)?,
            ))
        })?;
        for row in rows {
            let (response_id, question_id, value_json, time_spent_secs, change_count) = row?;
            let value = serde_json::from_str(&value_json)
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            if let Some(r) = responses.iter_mut().find(|r| r.id == response_id) {
                r.items.push(ResponseItem {
                    question_id,
                    value,
                    time_spent_secs,
                    change_count,
                });
            }
        }

        Ok(responses)
    }
}

fn operator_str(op: ConditionOperator) -> &'static str {
    match op {
        ConditionOperator::Equals => "equals",
        ConditionOperator::NotEquals => "not_equals",
        ConditionOperator::Contains => "contains",
        ConditionOperator::GreaterThan => "greater_than",
        ConditionOperator::LessThan => "less_than",
    }
}

fn parse_operator(raw: &str) -> Result<ConditionOperator, DatabaseError> {
    match raw {
        "equals" => Ok(ConditionOperator::Equals),
        "not_equals" => Ok(ConditionOperator::NotEquals),
        "contains" => Ok(ConditionOperator::Contains),
        "greater_than" => Ok(ConditionOperator::GreaterThan),
        "less_than" => Ok(ConditionOperator::LessThan),
        _ => Err(DatabaseError::QueryFailed(format!(
            "unknown operator: {raw}"
        ))),
    }
}

fn action_str(action: NavigationAction) -> &'static str {
    match action {
        NavigationAction::GoTo => "go_to",
        NavigationAction::SkipTo => "skip_to",
        NavigationAction::End => "end",
    }
}

fn parse_action(raw: &str) -> Result<NavigationAction, DatabaseError> {
    match raw {
        "go_to" => Ok(NavigationAction::GoTo),
        "skip_to" => Ok(NavigationAction::SkipTo),
        "end" => Ok(NavigationAction::End),
        _ => Err(DatabaseError::QueryFailed(format!("unknown action: {raw}"))),
    }
}

fn parse_question_type(raw: &str) -> Result<QuestionType, DatabaseError> {
    match raw {
        "text" => Ok(QuestionType::Text),
        "single_choice" => Ok(QuestionType::SingleChoice),
        "rating" => Ok(QuestionType::Rating),
        _ => Err(DatabaseError::QueryFailed(format!(
            "unknown question type: {raw}"
        ))),
    }
}
