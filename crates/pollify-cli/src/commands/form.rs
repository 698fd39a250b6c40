use clap::Subcommand;
use serde::Deserialize;

use pollify_core::storage::FormStore;
use pollify_core::{
    Choice, ConditionOperator, Form, NavigationAction, NavigationRule, Question, QuestionType,
    VisibilityRule,
};

use crate::common;

#[derive(Subcommand)]
pub enum FormAction {
    /// List forms with response counts
    List,
    /// Show a form with its questions and rules
    Show { form_id: String },
    /// Import a form (with optional rules) from a JSON file
    Import { path: std::path::PathBuf },
    /// Delete a form and everything under it
    Delete { form_id: String },
    /// Create the demo CSAT form
    SeedDemo,
}

/// On-disk import format: the form plus its rule sets.
#[derive(Deserialize)]
struct FormFile {
    form: Form,
    #[serde(default)]
    visibility_rules: Vec<VisibilityRule>,
    #[serde(default)]
    navigation_rules: Vec<NavigationRule>,
}

pub fn run(action: FormAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = common::open_database()?;

    match action {
        FormAction::List => {
            let forms = db.list_forms()?;
            println!("{}", serde_json::to_string_pretty(&forms)?);
        }
        FormAction::Show { form_id } => {
            let Some(form) = db.form(&form_id)? else {
                return Err(format!("form not found: {form_id}").into());
            };
            let payload = serde_json::json!({
                "form": form,
                "visibility_rules": db.visibility_rules(&form_id)?,
                "navigation_rules": db.navigation_rules(&form_id)?,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        FormAction::Import { path } => {
            let raw = std::fs::read_to_string(&path)?;
            let file: FormFile = serde_json::from_str(&raw)?;
            let form_id = file.form.id.clone();
            db.insert_form(&file.form)?;
            for rule in &file.visibility_rules {
                db.insert_visibility_rule(&form_id, rule)?;
            }
            for rule in &file.navigation_rules {
                db.insert_navigation_rule(&form_id, rule)?;
            }
            println!("Imported form {form_id}");
        }
        FormAction::Delete { form_id } => {
            db.delete_form(&form_id)?;
            println!("Deleted form {form_id}");
        }
        FormAction::SeedDemo => {
            let form = demo_form();
            db.insert_form(&form)?;
            // Comments only for unhappy respondents (score below 4).
            db.insert_visibility_rule(
                &form.id,
                &VisibilityRule {
                    id: "csat-v-comments".into(),
                    depends_on: "csat-q-satisfaction".into(),
                    operator: ConditionOperator::LessThan,
                    value: "4".into(),
                    subject: "csat-q-comments".into(),
                    show_when_matched: true,
                    order: 1,
                },
            )?;
            // Perfectly happy respondents are done after the first question.
            db.insert_navigation_rule(
                &form.id,
                &NavigationRule {
                    id: "csat-n-happy".into(),
                    depends_on: "csat-q-satisfaction".into(),
                    operator: ConditionOperator::Equals,
                    value: "5".into(),
                    from: "csat-q-satisfaction".into(),
                    action: NavigationAction::End,
                    target: None,
                    order: 1,
                },
            )?;
            println!("Seeded form {}", form.id);
        }
    }
    Ok(())
}

fn demo_form() -> Form {
    let labels = [
        ("Very satisfied", "5"),
        ("Satisfied", "4"),
        ("Neutral", "3"),
        ("Dissatisfied", "2"),
        ("Very dissatisfied", "1"),
    ];
    Form {
        id: "csat-demo".into(),
        title: "Customer Satisfaction Survey".into(),
        description: Some("Quick CSAT survey".into()),
        is_public: true,
        questions: vec![
            Question {
                id: "csat-q-satisfaction".into(),
                title: "How satisfied are you?".into(),
                question_type: QuestionType::SingleChoice,
                required: true,
                order: 1,
                choices: labels
                    .iter()
                    .enumerate()
                    .map(|(i, (label, value))| Choice {
                        id: format!("csat-c-{value}"),
                        label: (*label).into(),
                        value: (*value).into(),
                        order: i as i64 + 1,
                    })
                    .collect(),
                rating: None,
            },
            Question {
                id: "csat-q-comments".into(),
                title: "Any comments?".into(),
                question_type: QuestionType::Text,
                required: false,
                order: 2,
                choices: Vec::new(),
                rating: None,
            },
        ],
    }
}
