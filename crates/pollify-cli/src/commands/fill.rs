//! Interactive fill session on stdin/stdout.

use std::io::{self, BufRead, Write};

use pollify_core::{AnswerValue, Config, FlowEngine, Question, QuestionType, SessionState};

use crate::common;

pub fn run(form_id: &str, identity: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let db = common::open_database()?;
    let engine = FlowEngine::new(&db);

    let identity = identity
        .or_else(|| Config::load().default_identity)
        .unwrap_or_else(|| "cli".to_string());

    let mut session = engine.start_session(form_id, &identity)?;
    println!("{}", session.form().title);
    if let Some(desc) = &session.form().description {
        println!("{desc}");
    }
    println!("(blank line skips an optional question, :back goes back)\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while session.state() == SessionState::InProgress {
        let Some(question) = session.current_question().cloned() else {
            break;
        };
        prompt(&question);

        let Some(line) = lines.next() else {
            println!("\nInput closed; session abandoned.");
            return Ok(());
        };
        let input = line?.trim().to_string();

        if input == ":back" {
            if session.retreat().is_none() {
                println!("Already at the first question.");
            }
            continue;
        }

        if !input.is_empty() {
            match parse_answer(&question, &input) {
                Some(value) => {
                    if let Err(e) = session.answer(&question.id, value) {
                        println!("{e}");
                        continue;
                    }
                }
                None => {
                    println!("Sorry, that doesn't fit the question. Try again.");
                    continue;
                }
            }
        }

        if let Err(e) = session.advance() {
            println!("{e}");
        }
    }

    match session.state() {
        SessionState::Completed => {
            let response = engine.submit_session(&mut session)?;
            println!("\nThanks! Response {} recorded.", response.id);
        }
        SessionState::Terminated => {
            println!("\nThat's all we needed. Thanks!");
        }
        SessionState::InProgress => {}
    }
    Ok(())
}

fn prompt(question: &Question) {
    let marker = if question.required { " *" } else { "" };
    println!("{}{marker}", question.title);
    match question.question_type {
        QuestionType::Text => {}
        QuestionType::SingleChoice => {
            for (i, choice) in question.choices.iter().enumerate() {
                println!("  {}. {}", i + 1, choice.label);
            }
        }
        QuestionType::Rating => {
            let scale = question.rating.clone().unwrap_or_default();
            println!("  ({}..{})", scale.min, scale.max);
        }
    }
    print!("> ");
    let _ = io::stdout().flush();
}

fn parse_answer(question: &Question, input: &str) -> Option<AnswerValue> {
    match question.question_type {
        QuestionType::Text => Some(AnswerValue::text(input)),
        QuestionType::SingleChoice => {
            let index: usize = input.parse().ok()?;
            let choice = question.choices.get(index.checked_sub(1)?)?;
            Some(AnswerValue::choice(choice.id.clone(), choice.value.clone()))
        }
        QuestionType::Rating => Some(AnswerValue::rating(input.parse().ok()?)),
    }
}
