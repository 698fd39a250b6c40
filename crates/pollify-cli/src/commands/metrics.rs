use std::collections::BTreeMap;

use pollify_core::{FlowEngine, QuestionMetrics};

use crate::common;

pub fn run(form_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let db = common::open_database()?;
    let engine = FlowEngine::new(&db);

    // BTreeMap for stable output order.
    let metrics: BTreeMap<String, QuestionMetrics> =
        engine.metrics(form_id)?.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
