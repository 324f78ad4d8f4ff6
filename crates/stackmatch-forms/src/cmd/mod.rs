#![cfg(feature = "cli")]

pub mod check;
pub mod payload;
pub mod progress;
pub mod render;
pub mod schema;
#[cfg(feature = "http")]
pub mod submit;
pub mod template;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rfq_form_spec::{AnswerMap, AnswerSet, AnswerStore, Blueprint};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::config::EngineConfig;

/// Shared state handed to every subcommand.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: EngineConfig,
}

pub fn load_blueprint(path: &Path) -> Result<Blueprint> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read blueprint {}", path.display()))?;
    Blueprint::from_json_str(&raw)
        .with_context(|| format!("blueprint {} is invalid", path.display()))
}

/// Reads an answers file into a store for `blueprint`. Accepts either a full
/// draft (`{"formId", "answers"}`) or a bare component map.
pub fn load_answers(path: Option<&Path>, blueprint: &Blueprint) -> Result<AnswerStore> {
    let mut store = AnswerStore::new(blueprint.clone());
    let Some(path) = path else {
        return Ok(store);
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read answers {}", path.display()))?;
    let value: JsonValue = serde_json::from_str(&raw)
        .with_context(|| format!("answers {} must be valid JSON", path.display()))?;
    let parsed = if value.get("answers").is_some() && value.get("formId").is_some() {
        serde_json::from_value::<AnswerSet>(value)
    } else {
        serde_json::from_value::<AnswerMap>(value).map(|answers| AnswerSet {
            form_id: blueprint.form_id().to_string(),
            answers,
            meta: None,
        })
    };
    let snapshot = parsed
        .with_context(|| format!("answers {} do not match the answer format", path.display()))?;

    let report = store.hydrate(snapshot);
    if !report.is_clean() {
        warn!(
            path = %path.display(),
            dropped = report.dropped.len(),
            "answers file contains fields the blueprint does not declare"
        );
    }
    Ok(store)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
