//! Reading command inputs from disk.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use gauge_assembly::Blueprint;
use gauge_core::{QuestionId, SessionId};
use gauge_psychometrics::ItemResponse;
use uuid::Uuid;

/// Parse a blueprint TOML file. The `strategy` key selects the variant.
pub fn read_blueprint(path: &Path) -> Result<Blueprint> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading blueprint {}", path.display()))?;
    parse_blueprint(&contents).with_context(|| format!("parsing blueprint {}", path.display()))
}

pub fn parse_blueprint(contents: &str) -> Result<Blueprint> {
    Ok(toml::from_str(contents)?)
}

/// Responses per question, as `{ "<question id>": [ItemResponse, ..] }`.
pub fn read_responses(path: &Path) -> Result<BTreeMap<QuestionId, Vec<ItemResponse>>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading responses {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing responses {}", path.display()))
}

/// Session ids, one per line. Blank lines and `#` comments are ignored.
pub fn read_session_ids(path: &Path) -> Result<BTreeSet<SessionId>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading group file {}", path.display()))?;
    parse_session_ids(&contents).with_context(|| format!("parsing group file {}", path.display()))
}

pub fn parse_session_ids(contents: &str) -> Result<BTreeSet<SessionId>> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            Uuid::parse_str(line)
                .map(SessionId::from)
                .with_context(|| format!("invalid session id '{line}'"))
        })
        .collect()
}

pub fn parse_question_ids(ids: &[String]) -> Result<Vec<QuestionId>> {
    ids.iter()
        .map(|id| {
            Uuid::parse_str(id.trim())
                .map(QuestionId::from)
                .with_context(|| format!("invalid question id '{id}'"))
        })
        .collect()
}
