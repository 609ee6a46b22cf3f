//! Turning free-form model answers into a search query and a list of selections.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::paper::{normalize_date, title_key, Paper, SelectedPaper};
use crate::report::strip_code_fences;

/// Upper bound on the moderator's selection, whatever the model returns.
pub const MAX_SELECTED: usize = 10;

fn query_label() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| {
        Regex::new(r"(?i)^\s*[*_]*\s*(final\s+)?(arxiv\s+)?(search\s+)?query\s*[*_]*\s*:\s*[*_]*\s*")
            .expect("static regex")
    })
}

/// Reduces the query engineer's answer to a bare query string.
/// Falls back to the wish itself when nothing usable is left.
pub fn clean_query(raw: &str, wish: &str) -> String {
    let text = answer_line(strip_code_fences(raw));
    let text = query_label().replace(text, "");
    let mut query = text.split_whitespace().collect::<Vec<_>>().join(" ");

    query = query.trim_matches('`').trim().to_string();
    if query.len() >= 2
        && query.starts_with('"')
        && query.ends_with('"')
        && !query[1..query.len() - 1].contains('"')
    {
        query = query[1..query.len() - 1].trim().to_string();
    }

    if query.is_empty() {
        wish.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        query
    }
}

/// An introduction line ending in `:` ("Here is the query:") means the query
/// is the last line of the answer.
fn answer_line(text: &str) -> &str {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(first) = lines.next() else {
        return text;
    };
    let intro = first.trim_end_matches(['*', '_']).trim_end().ends_with(':');
    match lines.last() {
        Some(last) if intro => last,
        _ => text,
    }
}

/// Finds the outermost JSON array or object inside surrounding prose.
fn embedded_json(text: &str) -> Option<&str> {
    let start = text.find(['[', '{'])?;
    let close = if text[start..].starts_with('[') { ']' } else { '}' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Parses the moderator's answer. Accepts a bare array, `{"papers": [...]}`,
/// either one wrapped in code fences or embedded in prose.
pub fn parse_selection(raw: &str) -> Result<Vec<SelectedPaper>> {
    let text = strip_code_fences(raw);
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(first) => embedded_json(text)
            .and_then(|inner| serde_json::from_str(inner).ok())
            .ok_or(Error::Json(first))?,
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("papers") {
            Some(Value::Array(items)) => items,
            _ => return Err(Error::Llm("selection object has no 'papers' list".into())),
        },
        other => {
            return Err(Error::Llm(format!(
                "expected a list of papers, got {}",
                json_kind(&other)
            )))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<SelectedPaper>(item) {
            Ok(paper) => Some(paper),
            Err(e) => {
                warn!(error = %e, "skipping malformed selection entry");
                None
            }
        })
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Cleans up the moderator's picks against what was actually retrieved:
/// drops untitled and repeated entries, fills blanks from the matching
/// candidate, normalises dates and enforces [`MAX_SELECTED`].
pub fn ground_selection(selected: Vec<SelectedPaper>, candidates: &[Paper]) -> Vec<SelectedPaper> {
    let by_title: HashMap<String, &Paper> = candidates
        .iter()
        .map(|p| (title_key(&p.title).to_lowercase(), p))
        .collect();

    let mut seen = HashSet::new();
    let mut grounded = Vec::new();

    for mut paper in selected {
        paper.title = title_key(&paper.title);
        if paper.title.is_empty() {
            continue;
        }
        let key = paper.title.to_lowercase();
        if !seen.insert(key.clone()) {
            continue;
        }

        match by_title.get(&key) {
            Some(source) => {
                if paper.abstract_text.trim().is_empty() {
                    paper.abstract_text = source.abstract_text.clone();
                }
                if paper.authors.is_empty() {
                    paper.authors = source.authors.clone();
                }
                if paper.published.trim().is_empty() {
                    paper.published = source.published.clone();
                }
                if paper.pdf_url.trim().is_empty() {
                    paper.pdf_url = source.pdf_url.clone();
                }
            }
            None => debug!(title = %paper.title, "selected paper is not among the retrieved ones"),
        }
        paper.published = normalize_date(&paper.published);
        grounded.push(paper);

        if grounded.len() == MAX_SELECTED {
            break;
        }
    }

    grounded
}
