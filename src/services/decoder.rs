use crate::ml::preview;
use crate::models::RecommendationItem;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Substituted for any required field the model left out.
pub const PLACEHOLDER: &str = "N/A";

const MAX_RAW_PREVIEW_LENGTH: usize = 200;

const FENCE: &str = "```";

static JSON_FENCE_OPENING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```[ \t]*json\b[ \t]*\r?\n?").expect("json fence pattern"));

static BARE_FENCE_OPENING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[ \t]*\r?\n").expect("bare fence pattern"));

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Model output is not valid JSON: {message} (output: {raw})")]
    InvalidJson { message: String, raw: String },

    #[error("Model output is JSON but not an array (found {0})")]
    NotAnArray(&'static str),

    #[error("Recommendation #{index} is not an object (found {found})")]
    InvalidItem { index: usize, found: &'static str },
}

/// Returns the interior of the fenced block holding the payload, if any.
///
/// A `json`-tagged fence is preferred over a bare one. Backticks inside the
/// payload are tolerated: the first closing fence whose interior parses as
/// JSON wins, otherwise the nearest closing fence is used.
pub fn extract_fenced_block(raw: &str) -> Option<&str> {
    let opening = JSON_FENCE_OPENING
        .find(raw)
        .or_else(|| BARE_FENCE_OPENING.find(raw))?;
    let body = &raw[opening.end()..];

    let mut nearest = None;
    for (end, _) in body.match_indices(FENCE) {
        let candidate = body[..end].trim();
        if serde_json::from_str::<Value>(candidate).is_ok() {
            return Some(candidate);
        }
        nearest.get_or_insert(candidate);
    }
    nearest
}

/// Parses raw model output into recommendation items.
///
/// Output that is already valid JSON is used as is; otherwise the fenced
/// block wins over the surrounding text. Missing, null, non-string or blank
/// fields become [`PLACEHOLDER`], and repeated destinations are dropped
/// keeping the first.
pub fn decode(raw: &str) -> Result<Vec<RecommendationItem>, DecodeError> {
    let invalid_json = |e: serde_json::Error| DecodeError::InvalidJson {
        message: e.to_string(),
        raw: preview(raw, MAX_RAW_PREVIEW_LENGTH),
    };

    let value: Value = match serde_json::from_str(raw.trim()) {
        Ok(value) => value,
        Err(direct) => match extract_fenced_block(raw) {
            Some(block) => {
                debug!("Found fenced JSON block in model output");
                serde_json::from_str(block).map_err(invalid_json)?
            }
            None => return Err(invalid_json(direct)),
        },
    };

    let Value::Array(elements) = value else {
        return Err(DecodeError::NotAnArray(json_type(&value)));
    };

    let items = elements
        .iter()
        .enumerate()
        .map(|(index, element)| decode_item(index, element))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(dedupe_by_country(items))
}

fn decode_item(index: usize, element: &Value) -> Result<RecommendationItem, DecodeError> {
    let Some(object) = element.as_object() else {
        return Err(DecodeError::InvalidItem {
            index,
            found: json_type(element),
        });
    };

    let field = |name: &str| -> String {
        match object.get(name).and_then(Value::as_str).map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => {
                warn!("Recommendation #{} is missing '{}'", index, name);
                PLACEHOLDER.to_string()
            }
        }
    };

    Ok(RecommendationItem {
        country_name: field("country_name"),
        desc: field("desc"),
        country_continent_location: field("country_continent_location"),
    })
}

/// Drops items whose `country_name` repeats an earlier one (case-insensitive).
///
/// Placeholder names are never treated as duplicates of each other.
pub fn dedupe_by_country(items: Vec<RecommendationItem>) -> Vec<RecommendationItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            if item.country_name == PLACEHOLDER {
                return true;
            }
            let keep = seen.insert(item.country_name.to_lowercase());
            if !keep {
                warn!("Dropping duplicate recommendation: {}", item.country_name);
            }
            keep
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
