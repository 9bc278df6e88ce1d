//! Extraction of the recommendation list from free-form LLM output.
//!
//! Models wrap the requested JSON in prose or code fences often enough that
//! decoding the raw content directly is not reliable. Each `ParseStrategy`
//! is an independent attempt; they are tried in order and the first one that
//! decodes to a recommendations list wins.

use super::models::ParsedRecommendationItem;
use crate::llm::RawProviderResponse;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```(?:json)?\s*\n(.*?)\n```").expect("valid fenced block regex");
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("LLM response is empty")]
    EmptyResponse,
    #[error("LLM response does not contain decodable JSON")]
    UnparsableResponse,
    #[error("LLM response contains no recommendations")]
    NoRecommendations,
    #[error("LLM response has an unexpected shape: {0}")]
    InvalidSchema(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Decode the span from the first `{` to the last `}`.
    BraceSlice,
    /// Decode the whole content.
    WholeContent,
    /// Decode the interior of each fenced code block, in order.
    FencedBlocks,
}

impl ParseStrategy {
    pub const ORDER: [ParseStrategy; 3] = [
        ParseStrategy::BraceSlice,
        ParseStrategy::WholeContent,
        ParseStrategy::FencedBlocks,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ParseStrategy::BraceSlice => "brace_slice",
            ParseStrategy::WholeContent => "whole_content",
            ParseStrategy::FencedBlocks => "fenced_blocks",
        }
    }

    pub fn extract(&self, content: &str) -> Option<Value> {
        match self {
            ParseStrategy::BraceSlice => {
                let start = content.find('{')?;
                let end = content.rfind('}')?;
                if end <= start {
                    return None;
                }
                serde_json::from_str(&content[start..=end]).ok()
            }
            ParseStrategy::WholeContent => serde_json::from_str(content.trim()).ok(),
            ParseStrategy::FencedBlocks => FENCED_BLOCK
                .captures_iter(content)
                .filter_map(|caps| caps.get(1))
                .find_map(|block| serde_json::from_str(block.as_str().trim()).ok()),
        }
    }
}

/// Parses a provider response into recommendation items, numbered by
/// position in the order the model declared them.
pub fn parse_response(
    response: &RawProviderResponse,
) -> Result<Vec<ParsedRecommendationItem>, ParseError> {
    let content = response
        .first_content()
        .filter(|c| !c.trim().is_empty())
        .ok_or(ParseError::EmptyResponse)?;

    let mut schema_error = None;
    let mut entries = None;
    for strategy in ParseStrategy::ORDER {
        let Some(value) = strategy.extract(content) else {
            continue;
        };
        match recommendation_entries(value) {
            Ok(found) => {
                debug!(strategy = strategy.name(), "Decoded LLM response");
                entries = Some(found);
                break;
            }
            Err(e) => {
                debug!(strategy = strategy.name(), error = %e, "Decoded JSON has no recommendations list");
                schema_error.get_or_insert(e);
            }
        }
    }

    let Some(entries) = entries else {
        if let Some(e) = schema_error {
            warn!(error = %e, "LLM response JSON has an unexpected shape");
            return Err(e);
        }
        warn!(
            content_len = content.len(),
            "No parse strategy could decode the LLM response"
        );
        debug!(content = %content, "Unparsable LLM response");
        return Err(ParseError::UnparsableResponse);
    };
    if entries.is_empty() {
        return Err(ParseError::NoRecommendations);
    }

    let total = entries.len();
    let items: Vec<ParsedRecommendationItem> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let item = decode_item(entry);
            if item.is_none() {
                warn!(index, "Skipping recommendation without track or artist name");
            }
            item
        })
        .enumerate()
        .map(|(position, item)| ParsedRecommendationItem { position, ..item })
        .collect();

    if items.is_empty() {
        return Err(ParseError::NoRecommendations);
    }
    if items.len() < total {
        debug!(kept = items.len(), total, "Dropped malformed recommendation entries");
    }
    Ok(items)
}

fn recommendation_entries(value: Value) -> Result<Vec<Value>, ParseError> {
    match value {
        Value::Object(mut map) => match map.remove("recommendations") {
            Some(Value::Array(entries)) => Ok(entries),
            Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(ParseError::InvalidSchema(format!(
                "recommendations is {}, expected an array",
                json_type(&other)
            ))),
            None => Err(ParseError::InvalidSchema(
                "missing recommendations key".to_string(),
            )),
        },
        Value::Array(entries) if entries.iter().all(Value::is_object) => {
            debug!("Treating top-level array as the recommendations list");
            Ok(entries)
        }
        other => Err(ParseError::InvalidSchema(format!(
            "top-level value is {}",
            json_type(&other)
        ))),
    }
}

fn decode_item(entry: &Value) -> Option<ParsedRecommendationItem> {
    let field = |key: &str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(ParsedRecommendationItem {
        track_name: field("track_name")?,
        artist_name: field("artist_name")?,
        album_name: field("album_name"),
        explanation: field("explanation").unwrap_or_default(),
        ..Default::default()
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
