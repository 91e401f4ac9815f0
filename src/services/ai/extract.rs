use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::models::Flow;

/// Outcome of reading a collection step's `{done, message, ...}` reply.
#[derive(Debug)]
pub enum Extraction<T> {
    /// `done` was true and the payload matched the step's schema.
    Complete { message: String, payload: T },
    /// The model wants more input; `message` is its question.
    Incomplete { message: String },
    /// `done` was true but the payload did not match the schema.
    Invalid { message: String, reason: String },
    /// No JSON object could be found in the reply.
    Unreadable { raw: String },
}

pub fn parse_extraction<T: DeserializeOwned>(response: &str) -> Extraction<T> {
    let Some(value) = parse_json_reply(response) else {
        tracing::warn!("failed to parse LLM response as JSON envelope");
        return Extraction::Unreadable {
            raw: response.trim().to_string(),
        };
    };

    let done = value.get("done").and_then(Value::as_bool).unwrap_or(false);
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if !done {
        return Extraction::Incomplete { message };
    }

    match serde_json::from_value::<T>(value) {
        Ok(payload) => Extraction::Complete { message, payload },
        Err(e) => Extraction::Invalid {
            message,
            reason: e.to_string(),
        },
    }
}

/// Finds the JSON object in a model reply: bare, fenced, or embedded in prose.
pub fn parse_json_reply(response: &str) -> Option<Value> {
    let trimmed = response.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    // Strip markdown code fences
    let cleaned = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(cleaned) {
        return Some(value);
    }

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&cleaned[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Matches the classifier's reply against the two known flow labels.
pub fn parse_flow_label(reply: &str) -> Option<Flow> {
    let label = reply
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.' || c.is_whitespace())
        .to_lowercase();

    match label.as_str() {
        "booking" => Some(Flow::Booking),
        "general" => Some(Flow::General),
        _ => None,
    }
}
