//! Structured payload recovery from free-form model output.
//!
//! Parsing never fails outright. Either a JSON object is recovered (possibly
//! with missing keys defaulted) and the result is `Success`, or the raw text
//! is kept verbatim alongside an empty payload as `Degraded`.

use serde_json::{Map, Value};

use crate::models::{
    Artifact, RequirementsAnalysis, StageName, TestCaseCollection, TestDataCollection,
    UserStoryCollection,
};

const FENCE: &str = "```";

/// A payload shape the parser can produce.
pub trait ResponseShape: Sized + Default {
    /// Build the payload from a recovered object. Missing keys default to empty.
    fn from_object(obj: &Map<String, Value>) -> Self;

    /// Last-resort extraction from unstructured text. Collection shapes have none.
    fn scalar_fallback(_raw: &str) -> Option<Self> {
        None
    }
}

impl ResponseShape for RequirementsAnalysis {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self::from_json_object(obj)
    }

    fn scalar_fallback(raw: &str) -> Option<Self> {
        Self::from_key_value_lines(raw)
    }
}

impl ResponseShape for UserStoryCollection {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self::from_json_object(obj)
    }
}

impl ResponseShape for TestCaseCollection {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self::from_json_object(obj)
    }
}

impl ResponseShape for TestDataCollection {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self::from_json_object(obj)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    Success(T),
    Degraded { raw_text: String, payload: T },
}

impl<T> ParseOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn payload(&self) -> &T {
        match self {
            Self::Success(p) | Self::Degraded { payload: p, .. } => p,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ParseOutcome<U> {
        match self {
            Self::Success(p) => ParseOutcome::Success(f(p)),
            Self::Degraded { raw_text, payload } => ParseOutcome::Degraded {
                raw_text,
                payload: f(payload),
            },
        }
    }
}

/// Structural extraction strategies, tried in order; the first that yields
/// an object wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// The whole response is JSON.
    Direct,
    /// JSON inside the first triple-backtick block, `json` tag optional.
    FencedBlock,
}

pub const STRATEGIES: [ParseStrategy; 2] = [ParseStrategy::Direct, ParseStrategy::FencedBlock];

impl ParseStrategy {
    /// Extracted value after one string-unwrapping pass, if any.
    pub fn extract(&self, raw: &str) -> Option<Value> {
        let candidate = match self {
            Self::Direct => raw.trim(),
            Self::FencedBlock => fenced_interior(raw)?,
        };
        serde_json::from_str::<Value>(candidate).ok().map(unwrap_string_encoding)
    }
}

/// Interior of the first fenced block. An unclosed fence runs to the end.
fn fenced_interior(raw: &str) -> Option<&str> {
    let start = raw.find(FENCE)? + FENCE.len();
    let body = strip_language_tag(&raw[start..]);
    let end = body.find(FENCE).unwrap_or(body.len());
    Some(body[..end].trim())
}

/// Drop the info string after an opening fence: a bare tag on its own line
/// (`json`, `jsonc`, `JSON5`), or an inline `json` followed by whitespace.
fn strip_language_tag(body: &str) -> &str {
    if let Some((first, rest)) = body.split_once('\n') {
        let tag = first.trim();
        if !tag.is_empty()
            && tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_' | '.'))
        {
            return rest;
        }
    }
    match body.get(..4) {
        Some(tag)
            if tag.eq_ignore_ascii_case("json")
                && body[4..].chars().next().map_or(true, char::is_whitespace) =>
        {
            &body[4..]
        }
        _ => body,
    }
}

/// A JSON string holding JSON is decoded once; deeper nesting is left alone.
fn unwrap_string_encoding(value: Value) -> Value {
    match value {
        Value::String(inner) => serde_json::from_str::<Value>(inner.trim()).unwrap_or(Value::String(inner)),
        other => other,
    }
}

/// Recover a `T` from model output.
pub fn parse_response<T: ResponseShape>(raw: &str) -> ParseOutcome<T> {
    if raw.trim().is_empty() {
        return degraded(raw);
    }

    for strategy in STRATEGIES {
        match strategy.extract(raw) {
            Some(Value::Object(obj)) => {
                tracing::debug!(?strategy, keys = obj.len(), "Structured payload recovered");
                return ParseOutcome::Success(T::from_object(&obj));
            }
            Some(other) => {
                tracing::debug!(?strategy, kind = value_kind(&other), "Parsed value is not an object");
            }
            None => {}
        }
    }

    if let Some(payload) = T::scalar_fallback(raw) {
        tracing::debug!("Payload recovered by line scanning");
        return ParseOutcome::Success(payload);
    }

    degraded(raw)
}

/// Parse a response with the shape the stage expects.
pub fn parse_for_stage(stage: StageName, raw: &str) -> ParseOutcome<Artifact> {
    match stage {
        StageName::Analysis => parse_response::<RequirementsAnalysis>(raw).map(Artifact::Analysis),
        StageName::UserStories => {
            parse_response::<UserStoryCollection>(raw).map(Artifact::UserStories)
        }
        StageName::TestCases => parse_response::<TestCaseCollection>(raw).map(Artifact::TestCases),
        StageName::TestData => parse_response::<TestDataCollection>(raw).map(Artifact::TestData),
    }
}

fn degraded<T: Default>(raw: &str) -> ParseOutcome<T> {
    ParseOutcome::Degraded {
        raw_text: raw.to_string(),
        payload: T::default(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
