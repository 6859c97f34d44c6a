//! Scanned / typed input normalization
//!
//! QR payloads and manual entry either carry a bare component id or a
//! JSON-like record written with single quotes (`{'id':'X1', ...}`). Single
//! quotes are swapped for double quotes and the result is parsed once; any
//! failure falls back to treating the trimmed input as the id.

use serde_json::Value;

/// Outcome of normalizing raw input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedInput {
    /// The input parsed as a record carrying an `id` field
    StructuredHint { id: String },
    /// The input is used verbatim (trimmed) as the id
    PlainIdentifier { value: String },
}

impl NormalizedInput {
    /// The component id to look up
    pub fn identifier(&self) -> &str {
        match self {
            NormalizedInput::StructuredHint { id } => id,
            NormalizedInput::PlainIdentifier { value } => value,
        }
    }

    pub fn into_identifier(self) -> String {
        match self {
            NormalizedInput::StructuredHint { id } => id,
            NormalizedInput::PlainIdentifier { value } => value,
        }
    }

    /// Nothing to look up
    pub fn is_empty(&self) -> bool {
        self.identifier().is_empty()
    }
}

/// Normalize raw scanned or typed text into a lookup id. Never fails.
pub fn normalize(raw: &str) -> NormalizedInput {
    if let Some(id) = structured_id(raw) {
        return NormalizedInput::StructuredHint { id };
    }
    NormalizedInput::PlainIdentifier {
        value: raw.trim().to_string(),
    }
}

fn structured_id(raw: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(&raw.replace('\'', "\"")).ok()?;
    match parsed.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().map_or(true, |f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        // nested values are not usable as registry keys
        _ => None,
    }
}
