//! Classification of structured payloads embedded in answers.
//!
//! [`resolve`] parses a completed JSON segment and classifies it by key
//! presence. The classification is heuristic: anything it cannot place is
//! [`PayloadShape::Unrecognized`] and renders as a code block.

use serde_json::Value;

/// Keys searched, in order, for a row array.
const CONTAINER_KEYS: &[&str] = &[
    "data",
    "result",
    "agents",
    "flows",
    "users",
    "runs",
    "rows",
    "output",
    "items",
    "templates",
];

/// How many object levels the row-array search descends.
const MAX_CONTAINER_DEPTH: usize = 3;

/// Shape of a structured payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// An array of rows.
    Tabular,
    /// A form descriptor (`"type": "form"`).
    Form,
    /// A plain key/value object.
    Record,
    /// An operation result reporting success.
    SuccessEnvelope,
    /// An operation result reporting failure.
    ErrorEnvelope,
    /// Not JSON, or JSON with no recognized shape.
    Unrecognized,
}

/// A classified payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredPayload {
    /// The detected shape.
    pub shape: PayloadShape,
    /// The parsed value. For [`PayloadShape::Tabular`] this is the row array;
    /// for unparseable input it is the raw text as a JSON string.
    pub data: Value,
}

impl StructuredPayload {
    /// Column names of a tabular payload: the keys of its object rows in
    /// first-seen order. Empty for other shapes.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        if self.shape != PayloadShape::Tabular {
            return columns;
        }

        let rows = self.data.as_array().map(Vec::as_slice).unwrap_or_default();
        for row in rows {
            if let Some(object) = row.as_object() {
                for key in object.keys() {
                    if !columns.iter().any(|c| c == key) {
                        columns.push(key.clone());
                    }
                }
            }
        }
        columns
    }

    /// Rows of a tabular payload.
    pub fn rows(&self) -> &[Value] {
        match (&self.shape, &self.data) {
            (PayloadShape::Tabular, Value::Array(rows)) => rows,
            _ => &[],
        }
    }
}

/// Parse and classify a completed JSON segment.
///
/// Never fails: invalid JSON yields [`PayloadShape::Unrecognized`] carrying
/// the raw text.
///
/// # Examples
///
/// ```
/// use flowchat_core::payload::{PayloadShape, resolve};
///
/// let payload = resolve(r#"{"data":[{"id":1}]}"#);
/// assert_eq!(payload.shape, PayloadShape::Tabular);
/// assert_eq!(payload.data, serde_json::json!([{"id": 1}]));
///
/// assert_eq!(resolve("not json").shape, PayloadShape::Unrecognized);
/// ```
pub fn resolve(raw: &str) -> StructuredPayload {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) => classify(value),
        Err(e) => {
            tracing::debug!(error = %e, "payload: not valid JSON, rendering as code");
            StructuredPayload {
                shape: PayloadShape::Unrecognized,
                data: Value::String(raw.to_string()),
            }
        }
    }
}

/// Classify an already parsed value.
pub fn classify(value: Value) -> StructuredPayload {
    if let Some(shape) = envelope_shape(&value) {
        return StructuredPayload { shape, data: value };
    }

    if value.get("type").and_then(Value::as_str) == Some("form") {
        return StructuredPayload {
            shape: PayloadShape::Form,
            data: value,
        };
    }

    if let Some(rows) = find_rows(&value, 1) {
        return StructuredPayload {
            shape: PayloadShape::Tabular,
            data: rows.clone(),
        };
    }

    let shape = if value.is_object() {
        PayloadShape::Record
    } else {
        PayloadShape::Unrecognized
    };
    StructuredPayload { shape, data: value }
}

fn envelope_shape(value: &Value) -> Option<PayloadShape> {
    let object = value.as_object()?;
    let success = object.get("success")?.as_bool()?;

    let kind = object.get("type").and_then(Value::as_str);
    let has_error = object.contains_key("error");
    let is_envelope = object.get("users").is_some_and(Value::is_array)
        || object.contains_key("message")
        || kind == Some("conversation")
        || has_error;
    if !is_envelope {
        return None;
    }

    if !success || has_error || kind == Some("error") {
        Some(PayloadShape::ErrorEnvelope)
    } else {
        Some(PayloadShape::SuccessEnvelope)
    }
}

fn find_rows(value: &Value, depth: usize) -> Option<&Value> {
    if value.is_array() {
        return Some(value);
    }
    let object = value.as_object()?;

    if let Some(rows) = CONTAINER_KEYS
        .iter()
        .filter_map(|key| object.get(*key))
        .find(|v| v.is_array())
    {
        return Some(rows);
    }

    if depth >= MAX_CONTAINER_DEPTH {
        return None;
    }
    CONTAINER_KEYS
        .iter()
        .filter_map(|key| object.get(*key))
        .filter(|v| v.is_object())
        .find_map(|nested| find_rows(nested, depth + 1))
}
