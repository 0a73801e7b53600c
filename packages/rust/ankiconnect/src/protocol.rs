//! AnkiConnect wire format.
//!
//! Every request is `{"action", "version", "params"?}`; every response is
//! `{"result", "error"}` with exactly one of them meaningful.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cardfeed_shared::{CardfeedError, Result, TargetId, TargetNoteFields};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Request body posted to the endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct RequestEnvelope<'a> {
    pub action: &'a str,
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Validate a response envelope and return its `result`.
///
/// A body without both keys is a malformed response; a non-null `error`
/// is a failure of the call.
pub(crate) fn unwrap_envelope(action: &str, body: Value) -> Result<Value> {
    let Value::Object(mut map) = body else {
        return Err(CardfeedError::protocol(
            action,
            format!("unexpected response shape: {body}"),
        ));
    };

    if !map.contains_key("result") || !map.contains_key("error") {
        return Err(CardfeedError::protocol(
            action,
            format!("unexpected response shape: {}", Value::Object(map)),
        ));
    }

    match map.remove("error") {
        Some(Value::Null) | None => Ok(map.remove("result").unwrap_or(Value::Null)),
        Some(Value::String(msg)) => Err(CardfeedError::protocol(action, msg)),
        Some(other) => Err(CardfeedError::protocol(action, other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// notesInfo
// ---------------------------------------------------------------------------

/// A note known to the flashcard application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteInfo {
    pub target_id: TargetId,
    pub fields: TargetNoteFields,
}

#[derive(Debug, Deserialize)]
struct RawNoteInfo {
    #[serde(rename = "noteId", default)]
    note_id: Option<i64>,
    #[serde(default)]
    fields: HashMap<String, RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    #[serde(default)]
    value: String,
    #[serde(default)]
    order: usize,
}

/// Decode a `notesInfo` result, dropping entries for unknown ids.
pub(crate) fn parse_notes_info(result: Value) -> Result<Vec<NoteInfo>> {
    let raw: Vec<Option<RawNoteInfo>> = serde_json::from_value(result)
        .map_err(|e| CardfeedError::protocol("notesInfo", format!("malformed result: {e}")))?;

    Ok(raw
        .into_iter()
        .flatten()
        .filter_map(|info| {
            let id = info.note_id?;
            let mut fields: Vec<(String, RawField)> = info.fields.into_iter().collect();
            fields.sort_by_key(|(_, f)| f.order);
            Some(NoteInfo {
                target_id: TargetId(id),
                fields: TargetNoteFields::new(fields.into_iter().map(|(k, f)| (k, f.value))),
            })
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Search queries
// ---------------------------------------------------------------------------

/// Build an exact-match search on one field: `Field:"value"`.
///
/// Escapes the characters Anki's search syntax treats specially inside a
/// quoted term so the value is matched literally.
pub fn exact_field_query(field: &str, value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '*' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("{field}:\"{escaped}\"")
}
