//! Canonical note loading: YAML front matter plus a markdown body.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use cardfeed_shared::{CardfeedError, Result};

/// A canonical note source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalNote {
    /// File the note was loaded from.
    pub path: PathBuf,
    /// Canonical id (`note_id`).
    pub note_id: String,
    /// Target note type (`anki.model`).
    pub model: String,
    /// Target deck (`anki.deck`).
    pub deck: String,
    pub tags: Vec<String>,
    /// Extra fields (`fields`), values stringified.
    pub fields: BTreeMap<String, String>,
    /// Markdown after the front matter.
    pub body: String,
}

/// Read and parse a note file.
pub fn load_note(path: &Path) -> Result<CanonicalNote> {
    let content = std::fs::read_to_string(path).map_err(|e| CardfeedError::io(path, e))?;
    parse_note(path, &content)
}

/// Parse note content; `path` is used for error messages only.
pub fn parse_note(path: &Path, content: &str) -> Result<CanonicalNote> {
    let (yaml, body) = split_front_matter(content);

    let meta: Value = match yaml {
        Some(yaml) if !yaml.trim().is_empty() => serde_yaml::from_str(yaml).map_err(|e| {
            CardfeedError::parse(format!("invalid front matter in {}: {e}", path.display()))
        })?,
        _ => Value::Null,
    };

    let anki = meta.get("anki").cloned().unwrap_or(Value::Null);

    let note = CanonicalNote {
        path: path.to_path_buf(),
        note_id: require(meta.get("note_id"), "note_id", path)?,
        model: require(anki.get("model"), "anki.model", path)?,
        deck: require(anki.get("deck"), "anki.deck", path)?,
        tags: split_tags(meta.get("tags")),
        fields: string_fields(meta.get("fields")),
        body: body.to_string(),
    };

    debug!(note_id = %note.note_id, path = %path.display(), "note loaded");
    Ok(note)
}

/// Split `---\n<yaml>\n---\n<body>`; content without front matter is all body.
fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    // Closing fence may directly follow the opening one.
    if let Some(body) = rest.strip_prefix("---") {
        return (Some(""), body.trim_start_matches(['\r', '\n']));
    }

    match rest.find("\n---") {
        Some(end) => {
            let yaml = &rest[..end];
            let after = &rest[end + 4..];
            (Some(yaml), after.trim_start_matches(['\r', '\n']))
        }
        None => (None, content),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn require(value: Option<&Value>, key: &str, path: &Path) -> Result<String> {
    value
        .and_then(scalar_to_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CardfeedError::MissingField {
            key: key.to_string(),
            path: path.to_path_buf(),
        })
}

/// Tags may be a list or a comma/space separated string.
fn split_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(scalar_to_string)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .replace(',', " ")
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        Some(other) => scalar_to_string(other).into_iter().collect(),
    }
}

fn string_fields(value: Option<&Value>) -> BTreeMap<String, String> {
    let Some(Value::Mapping(map)) = value else {
        return BTreeMap::new();
    };

    map.iter()
        .filter_map(|(k, v)| {
            let key = scalar_to_string(k)?;
            let value = match v {
                Value::Null => String::new(),
                other => scalar_to_string(other).unwrap_or_else(|| {
                    serde_yaml::to_string(other)
                        .map(|s| s.trim_end().to_string())
                        .unwrap_or_default()
                }),
            };
            Some((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<CanonicalNote> {
        parse_note(Path::new("notes/test.md"), content)
    }

    const FULL: &str = r#"---
note_id: bio-001
anki:
  model: Basic
  deck: Biology::Cells
tags: [cells, "  organelles "]
fields:
  Source: lecture 3
  Page: 12
  Empty: ~
---

### AFTER_FRONT
What do mitochondria do?
"#;

    #[test]
    fn parses_full_note() {
        let note = parse(FULL).unwrap();
        assert_eq!(note.note_id, "bio-001");
        assert_eq!(note.model, "Basic");
        assert_eq!(note.deck, "Biology::Cells");
        assert_eq!(note.tags, vec!["cells", "organelles"]);
        assert_eq!(note.fields["Source"], "lecture 3");
        assert_eq!(note.fields["Page"], "12");
        assert_eq!(note.fields["Empty"], "");
        assert!(note.body.starts_with("### AFTER_FRONT"));
    }

    #[test]
    fn string_tags_split_on_commas_and_spaces() {
        let note = parse("---\nnote_id: x\nanki: {model: M, deck: D}\ntags: a, b c\n---\nbody").unwrap();
        assert_eq!(note.tags, vec!["a", "b", "c"]);
        assert_eq!(note.body, "body");
    }

    #[test]
    fn missing_deck_names_key_and_path() {
        let err = parse("---\nnote_id: x\nanki:\n  model: Basic\n---\n").unwrap_err();
        match err {
            CardfeedError::MissingField { key, path } => {
                assert_eq!(key, "anki.deck");
                assert_eq!(path, Path::new("notes/test.md"));
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn blank_note_id_is_missing() {
        let err = parse("---\nnote_id: \"  \"\nanki: {model: M, deck: D}\n---\n").unwrap_err();
        assert!(err.to_string().contains("'note_id'"));
    }

    #[test]
    fn no_front_matter_is_missing_note_id() {
        let err = parse("# Just markdown\n").unwrap_err();
        assert!(matches!(err, CardfeedError::MissingField { ref key, .. } if key == "note_id"));
    }

    #[test]
    fn invalid_yaml_is_parse_error() {
        let err = parse("---\nnote_id: [unclosed\n---\n").unwrap_err();
        assert!(matches!(err, CardfeedError::Parse { .. }));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n.md");
        std::fs::write(&path, FULL).unwrap();

        let note = load_note(&path).unwrap();
        assert_eq!(note.path, path);

        let err = load_note(&dir.path().join("absent.md")).unwrap_err();
        assert!(matches!(err, CardfeedError::Io { .. }));
    }
}
