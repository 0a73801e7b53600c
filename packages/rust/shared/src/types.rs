//! Core domain types shared by the extraction and update pipelines.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Headings and sections
// ---------------------------------------------------------------------------

/// Heading levels the scanner cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadingLevel {
    /// Note boundary; its text is the note id.
    H2,
    /// Sub-section label inside a note.
    H3,
}

/// A located heading marker in an HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: HeadingLevel,
    /// Decoded text with inner markup stripped and whitespace collapsed.
    pub text: String,
    /// Byte offset where the opening tag begins.
    pub start: usize,
    /// Byte offset immediately after the closing tag.
    pub end: usize,
}

/// The body of one note inside a concatenated HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSection {
    /// Decoded text of the owning H2 heading.
    pub note_id: String,
    /// Half-open byte range of the note body.
    pub body: Range<usize>,
}

impl NoteSection {
    /// Slice this section's body out of the document it was partitioned from.
    pub fn body_of<'a>(&self, html: &'a str) -> &'a str {
        &html[self.body.clone()]
    }
}

/// Front/back fragments pulled out of one note section.
///
/// Empty strings mean "nothing to write", never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedNote {
    pub note_id: String,
    pub front_html: String,
    pub back_html: String,
}

impl ExtractedNote {
    pub fn has_content(&self) -> bool {
        !self.front_html.is_empty() || !self.back_html.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TargetId
// ---------------------------------------------------------------------------

/// Numeric note identifier assigned by the flashcard application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub i64);

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TargetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Canonical note id → target id.
pub type IdentityMapping = BTreeMap<String, TargetId>;

// ---------------------------------------------------------------------------
// TargetNoteFields
// ---------------------------------------------------------------------------

/// Current fields of a target note, in the note type's field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetNoteFields {
    fields: Vec<(String, String)>,
}

impl TargetNoteFields {
    /// Build from `(name, value)` pairs already in field order.
    pub fn new<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field name at a position in field order.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|(k, _)| k.as_str())
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|(k, _)| k.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// A pending field update for one target note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteUpdate {
    /// Canonical id, kept for logging.
    pub note_id: String,
    pub target_id: TargetId,
    /// Exactly the fields to write.
    pub fields: BTreeMap<String, String>,
}

/// Why a note was not turned into an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No target id was supplied or resolved.
    NoIdentity,
    /// The target id is unknown to the flashcard application.
    TargetMissing,
    /// Nothing to write.
    NoContent,
    /// The front field is not on the target note.
    FrontFieldMissing {
        field: String,
        available: Vec<String>,
    },
    /// The explicit back field is not on the target note.
    BackFieldNotPresent {
        field: String,
        available: Vec<String>,
    },
    /// No candidate matched and the note does not have exactly two fields.
    CannotAutoDetectBackField { available: Vec<String> },
}

impl SkipReason {
    /// Stable reason code used in log lines and summaries.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoIdentity => "no identity",
            Self::TargetMissing => "target missing",
            Self::NoContent => "no content",
            Self::FrontFieldMissing { .. } => "front field missing",
            Self::BackFieldNotPresent { .. } => "back field not present",
            Self::CannotAutoDetectBackField { .. } => "cannot auto-detect back field",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrontFieldMissing { field, available }
            | Self::BackFieldNotPresent { field, available } => {
                write!(f, "{}: {field:?} not in {available:?}", self.code())
            }
            Self::CannotAutoDetectBackField { available } => {
                write!(f, "{}: available fields {available:?}", self.code())
            }
            _ => f.write_str(self.code()),
        }
    }
}

/// Outcome of reconciling one extracted note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileResult {
    Update(NoteUpdate),
    Skip { note_id: String, reason: SkipReason },
}

impl ReconcileResult {
    pub fn skip(note_id: impl Into<String>, reason: SkipReason) -> Self {
        Self::Skip {
            note_id: note_id.into(),
            reason,
        }
    }

    pub fn note_id(&self) -> &str {
        match self {
            Self::Update(update) => &update.note_id,
            Self::Skip { note_id, .. } => note_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_id_roundtrip() {
        let id: TargetId = " 1496198395707 ".parse().expect("parse TargetId");
        assert_eq!(id, TargetId(1496198395707));
        assert_eq!(id.to_string(), "1496198395707");
        assert!("12a".parse::<TargetId>().is_err());
    }

    #[test]
    fn target_fields_keep_order() {
        let fields = TargetNoteFields::new([("Front", "q"), ("Back", "a")]);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.name_at(1), Some("Back"));
        assert_eq!(fields.get("Front"), Some("q"));
        assert!(!fields.contains("Answer"));
    }

    #[test]
    fn section_body_slice() {
        let html = "<h2>A</h2>body<h2>B</h2>";
        let section = NoteSection {
            note_id: "A".into(),
            body: 9..13,
        };
        assert_eq!(section.body_of(html), "body");
    }

    #[test]
    fn skip_reason_display_includes_code() {
        let reason = SkipReason::FrontFieldMissing {
            field: "Front".into(),
            available: vec!["Text".into()],
        };
        assert_eq!(reason.code(), "front field missing");
        assert!(reason.to_string().starts_with("front field missing"));
        assert_eq!(SkipReason::NoIdentity.to_string(), "no identity");
    }
}
