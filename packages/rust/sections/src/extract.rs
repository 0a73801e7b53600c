//! Front/back extraction within a single note section.

use std::sync::LazyLock;

use regex::Regex;

use cardfeed_shared::{ExtractedNote, Heading, HeadingLevel, LabelsConfig};

use crate::scanner::scan_headings;

/// `<hr>`, `<hr/>`, `<hr class="...">`; the end-of-note delimiter.
static HR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<hr\b[^>]*>").expect("hr regex"));

/// Labels of the two H3 sub-sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLabels {
    pub front: String,
    pub back: String,
}

impl Default for SectionLabels {
    fn default() -> Self {
        Self::from(&LabelsConfig::default())
    }
}

impl From<&LabelsConfig> for SectionLabels {
    fn from(config: &LabelsConfig) -> Self {
        Self {
            front: config.front.clone(),
            back: config.back.clone(),
        }
    }
}

/// Pull the front and back fragments out of one section body.
///
/// - neither label: both empty
/// - front only: front runs to the end of the section
/// - both: front stops at the back label; back stops at the first `<hr>`
///   after it or the end of the section
/// - back only: back as above, front empty
///
/// When the back label occurs before the front label, the front runs to the
/// end of the section and the back also stops at the front label. Fragments
/// are trimmed and otherwise passed through untouched.
pub fn extract_front_back(note_id: &str, body: &str, labels: &SectionLabels) -> ExtractedNote {
    let h3s: Vec<Heading> = scan_headings(body)
        .into_iter()
        .filter(|h| h.level == HeadingLevel::H3)
        .collect();

    let front = h3s.iter().find(|h| label_matches(&h.text, &labels.front));
    let back = match front {
        Some(f) => h3s
            .iter()
            .find(|h| h.start >= f.end && label_matches(&h.text, &labels.back))
            .or_else(|| h3s.iter().find(|h| label_matches(&h.text, &labels.back))),
        None => h3s.iter().find(|h| label_matches(&h.text, &labels.back)),
    };

    let (front_html, back_html) = match (front, back) {
        (None, None) => ("", ""),
        (Some(f), None) => (&body[f.end..], ""),
        (Some(f), Some(b)) if b.start >= f.end => {
            (&body[f.end..b.start], &body[b.end..back_end(body, b.end, None)])
        }
        (Some(f), Some(b)) => (
            &body[f.end..],
            &body[b.end..back_end(body, b.end, Some(f.start))],
        ),
        (None, Some(b)) => ("", &body[b.end..back_end(body, b.end, None)]),
    };

    ExtractedNote {
        note_id: note_id.to_string(),
        front_html: front_html.trim().to_string(),
        back_html: back_html.trim().to_string(),
    }
}

fn label_matches(text: &str, label: &str) -> bool {
    text.trim().to_lowercase() == label.trim().to_lowercase()
}

/// First `<hr>` at or after `from`, capped by `limit`, else the body end.
fn back_end(body: &str, from: usize, limit: Option<usize>) -> usize {
    let cap = limit.unwrap_or(body.len());
    HR_RE
        .find_at(body, from)
        .map(|m| m.start())
        .filter(|&start| start < cap)
        .unwrap_or(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(body: &str) -> ExtractedNote {
        extract_front_back("N", body, &SectionLabels::default())
    }

    #[test]
    fn both_markers_with_rule() {
        let body = "<h3>AFTER_FRONT</h3>\n<p>Q</p>\n<h3>AFTER_BACK</h3>\n<p>A</p>\n<hr />\n<p>trailer</p>";
        let note = extract(body);
        assert_eq!(note.front_html, "<p>Q</p>");
        assert_eq!(note.back_html, "<p>A</p>");
    }

    #[test]
    fn both_markers_without_rule_runs_to_end() {
        let note = extract("<h3>AFTER_FRONT</h3>Q<h3>AFTER_BACK</h3>A <p>more</p> ");
        assert_eq!(note.front_html, "Q");
        assert_eq!(note.back_html, "A <p>more</p>");
    }

    #[test]
    fn front_only_runs_to_section_end() {
        let note = extract("<h3>AFTER_FRONT</h3>Q<hr>still front");
        assert_eq!(note.front_html, "Q<hr>still front");
        assert_eq!(note.back_html, "");
    }

    #[test]
    fn back_only() {
        let note = extract("<p>intro</p><h3>AFTER_BACK</h3>A<HR class=\"end\">tail");
        assert_eq!(note.front_html, "");
        assert_eq!(note.back_html, "A");
    }

    #[test]
    fn neither_marker() {
        let note = extract("<p>just text</p><h3>Notes</h3>");
        assert_eq!(note, ExtractedNote { note_id: "N".into(), ..Default::default() });
        assert!(!note.has_content());
    }

    #[test]
    fn labels_case_insensitive_and_trimmed() {
        let note = extract("<h3 id=\"f\"> after_front </h3>Q<h3><strong>After_Back</strong></h3>A");
        assert_eq!(note.front_html, "Q");
        assert_eq!(note.back_html, "A");
    }

    #[test]
    fn other_h3_stays_inside_front() {
        let note = extract("<h3>AFTER_FRONT</h3>Q<h3>Hint</h3>h<h3>AFTER_BACK</h3>A");
        assert_eq!(note.front_html, "Q<h3>Hint</h3>h");
    }

    #[test]
    fn back_before_front() {
        let note = extract("<h3>AFTER_BACK</h3>A<h3>AFTER_FRONT</h3>Q");
        assert_eq!(note.front_html, "Q");
        assert_eq!(note.back_html, "A");
    }

    #[test]
    fn custom_labels() {
        let labels = SectionLabels {
            front: "QUESTION".into(),
            back: "ANSWER".into(),
        };
        let note = extract_front_back("X", "<h3>Question</h3>q<h3>Answer</h3>a", &labels);
        assert_eq!(note.note_id, "X");
        assert_eq!(note.front_html, "q");
        assert_eq!(note.back_html, "a");
    }
}
