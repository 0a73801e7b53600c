//! Minimal front/back renderer for canonical notes.
//!
//! Splits the markdown body at the front/back label headings and renders
//! each part with `pulldown-cmark`. Styling and layout are left to the
//! note type on the flashcard side.

use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};

use cardfeed_shared::LabelsConfig;

use crate::note::CanonicalNote;

/// Rendered HTML fragments of one note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedNote {
    pub front_html: String,
    pub back_html: String,
}

/// Render a note's front and back parts.
///
/// A body without any label heading renders entirely as the front.
pub fn render_note(note: &CanonicalNote, labels: &LabelsConfig) -> RenderedNote {
    let (front_md, back_md) = split_body(&note.body, labels);
    RenderedNote {
        front_html: markdown_to_html(&front_md),
        back_html: markdown_to_html(&back_md),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Front,
    Back,
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

/// Headings whose text is one of the labels, with their source ranges.
///
/// Only real headings count; label text inside code blocks is content.
fn label_headings(body: &str, labels: &LabelsConfig) -> Vec<(Part, Range<usize>)> {
    let mut found = Vec::new();
    let mut current: Option<(Range<usize>, String)> = None;

    for (event, range) in Parser::new_ext(body, markdown_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { .. }) => current = Some((range, String::new())),
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, heading)) = current.as_mut() {
                    heading.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                let Some((range, heading)) = current.take() else {
                    continue;
                };
                let heading = heading.trim();
                if heading.eq_ignore_ascii_case(labels.front.trim()) {
                    found.push((Part::Front, range));
                } else if heading.eq_ignore_ascii_case(labels.back.trim()) {
                    found.push((Part::Back, range));
                }
            }
            _ => {}
        }
    }

    found
}

fn split_body(body: &str, labels: &LabelsConfig) -> (String, String) {
    let markers = label_headings(body, labels);
    if markers.is_empty() {
        return (body.to_string(), String::new());
    }

    let mut front = Vec::new();
    let mut back = Vec::new();
    for (i, (part, range)) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map_or(body.len(), |(_, next)| next.start);
        let segment = &body[range.end..end];
        match part {
            Part::Front => front.push(segment),
            Part::Back => back.push(segment),
        }
    }

    (front.join("\n"), back.join("\n"))
}

fn markdown_to_html(md: &str) -> String {
    if md.trim().is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(md.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(md, markdown_options()));
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn note_with_body(body: &str) -> CanonicalNote {
        CanonicalNote {
            path: PathBuf::from("n.md"),
            note_id: "n".into(),
            model: "Basic".into(),
            deck: "Default".into(),
            tags: vec![],
            fields: Default::default(),
            body: body.into(),
        }
    }

    #[test]
    fn renders_both_parts() {
        let note = note_with_body(
            "# Title\n\n### AFTER_FRONT\nWhat is **ATP**?\n\n### AFTER_BACK\n- energy\n- currency\n",
        );
        let rendered = render_note(&note, &LabelsConfig::default());

        assert_eq!(rendered.front_html, "<p>What is <strong>ATP</strong>?</p>");
        assert!(rendered.back_html.starts_with("<ul>"));
        assert!(rendered.back_html.contains("<li>energy</li>"));
        assert!(!rendered.front_html.contains("Title"));
    }

    #[test]
    fn body_without_labels_is_front() {
        let rendered = render_note(&note_with_body("Plain ~~old~~ text"), &LabelsConfig::default());
        assert_eq!(rendered.front_html, "<p>Plain <del>old</del> text</p>");
        assert_eq!(rendered.back_html, "");
    }

    #[test]
    fn label_headings_any_level_and_case() {
        let note = note_with_body("## after_front ##\nQ\n#### After_Back\nA");
        let rendered = render_note(&note, &LabelsConfig::default());
        assert_eq!(rendered.front_html, "<p>Q</p>");
        assert_eq!(rendered.back_html, "<p>A</p>");
    }

    #[test]
    fn labels_inside_code_fences_are_content() {
        let note = note_with_body(
            "### AFTER_FRONT\nShow a heading:\n\n```md\n# AFTER_BACK\n```\n\n### AFTER_BACK\nA\n",
        );
        let rendered = render_note(&note, &LabelsConfig::default());

        assert!(rendered.front_html.contains("<code class=\"language-md\"># AFTER_BACK"));
        assert_eq!(rendered.back_html, "<p>A</p>");
    }

    #[test]
    fn setext_label_heading_splits() {
        let note = note_with_body("AFTER_FRONT\n---\nQ\n\nAFTER_BACK\n===\nA");
        let rendered = render_note(&note, &LabelsConfig::default());
        assert_eq!(rendered.front_html, "<p>Q</p>");
        assert_eq!(rendered.back_html, "<p>A</p>");
    }

    #[test]
    fn tables_render() {
        let note = note_with_body("### AFTER_BACK\n| a | b |\n|---|---|\n| 1 | 2 |\n");
        let rendered = render_note(&note, &LabelsConfig::default());
        assert!(rendered.back_html.contains("<table>"));
        assert_eq!(rendered.front_html, "");
    }
}
