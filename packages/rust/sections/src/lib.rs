//! Section-scoped extraction of front/back fragments from rendered note HTML.
//!
//! A rendered deck is one HTML document in which every note starts with an
//! `<h2>` carrying its id and holds `<h3>AFTER_FRONT</h3>` / `<h3>AFTER_BACK</h3>`
//! sub-sections. This crate provides:
//! - [`scan_headings`]: locate H2/H3 markers with decoded text
//! - [`partition_sections`]: slice the document into per-note bodies
//! - [`extract_front_back`]: pull the two labeled fragments out of one body

mod extract;
mod partition;
mod scanner;

use tracing::{debug, instrument};

use cardfeed_shared::{ExtractedNote, NoteSection};

pub use extract::{SectionLabels, extract_front_back};
pub use partition::partition_sections;
pub use scanner::{decode_entities, heading_text, scan_headings};

/// A note section together with what was extracted from it.
#[derive(Debug, Clone)]
pub struct DocumentNote {
    pub section: NoteSection,
    pub note: ExtractedNote,
}

/// Run scanner → partitioner → extractor over a whole document.
#[instrument(skip_all, fields(len = html.len()))]
pub fn extract_document(html: &str, labels: &SectionLabels) -> Vec<DocumentNote> {
    let headings = scan_headings(html);
    let sections = partition_sections(html, &headings);

    debug!(
        headings = headings.len(),
        sections = sections.len(),
        "document partitioned"
    );

    sections
        .into_iter()
        .map(|section| {
            let note = extract_front_back(&section.note_id, section.body_of(html), labels);
            DocumentNote { section, note }
        })
        .collect()
}
