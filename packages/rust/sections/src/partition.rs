//! Split a concatenated document into per-note sections at H2 boundaries.

use tracing::debug;

use cardfeed_shared::{Heading, HeadingLevel, NoteSection};

/// One section per H2 heading with non-empty text.
///
/// A body runs from the end of its H2 to the start of the next H2 (or the
/// end of the document). H3 headings are not boundaries. Empty-text H2s
/// still end the previous section but produce none of their own. Duplicate
/// ids yield independent sections.
pub fn partition_sections(html: &str, headings: &[Heading]) -> Vec<NoteSection> {
    let h2s: Vec<&Heading> = headings
        .iter()
        .filter(|h| h.level == HeadingLevel::H2)
        .collect();

    let mut sections = Vec::with_capacity(h2s.len());

    for (i, h2) in h2s.iter().enumerate() {
        if h2.text.is_empty() {
            debug!(offset = h2.start, "skipping H2 with empty text");
            continue;
        }

        let end = h2s.get(i + 1).map_or(html.len(), |next| next.start);
        sections.push(NoteSection {
            note_id: h2.text.clone(),
            body: h2.end..end,
        });
    }

    sections
}
