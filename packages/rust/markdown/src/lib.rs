//! Canonical note sources: front-matter loading and front/back rendering.
//!
//! A canonical note is a markdown file with a YAML front-matter block:
//!
//! ```markdown
//! ---
//! note_id: bio-001
//! anki:
//!   model: Basic
//!   deck: Biology
//! tags: [cells]
//! ---
//! ### AFTER_FRONT
//! Question
//! ### AFTER_BACK
//! Answer
//! ```

mod note;
mod render;

pub use note::{CanonicalNote, load_note, parse_note};
pub use render::{RenderedNote, render_note};
