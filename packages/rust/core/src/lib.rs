//! Core pipeline orchestration and domain logic for cardfeed.
//!
//! This crate ties together note loading, section extraction, identity
//! resolution and field reconciliation into the three end-to-end flows:
//! [`export_notes`], [`extract_notes`] and [`run_update`].

pub mod apply;
pub mod inputs;
pub mod pipeline;
pub mod reconcile;
pub mod resolve;
pub mod tsv;
pub mod update;

#[cfg(test)]
mod testing;

pub use pipeline::{
    ExportConfig, ExportResult, ExtractConfig, ExtractResult, ProgressReporter, SilentProgress,
    export_notes, extract_notes,
};
pub use update::{SkippedNote, UpdateConfig, UpdateResult, run_update};
