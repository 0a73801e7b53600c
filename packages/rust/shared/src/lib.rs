//! Shared types, error model, and configuration for cardfeed.
//!
//! This crate is the foundation depended on by all other cardfeed crates.
//! It provides:
//! - [`CardfeedError`]: the unified error type
//! - Domain types ([`Heading`], [`NoteSection`], [`ExtractedNote`], [`TargetId`],
//!   [`TargetNoteFields`], [`ReconcileResult`])
//! - Configuration ([`AppConfig`], [`SyncConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnkiConfig, AppConfig, FieldsConfig, LabelsConfig, PreviewConfig, SyncConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{CardfeedError, Result};
pub use types::{
    ExtractedNote, Heading, HeadingLevel, IdentityMapping, NoteSection, NoteUpdate,
    ReconcileResult, SkipReason, TargetId, TargetNoteFields,
};
