//! File-to-file pipelines: canonical notes → import TSV, rendered HTML → update TSV.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use cardfeed_markdown::{CanonicalNote, load_note, render_note};
use cardfeed_sections::{SectionLabels, extract_document};
use cardfeed_shared::{CardfeedError, IdentityMapping, LabelsConfig, Result};

use crate::inputs::expand_inputs;
use crate::tsv::{EXTRACT_COLUMNS, IMPORT_COLUMNS, escape_field, read_identity_map, write_table};

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each note source is loaded.
    fn note_loaded(&self, path: &Path, current: usize, total: usize);
    /// Called after each update request, whatever its outcome.
    fn update_sent(&self, note_id: &str, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn note_loaded(&self, _path: &Path, _current: usize, _total: usize) {}
    fn update_sent(&self, _note_id: &str, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Configuration for the `export` pipeline.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Note paths, directories, or glob patterns.
    pub inputs: Vec<String>,
    /// Import TSV to write.
    pub output: PathBuf,
    /// Optional `note_id` → `noteId` mapping.
    pub mapping: Option<PathBuf>,
    /// Keep only the first N loaded notes.
    pub limit: Option<usize>,
    /// Replace an existing output file.
    pub overwrite: bool,
    pub labels: LabelsConfig,
}

/// Result of the `export` pipeline.
#[derive(Debug)]
pub struct ExportResult {
    pub rows: usize,
    pub output: PathBuf,
    /// Extra field columns after the fixed ones.
    pub extra_columns: Vec<String>,
    pub elapsed: Duration,
}

/// Render canonical notes into an import TSV.
///
/// 1. Resolve inputs
/// 2. Load and render notes
/// 3. Attach target ids from the mapping
/// 4. Write rows sorted by `note_id`
#[instrument(skip_all, fields(output = %config.output.display()))]
pub fn export_notes(config: &ExportConfig, progress: &dyn ProgressReporter) -> Result<ExportResult> {
    let start = Instant::now();
    refuse_overwrite(&config.output, config.overwrite)?;

    progress.phase("Resolving inputs");
    let mut paths = expand_inputs(&config.inputs)?;
    if let Some(limit) = config.limit {
        paths.truncate(limit);
    }

    let mapping = load_mapping(config.mapping.as_deref())?;

    progress.phase("Rendering notes");
    let mut notes = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        let note = load_note(path)?;
        let rendered = render_note(&note, &config.labels);
        progress.note_loaded(path, i + 1, paths.len());
        notes.push((note, rendered));
    }
    notes.sort_by(|a, b| a.0.note_id.cmp(&b.0.note_id));

    let extra_columns: Vec<String> = notes
        .iter()
        .flat_map(|(note, _)| note.fields.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let headers: Vec<String> = IMPORT_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(extra_columns.iter().cloned())
        .collect();

    progress.phase("Writing TSV");
    let records = notes.iter().map(|(note, rendered)| {
        let mut record = vec![
            escape_field(&note.note_id),
            target_cell(&mapping, note),
            escape_field(&note.model),
            escape_field(&note.deck),
            escape_field(&note.tags.join(" ")),
            escape_field(&rendered.front_html),
            escape_field(&rendered.back_html),
        ];
        record.extend(
            extra_columns
                .iter()
                .map(|key| escape_field(note.fields.get(key).map_or("", String::as_str))),
        );
        record
    });
    let rows = write_table(&config.output, &headers, records)?;

    let result = ExportResult {
        rows,
        output: config.output.clone(),
        extra_columns,
        elapsed: start.elapsed(),
    };

    info!(
        rows = result.rows,
        extras = result.extra_columns.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "export complete"
    );

    Ok(result)
}

fn target_cell(mapping: &IdentityMapping, note: &CanonicalNote) -> String {
    mapping
        .get(&note.note_id)
        .map(|id| id.to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Extract
// ---------------------------------------------------------------------------

/// Configuration for the `extract` pipeline.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Rendered HTML document holding many notes.
    pub input: PathBuf,
    /// Update TSV to write.
    pub output: PathBuf,
    /// Optional `note_id` → `noteId` mapping.
    pub mapping: Option<PathBuf>,
    pub labels: LabelsConfig,
}

/// Result of the `extract` pipeline.
#[derive(Debug)]
pub struct ExtractResult {
    pub rows: usize,
    /// Rows that already carry a target id.
    pub mapped: usize,
    /// Sections with neither a front nor a back label.
    pub unlabeled: Vec<String>,
    pub output: PathBuf,
    pub elapsed: Duration,
}

/// Split a rendered document into one update row per note section.
#[instrument(skip_all, fields(input = %config.input.display()))]
pub fn extract_notes(config: &ExtractConfig, progress: &dyn ProgressReporter) -> Result<ExtractResult> {
    let start = Instant::now();

    progress.phase("Reading document");
    let html = std::fs::read_to_string(&config.input)
        .map_err(|e| CardfeedError::io(&config.input, e))?;
    let mapping = load_mapping(config.mapping.as_deref())?;

    progress.phase("Extracting sections");
    let labels = SectionLabels::from(&config.labels);
    let notes = extract_document(&html, &labels);

    let mut mapped = 0;
    let mut unlabeled = Vec::new();
    let records: Vec<Vec<String>> = notes
        .iter()
        .map(|doc| {
            let note = &doc.note;
            let target = mapping.get(&note.note_id);
            if target.is_some() {
                mapped += 1;
            }
            if !note.has_content() {
                warn!(note_id = %note.note_id, "section has no front or back content");
                unlabeled.push(note.note_id.clone());
            }

            let answer = if !note.back_html.is_empty() {
                note.back_html.as_str()
            } else if !note.front_html.is_empty() {
                note.front_html.as_str()
            } else {
                doc.section.body_of(&html).trim()
            };

            vec![
                escape_field(&note.note_id),
                target.map(|id| id.to_string()).unwrap_or_default(),
                escape_field(&note.front_html),
                escape_field(&note.back_html),
                escape_field(answer),
            ]
        })
        .collect();

    progress.phase("Writing TSV");
    let headers: Vec<String> = EXTRACT_COLUMNS.iter().map(|c| c.to_string()).collect();
    let rows = write_table(&config.output, &headers, records)?;

    let result = ExtractResult {
        rows,
        mapped,
        unlabeled,
        output: config.output.clone(),
        elapsed: start.elapsed(),
    };

    info!(
        rows = result.rows,
        mapped = result.mapped,
        unlabeled = result.unlabeled.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "extract complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_mapping(path: Option<&Path>) -> Result<IdentityMapping> {
    match path {
        Some(path) => read_identity_map(path),
        None => Ok(IdentityMapping::new()),
    }
}

fn refuse_overwrite(output: &Path, overwrite: bool) -> Result<()> {
    if output.exists() && !overwrite {
        return Err(CardfeedError::validation(format!(
            "{} already exists (pass --overwrite to replace it)",
            output.display()
        )));
    }
    Ok(())
}
