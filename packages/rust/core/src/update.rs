//! Update flow: push extracted fragments into existing target notes.
//!
//! Reads an update TSV, resolves target ids, fetches the targets' current
//! fields in one batch, reconciles every row and then either sends the
//! updates one note at a time or prints a dry-run preview.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use cardfeed_ankiconnect::AnkiApi;
use cardfeed_shared::{
    ExtractedNote, IdentityMapping, NoteUpdate, PreviewConfig, ReconcileResult, Result, SkipReason,
    SyncConfig, TargetId,
};

use crate::apply::{FailedUpdate, apply_updates, preview_lines};
use crate::pipeline::ProgressReporter;
use crate::reconcile::{FieldReconciler, TargetIndex};
use crate::resolve::{AmbiguousIdentity, IdentityResolver};
use crate::tsv::{UpdateRow, read_identity_map, read_update_rows};

// ---------------------------------------------------------------------------
// Update config & result
// ---------------------------------------------------------------------------

/// Configuration for the `update` pipeline.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Update TSV to read.
    pub input: PathBuf,
    /// Optional mapping used before falling back to lookups.
    pub mapping: Option<PathBuf>,
    /// Process only the first N rows.
    pub limit: Option<usize>,
    /// Preview instead of writing.
    pub dry_run: bool,
    pub sync: SyncConfig,
    /// Explicit field for legacy `answer_html` rows.
    pub answer_field: Option<String>,
    pub preview: PreviewConfig,
}

/// A row that did not produce an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedNote {
    pub note_id: String,
    pub reason: SkipReason,
}

/// Result of the `update` pipeline.
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Rows read from the TSV (after `limit`).
    pub rows: usize,
    /// Updates prepared by reconciliation.
    pub prepared: usize,
    pub skipped: Vec<SkippedNote>,
    pub sent: usize,
    pub failed: Vec<FailedUpdate>,
    pub ambiguous: Vec<AmbiguousIdentity>,
    /// Dry-run preview lines; empty when updates were sent.
    pub preview: Vec<String>,
    pub dry_run: bool,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full `update` pipeline against `api`.
///
/// Unreachable endpoints and failed lookups abort the run; per-note
/// problems are recorded as skips or failures.
#[instrument(skip_all, fields(input = %config.input.display(), dry_run = config.dry_run))]
pub async fn run_update<A: AnkiApi>(
    api: &A,
    config: &UpdateConfig,
    progress: &dyn ProgressReporter,
) -> Result<UpdateResult> {
    let start = Instant::now();

    // --- Phase 1: Read rows ---
    progress.phase("Reading update rows");
    let feed = read_update_rows(&config.input)?;
    let answer_only = feed.answer_only;
    let mut rows = feed.rows;
    if let Some(limit) = config.limit {
        rows.truncate(limit);
    }
    let mapping = match &config.mapping {
        Some(path) => read_identity_map(path)?,
        None => IdentityMapping::new(),
    };

    // --- Phase 2: Reachability ---
    progress.phase("Checking AnkiConnect");
    let version = api.version().await?;
    info!(version, rows = rows.len(), "AnkiConnect reachable");

    // --- Phase 3: Identities ---
    progress.phase("Resolving note identities");
    let requests: Vec<(String, Option<TargetId>)> = rows
        .iter()
        .map(|row| {
            let supplied = row.target_id.or_else(|| mapping.get(&row.note_id).copied());
            (row.note_id.clone(), supplied)
        })
        .collect();
    let resolution = IdentityResolver::new(api, &config.sync)
        .resolve(&requests)
        .await?;

    // --- Phase 4: Fetch targets ---
    progress.phase("Fetching target notes");
    let ids = unique_ids(&resolution.targets);
    let targets: TargetIndex = if ids.is_empty() {
        TargetIndex::new()
    } else {
        api.notes_info(&ids)
            .await?
            .into_iter()
            .map(|info| (info.target_id, info.fields))
            .collect()
    };

    // --- Phase 5: Reconcile ---
    progress.phase("Reconciling fields");
    let reconciler =
        FieldReconciler::new(&config.sync).with_answer_field(config.answer_field.clone());
    let mut updates: Vec<NoteUpdate> = Vec::new();
    let mut skipped = Vec::new();

    for (row, target) in rows.iter().zip(&resolution.targets) {
        match reconcile_row(&reconciler, row, answer_only, *target, &targets) {
            ReconcileResult::Update(update) => updates.push(update),
            ReconcileResult::Skip { note_id, reason } => {
                warn!(note_id = %note_id, reason = reason.code(), detail = %reason, "skipping note");
                skipped.push(SkippedNote { note_id, reason });
            }
        }
    }

    // --- Phase 6: Apply or preview ---
    let mut result = UpdateResult {
        rows: rows.len(),
        prepared: updates.len(),
        skipped,
        ambiguous: resolution.ambiguous,
        dry_run: config.dry_run,
        ..Default::default()
    };

    if config.dry_run {
        result.preview = preview_lines(&updates, &config.preview);
    } else {
        progress.phase("Sending updates");
        let outcome = apply_updates(api, &updates, progress).await;
        result.sent = outcome.sent;
        result.failed = outcome.failed;
    }
    result.elapsed = start.elapsed();

    info!(
        rows = result.rows,
        prepared = result.prepared,
        skipped = result.skipped.len(),
        sent = result.sent,
        failed = result.failed.len(),
        ambiguous = result.ambiguous.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "update complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Feeds with only `answer_html` carry a single payload per row. In any
/// other feed `answer_html` is an alias and never written.
fn reconcile_row(
    reconciler: &FieldReconciler<'_>,
    row: &UpdateRow,
    answer_only: bool,
    target: Option<TargetId>,
    targets: &TargetIndex,
) -> ReconcileResult {
    if answer_only {
        return reconciler.reconcile_answer(&row.note_id, row.answer_html.trim(), target, targets);
    }

    let note = ExtractedNote {
        note_id: row.note_id.clone(),
        front_html: row.front_html.trim().to_string(),
        back_html: row.back_html.trim().to_string(),
    };
    reconciler.reconcile(&note, target, targets)
}

/// Resolved ids, de-duplicated, first occurrence first.
fn unique_ids(targets: &[Option<TargetId>]) -> Vec<TargetId> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .flatten()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
