//! Tab-separated boundary formats.
//!
//! Every file has a header row and a `\t` delimiter. Values are escaped on
//! write so each record stays on one physical line; on read only the
//! newline escape is reversed.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use cardfeed_shared::{CardfeedError, IdentityMapping, Result, TargetId};

/// Columns of the extraction output.
pub const EXTRACT_COLUMNS: [&str; 5] = ["note_id", "noteId", "front_html", "back_html", "answer_html"];

/// Leading columns of the import feed; extra note fields follow.
pub const IMPORT_COLUMNS: [&str; 7] = [
    "note_id",
    "noteId",
    "model",
    "deck",
    "tags",
    "front_html",
    "back_html",
];

/// Content columns accepted by the update reader.
const CONTENT_COLUMNS: [&str; 3] = ["answer_html", "back_html", "front_html"];

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Make a value safe for a single TSV line.
///
/// Line endings become `\n`, tabs become `\t`. A backslash is doubled only
/// where it would otherwise be read back as part of an escape.
pub fn escape_field(value: &str) -> String {
    let normalized = value.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(normalized.len());
    let mut chars = normalized.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => {
                out.push('\\');
                if matches!(chars.peek(), Some('\\' | 'n' | '\n' | '\t')) {
                    out.push('\\');
                }
            }
            other => out.push(other),
        }
    }

    out
}

/// Reverse the newline escape. `\t` stays as the two characters.
pub fn unescape_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            _ => out.push('\\'),
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Generic table I/O
// ---------------------------------------------------------------------------

/// A TSV file read into header-keyed rows.
#[derive(Debug, Clone)]
pub struct TsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl TsvTable {
    fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.headers.iter().any(|h| h == *c))
            .map(|c| c.to_string())
            .collect()
    }

    fn require_columns(&self, required: &[&str], path: &Path) -> Result<()> {
        let missing = self.missing_columns(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CardfeedError::MissingColumns {
                columns: missing,
                path: path.to_path_buf(),
            })
        }
    }
}

/// Read a tab-separated file with a header row.
pub fn read_table(path: &Path) -> Result<TsvTable> {
    let file = std::fs::File::open(path).map_err(|e| CardfeedError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CardfeedError::Csv(format!("{}: {e}", path.display())))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CardfeedError::Csv(format!("{}: {e}", path.display())))?;
        let row: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(row);
    }

    debug!(path = %path.display(), rows = rows.len(), "TSV read");
    Ok(TsvTable { headers, rows })
}

/// Write a header row and records, creating parent directories.
pub fn write_table<I>(path: &Path, headers: &[String], records: I) -> Result<usize>
where
    I: IntoIterator<Item = Vec<String>>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CardfeedError::io(parent, e))?;
    }

    let file = std::fs::File::create(path).map_err(|e| CardfeedError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(file);
    let csv_err = |e: csv::Error| CardfeedError::Csv(format!("{}: {e}", path.display()));

    writer.write_record(headers).map_err(csv_err)?;
    let mut count = 0;
    for record in records {
        writer.write_record(&record).map_err(csv_err)?;
        count += 1;
    }
    writer
        .flush()
        .map_err(|e| CardfeedError::io(path, e))?;

    Ok(count)
}

fn cell<'a>(row: &'a HashMap<String, String>, column: &str) -> &'a str {
    row.get(column).map(String::as_str).unwrap_or("").trim()
}

// ---------------------------------------------------------------------------
// Identity mapping
// ---------------------------------------------------------------------------

/// Read a `note_id` → `noteId` mapping.
///
/// Rows missing either value are ignored; rows with a non-numeric `noteId`
/// are ignored with a warning.
pub fn read_identity_map(path: &Path) -> Result<IdentityMapping> {
    let table = read_table(path)?;
    table.require_columns(&["note_id", "noteId"], path)?;

    let mut mapping = IdentityMapping::new();
    for row in &table.rows {
        let note_id = cell(row, "note_id");
        let target = cell(row, "noteId");
        if note_id.is_empty() || target.is_empty() {
            continue;
        }
        match target.parse::<TargetId>() {
            Ok(id) => {
                mapping.insert(note_id.to_string(), id);
            }
            Err(_) => warn!(note_id, value = target, "ignoring non-numeric noteId in mapping"),
        }
    }

    debug!(path = %path.display(), entries = mapping.len(), "identity mapping loaded");
    Ok(mapping)
}

// ---------------------------------------------------------------------------
// Update rows
// ---------------------------------------------------------------------------

/// One row of an update feed, newline escapes already reversed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRow {
    pub note_id: String,
    /// Target id supplied by the feed, if any.
    pub target_id: Option<TargetId>,
    pub front_html: String,
    pub back_html: String,
    /// Legacy single-field payload.
    pub answer_html: String,
}

/// Rows of an update feed plus the shape of its header.
#[derive(Debug, Clone, Default)]
pub struct UpdateFeed {
    pub rows: Vec<UpdateRow>,
    /// The feed has `answer_html` but neither `front_html` nor `back_html`.
    pub answer_only: bool,
}

/// Read an update feed (`note_id`, `noteId`, and at least one content column).
pub fn read_update_rows(path: &Path) -> Result<UpdateFeed> {
    let table = read_table(path)?;
    table.require_columns(&["note_id", "noteId"], path)?;

    if table.missing_columns(&CONTENT_COLUMNS).len() == CONTENT_COLUMNS.len() {
        return Err(CardfeedError::validation(format!(
            "{}: TSV must include at least one content column from {CONTENT_COLUMNS:?}; found columns: {:?}",
            path.display(),
            table.headers
        )));
    }

    let answer_only = table.missing_columns(&["front_html", "back_html"]).len() == 2;

    let mut rows = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        if row.values().all(|v| v.trim().is_empty()) {
            continue;
        }

        let raw_id = cell(row, "noteId");
        let target_id = if raw_id.is_empty() {
            None
        } else {
            Some(raw_id.parse::<TargetId>().map_err(|_| {
                CardfeedError::validation(format!(
                    "{}: row {}: noteId '{raw_id}' is not numeric",
                    path.display(),
                    i + 2
                ))
            })?)
        };

        rows.push(UpdateRow {
            note_id: cell(row, "note_id").to_string(),
            target_id,
            front_html: unescape_field(row.get("front_html").map_or("", String::as_str)),
            back_html: unescape_field(row.get("back_html").map_or("", String::as_str)),
            answer_html: unescape_field(row.get("answer_html").map_or("", String::as_str)),
        });
    }

    Ok(UpdateFeed { rows, answer_only })
}
