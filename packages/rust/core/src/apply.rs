//! Sending prepared updates, or previewing them in a dry run.

use tracing::{info, warn};

use cardfeed_ankiconnect::AnkiApi;
use cardfeed_shared::{NoteUpdate, PreviewConfig};

use crate::pipeline::ProgressReporter;

/// An update the target application rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpdate {
    pub note_id: String,
    pub error: String,
}

/// Outcome of sending a batch of updates.
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    pub sent: usize,
    pub failed: Vec<FailedUpdate>,
}

/// Send each update in its own request.
///
/// A rejected update is logged and recorded; the remaining updates are
/// still sent.
pub async fn apply_updates<A: AnkiApi>(
    api: &A,
    updates: &[NoteUpdate],
    progress: &dyn ProgressReporter,
) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();

    for (i, update) in updates.iter().enumerate() {
        match api.update_note_fields(update).await {
            Ok(()) => outcome.sent += 1,
            Err(e) => {
                warn!(
                    note_id = %update.note_id,
                    target_id = %update.target_id,
                    error = %e,
                    "update rejected"
                );
                outcome.failed.push(FailedUpdate {
                    note_id: update.note_id.clone(),
                    error: e.to_string(),
                });
            }
        }
        progress.update_sent(&update.note_id, i + 1, updates.len());
    }

    info!(sent = outcome.sent, failed = outcome.failed.len(), "updates applied");
    outcome
}

/// Preview lines for the first few pending updates, one per field.
pub fn preview_lines(updates: &[NoteUpdate], preview: &PreviewConfig) -> Vec<String> {
    updates
        .iter()
        .take(preview.sample_size)
        .flat_map(|update| {
            update.fields.iter().map(move |(field, value)| {
                format!(
                    "DRY RUN: noteId={} field={field} value[:{n}]={}",
                    update.target_id,
                    snippet(value, preview.snippet_len),
                    n = preview.snippet_len,
                )
            })
        })
        .collect()
}

fn snippet(value: &str, len: usize) -> String {
    value.chars().take(len).collect::<String>().replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use cardfeed_shared::TargetId;

    use crate::pipeline::SilentProgress;
    use crate::testing::FakeAnki;

    fn update(note_id: &str, id: i64, fields: &[(&str, &str)]) -> NoteUpdate {
        NoteUpdate {
            note_id: note_id.into(),
            target_id: TargetId(id),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn rejected_update_does_not_stop_the_run() {
        let anki = FakeAnki::default().rejecting(2);
        let updates = vec![
            update("a", 1, &[("Back", "x")]),
            update("b", 2, &[("Back", "y")]),
            update("c", 3, &[("Back", "z")]),
        ];

        let outcome = apply_updates(&anki, &updates, &SilentProgress).await;

        assert_eq!(outcome.sent, 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].note_id, "b");
        let sent: Vec<_> = anki.updates().iter().map(|u| u.target_id).collect();
        assert_eq!(sent, vec![TargetId(1), TargetId(3)]);
    }

    #[test]
    fn preview_is_bounded_and_escapes_newlines() {
        let preview = PreviewConfig {
            sample_size: 2,
            snippet_len: 6,
        };
        let updates = vec![
            update("a", 1, &[("Back", "ab\ncdefgh"), ("Front", "q")]),
            update("b", 2, &[("Back", "short")]),
            update("c", 3, &[("Back", "hidden")]),
        ];

        let lines = preview_lines(&updates, &preview);
        assert_eq!(
            lines,
            vec![
                "DRY RUN: noteId=1 field=Back value[:6]=ab\\ncde",
                "DRY RUN: noteId=1 field=Front value[:6]=q",
                "DRY RUN: noteId=2 field=Back value[:6]=short",
            ]
        );
    }
}
