//! Field reconciliation: decide which target fields an extracted note writes.
//!
//! Checks run in a fixed order and the first failing one decides the skip
//! reason. A note whose front cannot be placed is skipped whole; no partial
//! update is ever produced.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use cardfeed_shared::{
    ExtractedNote, NoteUpdate, ReconcileResult, SkipReason, SyncConfig, TargetId, TargetNoteFields,
};

/// Current fields of every fetched target, keyed by id.
pub type TargetIndex = HashMap<TargetId, TargetNoteFields>;

/// Turns extracted notes into updates against known targets.
#[derive(Debug, Clone)]
pub struct FieldReconciler<'a> {
    config: &'a SyncConfig,
    answer_field_override: Option<String>,
}

impl<'a> FieldReconciler<'a> {
    pub fn new(config: &'a SyncConfig) -> Self {
        Self {
            config,
            answer_field_override: None,
        }
    }

    /// Explicit field for legacy `answer_html` payloads.
    pub fn with_answer_field(mut self, field: Option<String>) -> Self {
        self.answer_field_override = field;
        self
    }

    /// Reconcile one note against its resolved target.
    pub fn reconcile(
        &self,
        note: &ExtractedNote,
        target_id: Option<TargetId>,
        targets: &TargetIndex,
    ) -> ReconcileResult {
        let (target_id, fields) = match locate(&note.note_id, target_id, targets) {
            Ok(found) => found,
            Err(skip) => return skip,
        };

        if !note.has_content() {
            return ReconcileResult::skip(&note.note_id, SkipReason::NoContent);
        }

        let mut writes = BTreeMap::new();

        if !note.front_html.is_empty() {
            let front = self.config.front_field();
            if !fields.contains(front) {
                return ReconcileResult::skip(
                    &note.note_id,
                    SkipReason::FrontFieldMissing {
                        field: front.to_string(),
                        available: fields.names(),
                    },
                );
            }
            writes.insert(front.to_string(), note.front_html.clone());
        }

        if !note.back_html.is_empty() {
            let back = match select_back_field(
                fields,
                self.config.back_field_override.as_deref(),
                &self.config.back_candidate_order,
            ) {
                Ok(name) => name,
                Err(reason) => return ReconcileResult::skip(&note.note_id, reason),
            };
            writes.insert(back, note.back_html.clone());
        }

        debug!(note_id = %note.note_id, %target_id, fields = ?writes.keys(), "update prepared");
        ReconcileResult::Update(NoteUpdate {
            note_id: note.note_id.clone(),
            target_id,
            fields: writes,
        })
    }

    /// Reconcile a legacy single-payload row.
    ///
    /// The payload goes where a back fragment would, preferring the answer
    /// field override over the back field override.
    pub fn reconcile_answer(
        &self,
        note_id: &str,
        answer_html: &str,
        target_id: Option<TargetId>,
        targets: &TargetIndex,
    ) -> ReconcileResult {
        let (target_id, fields) = match locate(note_id, target_id, targets) {
            Ok(found) => found,
            Err(skip) => return skip,
        };

        if answer_html.is_empty() {
            return ReconcileResult::skip(note_id, SkipReason::NoContent);
        }

        let explicit = self
            .answer_field_override
            .as_deref()
            .or(self.config.back_field_override.as_deref());

        match select_back_field(fields, explicit, &self.config.back_candidate_order) {
            Ok(name) => ReconcileResult::Update(NoteUpdate {
                note_id: note_id.to_string(),
                target_id,
                fields: BTreeMap::from([(name, answer_html.to_string())]),
            }),
            Err(reason) => ReconcileResult::skip(note_id, reason),
        }
    }
}

fn locate<'t>(
    note_id: &str,
    target_id: Option<TargetId>,
    targets: &'t TargetIndex,
) -> Result<(TargetId, &'t TargetNoteFields), ReconcileResult> {
    let Some(id) = target_id else {
        return Err(ReconcileResult::skip(note_id, SkipReason::NoIdentity));
    };
    match targets.get(&id) {
        Some(fields) => Ok((id, fields)),
        None => Err(ReconcileResult::skip(note_id, SkipReason::TargetMissing)),
    }
}

/// Pick the field receiving back content.
///
/// An explicit field must exist on the target. Otherwise the first present
/// candidate wins, then the second field of a two-field note type.
pub fn select_back_field(
    fields: &TargetNoteFields,
    explicit: Option<&str>,
    candidates: &[String],
) -> Result<String, SkipReason> {
    if let Some(name) = explicit {
        return if fields.contains(name) {
            Ok(name.to_string())
        } else {
            Err(SkipReason::BackFieldNotPresent {
                field: name.to_string(),
                available: fields.names(),
            })
        };
    }

    if let Some(name) = candidates.iter().find(|c| fields.contains(c)) {
        return Ok(name.clone());
    }

    if fields.len() == 2 {
        if let Some(second) = fields.name_at(1) {
            return Ok(second.to_string());
        }
    }

    Err(SkipReason::CannotAutoDetectBackField {
        available: fields.names(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(front: &str, back: &str) -> ExtractedNote {
        ExtractedNote {
            note_id: "n1".into(),
            front_html: front.into(),
            back_html: back.into(),
        }
    }

    fn index(fields: &[&str]) -> TargetIndex {
        HashMap::from([(
            TargetId(1),
            TargetNoteFields::new(fields.iter().map(|f| (*f, ""))),
        )])
    }

    fn update_fields(result: ReconcileResult) -> BTreeMap<String, String> {
        match result {
            ReconcileResult::Update(update) => update.fields,
            other => panic!("expected update, got {other:?}"),
        }
    }

    fn skip_reason(result: ReconcileResult) -> SkipReason {
        match result {
            ReconcileResult::Skip { reason, .. } => reason,
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn front_and_back_written_and_nothing_else() {
        let config = SyncConfig::default();
        let rec = FieldReconciler::new(&config);
        let fields = update_fields(rec.reconcile(&note("Q", "A"), Some(TargetId(1)), &index(&["Front", "Back"])));

        assert_eq!(fields.len(), 2);
        assert_eq!(fields["Front"], "Q");
        assert_eq!(fields["Back"], "A");
    }

    #[test]
    fn three_fields_without_candidate_cannot_auto_detect() {
        let config = SyncConfig::default();
        let rec = FieldReconciler::new(&config);
        let result = rec.reconcile(
            &note("", "A"),
            Some(TargetId(1)),
            &index(&["Front", "Question", "Explanation"]),
        );

        assert_eq!(skip_reason(result).code(), "cannot auto-detect back field");
    }

    #[test]
    fn two_field_note_uses_second_field() {
        let config = SyncConfig::default();
        let rec = FieldReconciler::new(&config);
        let fields = update_fields(rec.reconcile(&note("", "A"), Some(TargetId(1)), &index(&["Front", "Text"])));
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["Text"]);
    }

    #[test]
    fn candidate_order_wins_over_position() {
        let config = SyncConfig::default();
        let rec = FieldReconciler::new(&config);
        let fields = update_fields(rec.reconcile(
            &note("", "A"),
            Some(TargetId(1)),
            &index(&["Front", "Back", "Answer"]),
        ));
        assert!(fields.contains_key("Answer"));
    }

    #[test]
    fn decision_order_short_circuits() {
        let config = SyncConfig::default();
        let rec = FieldReconciler::new(&config);
        let targets = index(&["Front", "Back"]);

        assert_eq!(skip_reason(rec.reconcile(&note("", ""), None, &targets)), SkipReason::NoIdentity);
        assert_eq!(
            skip_reason(rec.reconcile(&note("Q", "A"), Some(TargetId(7)), &targets)),
            SkipReason::TargetMissing
        );
        assert_eq!(
            skip_reason(rec.reconcile(&note("", ""), Some(TargetId(1)), &targets)),
            SkipReason::NoContent
        );
    }

    #[test]
    fn missing_front_field_skips_whole_note() {
        let config = SyncConfig {
            front_field_override: Some("Prompt".into()),
            ..Default::default()
        };
        let rec = FieldReconciler::new(&config);
        let result = rec.reconcile(&note("Q", "A"), Some(TargetId(1)), &index(&["Front", "Back"]));

        assert!(matches!(
            skip_reason(result),
            SkipReason::FrontFieldMissing { ref field, .. } if field == "Prompt"
        ));
    }

    #[test]
    fn explicit_back_field_must_exist() {
        let config = SyncConfig {
            back_field_override: Some("Extra".into()),
            ..Default::default()
        };
        let rec = FieldReconciler::new(&config);
        let result = rec.reconcile(&note("Q", "A"), Some(TargetId(1)), &index(&["Front", "Back"]));

        assert_eq!(skip_reason(result).code(), "back field not present");
    }

    #[test]
    fn front_only_note_writes_front_only() {
        let config = SyncConfig::default();
        let rec = FieldReconciler::new(&config);
        let fields = update_fields(rec.reconcile(
            &note("Q", ""),
            Some(TargetId(1)),
            &index(&["Front", "Question", "Explanation"]),
        ));
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["Front"]);
    }

    #[test]
    fn answer_payload_prefers_answer_override() {
        let config = SyncConfig {
            back_field_override: Some("Back".into()),
            ..Default::default()
        };
        let targets = index(&["Front", "Back", "Notes"]);

        let rec = FieldReconciler::new(&config).with_answer_field(Some("Notes".into()));
        let fields = update_fields(rec.reconcile_answer("n1", "A", Some(TargetId(1)), &targets));
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["Notes"]);

        let rec = FieldReconciler::new(&config);
        let fields = update_fields(rec.reconcile_answer("n1", "A", Some(TargetId(1)), &targets));
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["Back"]);

        assert_eq!(
            skip_reason(rec.reconcile_answer("n1", "", Some(TargetId(1)), &targets)),
            SkipReason::NoContent
        );
    }
}
