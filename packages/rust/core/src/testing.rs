//! In-memory [`AnkiApi`] used by the pipeline tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use cardfeed_ankiconnect::{AnkiApi, NoteInfo, exact_field_query};
use cardfeed_shared::{CardfeedError, NoteUpdate, Result, TargetId, TargetNoteFields};

#[derive(Default)]
pub struct FakeAnki {
    search: HashMap<String, Vec<TargetId>>,
    notes: BTreeMap<TargetId, TargetNoteFields>,
    rejected: HashSet<TargetId>,
    unreachable: bool,
    failing_lookups: bool,
    queries: Mutex<Vec<String>>,
    info_calls: Mutex<Vec<Vec<TargetId>>>,
    updates: Mutex<Vec<NoteUpdate>>,
}

impl FakeAnki {
    /// Make `note_id` findable on the default `NoteID` field.
    pub fn with_identity(mut self, note_id: &str, ids: &[i64]) -> Self {
        self.search.insert(
            exact_field_query("NoteID", note_id),
            ids.iter().copied().map(TargetId).collect(),
        );
        self
    }

    pub fn with_note(mut self, id: i64, fields: &[&str]) -> Self {
        self.notes.insert(
            TargetId(id),
            TargetNoteFields::new(fields.iter().map(|name| (*name, ""))),
        );
        self
    }

    pub fn rejecting(mut self, id: i64) -> Self {
        self.rejected.insert(TargetId(id));
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn failing_lookups(mut self) -> Self {
        self.failing_lookups = true;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn info_calls(&self) -> Vec<Vec<TargetId>> {
        self.info_calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<NoteUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

impl AnkiApi for FakeAnki {
    async fn version(&self) -> Result<u32> {
        if self.unreachable {
            return Err(CardfeedError::Network("connection refused".into()));
        }
        Ok(6)
    }

    async fn find_notes(&self, query: &str) -> Result<Vec<TargetId>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.failing_lookups {
            return Err(CardfeedError::protocol("findNotes", "collection is not available"));
        }
        Ok(self.search.get(query).cloned().unwrap_or_default())
    }

    async fn notes_info(&self, ids: &[TargetId]) -> Result<Vec<NoteInfo>> {
        self.info_calls.lock().unwrap().push(ids.to_vec());
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.notes.get(id).map(|fields| NoteInfo {
                    target_id: *id,
                    fields: fields.clone(),
                })
            })
            .collect())
    }

    async fn update_note_fields(&self, update: &NoteUpdate) -> Result<()> {
        if self.rejected.contains(&update.target_id) {
            return Err(CardfeedError::protocol("updateNoteFields", "cannot update note"));
        }
        self.updates.lock().unwrap().push(update.clone());
        Ok(())
    }
}
