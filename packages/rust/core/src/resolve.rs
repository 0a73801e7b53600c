//! Identity resolution: canonical note ids → target ids.
//!
//! Supplied ids are kept as-is. Blank ones are looked up by an exact match
//! on the identity field, once per distinct note id.

use std::collections::HashMap;

use tracing::{debug, instrument, warn};

use cardfeed_ankiconnect::{AnkiApi, exact_field_query};
use cardfeed_shared::{IdentityMapping, Result, SyncConfig, TargetId};

/// A lookup that matched more than one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousIdentity {
    pub note_id: String,
    /// Every match, in lookup order. The first was adopted.
    pub candidates: Vec<TargetId>,
}

/// Result of resolving a batch of identities.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolution {
    /// One entry per request, in request order.
    pub targets: Vec<Option<TargetId>>,
    /// Ids found by lookup during this run.
    pub looked_up: IdentityMapping,
    pub ambiguous: Vec<AmbiguousIdentity>,
    /// Note ids the lookup could not resolve, in first-seen order.
    pub unresolved: Vec<String>,
    /// Number of lookups actually issued.
    pub lookups: usize,
}

/// Resolves target ids through the flashcard application's search.
pub struct IdentityResolver<'a, A> {
    api: &'a A,
    identity_field: String,
}

impl<'a, A: AnkiApi> IdentityResolver<'a, A> {
    pub fn new(api: &'a A, config: &SyncConfig) -> Self {
        Self {
            api,
            identity_field: config.identity_field_name.clone(),
        }
    }

    /// Resolve `(note_id, supplied_target_id)` pairs.
    ///
    /// A failing lookup aborts the whole resolution.
    #[instrument(skip_all, fields(requests = requests.len(), field = %self.identity_field))]
    pub async fn resolve(&self, requests: &[(String, Option<TargetId>)]) -> Result<IdentityResolution> {
        let mut memo: HashMap<&str, Option<TargetId>> = HashMap::new();
        let mut resolution = IdentityResolution {
            targets: Vec::with_capacity(requests.len()),
            ..Default::default()
        };

        for (note_id, supplied) in requests {
            if let Some(id) = supplied {
                resolution.targets.push(Some(*id));
                continue;
            }
            if note_id.is_empty() {
                resolution.targets.push(None);
                continue;
            }
            if let Some(found) = memo.get(note_id.as_str()) {
                resolution.targets.push(*found);
                continue;
            }

            let query = exact_field_query(&self.identity_field, note_id);
            let matches = self.api.find_notes(&query).await?;
            resolution.lookups += 1;

            let found = match matches.as_slice() {
                [] => {
                    debug!(note_id = %note_id, "no target matched");
                    resolution.unresolved.push(note_id.clone());
                    None
                }
                [only] => Some(*only),
                [first, ..] => {
                    warn!(
                        note_id = %note_id,
                        matches = matches.len(),
                        adopted = %first,
                        "ambiguous identity, using first match"
                    );
                    resolution.ambiguous.push(AmbiguousIdentity {
                        note_id: note_id.clone(),
                        candidates: matches.clone(),
                    });
                    Some(*first)
                }
            };

            if let Some(id) = found {
                resolution.looked_up.insert(note_id.clone(), id);
            }
            memo.insert(note_id.as_str(), found);
            resolution.targets.push(found);
        }

        Ok(resolution)
    }
}
