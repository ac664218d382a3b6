//! Typed relations between pool entities, prior to Edge Loading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A polymorphic pointer to an entity: a label and an id, never a nested
/// object. This is the shape every `{ref_id, ref_type}` pair in the source
/// system collapses to (see `SPEC_FULL.md` §9, "Polymorphic references").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub label: String,
    pub id: String,
}

impl EntityRef {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}

/// A relational-store record of a typed edge, prior to being loaded into
/// the graph by the Edge Loader. `verb` is validated against the verb
/// glossary at load time, not at construction time, since the glossary
/// lives in `enliterator-graph`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub batch_id: String,
    pub source: EntityRef,
    pub target: EntityRef,
    pub verb: String,
    pub strength: Option<f64>,
    pub valid_time_start: Option<DateTime<Utc>>,
    pub valid_time_end: Option<DateTime<Utc>>,
    pub rights_id: String,
}

impl Relation {
    pub fn new(
        id: impl Into<String>,
        batch_id: impl Into<String>,
        source: EntityRef,
        target: EntityRef,
        verb: impl Into<String>,
        rights_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            batch_id: batch_id.into(),
            source,
            target,
            verb: verb.into(),
            strength: None,
            valid_time_start: None,
            valid_time_end: None,
            rights_id: rights_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ref_never_nests_an_object() {
        let r = EntityRef::new("Idea", "idea-1");
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("label").unwrap().is_string());
        assert!(json.get("id").unwrap().is_string());
    }
}
