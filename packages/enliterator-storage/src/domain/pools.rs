//! The Pool Canon: typed entity categories extracted from ingested items.
//!
//! Seven pools are content-bearing and required to be connected once graph
//! assembly completes (`Idea`, `Manifest`, `Experience`, `Relational`,
//! `Evolutionary`, `Practical`, `Emanation`); five are optional annotation
//! pools that may remain isolated in the graph (`Actor`, `Spatial`,
//! `Evidence`, `Risk`, `Method`). `Intent` is carried alongside the pool
//! canon as an additional graph label for agent-intent records, sharing the
//! `observed_at` convention with `Experience` but otherwise out of pool
//! classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The discriminant of a [`PoolEntity`]; doubles as the node label written
/// during Graph Assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolKind {
    Idea,
    Manifest,
    Experience,
    Relational,
    Evolutionary,
    Practical,
    Emanation,
    Actor,
    Spatial,
    Evidence,
    Risk,
    Method,
    Intent,
}

impl PoolKind {
    pub fn label(&self) -> &'static str {
        match self {
            PoolKind::Idea => "Idea",
            PoolKind::Manifest => "Manifest",
            PoolKind::Experience => "Experience",
            PoolKind::Relational => "Relational",
            PoolKind::Evolutionary => "Evolutionary",
            PoolKind::Practical => "Practical",
            PoolKind::Emanation => "Emanation",
            PoolKind::Actor => "Actor",
            PoolKind::Spatial => "Spatial",
            PoolKind::Evidence => "Evidence",
            PoolKind::Risk => "Risk",
            PoolKind::Method => "Method",
            PoolKind::Intent => "Intent",
        }
    }

    /// Content pools require `rights_id` and `repr_text` existence
    /// constraints during Schema Provisioning (§4.4.2).
    pub fn is_content_pool(&self) -> bool {
        matches!(
            self,
            PoolKind::Idea
                | PoolKind::Manifest
                | PoolKind::Experience
                | PoolKind::Practical
                | PoolKind::Emanation
        )
    }

    /// Pools whose nodes must not be orphaned by Orphan Removal (§4.4.6).
    pub fn requires_connectivity(&self) -> bool {
        matches!(
            self,
            PoolKind::Idea
                | PoolKind::Manifest
                | PoolKind::Experience
                | PoolKind::Relational
                | PoolKind::Evolutionary
                | PoolKind::Practical
                | PoolKind::Emanation
        )
    }

    pub fn all() -> &'static [PoolKind] {
        &[
            PoolKind::Idea,
            PoolKind::Manifest,
            PoolKind::Experience,
            PoolKind::Relational,
            PoolKind::Evolutionary,
            PoolKind::Practical,
            PoolKind::Emanation,
            PoolKind::Actor,
            PoolKind::Spatial,
            PoolKind::Evidence,
            PoolKind::Risk,
            PoolKind::Method,
            PoolKind::Intent,
        ]
    }
}

/// Closed enum for `Emanation.influence_type`.
///
/// Resolved per `SPEC_FULL.md` §9 Open Questions (no canonical list was
/// given): these five values cover the ways an Idea's downstream influence
/// propagates back through the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmanationInfluenceType {
    Causal,
    Inspirational,
    Derivative,
    Catalytic,
    Cautionary,
}

/// Closed enum for `Relational.relation_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationalRelationType {
    Collaborates,
    Supersedes,
    Contradicts,
    Complements,
    DependsOn,
}

/// Closed enum for one entry of `Practical.steps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticalStepKind {
    Plan,
    Prepare,
    Execute,
    Validate,
    Review,
}

/// Pool-specific structured fields, one variant per [`PoolKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolFields {
    Idea {
        label: String,
    },
    Manifest {
        label: String,
        manifest_type: String,
    },
    Experience {
        agent_label: String,
        narrative_text: String,
    },
    Relational {
        relation_type: RelationalRelationType,
    },
    Evolutionary {
        version_label: String,
    },
    Practical {
        steps: Vec<PracticalStepKind>,
    },
    Emanation {
        influence_type: EmanationInfluenceType,
    },
    Actor {
        name: String,
    },
    Spatial {
        name: String,
        year: Option<i32>,
    },
    Evidence {
        source_ref: String,
    },
    Risk {
        severity: String,
    },
    Method {
        name: String,
    },
    Intent {
        summary: String,
    },
}

impl PoolFields {
    pub fn kind(&self) -> PoolKind {
        match self {
            PoolFields::Idea { .. } => PoolKind::Idea,
            PoolFields::Manifest { .. } => PoolKind::Manifest,
            PoolFields::Experience { .. } => PoolKind::Experience,
            PoolFields::Relational { .. } => PoolKind::Relational,
            PoolFields::Evolutionary { .. } => PoolKind::Evolutionary,
            PoolFields::Practical { .. } => PoolKind::Practical,
            PoolFields::Emanation { .. } => PoolKind::Emanation,
            PoolFields::Actor { .. } => PoolKind::Actor,
            PoolFields::Spatial { .. } => PoolKind::Spatial,
            PoolFields::Evidence { .. } => PoolKind::Evidence,
            PoolFields::Risk { .. } => PoolKind::Risk,
            PoolFields::Method { .. } => PoolKind::Method,
            PoolFields::Intent { .. } => PoolKind::Intent,
        }
    }
}

/// A single pool entity extracted during Pool Extraction (§4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEntity {
    pub id: String,
    pub batch_id: String,
    pub repr_text: String,
    pub rights_id: String,
    pub source_item_id: String,
    pub valid_time_start: Option<DateTime<Utc>>,
    pub valid_time_end: Option<DateTime<Utc>>,
    /// Populated instead of `valid_time_start` for `Experience` and
    /// `Intent`, per the Data Model invariant.
    pub observed_at: Option<DateTime<Utc>>,
    pub fields: PoolFields,
}

impl PoolEntity {
    pub fn kind(&self) -> PoolKind {
        self.fields.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_pools_match_spec_list() {
        let content: Vec<_> = PoolKind::all()
            .iter()
            .filter(|k| k.is_content_pool())
            .map(|k| k.label())
            .collect();
        assert_eq!(
            content,
            vec!["Idea", "Manifest", "Experience", "Practical", "Emanation"]
        );
    }

    #[test]
    fn connectivity_required_pools_match_spec_list() {
        let connected: Vec<_> = PoolKind::all()
            .iter()
            .filter(|k| k.requires_connectivity())
            .map(|k| k.label())
            .collect();
        assert_eq!(
            connected,
            vec![
                "Idea",
                "Manifest",
                "Experience",
                "Relational",
                "Evolutionary",
                "Practical",
                "Emanation"
            ]
        );
    }

    #[test]
    fn fields_kind_matches_entity_kind() {
        let entity = PoolEntity {
            id: "e1".into(),
            batch_id: "b1".into(),
            repr_text: "a new idea".into(),
            rights_id: "r1".into(),
            source_item_id: "item-1".into(),
            valid_time_start: Some(Utc::now()),
            valid_time_end: None,
            observed_at: None,
            fields: PoolFields::Idea {
                label: "sustainability".into(),
            },
        };
        assert_eq!(entity.kind(), PoolKind::Idea);
    }
}
