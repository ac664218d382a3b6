//! Provenance and rights: the gate every content-bearing entity must cite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseType {
    PublicDomain,
    CreativeCommons,
    Proprietary,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    Granted,
    Denied,
    Unspecified,
}

/// Rights and provenance attached to a single content-bearing entity.
///
/// `publishability` and `training_eligibility` are authoritative: every
/// downstream stage (pool extraction output, graph node, embedding, dataset
/// build) MUST filter by these two flags rather than re-deriving them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceAndRights {
    pub id: String,
    pub license: LicenseType,
    pub consent: ConsentStatus,
    pub publishable: bool,
    pub trainable: bool,
    /// Confidence of the rights inference in `[0, 1]`.
    pub confidence: f64,
    pub source_type: String,
    /// Name of the method/model that produced this inference, or
    /// `"operator_override"` / `"test_rights_override"` for non-inferred
    /// records.
    pub method: String,
    pub valid_time_start: DateTime<Utc>,
    pub valid_time_end: Option<DateTime<Utc>>,
}

/// Confidence at or above which an inferred rights record is accepted
/// without quarantining the owning item.
///
/// Resolved per `SPEC_FULL.md` §9 Open Questions: inference below this
/// boundary quarantines the item rather than persisting a permissive
/// record, but the record itself is still written (with `publishable =
/// false`, `trainable = false`) so the quarantine is auditable.
pub const RIGHTS_CONFIDENCE_THRESHOLD: f64 = 0.7;

impl ProvenanceAndRights {
    pub fn accepted(
        id: impl Into<String>,
        license: LicenseType,
        consent: ConsentStatus,
        publishable: bool,
        trainable: bool,
        confidence: f64,
        source_type: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            license,
            consent,
            publishable,
            trainable,
            confidence,
            source_type: source_type.into(),
            method: method.into(),
            valid_time_start: Utc::now(),
            valid_time_end: None,
        }
    }

    /// A rights record for a quarantined item: rights remain on file for
    /// audit purposes, but are never publishable or trainable.
    pub fn quarantined(
        id: impl Into<String>,
        confidence: f64,
        source_type: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            license: LicenseType::Unknown,
            consent: ConsentStatus::Unspecified,
            publishable: false,
            trainable: false,
            confidence,
            source_type: source_type.into(),
            method: method.into(),
            valid_time_start: Utc::now(),
            valid_time_end: None,
        }
    }

    /// Permissive rights used when `test_rights_override` is enabled for a
    /// synthetic batch.
    pub fn test_override(id: impl Into<String>) -> Self {
        Self::accepted(
            id,
            LicenseType::PublicDomain,
            ConsentStatus::Granted,
            true,
            true,
            0.9,
            "synthetic",
            "test_rights_override",
        )
    }

    pub fn meets_confidence_threshold(&self) -> bool {
        self.confidence >= RIGHTS_CONFIDENCE_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarantined_rights_are_never_publishable() {
        let r = ProvenanceAndRights::quarantined("r1", 0.2, "upload", "rights-model-v1");
        assert!(!r.publishable);
        assert!(!r.trainable);
    }

    #[test]
    fn test_override_is_permissive() {
        let r = ProvenanceAndRights::test_override("r2");
        assert!(r.publishable);
        assert!(r.trainable);
        assert!(r.meets_confidence_threshold());
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let r = ProvenanceAndRights::accepted(
            "r3",
            LicenseType::CreativeCommons,
            ConsentStatus::Granted,
            true,
            true,
            RIGHTS_CONFIDENCE_THRESHOLD,
            "upload",
            "rights-model-v1",
        );
        assert!(r.meets_confidence_threshold());
    }
}
