//! Relational storage for the enliterator pipeline (`SPEC_FULL.md` C1).
//!
//! Holds the durable record of batches, items, rights, lexicon entries,
//! pool entities, relations and pipeline runs. The graph store
//! (`enliterator-graph`) is the system of record for traversal; this crate
//! is the system of record for identity and ownership.

pub mod domain;
pub mod error;

#[cfg(feature = "sqlite")]
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{
    BatchStatus, ConsentStatus, EmanationInfluenceType, Embedding, EnliteratorStore, EntityRef,
    IngestBatch, IngestItem, ItemStageKind, ItemStageStatuses, LexiconEntry, LicenseType,
    PipelineRun, PoolEntity, PoolFields, PoolKind, PracticalStepKind, ProvenanceAndRights,
    Relation, RelationalRelationType, RunState, Stage, StageOutcome, StageStatus, STAGE_ORDER,
    RIGHTS_CONFIDENCE_THRESHOLD,
};

#[cfg(feature = "sqlite")]
pub use infrastructure::sqlite::SqliteStore;
