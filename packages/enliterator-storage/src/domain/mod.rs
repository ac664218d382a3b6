//! Domain layer: the relational-store entities and the `EnliteratorStore`
//! port they are persisted through.
//!
//! # Entities
//!
//! - [`batch::IngestBatch`] — a submitted document collection.
//! - [`item::IngestItem`] — one file/document within a batch.
//! - [`rights::ProvenanceAndRights`] — the rights gate every content entity
//!   cites.
//! - [`lexicon::LexiconEntry`] — canonical vocabulary.
//! - [`pools::PoolEntity`] — a typed entity from the Pool Canon.
//! - [`relation::Relation`] — a typed edge prior to graph loading.
//! - [`pipeline_run::PipelineRun`] — the run this module's stage statuses
//!   and metrics are tracked against.
//! - [`embedding::Embedding`] — a vector persisted against a graph node.
//!
//! # Port
//!
//! - [`store::EnliteratorStore`] — the storage abstraction every stage job
//!   and the pipeline runner mutate state through.

pub mod batch;
pub mod embedding;
pub mod item;
pub mod lexicon;
pub mod pipeline_run;
pub mod pools;
pub mod relation;
pub mod rights;
pub mod store;

pub use batch::{BatchStatus, IngestBatch};
pub use embedding::Embedding;
pub use item::{IngestItem, ItemStageStatuses, StageStatus};
pub use lexicon::LexiconEntry;
pub use pipeline_run::{PipelineRun, RunState, Stage, StageOutcome, STAGE_ORDER};
pub use pools::{
    EmanationInfluenceType, PoolEntity, PoolFields, PoolKind, PracticalStepKind,
    RelationalRelationType,
};
pub use relation::{EntityRef, Relation};
pub use rights::{ConsentStatus, LicenseType, ProvenanceAndRights, RIGHTS_CONFIDENCE_THRESHOLD};
pub use store::{EnliteratorStore, ItemStageKind};
