//! Call contracts for the black-box services this system treats as
//! external collaborators (§6): Rights Inference, Term Extraction, Pool
//! Extraction, Embedding. These are specified only by the shape of their
//! calls — concrete implementations (an LLM client, a vector database
//! client) are out of scope.

use std::time::Duration;

use async_trait::async_trait;
use enliterator_storage::{ConsentStatus, IngestItem, LexiconEntry, LicenseType, PoolEntity, Relation};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default deadlines for external calls (§5 "Cancellation & timeouts").
pub const EXTRACTION_DEADLINE: Duration = Duration::from_secs(30);
pub const RIGHTS_DEADLINE: Duration = Duration::from_secs(30);
pub const EMBEDDING_DEADLINE: Duration = Duration::from_secs(60);
pub const DATABASE_POLL_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RightsInference {
    pub confidence: f64,
    pub license: LicenseType,
    pub consent: ConsentStatus,
    pub publishable: bool,
    pub trainable: bool,
    pub source_type: String,
    pub method: String,
}

#[async_trait]
pub trait RightsService: Send + Sync {
    /// Transport-level failures are `ExternalTransient`; a response that
    /// fails schema validation is `ExternalPermanent` (§6, §7).
    async fn infer(&self, item: &IngestItem) -> Result<RightsInference>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTerm {
    pub surface_form: String,
    pub canonical_term: String,
    pub term_type: Option<String>,
    pub description: Option<String>,
    pub negative_surface_forms: Vec<String>,
}

#[async_trait]
pub trait TermExtractionService: Send + Sync {
    async fn extract(&self, item_text: &str, context: &[LexiconEntry]) -> Result<Vec<ExtractedTerm>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolExtractionResult {
    pub entities: Vec<PoolEntity>,
    pub relations: Vec<Relation>,
}

#[async_trait]
pub trait PoolExtractionService: Send + Sync {
    /// `relations[].verb` MUST belong to the verb glossary; the stage job
    /// validates this at load time rather than trusting the service.
    async fn extract(
        &self,
        item_text: &str,
        lexicon: &[LexiconEntry],
    ) -> Result<PoolExtractionResult>;
}

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    fn model(&self) -> &str;
    fn dims(&self) -> usize;
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;
}

/// One discovered document, prior to hashing/sampling into an `IngestItem`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub mime_type: String,
    pub content: String,
}

/// File discovery (MIME detection, archive expansion) — out of scope per
/// §1, specified only by the contract of emitting raw documents for a
/// batch (§1 "beyond the contract of emitting sanitized item records").
#[async_trait]
pub trait IntakeSource: Send + Sync {
    async fn discover(&self, batch_id: &str) -> Result<Vec<RawDocument>>;
}

/// The bundle of external collaborators a stage job is handed. Grouped the
/// way the teacher's `StageContext` bundles its cache/repo handles, so
/// adding a new collaborator never changes every stage job's signature.
pub struct ExternalServices {
    pub intake: Box<dyn IntakeSource>,
    pub rights: Box<dyn RightsService>,
    pub term_extraction: Box<dyn TermExtractionService>,
    pub pool_extraction: Box<dyn PoolExtractionService>,
    pub embedding: Box<dyn EmbeddingService>,
}
