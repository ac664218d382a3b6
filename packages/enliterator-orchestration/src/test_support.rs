//! Fakes shared by stage job tests: an in-memory `GraphStore` and
//! canned `ExternalServices`, following the teacher's convention of
//! hand-rolled in-memory fakes over the trait ports rather than mocks.

#![cfg(test)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use enliterator_graph::{GraphStore, Result as GraphResult, Row, Statement};
use enliterator_storage::{
    ConsentStatus, IngestItem, LexiconEntry, LicenseType, PoolEntity, Relation,
};

use crate::error::Result;
use crate::external::{
    EmbeddingService, ExtractedTerm, PoolExtractionResult, PoolExtractionService, RawDocument,
    RightsInference, RightsService, TermExtractionService,
};
use crate::external::IntakeSource;

/// Records every statement it was asked to run and answers every `query`
/// with an empty result set, which is enough for stage jobs whose graph
/// interactions this test suite only asserts were *attempted*, not their
/// Cypher semantics (those are covered in `enliterator-graph`'s own tests).
#[derive(Default)]
pub struct FakeGraphStore {
    pub databases_created: Mutex<Vec<String>>,
    pub transactions: Mutex<Vec<(String, Vec<Statement>)>>,
}

#[async_trait]
impl GraphStore for FakeGraphStore {
    async fn create_database(&self, name: &str) -> GraphResult<bool> {
        self.databases_created.lock().unwrap().push(name.to_string());
        Ok(true)
    }

    async fn wait_online(&self, _name: &str, _timeout: Duration) -> GraphResult<()> {
        Ok(())
    }

    async fn run_transaction(&self, database: &str, statements: Vec<Statement>) -> GraphResult<()> {
        self.transactions
            .lock()
            .unwrap()
            .push((database.to_string(), statements));
        Ok(())
    }

    async fn query(&self, _database: &str, _statement: Statement) -> GraphResult<Vec<Row>> {
        Ok(Vec::new())
    }
}

pub struct FakeIntakeSource {
    pub documents: Vec<RawDocument>,
}

#[async_trait]
impl IntakeSource for FakeIntakeSource {
    async fn discover(&self, _batch_id: &str) -> Result<Vec<RawDocument>> {
        Ok(self.documents.clone())
    }
}

pub struct FakeRightsService {
    pub confidence: f64,
}

#[async_trait]
impl RightsService for FakeRightsService {
    async fn infer(&self, _item: &IngestItem) -> Result<RightsInference> {
        Ok(RightsInference {
            confidence: self.confidence,
            license: LicenseType::CreativeCommons,
            consent: ConsentStatus::Granted,
            publishable: true,
            trainable: true,
            source_type: "upload".to_string(),
            method: "rights-model-v1".to_string(),
        })
    }
}

pub struct FakeTermExtractionService {
    pub terms: Vec<ExtractedTerm>,
}

#[async_trait]
impl TermExtractionService for FakeTermExtractionService {
    async fn extract(&self, _item_text: &str, _context: &[LexiconEntry]) -> Result<Vec<ExtractedTerm>> {
        Ok(self.terms.clone())
    }
}

pub struct FakePoolExtractionService {
    pub entities: Vec<PoolEntity>,
    pub relations: Vec<Relation>,
}

#[async_trait]
impl PoolExtractionService for FakePoolExtractionService {
    async fn extract(
        &self,
        _item_text: &str,
        _lexicon: &[LexiconEntry],
    ) -> Result<PoolExtractionResult> {
        Ok(PoolExtractionResult {
            entities: self.entities.clone(),
            relations: self.relations.clone(),
        })
    }
}

pub struct FakeEmbeddingService;

#[async_trait]
impl EmbeddingService for FakeEmbeddingService {
    fn model(&self) -> &str {
        "fake-embedding-v1"
    }

    fn dims(&self) -> usize {
        3
    }

    async fn encode(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.1, 0.2, 0.3])
    }
}

/// `ExternalServices` wired to harmless defaults; override only the
/// collaborator the test under construction actually exercises.
pub fn default_external_services() -> crate::external::ExternalServices {
    crate::external::ExternalServices {
        intake: Box::new(FakeIntakeSource { documents: vec![] }),
        rights: Box::new(FakeRightsService { confidence: 0.9 }),
        term_extraction: Box::new(FakeTermExtractionService { terms: vec![] }),
        pool_extraction: Box::new(FakePoolExtractionService {
            entities: vec![],
            relations: vec![],
        }),
        embedding: Box::new(FakeEmbeddingService),
    }
}

/// A `StageJobContext` over a fresh in-memory store, a recording fake
/// graph, and default external services, for one batch.
pub fn test_context(
    batch_id: &str,
    external: crate::external::ExternalServices,
) -> crate::stage_job::StageJobContext {
    let store: std::sync::Arc<dyn enliterator_storage::EnliteratorStore> =
        std::sync::Arc::new(enliterator_storage::SqliteStore::new_in_memory().unwrap());
    let graph: std::sync::Arc<dyn GraphStore> = std::sync::Arc::new(FakeGraphStore::default());
    crate::stage_job::StageJobContext {
        batch_id: batch_id.to_string(),
        store,
        graph,
        external: std::sync::Arc::new(external),
        config: std::sync::Arc::new(crate::config::OrchestrationConfig::default()),
    }
}
