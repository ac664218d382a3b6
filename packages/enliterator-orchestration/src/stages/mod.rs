//! One stage job per pipeline stage (§4.2, §4.3, §4.4, §4.5), registered
//! against their `Stage` in `runner::PipelineRunner::new`.

pub mod deliverables;
pub mod embeddings;
pub mod fine_tune_dataset;
pub mod graph_assembly;
pub mod intake;
pub mod lexicon_bootstrap;
pub mod literacy_scoring;
pub mod pool_extraction;
pub mod rights_provenance;

pub use deliverables::DeliverablesStage;
pub use embeddings::EmbeddingsStage;
pub use fine_tune_dataset::FineTuneDatasetStage;
pub use graph_assembly::GraphAssemblyStage;
pub use intake::IntakeStage;
pub use lexicon_bootstrap::LexiconBootstrapStage;
pub use literacy_scoring::LiteracyScoringStage;
pub use pool_extraction::PoolExtractionStage;
pub use rights_provenance::RightsProvenanceStage;
