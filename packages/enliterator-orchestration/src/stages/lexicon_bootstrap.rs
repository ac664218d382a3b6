//! Stage 3 — Lexicon Bootstrap (§4.3): extract canonical terms from
//! accepted items, merging into the existing batch lexicon by canonical
//! term rather than duplicating entries.

use async_trait::async_trait;
use enliterator_storage::{ItemStageKind, LexiconEntry, Stage, StageStatus};

use crate::error::{ErrorCategory, OrchestratorError, Result};
use crate::stage_job::{StageJob, StageJobContext, StageMetrics};

pub struct LexiconBootstrapStage;

#[async_trait]
impl StageJob for LexiconBootstrapStage {
    fn stage(&self) -> Stage {
        Stage::LexiconBootstrap
    }

    async fn execute(&self, ctx: &StageJobContext) -> Result<StageMetrics> {
        let items: Vec<_> = ctx
            .store
            .items_by_stage_status(
                &ctx.batch_id,
                ItemStageKind::Lexicon,
                &[StageStatus::Pending, StageStatus::Failed],
            )
            .await?
            .into_iter()
            .filter(|item| !item.quarantined)
            .collect();

        let eligible = items.len();
        let mut terms_extracted = 0u64;
        let mut items_completed = 0u64;

        for mut item in items {
            let context = ctx.store.lexicon_for_batch(&ctx.batch_id).await?;
            let extracted = ctx
                .external
                .term_extraction
                .extract(&item.content, &context)
                .await
                .map_err(|e| {
                    OrchestratorError::stage_failed(
                        "lexicon_bootstrap",
                        ErrorCategory::ExternalTransient,
                        e.to_string(),
                    )
                })?;

            let mut persisted_any = false;
            for term in extracted {
                terms_extracted += 1;
                match ctx
                    .store
                    .find_lexicon_entry_by_term(&ctx.batch_id, &term.canonical_term)
                    .await?
                {
                    Some(mut existing) => {
                        let mut incoming = LexiconEntry::new(
                            uuid::Uuid::new_v4().to_string(),
                            ctx.batch_id.clone(),
                            term.canonical_term.clone(),
                            item.id.clone(),
                        );
                        incoming.surface_forms.push(term.surface_form.clone());
                        incoming.negative_surface_forms = term.negative_surface_forms.clone();
                        existing.merge_surface_forms(&incoming);
                        ctx.store.save_lexicon_entry(&existing).await?;
                        persisted_any = true;
                    }
                    None => {
                        let mut entry = LexiconEntry::new(
                            uuid::Uuid::new_v4().to_string(),
                            ctx.batch_id.clone(),
                            term.canonical_term.clone(),
                            item.id.clone(),
                        );
                        entry.surface_forms.push(term.surface_form.clone());
                        entry.negative_surface_forms = term.negative_surface_forms.clone();
                        entry.description = term.description.clone();
                        entry.pool_association = term.term_type.clone();
                        ctx.store.save_lexicon_entry(&entry).await?;
                        persisted_any = true;
                    }
                }
            }

            // Only items whose terms were actually persisted advance to
            // Pool Extraction; items whose terms were entirely subsumed by
            // existing surface forms still count as processed here but do
            // not falsely advance an item that contributed nothing new.
            if persisted_any {
                item.stages.lexicon = StageStatus::Completed;
                item.stages.pool = StageStatus::Pending;
                items_completed += 1;
            } else {
                item.stages.lexicon = StageStatus::Completed;
            }
            ctx.store.save_item(&item).await?;
        }

        if eligible > 0 && terms_extracted == 0 {
            return Err(OrchestratorError::stage_failed(
                "lexicon_bootstrap",
                ErrorCategory::PreconditionFailure,
                "eligible items existed but no terms were extracted",
            ));
        }

        let mut metrics = StageMetrics::new();
        metrics.insert("terms_extracted".to_string(), terms_extracted as f64);
        metrics.insert("items_completed".to_string(), items_completed as f64);
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use enliterator_storage::{IngestBatch, IngestItem};

    use super::*;
    use crate::external::ExtractedTerm;
    use crate::test_support::*;

    async fn ctx_with_eligible_item(terms: Vec<ExtractedTerm>) -> StageJobContext {
        let ctx = test_context(
            "1",
            crate::external::ExternalServices {
                term_extraction: Box::new(FakeTermExtractionService { terms }),
                ..default_external_services()
            },
        );
        ctx.store.save_batch(&IngestBatch::new("1", "upload")).await.unwrap();
        let mut item = IngestItem::from_content("item-1", "1", "text/plain", "hello".to_string());
        item.stages.triage = StageStatus::Completed;
        item.stages.lexicon = StageStatus::Pending;
        ctx.store.save_item(&item).await.unwrap();
        ctx
    }

    fn term(canonical: &str, surface: &str) -> ExtractedTerm {
        ExtractedTerm {
            surface_form: surface.to_string(),
            canonical_term: canonical.to_string(),
            term_type: None,
            description: None,
            negative_surface_forms: vec![],
        }
    }

    #[tokio::test]
    async fn new_term_creates_lexicon_entry_and_advances_item() {
        let ctx = ctx_with_eligible_item(vec![term("rainfall", "rain")]).await;
        let metrics = LexiconBootstrapStage.execute(&ctx).await.unwrap();
        assert_eq!(metrics["terms_extracted"], 1.0);
        assert_eq!(metrics["items_completed"], 1.0);

        let lexicon = ctx.store.lexicon_for_batch("1").await.unwrap();
        assert_eq!(lexicon.len(), 1);
        assert_eq!(lexicon[0].canonical_term, "rainfall");

        let item = ctx.store.get_item("item-1").await.unwrap();
        assert_eq!(item.stages.lexicon, StageStatus::Completed);
        assert_eq!(item.stages.pool, StageStatus::Pending);
    }

    #[tokio::test]
    async fn no_terms_extracted_from_an_eligible_item_fails_the_stage() {
        let ctx = ctx_with_eligible_item(vec![]).await;
        let err = LexiconBootstrapStage.execute(&ctx).await.unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::PreconditionFailure);
    }
}
