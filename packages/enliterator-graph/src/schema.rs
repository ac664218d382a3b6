//! Schema Provisioning (§4.4.2, Transaction A) and the Lexicon backfill that
//! must precede it.

use enliterator_storage::{EnliteratorStore, LexiconEntry, PoolKind};

use crate::error::Result;
use crate::store::{GraphStore, Statement};

pub struct SchemaManager;

impl SchemaManager {
    pub fn new() -> Self {
        Self
    }

    /// Backfill `Lexicon.canonical_description` from `description`, falling
    /// back to the fixed placeholder. Runs against the relational store, in
    /// a transaction preceding Transaction A, never inside it.
    pub async fn backfill_lexicon_descriptions(
        &self,
        store: &dyn EnliteratorStore,
        batch_id: &str,
    ) -> enliterator_storage::Result<()> {
        for mut entry in store.lexicon_for_batch(batch_id).await? {
            if entry.description.is_none() {
                entry.description = Some(entry.canonical_description());
                store.save_lexicon_entry(&entry).await?;
            }
        }
        Ok(())
    }

    /// Create every unique/existence constraint and supporting index named
    /// in §4.4.2, as a single schema-only transaction.
    pub async fn provision(&self, graph: &dyn GraphStore, database: &str) -> Result<()> {
        let mut statements = Vec::new();

        for pool in PoolKind::all() {
            let label = pool.label();
            statements.push(Statement::new(format!(
                "CREATE CONSTRAINT {label}_id_unique IF NOT EXISTS FOR (n:{label}) REQUIRE n.id IS UNIQUE"
            )));
            if pool.is_content_pool() {
                statements.push(Statement::new(format!(
                    "CREATE CONSTRAINT {label}_rights_id_exists IF NOT EXISTS FOR (n:{label}) REQUIRE n.rights_id IS NOT NULL"
                )));
                statements.push(Statement::new(format!(
                    "CREATE CONSTRAINT {label}_repr_text_exists IF NOT EXISTS FOR (n:{label}) REQUIRE n.repr_text IS NOT NULL"
                )));
            }
            statements.push(Statement::new(format!(
                "CREATE INDEX {label}_batch_id_idx IF NOT EXISTS FOR (n:{label}) ON (n.batch_id)"
            )));
        }

        statements.push(Statement::new(
            "CREATE CONSTRAINT provenance_and_rights_id_unique IF NOT EXISTS \
             FOR (n:ProvenanceAndRights) REQUIRE n.id IS UNIQUE",
        ));
        statements.push(Statement::new(
            "CREATE CONSTRAINT provenance_and_rights_publishable_exists IF NOT EXISTS \
             FOR (n:ProvenanceAndRights) REQUIRE n.publishable IS NOT NULL",
        ));
        statements.push(Statement::new(
            "CREATE CONSTRAINT provenance_and_rights_trainable_exists IF NOT EXISTS \
             FOR (n:ProvenanceAndRights) REQUIRE n.trainable IS NOT NULL",
        ));
        statements.push(Statement::new(
            "CREATE INDEX provenance_and_rights_publishable_idx IF NOT EXISTS \
             FOR (n:ProvenanceAndRights) ON (n.publishable)",
        ));
        statements.push(Statement::new(
            "CREATE INDEX provenance_and_rights_trainable_idx IF NOT EXISTS \
             FOR (n:ProvenanceAndRights) ON (n.trainable)",
        ));

        statements.push(Statement::new(
            "CREATE CONSTRAINT lexicon_id_unique IF NOT EXISTS \
             FOR (n:Lexicon) REQUIRE n.id IS UNIQUE",
        ));
        statements.push(Statement::new(
            "CREATE CONSTRAINT lexicon_canonical_description_exists IF NOT EXISTS \
             FOR (n:Lexicon) REQUIRE n.canonical_description IS NOT NULL",
        ));
        statements.push(Statement::new(
            "CREATE INDEX lexicon_term_idx IF NOT EXISTS FOR (n:Lexicon) ON (n.canonical_term)",
        ));

        statements.push(Statement::new(
            "CREATE INDEX valid_time_start_idx IF NOT EXISTS \
             FOR (n:Idea) ON (n.valid_time_start)",
        ));

        graph.run_transaction(database, statements).await
    }
}

impl Default for SchemaManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A property map's `canonical_description`, defaulted per §4.4.3's
/// "Required defaults" rule.
pub fn canonical_description_default(entry: &LexiconEntry) -> String {
    entry.canonical_description()
}
