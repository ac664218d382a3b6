//! Node Loading (§4.4.3, Transaction B) and Edge Loading (§4.4.4, the same
//! transaction or a fresh Transaction C — never mixed with schema).

use std::collections::BTreeMap;

use enliterator_storage::{PoolEntity, ProvenanceAndRights, Relation};
use serde_json::Value;

use crate::error::{GraphError, Result};
use crate::sanitize::{sanitize_struct, PropertyMap};
use crate::store::{GraphStore, Statement};
use crate::verbs::{edge_type, lookup};

/// Counts returned by a loader pass, folded into the stage job's metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadMetrics {
    pub nodes_merged: u64,
    pub edges_merged: u64,
    pub unknown_verbs_skipped: u64,
}

pub struct NodeLoader;

impl NodeLoader {
    pub fn new() -> Self {
        Self
    }

    /// Build the sanitized property map for one pool entity (§4.4.3). The
    /// node's label is `entity.kind().label()`, not a property.
    pub fn properties(entity: &PoolEntity) -> Result<PropertyMap> {
        let fields_json = serde_json::to_value(&entity.fields)?;
        let mut props = sanitize_struct(&fields_json);
        props.insert("id".to_string(), Value::String(entity.id.clone()));
        props.insert("batch_id".to_string(), Value::String(entity.batch_id.clone()));
        props.insert("repr_text".to_string(), Value::String(entity.repr_text.clone()));
        props.insert("rights_id".to_string(), Value::String(entity.rights_id.clone()));
        props.insert(
            "source_item_id".to_string(),
            Value::String(entity.source_item_id.clone()),
        );
        if let Some(t) = entity.valid_time_start {
            props.insert("valid_time_start".to_string(), Value::String(t.to_rfc3339()));
        }
        if let Some(t) = entity.valid_time_end {
            props.insert("valid_time_end".to_string(), Value::String(t.to_rfc3339()));
        }
        if let Some(t) = entity.observed_at {
            props.insert("observed_at".to_string(), Value::String(t.to_rfc3339()));
        }
        Ok(props)
    }

    pub fn rights_properties(rights: &ProvenanceAndRights) -> Result<PropertyMap> {
        let mut props = sanitize_struct(&serde_json::to_value(rights)?);
        // `license`/`consent` already sanitize to strings via their own
        // serde impls; re-assert the two existence-constrained fields as
        // explicit booleans so the constraint check never sees an absent
        // key even if the struct shape changes upstream.
        props.insert("publishable".to_string(), Value::Bool(rights.publishable));
        props.insert("trainable".to_string(), Value::Bool(rights.trainable));
        Ok(props)
    }

    fn merge_statement(label: &str, props: &PropertyMap) -> Statement {
        let mut statement = Statement::new(format!(
            "MERGE (n:{label} {{id: $id}}) SET n += $props"
        ));
        statement.params.insert("id".to_string(), props["id"].clone());
        statement
            .params
            .insert("props".to_string(), Value::Object(props.clone().into_iter().collect()));
        statement
    }

    /// `MERGE` every pool entity and its rights node, building the
    /// `HAS_RIGHTS` edge inline per the "additionally" clause of §4.4.4.
    pub async fn load(
        &self,
        graph: &dyn GraphStore,
        database: &str,
        entities: &[PoolEntity],
        rights: &BTreeMap<String, ProvenanceAndRights>,
    ) -> Result<LoadMetrics> {
        let mut statements = Vec::new();
        let mut rights_written = std::collections::BTreeSet::new();

        for entity in entities {
            let props = Self::properties(entity)?;
            statements.push(Self::merge_statement(entity.kind().label(), &props));

            if !rights_written.contains(&entity.rights_id) {
                if let Some(r) = rights.get(&entity.rights_id) {
                    let rprops = Self::rights_properties(r)?;
                    statements.push(Self::merge_statement("ProvenanceAndRights", &rprops));
                    rights_written.insert(entity.rights_id.clone());
                }
            }

            statements.push(
                Statement::new(
                    "MATCH (n {id: $node_id}), (r:ProvenanceAndRights {id: $rights_id}) \
                     MERGE (n)-[:HAS_RIGHTS]->(r)",
                )
                .with_param("node_id", entity.id.clone())
                .with_param("rights_id", entity.rights_id.clone()),
            );
        }

        let merged = entities.len() as u64;
        graph.run_transaction(database, statements).await?;
        Ok(LoadMetrics {
            nodes_merged: merged,
            ..Default::default()
        })
    }
}

impl Default for NodeLoader {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EdgeLoader;

impl EdgeLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load every relational-store `Relation` as a glossary-validated edge,
    /// including the mandated reverse/symmetric mirror (§4.4.4 steps 1-4).
    pub async fn load(
        &self,
        graph: &dyn GraphStore,
        database: &str,
        relations: &[Relation],
    ) -> Result<LoadMetrics> {
        let mut statements = Vec::new();
        let mut merged = 0u64;
        let mut skipped = 0u64;

        for relation in relations {
            let Some(entry) = lookup(&relation.verb) else {
                tracing::warn!(verb = %relation.verb, relation_id = %relation.id, "unknown verb, skipping");
                skipped += 1;
                continue;
            };
            if !entry.source_label.matches(&relation.source.label)
                || !entry.target_label.matches(&relation.target.label)
            {
                return Err(GraphError::invalid_input(format!(
                    "relation {} uses verb {} with labels {}->{}, which the glossary entry does not permit",
                    relation.id, relation.verb, relation.source.label, relation.target.label
                )));
            }

            let forward_type = edge_type(entry.name);
            statements.push(
                Statement::new(format!(
                    "MATCH (a {{id: $src}}), (b {{id: $tgt}}) \
                     MERGE (a)-[e:{forward_type}]->(b) \
                     SET e.created_at = $created_at, e.valid_time_start = $vts, e.valid_time_end = $vte"
                ))
                .with_param("src", relation.source.id.clone())
                .with_param("tgt", relation.target.id.clone())
                .with_param("created_at", chrono::Utc::now().to_rfc3339())
                .with_param(
                    "vts",
                    relation.valid_time_start.map(|t| t.to_rfc3339()).unwrap_or_default(),
                )
                .with_param(
                    "vte",
                    relation.valid_time_end.map(|t| t.to_rfc3339()).unwrap_or_default(),
                ),
            );
            merged += 1;

            if entry.symmetric {
                let sym_statement = Statement::new(format!(
                    "MATCH (a {{id: $src}}), (b {{id: $tgt}}) MERGE (b)-[:{forward_type}]->(a)"
                ))
                .with_param("src", relation.source.id.clone())
                .with_param("tgt", relation.target.id.clone());
                statements.push(sym_statement);
                merged += 1;
            } else if let Some(reverse) = entry.reverse {
                let reverse_type = edge_type(reverse);
                let reverse_statement = Statement::new(format!(
                    "MATCH (a {{id: $src}}), (b {{id: $tgt}}) MERGE (b)-[:{reverse_type}]->(a)"
                ))
                .with_param("src", relation.source.id.clone())
                .with_param("tgt", relation.target.id.clone());
                statements.push(reverse_statement);
                merged += 1;
            }
        }

        graph.run_transaction(database, statements).await?;
        Ok(LoadMetrics {
            edges_merged: merged,
            unknown_verbs_skipped: skipped,
            ..Default::default()
        })
    }
}

impl Default for EdgeLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use enliterator_storage::{EntityRef, PoolFields};

    fn idea(id: &str) -> PoolEntity {
        PoolEntity {
            id: id.to_string(),
            batch_id: "1".to_string(),
            repr_text: "an idea".to_string(),
            rights_id: "r1".to_string(),
            source_item_id: "item-1".to_string(),
            valid_time_start: Some(Utc::now()),
            valid_time_end: None,
            observed_at: None,
            fields: PoolFields::Idea {
                label: "sustainability".to_string(),
            },
        }
    }

    #[test]
    fn properties_include_identity_and_sanitized_fields() {
        let props = NodeLoader::properties(&idea("e1")).unwrap();
        assert_eq!(props["id"], serde_json::json!("e1"));
        assert_eq!(props["label"], serde_json::json!("sustainability"));
        assert_eq!(props["rights_id"], serde_json::json!("r1"));
    }

    #[tokio::test]
    async fn edge_loader_rejects_verb_with_mismatched_labels() {
        use crate::store::GraphStore;

        struct NoopStore;
        #[async_trait::async_trait]
        impl GraphStore for NoopStore {
            async fn create_database(&self, _name: &str) -> crate::error::Result<bool> {
                Ok(true)
            }
            async fn wait_online(&self, _name: &str, _t: std::time::Duration) -> crate::error::Result<()> {
                Ok(())
            }
            async fn run_transaction(&self, _db: &str, _s: Vec<Statement>) -> crate::error::Result<()> {
                Ok(())
            }
            async fn query(&self, _db: &str, _s: Statement) -> crate::error::Result<Vec<crate::store::Row>> {
                Ok(Vec::new())
            }
        }

        let relation = Relation::new(
            "rel-1",
            "1",
            EntityRef::new("Spatial", "s1"),
            EntityRef::new("Manifest", "m1"),
            "embodies",
            "r1",
        );
        let loader = EdgeLoader::new();
        let err = loader
            .load(&NoopStore, "ekn-1", &[relation])
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidInput);
    }
}
