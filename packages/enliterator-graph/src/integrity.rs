//! Integrity Verification (§4.4.7): the closing check of Graph Assembly.

use std::collections::BTreeMap;

use enliterator_storage::PoolKind;
use serde_json::Value;

use crate::error::Result;
use crate::store::{GraphStore, Statement};
use crate::verbs::VERB_GLOSSARY;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrityReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Node/edge counts by label and by verb.
    pub summary: BTreeMap<String, u64>,
}

pub struct IntegrityVerifier;

impl IntegrityVerifier {
    pub fn new() -> Self {
        Self
    }

    async fn count(&self, graph: &dyn GraphStore, database: &str, cypher: &str) -> Result<u64> {
        let rows = graph.query(database, Statement::new(cypher)).await?;
        Ok(rows
            .first()
            .and_then(|r| r.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    /// Run every check from §4.4.7 and fold the outcome into a report.
    /// Errors fail the stage; warnings are recorded but do not block.
    pub async fn verify(&self, graph: &dyn GraphStore, database: &str) -> Result<IntegrityReport> {
        let mut report = IntegrityReport {
            valid: true,
            ..Default::default()
        };

        for pool in PoolKind::all() {
            let label = pool.label();
            let n = self
                .count(graph, database, &format!("MATCH (n:{label}) RETURN count(n) AS count"))
                .await?;
            report.summary.insert(label.to_string(), n);

            if pool.is_content_pool() {
                let missing_rights = self
                    .count(
                        graph,
                        database,
                        &format!(
                            "MATCH (n:{label}) WHERE n.rights_id IS NULL \
                             OR NOT (n)-[:HAS_RIGHTS]->(:ProvenanceAndRights) RETURN count(n) AS count"
                        ),
                    )
                    .await?;
                if missing_rights > 0 {
                    report.valid = false;
                    report.errors.push(format!(
                        "{missing_rights} {label} node(s) missing rights_id or HAS_RIGHTS edge"
                    ));
                }

                let missing_repr = self
                    .count(
                        graph,
                        database,
                        &format!(
                            "MATCH (n:{label}) WHERE n.repr_text IS NULL OR n.repr_text = '' RETURN count(n) AS count"
                        ),
                    )
                    .await?;
                if missing_repr > 0 {
                    report.valid = false;
                    report.errors.push(format!("{missing_repr} {label} node(s) missing repr_text"));
                }
            }

            let time_field = if matches!(pool, PoolKind::Experience | PoolKind::Intent) {
                "observed_at"
            } else {
                "valid_time_start"
            };
            let missing_time = self
                .count(
                    graph,
                    database,
                    &format!("MATCH (n:{label}) WHERE n.{time_field} IS NULL RETURN count(n) AS count"),
                )
                .await?;
            if missing_time > 0 {
                report
                    .warnings
                    .push(format!("{missing_time} {label} node(s) missing {time_field}"));
            }
        }

        let missing_lexicon_terms = self
            .count(
                graph,
                database,
                "MATCH (n:Lexicon) WHERE n.canonical_term IS NULL OR n.canonical_term = '' RETURN count(n) AS count",
            )
            .await?;
        if missing_lexicon_terms > 0 {
            report.valid = false;
            report
                .errors
                .push(format!("{missing_lexicon_terms} Lexicon node(s) with empty canonical_term"));
        }

        let rel_types = graph
            .query(database, Statement::new("CALL db.relationshipTypes() YIELD relationshipType RETURN relationshipType"))
            .await?;
        for row in &rel_types {
            let Some(Value::String(rel_type)) = row.get("relationshipType") else {
                continue;
            };
            let lower = rel_type.to_lowercase();
            if lower == "has_rights" {
                continue;
            }
            let known = VERB_GLOSSARY.iter().any(|v| crate::verbs::edge_type(v.name) == *rel_type);
            if !known {
                report.warnings.push(format!("edge type {rel_type} is not in the verb glossary"));
            }
        }

        for entry in VERB_GLOSSARY {
            let forward = crate::verbs::edge_type(entry.name);
            let forward_count = self
                .count(graph, database, &format!("MATCH ()-[r:{forward}]->() RETURN count(r) AS count"))
                .await?;
            report.summary.insert(format!("verb:{forward}"), forward_count);

            if entry.symmetric {
                if forward_count % 2 != 0 {
                    report.valid = false;
                    report.errors.push(format!(
                        "symmetric verb {forward} has odd edge count {forward_count}"
                    ));
                }
            } else if let Some(reverse) = entry.reverse {
                let reverse_type = crate::verbs::edge_type(reverse);
                let reverse_count = self
                    .count(graph, database, &format!("MATCH ()-[r:{reverse_type}]->() RETURN count(r) AS count"))
                    .await?;
                if forward_count != reverse_count {
                    report.valid = false;
                    report.errors.push(format!(
                        "verb {forward} has {forward_count} forward edges but {reverse_count} reverse ({reverse_type}) edges"
                    ));
                }
            }
        }

        Ok(report)
    }
}

impl Default for IntegrityVerifier {
    fn default() -> Self {
        Self::new()
    }
}
