//! Deduplication (§4.4.5): deterministic node merging, run in its own
//! transaction after Node/Edge Loading.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::Result;
use crate::store::{GraphStore, Row, Statement};
use crate::verbs::VERB_GLOSSARY;

/// One candidate node as read back from the graph for dedup-key grouping.
#[derive(Debug, Clone)]
pub struct DedupCandidate {
    pub id: String,
    pub created_at: String,
    pub properties: Row,
}

/// A planned merge: `loser` is detached and deleted, `winner` survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    pub winner_id: String,
    pub loser_id: String,
}

fn string_prop(props: &Row, key: &str) -> Option<String> {
    match props.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(v) => Some(v.to_string()),
        None => None,
    }
}

/// The dedup key for a label's candidate, per the rules enumerated in
/// §4.4.5. Returns `None` for labels with no dedup rule (no merging
/// happens for them).
pub fn dedup_key(label: &str, props: &Row) -> Option<String> {
    match label {
        "Idea" => string_prop(props, "label"),
        "Manifest" => Some(format!(
            "{}\u{0}{}",
            string_prop(props, "label")?,
            string_prop(props, "manifest_type")?
        )),
        "Experience" => {
            let narrative = string_prop(props, "narrative_text")?;
            let prefix: String = narrative.chars().take(100).collect();
            Some(format!(
                "{}\u{0}{}\u{0}{}",
                string_prop(props, "agent_label")?,
                string_prop(props, "observed_at")?,
                prefix
            ))
        }
        "Lexicon" => string_prop(props, "canonical_term"),
        "Spatial" => Some(format!(
            "{}\u{0}{}",
            string_prop(props, "name")?,
            string_prop(props, "year").unwrap_or_default()
        )),
        _ => None,
    }
}

/// Order two candidates by the §4.4.5 tie-break rule: smaller id wins;
/// if ids don't compare decisively (equal after normalization), the
/// earlier `created_at` wins.
fn winner_first(a: &DedupCandidate, b: &DedupCandidate) -> Ordering {
    match (a.id.parse::<u64>(), b.id.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.created_at.cmp(&b.created_at)),
        _ => a.id.cmp(&b.id).then_with(|| a.created_at.cmp(&b.created_at)),
    }
}

/// Group candidates by dedup key and plan one merge per extra member of a
/// group (pure function, no I/O — the async executor calls this, then
/// issues the rewiring statements).
pub fn plan_merges(label: &str, candidates: &[DedupCandidate]) -> Vec<MergePlan> {
    let mut groups: BTreeMap<String, Vec<&DedupCandidate>> = BTreeMap::new();
    for candidate in candidates {
        if let Some(key) = dedup_key(label, &candidate.properties) {
            groups.entry(key).or_default().push(candidate);
        }
    }

    let mut plans = Vec::new();
    for (_, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| winner_first(a, b));
        let winner = members[0].id.clone();
        for loser in &members[1..] {
            plans.push(MergePlan {
                winner_id: winner.clone(),
                loser_id: loser.id.clone(),
            });
        }
    }
    plans
}

pub struct Deduplicator;

impl Deduplicator {
    pub fn new() -> Self {
        Self
    }

    /// Execute one merge: rewire every edge (by glossary verb, both
    /// directions) from `loser` onto `winner`, then `DETACH DELETE` the
    /// loser. Never overwrites identity columns on the winner (§4.4.5
    /// step 4); only whitelisted non-identity fields could be merged here,
    /// and none currently require it.
    pub async fn execute(&self, graph: &dyn GraphStore, database: &str, plan: &MergePlan) -> Result<()> {
        let mut statements = Vec::new();

        for entry in VERB_GLOSSARY {
            let edge_type = crate::verbs::edge_type(entry.name);
            statements.push(
                Statement::new(format!(
                    "MATCH (loser {{id: $loser}})-[:{edge_type}]->(tgt) \
                     MATCH (winner {{id: $winner}}) \
                     MERGE (winner)-[:{edge_type}]->(tgt)"
                ))
                .with_param("loser", plan.loser_id.clone())
                .with_param("winner", plan.winner_id.clone()),
            );
            statements.push(
                Statement::new(format!(
                    "MATCH (src)-[:{edge_type}]->(loser {{id: $loser}}) \
                     MATCH (winner {{id: $winner}}) \
                     MERGE (src)-[:{edge_type}]->(winner)"
                ))
                .with_param("loser", plan.loser_id.clone())
                .with_param("winner", plan.winner_id.clone()),
            );
        }

        statements.push(
            Statement::new("MATCH (loser {id: $loser}) DETACH DELETE loser")
                .with_param("loser", plan.loser_id.clone()),
        );

        graph.run_transaction(database, statements).await
    }

    /// Fetch candidates for `label`, plan merges, and execute them.
    pub async fn deduplicate_label(
        &self,
        graph: &dyn GraphStore,
        database: &str,
        label: &str,
    ) -> Result<usize> {
        let rows = graph
            .query(
                database,
                Statement::new(format!(
                    "MATCH (n:{label}) RETURN n.id AS id, n.created_at AS created_at, n AS props"
                )),
            )
            .await?;

        let candidates: Vec<DedupCandidate> = rows
            .into_iter()
            .filter_map(|row| {
                let id = string_prop(&row, "id")?;
                let created_at = string_prop(&row, "created_at").unwrap_or_default();
                let properties = match row.get("props") {
                    Some(Value::Object(map)) => map.clone().into_iter().collect(),
                    _ => Row::new(),
                };
                Some(DedupCandidate {
                    id,
                    created_at,
                    properties,
                })
            })
            .collect();

        let plans = plan_merges(label, &candidates);
        let merged = plans.len();
        for plan in &plans {
            self.execute(graph, database, plan).await?;
        }
        Ok(merged)
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, created_at: &str, label: &str) -> DedupCandidate {
        let mut props = Row::new();
        props.insert("label".to_string(), Value::String(label.to_string()));
        DedupCandidate {
            id: id.to_string(),
            created_at: created_at.to_string(),
            properties: props,
        }
    }

    #[test]
    fn duplicate_ideas_merge_into_smaller_id() {
        let candidates = vec![
            candidate("20", "2024-01-02T00:00:00Z", "sustainability"),
            candidate("5", "2024-01-01T00:00:00Z", "sustainability"),
        ];
        let plans = plan_merges("Idea", &candidates);
        assert_eq!(plans, vec![MergePlan { winner_id: "5".into(), loser_id: "20".into() }]);
    }

    #[test]
    fn distinct_labels_do_not_merge() {
        let candidates = vec![
            candidate("1", "2024-01-01T00:00:00Z", "sustainability"),
            candidate("2", "2024-01-01T00:00:00Z", "resilience"),
        ];
        assert!(plan_merges("Idea", &candidates).is_empty());
    }

    #[test]
    fn unrecognized_label_never_merges() {
        let candidates = vec![
            candidate("1", "2024-01-01T00:00:00Z", "x"),
            candidate("2", "2024-01-01T00:00:00Z", "x"),
        ];
        assert!(plan_merges("Actor", &candidates).is_empty());
    }
}
