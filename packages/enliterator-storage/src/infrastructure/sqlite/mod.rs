//! SQLite adapter implementing [`EnliteratorStore`].
//!
//! `rusqlite` is a synchronous driver; each trait method hands its work to
//! a blocking thread via `tokio::task::spawn_blocking` and clones the
//! shared, mutex-guarded connection into it, following the same
//! single-writer-connection shape the storage crate's SQLite adapter was
//! scaffolded for.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::item::StageStatus;
use crate::domain::pipeline_run::{Stage, StageOutcome};
use crate::domain::store::ItemStageKind;
use crate::domain::{
    EnliteratorStore, EntityRef, IngestBatch, IngestItem, ItemStageStatuses, LexiconEntry,
    PipelineRun, PoolEntity, ProvenanceAndRights, Relation, RunState,
};
use crate::error::{Result, StorageError};

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("sqlite connection mutex poisoned");
            f(&guard)
        })
        .await
        .map_err(|e| StorageError::database(format!("blocking task panicked: {e}")))?
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ingest_batches (
    id TEXT PRIMARY KEY,
    source_descriptor TEXT NOT NULL,
    status TEXT NOT NULL,
    literacy_score REAL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ingest_items (
    id TEXT PRIMARY KEY,
    batch_id TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    mime_type TEXT NOT NULL,
    content TEXT NOT NULL,
    content_sample TEXT NOT NULL,
    triage_status TEXT NOT NULL,
    lexicon_status TEXT NOT NULL,
    pool_status TEXT NOT NULL,
    quarantined INTEGER NOT NULL,
    rights_id TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_items_batch_hash ON ingest_items(batch_id, content_hash);

CREATE TABLE IF NOT EXISTS provenance_and_rights (
    id TEXT PRIMARY KEY,
    license TEXT NOT NULL,
    consent TEXT NOT NULL,
    publishable INTEGER NOT NULL,
    trainable INTEGER NOT NULL,
    confidence REAL NOT NULL,
    source_type TEXT NOT NULL,
    method TEXT NOT NULL,
    valid_time_start TEXT NOT NULL,
    valid_time_end TEXT
);

CREATE TABLE IF NOT EXISTS lexicon_entries (
    id TEXT PRIMARY KEY,
    batch_id TEXT NOT NULL,
    canonical_term TEXT NOT NULL,
    surface_forms TEXT NOT NULL,
    negative_surface_forms TEXT NOT NULL,
    pool_association TEXT,
    description TEXT,
    source_item_id TEXT NOT NULL,
    valid_time_start TEXT NOT NULL,
    valid_time_end TEXT
);
CREATE INDEX IF NOT EXISTS idx_lexicon_batch_term ON lexicon_entries(batch_id, canonical_term);

CREATE TABLE IF NOT EXISTS pool_entities (
    id TEXT PRIMARY KEY,
    batch_id TEXT NOT NULL,
    repr_text TEXT NOT NULL,
    rights_id TEXT NOT NULL,
    source_item_id TEXT NOT NULL,
    valid_time_start TEXT,
    valid_time_end TEXT,
    observed_at TEXT,
    fields_json TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_pool_entities_batch ON pool_entities(batch_id);

CREATE TABLE IF NOT EXISTS relations (
    id TEXT PRIMARY KEY,
    batch_id TEXT NOT NULL,
    source_label TEXT NOT NULL,
    source_id TEXT NOT NULL,
    target_label TEXT NOT NULL,
    target_id TEXT NOT NULL,
    verb TEXT NOT NULL,
    strength REAL,
    valid_time_start TEXT,
    valid_time_end TEXT,
    rights_id TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_relations_batch ON relations(batch_id);

CREATE TABLE IF NOT EXISTS pipeline_runs (
    id TEXT PRIMARY KEY,
    batch_id TEXT NOT NULL,
    current_stage TEXT NOT NULL,
    state TEXT NOT NULL,
    retry_count INTEGER NOT NULL,
    stage_statuses_json TEXT NOT NULL,
    stage_metrics_json TEXT NOT NULL,
    error_message TEXT,
    next_retry_at TEXT,
    started_at TEXT NOT NULL,
    finished_at TEXT
);
"#;

fn json_col<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn from_json_col<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    Ok(serde_json::from_str(raw)?)
}

// serde_json rejects enum keys in maps (it only accepts string-producing
// key serialization), so stage maps are converted through `Stage::as_str`
// before going to JSON and parsed back through `Stage::from_index` lookup.
fn stage_statuses_to_json(map: &BTreeMap<Stage, StageOutcome>) -> Result<String> {
    let as_strings: BTreeMap<String, StageOutcome> =
        map.iter().map(|(k, v)| (k.as_str().to_string(), *v)).collect();
    json_col(&as_strings)
}

fn stage_statuses_from_json(raw: &str) -> Result<BTreeMap<Stage, StageOutcome>> {
    let as_strings: BTreeMap<String, StageOutcome> = from_json_col(raw)?;
    Ok(as_strings
        .into_iter()
        .filter_map(|(k, v)| stage_from_str(&k).map(|s| (s, v)))
        .collect())
}

fn stage_metrics_to_json(map: &BTreeMap<Stage, BTreeMap<String, f64>>) -> Result<String> {
    let as_strings: BTreeMap<String, BTreeMap<String, f64>> =
        map.iter().map(|(k, v)| (k.as_str().to_string(), v.clone())).collect();
    json_col(&as_strings)
}

fn stage_metrics_from_json(raw: &str) -> Result<BTreeMap<Stage, BTreeMap<String, f64>>> {
    let as_strings: BTreeMap<String, BTreeMap<String, f64>> = from_json_col(raw)?;
    Ok(as_strings
        .into_iter()
        .filter_map(|(k, v)| stage_from_str(&k).map(|s| (s, v)))
        .collect())
}

fn stage_from_str(s: &str) -> Option<Stage> {
    crate::domain::STAGE_ORDER
        .iter()
        .find(|stage| stage.as_str() == s)
        .copied()
}

fn row_to_batch(row: &rusqlite::Row) -> rusqlite::Result<IngestBatch> {
    let status_json: String = row.get(2)?;
    Ok(IngestBatch {
        id: row.get(0)?,
        source_descriptor: row.get(1)?,
        status: serde_json::from_str(&status_json).unwrap_or(crate::domain::BatchStatus::Failed),
        literacy_score: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[async_trait]
impl EnliteratorStore for SqliteStore {
    async fn save_batch(&self, batch: &IngestBatch) -> Result<()> {
        let batch = batch.clone();
        self.with_conn(move |conn| {
            let status_json = json_col(&batch.status)?;
            conn.execute(
                "INSERT INTO ingest_batches (id, source_descriptor, status, literacy_score, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET source_descriptor=excluded.source_descriptor,
                    status=excluded.status, literacy_score=excluded.literacy_score, updated_at=excluded.updated_at",
                params![
                    batch.id,
                    batch.source_descriptor,
                    status_json,
                    batch.literacy_score,
                    batch.created_at.to_rfc3339(),
                    batch.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_batch(&self, batch_id: &str) -> Result<IngestBatch> {
        let batch_id = batch_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, source_descriptor, status, literacy_score, created_at, updated_at
                 FROM ingest_batches WHERE id = ?1",
                params![batch_id],
                row_to_batch,
            )
            .optional()?
            .ok_or_else(|| StorageError::batch_not_found(batch_id.clone()))
        })
        .await
    }

    async fn save_item(&self, item: &IngestItem) -> Result<()> {
        let item = item.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO ingest_items (id, batch_id, content_hash, size_bytes, mime_type, content,
                    content_sample, triage_status, lexicon_status, pool_status, quarantined, rights_id, created_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)
                 ON CONFLICT(id) DO UPDATE SET triage_status=excluded.triage_status,
                    lexicon_status=excluded.lexicon_status, pool_status=excluded.pool_status,
                    quarantined=excluded.quarantined, rights_id=excluded.rights_id",
                params![
                    item.id,
                    item.batch_id,
                    item.content_hash,
                    item.size_bytes,
                    item.mime_type,
                    item.content,
                    item.content_sample,
                    json_col(&item.stages.triage)?,
                    json_col(&item.stages.lexicon)?,
                    json_col(&item.stages.pool)?,
                    item.quarantined as i64,
                    item.rights_id,
                    item.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_item(&self, item_id: &str) -> Result<IngestItem> {
        let item_id = item_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, batch_id, content_hash, size_bytes, mime_type, content, content_sample,
                    triage_status, lexicon_status, pool_status, quarantined, rights_id, created_at
                 FROM ingest_items WHERE id = ?1",
                params![item_id],
                row_to_item,
            )
            .optional()?
            .ok_or_else(|| StorageError::item_not_found(item_id.clone()))
        })
        .await
    }

    async fn items_by_stage_status(
        &self,
        batch_id: &str,
        stage: ItemStageKind,
        statuses: &[StageStatus],
    ) -> Result<Vec<IngestItem>> {
        let batch_id = batch_id.to_string();
        let column = match stage {
            ItemStageKind::Triage => "triage_status",
            ItemStageKind::Lexicon => "lexicon_status",
            ItemStageKind::Pool => "pool_status",
        };
        let wanted: Vec<String> = statuses
            .iter()
            .map(|s| json_col(s))
            .collect::<Result<_>>()?;
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT id, batch_id, content_hash, size_bytes, mime_type, content, content_sample,
                    triage_status, lexicon_status, pool_status, quarantined, rights_id, created_at
                 FROM ingest_items WHERE batch_id = ?1 AND {column} IN ({})",
                wanted.iter().map(|_| "?").collect::<Vec<_>>().join(","),
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut bind_params: Vec<&dyn rusqlite::ToSql> = vec![&batch_id];
            for w in &wanted {
                bind_params.push(w);
            }
            let rows = stmt.query_map(bind_params.as_slice(), row_to_item)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
    }

    async fn find_item_by_hash(
        &self,
        batch_id: &str,
        content_hash: &str,
    ) -> Result<Option<IngestItem>> {
        let batch_id = batch_id.to_string();
        let content_hash = content_hash.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, batch_id, content_hash, size_bytes, mime_type, content, content_sample,
                        triage_status, lexicon_status, pool_status, quarantined, rights_id, created_at
                     FROM ingest_items WHERE batch_id = ?1 AND content_hash = ?2",
                    params![batch_id, content_hash],
                    row_to_item,
                )
                .optional()?)
        })
        .await
    }

    async fn save_rights(&self, rights: &ProvenanceAndRights) -> Result<()> {
        let rights = rights.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO provenance_and_rights (id, license, consent, publishable, trainable,
                    confidence, source_type, method, valid_time_start, valid_time_end)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
                 ON CONFLICT(id) DO UPDATE SET publishable=excluded.publishable, trainable=excluded.trainable",
                params![
                    rights.id,
                    json_col(&rights.license)?,
                    json_col(&rights.consent)?,
                    rights.publishable as i64,
                    rights.trainable as i64,
                    rights.confidence,
                    rights.source_type,
                    rights.method,
                    rights.valid_time_start.to_rfc3339(),
                    rights.valid_time_end.map(|t| t.to_rfc3339()),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_rights(&self, rights_id: &str) -> Result<ProvenanceAndRights> {
        let rights_id = rights_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, license, consent, publishable, trainable, confidence, source_type,
                    method, valid_time_start, valid_time_end FROM provenance_and_rights WHERE id = ?1",
                params![rights_id],
                row_to_rights,
            )
            .optional()?
            .ok_or_else(|| {
                StorageError::new(
                    crate::error::ErrorKind::RightsNotFound,
                    format!("rights not found: {rights_id}"),
                )
            })
        })
        .await
    }

    async fn save_lexicon_entry(&self, entry: &LexiconEntry) -> Result<()> {
        let entry = entry.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO lexicon_entries (id, batch_id, canonical_term, surface_forms,
                    negative_surface_forms, pool_association, description, source_item_id,
                    valid_time_start, valid_time_end)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
                 ON CONFLICT(id) DO UPDATE SET surface_forms=excluded.surface_forms,
                    negative_surface_forms=excluded.negative_surface_forms, description=excluded.description",
                params![
                    entry.id,
                    entry.batch_id,
                    entry.canonical_term,
                    json_col(&entry.surface_forms)?,
                    json_col(&entry.negative_surface_forms)?,
                    entry.pool_association,
                    entry.description,
                    entry.source_item_id,
                    entry.valid_time_start.to_rfc3339(),
                    entry.valid_time_end.map(|t| t.to_rfc3339()),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_lexicon_entry_by_term(
        &self,
        batch_id: &str,
        canonical_term: &str,
    ) -> Result<Option<LexiconEntry>> {
        let batch_id = batch_id.to_string();
        let canonical_term = canonical_term.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, batch_id, canonical_term, surface_forms, negative_surface_forms,
                        pool_association, description, source_item_id, valid_time_start, valid_time_end
                     FROM lexicon_entries WHERE batch_id = ?1 AND canonical_term = ?2",
                    params![batch_id, canonical_term],
                    row_to_lexicon,
                )
                .optional()?)
        })
        .await
    }

    async fn lexicon_for_batch(&self, batch_id: &str) -> Result<Vec<LexiconEntry>> {
        let batch_id = batch_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, batch_id, canonical_term, surface_forms, negative_surface_forms,
                    pool_association, description, source_item_id, valid_time_start, valid_time_end
                 FROM lexicon_entries WHERE batch_id = ?1",
            )?;
            let rows = stmt.query_map(params![batch_id], row_to_lexicon)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
    }

    async fn save_pool_entity(&self, entity: &PoolEntity) -> Result<()> {
        let entity = entity.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO pool_entities (id, batch_id, repr_text, rights_id, source_item_id,
                    valid_time_start, valid_time_end, observed_at, fields_json)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
                 ON CONFLICT(id) DO UPDATE SET repr_text=excluded.repr_text, fields_json=excluded.fields_json",
                params![
                    entity.id,
                    entity.batch_id,
                    entity.repr_text,
                    entity.rights_id,
                    entity.source_item_id,
                    entity.valid_time_start.map(|t| t.to_rfc3339()),
                    entity.valid_time_end.map(|t| t.to_rfc3339()),
                    entity.observed_at.map(|t| t.to_rfc3339()),
                    json_col(&entity.fields)?,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn pool_entities_for_batch(&self, batch_id: &str) -> Result<Vec<PoolEntity>> {
        let batch_id = batch_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, batch_id, repr_text, rights_id, source_item_id, valid_time_start,
                    valid_time_end, observed_at, fields_json FROM pool_entities WHERE batch_id = ?1",
            )?;
            let rows = stmt.query_map(params![batch_id], row_to_pool_entity)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
    }

    async fn save_relation(&self, relation: &Relation) -> Result<()> {
        let relation = relation.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO relations (id, batch_id, source_label, source_id, target_label,
                    target_id, verb, strength, valid_time_start, valid_time_end, rights_id)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    relation.id,
                    relation.batch_id,
                    relation.source.label,
                    relation.source.id,
                    relation.target.label,
                    relation.target.id,
                    relation.verb,
                    relation.strength,
                    relation.valid_time_start.map(|t| t.to_rfc3339()),
                    relation.valid_time_end.map(|t| t.to_rfc3339()),
                    relation.rights_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn relations_for_batch(&self, batch_id: &str) -> Result<Vec<Relation>> {
        let batch_id = batch_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, batch_id, source_label, source_id, target_label, target_id, verb,
                    strength, valid_time_start, valid_time_end, rights_id
                 FROM relations WHERE batch_id = ?1",
            )?;
            let rows = stmt.query_map(params![batch_id], row_to_relation)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
    }

    async fn save_pipeline_run(&self, run: &PipelineRun) -> Result<()> {
        let run = run.clone();
        self.with_conn(move |conn| {
            insert_or_replace_run(conn, &run)
        })
        .await
    }

    async fn get_pipeline_run(&self, run_id: &str) -> Result<PipelineRun> {
        let run_id = run_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, batch_id, current_stage, state, retry_count, stage_statuses_json,
                    stage_metrics_json, error_message, next_retry_at, started_at, finished_at
                 FROM pipeline_runs WHERE id = ?1",
                params![run_id],
                row_to_run,
            )
            .optional()?
            .ok_or_else(|| StorageError::run_not_found(run_id.clone()))
        })
        .await
    }

    async fn update_pipeline_run(&self, run: &PipelineRun, expected_current_stage: Stage) -> Result<()> {
        let run = run.clone();
        self.with_conn(move |conn| {
            let observed: Option<String> = conn
                .query_row(
                    "SELECT current_stage FROM pipeline_runs WHERE id = ?1",
                    params![run.id],
                    |row| row.get(0),
                )
                .optional()?;
            match observed {
                None => Err(StorageError::run_not_found(run.id.clone())),
                Some(observed_json) => {
                    let observed_stage: Stage = from_json_col(&observed_json)?;
                    if observed_stage != expected_current_stage {
                        return Err(StorageError::conflicting_write(format!(
                            "pipeline run {} is at stage {:?}, expected {:?}",
                            run.id, observed_stage, expected_current_stage
                        )));
                    }
                    insert_or_replace_run(conn, &run)
                }
            }
        })
        .await
    }
}

fn insert_or_replace_run(conn: &Connection, run: &PipelineRun) -> Result<()> {
    conn.execute(
        "INSERT INTO pipeline_runs (id, batch_id, current_stage, state, retry_count,
            stage_statuses_json, stage_metrics_json, error_message, next_retry_at, started_at, finished_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
         ON CONFLICT(id) DO UPDATE SET current_stage=excluded.current_stage, state=excluded.state,
            retry_count=excluded.retry_count, stage_statuses_json=excluded.stage_statuses_json,
            stage_metrics_json=excluded.stage_metrics_json, error_message=excluded.error_message,
            next_retry_at=excluded.next_retry_at, finished_at=excluded.finished_at",
        params![
            run.id,
            run.batch_id,
            json_col(&run.current_stage)?,
            json_col(&run.state)?,
            run.retry_count,
            stage_statuses_to_json(&run.stage_statuses)?,
            stage_metrics_to_json(&run.stage_metrics)?,
            run.error_message,
            run.next_retry_at.map(|t| t.to_rfc3339()),
            run.started_at.to_rfc3339(),
            run.finished_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<IngestItem> {
    let triage_json: String = row.get(7)?;
    let lexicon_json: String = row.get(8)?;
    let pool_json: String = row.get(9)?;
    let quarantined: i64 = row.get(10)?;
    Ok(IngestItem {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        content_hash: row.get(2)?,
        size_bytes: row.get::<_, i64>(3)? as u64,
        mime_type: row.get(4)?,
        content: row.get(5)?,
        content_sample: row.get(6)?,
        stages: ItemStageStatuses {
            triage: serde_json::from_str(&triage_json).unwrap_or(StageStatus::Pending),
            lexicon: serde_json::from_str(&lexicon_json).unwrap_or(StageStatus::Pending),
            pool: serde_json::from_str(&pool_json).unwrap_or(StageStatus::Pending),
        },
        quarantined: quarantined != 0,
        rights_id: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn row_to_rights(row: &rusqlite::Row) -> rusqlite::Result<ProvenanceAndRights> {
    let license_json: String = row.get(1)?;
    let consent_json: String = row.get(2)?;
    let publishable: i64 = row.get(3)?;
    let trainable: i64 = row.get(4)?;
    Ok(ProvenanceAndRights {
        id: row.get(0)?,
        license: serde_json::from_str(&license_json)
            .unwrap_or(crate::domain::LicenseType::Unknown),
        consent: serde_json::from_str(&consent_json)
            .unwrap_or(crate::domain::ConsentStatus::Unspecified),
        publishable: publishable != 0,
        trainable: trainable != 0,
        confidence: row.get(5)?,
        source_type: row.get(6)?,
        method: row.get(7)?,
        valid_time_start: row.get(8)?,
        valid_time_end: row.get(9)?,
    })
}

fn row_to_lexicon(row: &rusqlite::Row) -> rusqlite::Result<LexiconEntry> {
    let surface_forms_json: String = row.get(3)?;
    let negative_json: String = row.get(4)?;
    Ok(LexiconEntry {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        canonical_term: row.get(2)?,
        surface_forms: serde_json::from_str(&surface_forms_json).unwrap_or_default(),
        negative_surface_forms: serde_json::from_str(&negative_json).unwrap_or_default(),
        pool_association: row.get(5)?,
        description: row.get(6)?,
        source_item_id: row.get(7)?,
        valid_time_start: row.get(8)?,
        valid_time_end: row.get(9)?,
    })
}

fn row_to_pool_entity(row: &rusqlite::Row) -> rusqlite::Result<PoolEntity> {
    let fields_json: String = row.get(8)?;
    Ok(PoolEntity {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        repr_text: row.get(2)?,
        rights_id: row.get(3)?,
        source_item_id: row.get(4)?,
        valid_time_start: row.get(5)?,
        valid_time_end: row.get(6)?,
        observed_at: row.get(7)?,
        fields: serde_json::from_str(&fields_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?,
    })
}

fn row_to_relation(row: &rusqlite::Row) -> rusqlite::Result<Relation> {
    Ok(Relation {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        source: EntityRef::new(row.get::<_, String>(2)?, row.get::<_, String>(3)?),
        target: EntityRef::new(row.get::<_, String>(4)?, row.get::<_, String>(5)?),
        verb: row.get(6)?,
        strength: row.get(7)?,
        valid_time_start: row.get(8)?,
        valid_time_end: row.get(9)?,
        rights_id: row.get(10)?,
    })
}

fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<PipelineRun> {
    let current_stage_json: String = row.get(2)?;
    let state_json: String = row.get(3)?;
    let stage_statuses_json: String = row.get(5)?;
    let stage_metrics_json: String = row.get(6)?;
    let current_stage: Stage = serde_json::from_str(&current_stage_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e)))?;
    let state: RunState = serde_json::from_str(&state_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e)))?;
    let stage_statuses = stage_statuses_from_json(&stage_statuses_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e)))?;
    let stage_metrics = stage_metrics_from_json(&stage_metrics_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e)))?;
    Ok(PipelineRun {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        current_stage,
        state,
        retry_count: row.get::<_, i64>(4)? as u32,
        stage_statuses,
        stage_metrics,
        error_message: row.get(7)?,
        next_retry_at: row.get(8)?,
        started_at: row.get(9)?,
        finished_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BatchStatus, ConsentStatus, LicenseType};

    #[tokio::test]
    async fn save_and_get_batch_roundtrips() {
        let store = SqliteStore::new_in_memory().unwrap();
        let batch = IngestBatch::new("1", "local-upload");
        store.save_batch(&batch).await.unwrap();
        let loaded = store.get_batch("1").await.unwrap();
        assert_eq!(loaded.id, "1");
        assert_eq!(loaded.status, BatchStatus::Initialized);
    }

    #[tokio::test]
    async fn get_missing_batch_errors() {
        let store = SqliteStore::new_in_memory().unwrap();
        let err = store.get_batch("missing").await.unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::BatchNotFound);
    }

    #[tokio::test]
    async fn item_round_trips_with_stage_statuses() {
        let store = SqliteStore::new_in_memory().unwrap();
        let item = IngestItem::from_content("i1", "b1", "text/plain", "hello world".into());
        store.save_item(&item).await.unwrap();
        let loaded = store.get_item("i1").await.unwrap();
        assert_eq!(loaded.content_hash, item.content_hash);
        assert_eq!(loaded.stages.triage, StageStatus::Pending);
    }

    #[tokio::test]
    async fn find_item_by_hash_dedupes() {
        let store = SqliteStore::new_in_memory().unwrap();
        let item = IngestItem::from_content("i1", "b1", "text/plain", "same content".into());
        store.save_item(&item).await.unwrap();
        let found = store
            .find_item_by_hash("b1", &item.content_hash)
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn pipeline_run_cas_rejects_stale_write() {
        let store = SqliteStore::new_in_memory().unwrap();
        let run = PipelineRun::new("r1", "b1");
        store.save_pipeline_run(&run).await.unwrap();

        let mut advanced = run.clone();
        advanced.current_stage = Stage::Intake;
        store
            .update_pipeline_run(&advanced, Stage::Frame)
            .await
            .unwrap();

        // Retry using the now-stale expected stage must be rejected.
        let mut stale = advanced.clone();
        stale.current_stage = Stage::RightsProvenance;
        let err = store
            .update_pipeline_run(&stale, Stage::Frame)
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ConflictingWrite);
    }

    #[tokio::test]
    async fn rights_round_trip() {
        let store = SqliteStore::new_in_memory().unwrap();
        let rights = ProvenanceAndRights::accepted(
            "r1",
            LicenseType::CreativeCommons,
            ConsentStatus::Granted,
            true,
            true,
            0.9,
            "upload",
            "rights-model-v1",
        );
        store.save_rights(&rights).await.unwrap();
        let loaded = store.get_rights("r1").await.unwrap();
        assert!(loaded.publishable);
        assert_eq!(loaded.license, LicenseType::CreativeCommons);
    }
}
