//! Graph assembly for the enliterator pipeline (`SPEC_FULL.md` C2).
//!
//! Owns everything that happens once relational state is ready to become a
//! labeled property graph: database provisioning, schema provisioning,
//! node/edge loading against the closed verb glossary, deduplication,
//! orphan removal, and integrity verification (§4.4).

pub mod dedup;
pub mod error;
pub mod integrity;
pub mod loader;
pub mod orphan;
pub mod provisioning;
pub mod sanitize;
pub mod schema;
pub mod store;
pub mod verbs;

pub use dedup::{DedupCandidate, Deduplicator, MergePlan};
pub use error::{ErrorKind, GraphError, Result};
pub use integrity::{IntegrityReport, IntegrityVerifier};
pub use loader::{EdgeLoader, LoadMetrics, NodeLoader};
pub use orphan::{OrphanRemovalReport, OrphanRemover, DEFAULT_PRESERVE_WINDOW};
pub use provisioning::{ekn_database_name, DatabaseProvisioner, ProvisionOutcome, DEFAULT_ONLINE_TIMEOUT};
pub use schema::SchemaManager;
pub use store::{GraphStore, Neo4rsGraphStore, Row, Statement};
pub use verbs::{edge_type, lookup, LabelMatch, VerbEntry, VERB_GLOSSARY};
