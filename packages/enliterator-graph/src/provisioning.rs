//! Database Provisioning (§4.4.1): naming, creation, and online polling for
//! a batch's dedicated EKN database.

use std::time::Duration;

use crate::error::{GraphError, Result};
use crate::store::GraphStore;

/// Default timeout Database Provisioning waits for a new database to report
/// `online` (§4.4.1: "poll with timeout ≥ 30 s").
pub const DEFAULT_ONLINE_TIMEOUT: Duration = Duration::from_secs(30);

/// The outcome of provisioning a batch's graph database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    /// Database actually used: `ekn-<batch_id>`, or `"default"` if the
    /// backend does not support multiple databases.
    pub database_name: String,
    pub multi_database_supported: bool,
}

/// Validate and compute the EKN database name for `batch_id`, per the
/// `^ekn-[0-9]+$` pattern required by §4.4.1.
pub fn ekn_database_name(batch_id: &str) -> Result<String> {
    if batch_id.is_empty() || !batch_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GraphError::invalid_input(format!(
            "batch_id {batch_id:?} does not match ^[0-9]+$, cannot derive an ekn-<id> database name"
        )));
    }
    let name = format!("ekn-{batch_id}");
    Ok(name)
}

pub struct DatabaseProvisioner;

impl DatabaseProvisioner {
    pub fn new() -> Self {
        Self
    }

    /// Create (idempotently) and wait for online the dedicated database for
    /// `batch_id`. Falls back to a single default database, namespaced by
    /// `batch_id` property, if the backend does not support multi-database
    /// administration (recorded in the returned outcome, which the stage
    /// job logs as a metric).
    pub async fn provision(
        &self,
        graph: &dyn GraphStore,
        batch_id: &str,
        timeout: Duration,
    ) -> Result<ProvisionOutcome> {
        let name = ekn_database_name(batch_id)?;
        let supported = graph.create_database(&name).await?;
        if !supported {
            return Ok(ProvisionOutcome {
                database_name: "default".to_string(),
                multi_database_supported: false,
            });
        }
        graph.wait_online(&name, timeout).await?;
        Ok(ProvisionOutcome {
            database_name: name,
            multi_database_supported: true,
        })
    }
}

impl Default for DatabaseProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_rejects_non_numeric_batch_id() {
        assert!(ekn_database_name("batch-42").is_err());
    }

    #[test]
    fn database_name_accepts_numeric_batch_id() {
        assert_eq!(ekn_database_name("42").unwrap(), "ekn-42");
    }
}
