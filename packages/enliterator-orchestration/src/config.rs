//! `OrchestrationConfig`: the §6 configuration surface, loaded the way the
//! pack's `abitofhelp-adaptive_pipeline` teacher-adjacent repo layers the
//! `config` crate — defaults, then an optional TOML file, then `EKN_`-
//! prefixed environment variables, each layer overriding the last.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// When true, Rights & Provenance yields permissive rights for items
    /// whose source descriptor is tagged `synthetic` (§9 Open Question
    /// resolution). Never defaults on.
    pub test_rights_override: bool,
    pub max_retries: u32,
    pub retry_backoff_initial_ms: u64,
    pub retry_backoff_cap_ms: u64,
    pub orphan_preserve_window_ms: u64,
    /// Set to `false` by the runner itself once the graph store reports
    /// multi-database is unsupported (§9); starts `true`.
    pub graph_multi_database_supported: bool,
    pub embedding_model: String,
    pub embedding_dims: usize,
    /// Reserved: the verb glossary is a closed compile-time table
    /// (`enliterator_graph::VERB_GLOSSARY`) per the "Dynamic verb
    /// dispatch" design note, not dynamically loaded. This path is
    /// accepted for configuration-surface completeness and, if set, is
    /// only used to log a diagnostic if it disagrees with the compiled-in
    /// glossary's verb names.
    pub verb_glossary_path: Option<String>,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            test_rights_override: false,
            max_retries: 3,
            retry_backoff_initial_ms: 2_000,
            retry_backoff_cap_ms: 60_000,
            orphan_preserve_window_ms: 3_600_000,
            graph_multi_database_supported: true,
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dims: 1536,
            verb_glossary_path: None,
        }
    }
}

impl OrchestrationConfig {
    pub fn retry_backoff_initial_secs(&self) -> u64 {
        self.retry_backoff_initial_ms / 1_000
    }

    pub fn retry_backoff_cap_secs(&self) -> u64 {
        self.retry_backoff_cap_ms / 1_000
    }

    /// Load defaults, then an optional TOML file at `path`, then `EKN_`
    /// environment variables (e.g. `EKN_MAX_RETRIES=5`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("EKN"));
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let cfg = OrchestrationConfig::default();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.orphan_preserve_window_ms, 3_600_000);
        assert!(!cfg.test_rights_override);
    }

    #[test]
    fn load_with_no_file_falls_back_to_defaults() {
        let cfg = OrchestrationConfig::load(Some("/nonexistent/path/does-not-exist")).unwrap();
        assert_eq!(cfg, OrchestrationConfig::default());
    }
}
