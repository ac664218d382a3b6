//! Canonical lexicon: the controlled vocabulary terms are bootstrapped into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A canonical vocabulary entry, unique by `canonical_term` within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub id: String,
    pub batch_id: String,
    pub canonical_term: String,
    pub surface_forms: Vec<String>,
    pub negative_surface_forms: Vec<String>,
    /// Pool this term is associated with, if any (e.g. an Idea label).
    pub pool_association: Option<String>,
    pub description: Option<String>,
    /// Item that first contributed this term; required for auditability.
    pub source_item_id: String,
    pub valid_time_start: DateTime<Utc>,
    pub valid_time_end: Option<DateTime<Utc>>,
}

impl LexiconEntry {
    pub fn new(
        id: impl Into<String>,
        batch_id: impl Into<String>,
        canonical_term: impl Into<String>,
        source_item_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            batch_id: batch_id.into(),
            canonical_term: canonical_term.into(),
            surface_forms: Vec::new(),
            negative_surface_forms: Vec::new(),
            pool_association: None,
            description: None,
            source_item_id: source_item_id.into(),
            valid_time_start: Utc::now(),
            valid_time_end: None,
        }
    }

    /// Merge another entry's surface forms into this one, keeping set
    /// semantics (used both by Lexicon Bootstrap's cross-item normalization
    /// and by Deduplication for `Lexicon` graph nodes).
    pub fn merge_surface_forms(&mut self, other: &LexiconEntry) {
        for form in &other.surface_forms {
            if !self.surface_forms.contains(form) {
                self.surface_forms.push(form.clone());
            }
        }
        for form in &other.negative_surface_forms {
            if !self.negative_surface_forms.contains(form) {
                self.negative_surface_forms.push(form.clone());
            }
        }
    }

    /// Value to write into the graph's `canonical_description` property,
    /// per the Schema Provisioning backfill rule: prefer `description`,
    /// else a fixed placeholder.
    pub fn canonical_description(&self) -> String {
        match &self.description {
            Some(d) if !d.trim().is_empty() => d.clone(),
            _ => "Extracted term".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_set_semantics() {
        let mut a = LexiconEntry::new("1", "b", "rainfall", "item-1");
        a.surface_forms.push("rain".to_string());
        let mut b = LexiconEntry::new("2", "b", "rainfall", "item-2");
        b.surface_forms.push("rain".to_string());
        b.surface_forms.push("precipitation".to_string());

        a.merge_surface_forms(&b);
        assert_eq!(a.surface_forms, vec!["rain", "precipitation"]);
    }

    #[test]
    fn canonical_description_falls_back() {
        let entry = LexiconEntry::new("1", "b", "rainfall", "item-1");
        assert_eq!(entry.canonical_description(), "Extracted term");
    }
}
