//! Vector embeddings for pool entities.

use serde::{Deserialize, Serialize};

use super::relation::EntityRef;

/// An embedding persisted against a graph node (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub entity: EntityRef,
    pub vector: Vec<f32>,
    pub model: String,
    pub dims: usize,
}

impl Embedding {
    pub fn new(entity: EntityRef, vector: Vec<f32>, model: impl Into<String>) -> Self {
        let dims = vector.len();
        Self {
            entity,
            vector,
            model: model.into(),
            dims,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dims_matches_vector_length() {
        let e = Embedding::new(EntityRef::new("Idea", "1"), vec![0.1, 0.2, 0.3], "text-embed-v1");
        assert_eq!(e.dims, 3);
    }
}
